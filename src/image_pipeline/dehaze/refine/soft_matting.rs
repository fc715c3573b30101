use nalgebra::{DMatrix, Matrix3, Vector3};
use nalgebra_sparse::factorization::CscCholesky;
use nalgebra_sparse::{CooMatrix, CscMatrix};
use ndarray::Array2;
use tracing::{debug, info_span, warn};

use crate::image_pipeline::common::error::{DehazeError, Result};
use crate::image_pipeline::common::types::ColorImage;
use crate::image_pipeline::dehaze::params::SoftMattingParams;
use crate::image_pipeline::dehaze::refine::{TransmissionRefiner, check_same_size};
use crate::image_pipeline::dehaze::transmission::MIN_TRANSMISSION;

/// Matting windows are 3x3.
const WINDOW_RADIUS: usize = 1;
const WINDOW_LEN: usize = (2 * WINDOW_RADIUS + 1) * (2 * WINDOW_RADIUS + 1);

/// Soft matting refinement
///
/// Solves `(L + lambda * U) t = lambda * t_coarse` where `L` is the
/// closed-form matting Laplacian of the guide. Memory grows quickly with the
/// pixel count, so images above `params.max_pixels` are refused.
#[derive(Debug, Clone, Copy)]
pub struct SoftMatting {
    pub params: SoftMattingParams,
}

impl TransmissionRefiner for SoftMatting {
    fn name(&self) -> &'static str {
        "soft_matting"
    }

    fn refine(&self, coarse: &Array2<f32>, guide: &ColorImage) -> Result<Array2<f32>> {
        check_same_size(coarse, guide)?;
        let (height, width) = coarse.dim();
        let pixels = height * width;
        if pixels > self.params.max_pixels {
            return Err(DehazeError::ResourceLimit {
                strategy: self.name(),
                pixels,
                limit: self.params.max_pixels,
            });
        }
        if pixels > self.params.max_pixels / 2 {
            warn!(pixels, "soft matting on a large image is slow and memory hungry");
        }

        let lambda = self.params.lambda;
        let system = {
            let _span = info_span!("matting_laplacian", width, height).entered();
            let mut triplets = matting_laplacian(guide, self.params.epsilon)?;
            for i in 0..pixels {
                triplets.push(i, i, lambda);
            }
            CscMatrix::from(&triplets)
        };
        debug!(nnz = system.nnz(), "sparse system assembled");

        let rhs = DMatrix::from_fn(pixels, 1, |i, _| lambda * coarse[[i / width, i % width]] as f64);
        let solution = {
            let _span = info_span!("sparse_cholesky", pixels).entered();
            let factor = CscCholesky::factor(&system).map_err(|e| {
                DehazeError::numerical("soft_matting", format!("factorization failed: {:?}", e))
            })?;
            factor.solve(&rhs)
        };

        if let Some(bad) = solution.iter().find(|v| !v.is_finite()) {
            return Err(DehazeError::numerical(
                "soft_matting",
                format!("solver produced non-finite value {}", bad),
            ));
        }

        Ok(Array2::from_shape_fn((height, width), |(y, x)| {
            (solution[(y * width + x, 0)] as f32).clamp(MIN_TRANSMISSION, 1.0)
        }))
    }
}

/// Triplets of the matting Laplacian over all 3x3 windows lying inside the image.
///
/// Per window `k` with color mean `mu` and covariance `sigma`:
/// `L_ij += delta_ij - (1 + (I_i - mu)^T (sigma + eps / |w| * I3)^-1 (I_j - mu)) / |w|`.
fn matting_laplacian(guide: &ColorImage, epsilon: f64) -> Result<CooMatrix<f64>> {
    let (height, width) = (guide.height(), guide.width());
    let pixels = height * width;
    let mut coo = CooMatrix::new(pixels, pixels);
    if height < 2 * WINDOW_RADIUS + 1 || width < 2 * WINDOW_RADIUS + 1 {
        return Ok(coo);
    }

    let view = guide.view();
    let color = |y: usize, x: usize| {
        Vector3::new(
            view[[y, x, 0]] as f64,
            view[[y, x, 1]] as f64,
            view[[y, x, 2]] as f64,
        )
    };
    let n = WINDOW_LEN as f64;
    let regularizer = Matrix3::identity() * (epsilon / n);

    let mut indices = [0usize; WINDOW_LEN];
    let mut offsets = [Vector3::<f64>::zeros(); WINDOW_LEN];

    for cy in WINDOW_RADIUS..height - WINDOW_RADIUS {
        for cx in WINDOW_RADIUS..width - WINDOW_RADIUS {
            let mut mean = Vector3::zeros();
            let mut k = 0;
            for y in cy - WINDOW_RADIUS..=cy + WINDOW_RADIUS {
                for x in cx - WINDOW_RADIUS..=cx + WINDOW_RADIUS {
                    indices[k] = y * width + x;
                    offsets[k] = color(y, x);
                    mean += offsets[k];
                    k += 1;
                }
            }
            mean /= n;

            let mut covariance = Matrix3::zeros();
            for d in offsets.iter_mut() {
                *d -= mean;
                covariance += *d * d.transpose();
            }
            covariance /= n;

            let inverse = (covariance + regularizer).try_inverse().ok_or_else(|| {
                DehazeError::numerical(
                    "soft_matting",
                    format!("singular window covariance at ({}, {})", cx, cy),
                )
            })?;

            for a in 0..WINDOW_LEN {
                let projected = inverse * offsets[a];
                for b in a..WINDOW_LEN {
                    let delta = if a == b { 1.0 } else { 0.0 };
                    let value = delta - (1.0 + projected.dot(&offsets[b])) / n;
                    coo.push(indices[a], indices[b], value);
                    if a != b {
                        coo.push(indices[b], indices[a], value);
                    }
                }
            }
        }
    }
    Ok(coo)
}
