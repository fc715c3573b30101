use ndarray::{Array2, ArrayView1, ArrayViewMut1, Zip};
use tracing::debug;

use crate::image_pipeline::common::error::{DehazeError, Result};
use crate::image_pipeline::common::types::ColorImage;
use crate::image_pipeline::dehaze::dark_channel::{max_filter, min_filter};
use crate::image_pipeline::dehaze::refine::{TransmissionRefiner, check_same_size};

/// Guided filter refinement with the hazy image's luminance as guide
///
/// For every `(2 * radius + 1)` window the input is modelled as
/// `a * guide + b` (least squares, regularized by `epsilon`); coefficients are
/// box-averaged before being applied. Small `epsilon` keeps edges, large
/// `epsilon` tends towards a box blur.
#[derive(Debug, Clone, Copy)]
pub struct GuidedFilter {
    pub radius: usize,
    pub epsilon: f32,
}

impl GuidedFilter {
    /// Raw guided filter output, without the range guard applied by `refine`.
    pub fn filter(&self, guide: &Array2<f32>, input: &Array2<f32>) -> Array2<f32> {
        let r = self.radius;
        let eps = self.epsilon;

        let mean_g = box_mean(guide, r);
        let mean_i = box_mean(input, r);
        let corr_gi = box_mean(&(guide * input), r);
        let corr_gg = box_mean(&(guide * guide), r);

        let mut a = Array2::<f32>::zeros(guide.dim());
        let mut b = Array2::<f32>::zeros(guide.dim());
        Zip::from(&mut a)
            .and(&mut b)
            .and(&mean_g)
            .and(&mean_i)
            .and(&corr_gi)
            .and(&corr_gg)
            .for_each(|a, b, &mg, &mi, &cgi, &cgg| {
                let covariance = cgi - mg * mi;
                // rounding can push a flat window's variance just below zero
                let variance = (cgg - mg * mg).max(0.0);
                *a = covariance / (variance + eps);
                *b = mi - *a * mg;
            });

        let mean_a = box_mean(&a, r);
        let mean_b = box_mean(&b, r);
        &mean_a * guide + &mean_b
    }
}

impl TransmissionRefiner for GuidedFilter {
    fn name(&self) -> &'static str {
        "guided_filter"
    }

    fn refine(&self, coarse: &Array2<f32>, guide: &ColorImage) -> Result<Array2<f32>> {
        check_same_size(coarse, guide)?;
        if self.radius == 0 {
            return Err(DehazeError::invalid_parameter("gf_radius", "must be positive"));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(DehazeError::invalid_parameter(
                "gf_epsilon",
                format!("must be positive, got {}", self.epsilon),
            ));
        }
        debug!(radius = self.radius, epsilon = self.epsilon, "guided filter");

        let mut refined = self.filter(&guide.to_luminance(), coarse);

        // Each output depends on coarse values within 2 * radius; keep it in their range.
        let support = 2 * self.radius;
        let lo = min_filter(coarse, support);
        let hi = max_filter(coarse, support);
        Zip::from(&mut refined).and(&lo).and(&hi).for_each(|t, &lo, &hi| {
            *t = if t.is_nan() { lo } else { t.clamp(lo, hi) };
        });
        Ok(refined)
    }
}

/// Mean over a `(2 * radius + 1)` square window with replicated borders.
///
/// Separable running sums make the cost independent of `radius`.
pub fn box_mean(src: &Array2<f32>, radius: usize) -> Array2<f32> {
    let mut rows = Array2::<f32>::zeros(src.dim());
    Zip::from(rows.rows_mut())
        .and(src.rows())
        .par_for_each(|out, lane| running_mean(lane, out, radius));

    let mut result = Array2::<f32>::zeros(src.dim());
    Zip::from(result.columns_mut())
        .and(rows.columns())
        .par_for_each(|out, lane| running_mean(lane, out, radius));
    result
}

fn running_mean(src: ArrayView1<f32>, mut out: ArrayViewMut1<f32>, radius: usize) {
    let len = src.len() as isize;
    if len == 0 {
        return;
    }
    let r = radius as isize;
    let at = |k: isize| src[k.clamp(0, len - 1) as usize] as f64;
    let count = (2 * radius + 1) as f64;

    let mut sum: f64 = (-r..=r).map(at).sum();
    for i in 0..len {
        out[i as usize] = (sum / count) as f32;
        sum += at(i + r + 1) - at(i - r);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn naive_box(src: &Array2<f32>, radius: usize) -> Array2<f32> {
        let (h, w) = src.dim();
        let r = radius as isize;
        Array2::from_shape_fn((h, w), |(y, x)| {
            let mut sum = 0.0f64;
            for dy in -r..=r {
                for dx in -r..=r {
                    let yy = (y as isize + dy).clamp(0, h as isize - 1) as usize;
                    let xx = (x as isize + dx).clamp(0, w as isize - 1) as usize;
                    sum += src[[yy, xx]] as f64;
                }
            }
            (sum / ((2 * r + 1) * (2 * r + 1)) as f64) as f32
        })
    }

    fn blocky_transmission(width: usize, height: usize) -> Array2<f32> {
        Array2::from_shape_fn((height, width), |(y, x)| {
            if (x / 4 + y / 4) % 2 == 0 { 0.3 } else { 0.8 }
        })
    }

    fn striped_guide(width: usize, height: usize) -> ColorImage {
        ColorImage::new(Array3::from_shape_fn((height, width, 3), |(y, x, c)| {
            ((x * 3 + y * 5 + c) % 11) as f32 / 10.0
        }))
        .unwrap()
    }

    #[test]
    fn test_box_mean_matches_naive_with_replicated_borders() {
        let src = blocky_transmission(13, 9);
        for radius in [0, 1, 3, 10] {
            let fast = box_mean(&src, radius);
            let slow = naive_box(&src, radius);
            for (a, b) in fast.iter().zip(slow.iter()) {
                assert!((a - b).abs() < 1e-5, "radius {}: {} vs {}", radius, a, b);
            }
        }
    }

    #[test]
    fn test_constant_input_is_preserved() {
        let guide = striped_guide(10, 10);
        let coarse = Array2::from_elem((10, 10), 0.42f32);
        let refined = GuidedFilter { radius: 3, epsilon: 1e-3 }.refine(&coarse, &guide).unwrap();
        assert!(refined.iter().all(|&v| (v - 0.42).abs() < 1e-5));
    }

    #[test]
    fn test_no_overshoot_outside_local_range() {
        let guide = striped_guide(24, 20);
        let coarse = blocky_transmission(24, 20);
        for epsilon in [1e-6, 1e-3, 1.0] {
            let filter = GuidedFilter { radius: 2, epsilon };
            let refined = filter.refine(&coarse, &guide).unwrap();
            let lo = min_filter(&coarse, 4);
            let hi = max_filter(&coarse, 4);
            Zip::from(&refined).and(&lo).and(&hi).for_each(|&t, &l, &h| {
                assert!(t >= l && t <= h, "{} outside [{}, {}]", t, l, h);
            });
        }
    }

    #[test]
    fn test_large_epsilon_converges_to_box_blur() {
        let guide = striped_guide(20, 16);
        let coarse = blocky_transmission(20, 16);
        let radius = 2;
        let refined = GuidedFilter { radius, epsilon: 1e6 }.refine(&coarse, &guide).unwrap();
        // a -> 0 and b -> mean(p), so the output is the box mean applied twice
        let reference = box_mean(&box_mean(&coarse, radius), radius);
        for (a, b) in refined.iter().zip(reference.iter()) {
            assert!((a - b).abs() < 1e-3, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_small_epsilon_follows_guide_edges() {
        // guide has a vertical edge at x = 8; coarse is blurred across it
        let guide = ColorImage::new(Array3::from_shape_fn((12, 16, 3), |(_, x, _)| {
            if x < 8 { 0.2 } else { 0.9 }
        }))
        .unwrap();
        let coarse = Array2::from_shape_fn((12, 16), |(_, x)| {
            (0.2 + 0.6 * (x as f32 / 15.0)).clamp(0.0, 1.0)
        });
        let refined = GuidedFilter { radius: 2, epsilon: 1e-6 }.refine(&coarse, &guide).unwrap();
        let jump_refined = refined[[6, 8]] - refined[[6, 7]];
        let jump_coarse = coarse[[6, 8]] - coarse[[6, 7]];
        assert!(jump_refined > 2.0 * jump_coarse);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let guide = striped_guide(4, 4);
        let coarse = Array2::from_elem((4, 4), 0.5f32);
        assert!(GuidedFilter { radius: 0, epsilon: 1e-3 }.refine(&coarse, &guide).is_err());
        assert!(GuidedFilter { radius: 1, epsilon: 0.0 }.refine(&coarse, &guide).is_err());
    }
}
