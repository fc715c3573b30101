use ndarray::{Array2, Array3, Axis, Zip};

use crate::image_pipeline::common::error::{DehazeError, Result};
use crate::image_pipeline::common::types::{AtmosphericLight, ColorImage};

/// Inverts the haze model: `J = (I - A) / max(t, t0) + A`, then clips to [0, 1].
///
/// Non-finite values before the clip are reported rather than clipped away.
pub fn recover_radiance(
    image: &ColorImage,
    transmission: &Array2<f32>,
    light: &AtmosphericLight,
    t0: f32,
) -> Result<ColorImage> {
    if !(t0 > 0.0 && t0 < 1.0) {
        return Err(DehazeError::invalid_parameter(
            "t0",
            format!("must lie in (0, 1), got {}", t0),
        ));
    }
    if transmission.dim() != (image.height(), image.width()) {
        return Err(DehazeError::InvalidImage(format!(
            "transmission is {}x{}, image is {}x{}",
            transmission.ncols(),
            transmission.nrows(),
            image.width(),
            image.height()
        )));
    }

    let a = light.channels();
    let mut output = Array3::<f32>::zeros((image.height(), image.width(), 3));
    let mut non_finite = 0usize;
    Zip::from(output.lanes_mut(Axis(2)))
        .and(image.view().lanes(Axis(2)))
        .and(transmission)
        .for_each(|mut out, px, &t| {
            let t = t.max(t0);
            for c in 0..3 {
                let recovered = (px[c] - a[c]) / t + a[c];
                if !recovered.is_finite() {
                    non_finite += 1;
                }
                out[c] = recovered.clamp(0.0, 1.0);
            }
        });

    if non_finite > 0 {
        return Err(DehazeError::numerical(
            "radiance",
            format!("{} non-finite samples before clipping", non_finite),
        ));
    }
    Ok(ColorImage::from_clipped(output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_transmission_is_identity() {
        let image = ColorImage::uniform(4, 3, [0.2, 0.5, 0.7]).unwrap();
        let t = Array2::from_elem((3, 4), 1.0f32);
        let restored = recover_radiance(&image, &t, &AtmosphericLight([0.9; 3]), 0.1).unwrap();
        for (got, want) in restored.view().iter().zip(image.view().iter()) {
            assert!((got - want).abs() < 1e-6);
        }
    }

    #[test]
    fn test_inverts_haze_model() {
        let light = AtmosphericLight([0.8, 0.8, 0.8]);
        let scene = [0.1f32, 0.4, 0.6];
        let t = 0.5f32;
        let hazy: Vec<f32> = scene.iter().map(|j| j * t + 0.8 * (1.0 - t)).collect();
        let image = ColorImage::uniform(2, 2, [hazy[0], hazy[1], hazy[2]]).unwrap();
        let restored = recover_radiance(&image, &Array2::from_elem((2, 2), t), &light, 0.1).unwrap();
        for (got, want) in restored.pixel(1, 1).iter().zip(scene) {
            assert!((got - want).abs() < 1e-5);
        }
    }

    #[test]
    fn test_floor_bounds_amplification_and_output_is_clipped() {
        let image = ColorImage::uniform(1, 1, [0.0, 1.0, 0.5]).unwrap();
        let t = Array2::from_elem((1, 1), 1e-3f32);
        let restored = recover_radiance(&image, &t, &AtmosphericLight([0.5; 3]), 0.1).unwrap();
        // (0 - 0.5) / 0.1 + 0.5 = -4.5 and (1 - 0.5) / 0.1 + 0.5 = 5.5 before clipping
        assert_eq!(restored.pixel(0, 0), [0.0, 1.0, 0.5]);
    }

    #[test]
    fn test_nan_transmission_falls_back_to_floor() {
        let image = ColorImage::uniform(2, 1, [0.3; 3]).unwrap();
        let mut t = Array2::from_elem((1, 2), 0.5f32);
        t[[0, 1]] = f32::NAN;
        let restored = recover_radiance(&image, &t, &AtmosphericLight([0.4; 3]), 0.25).unwrap();
        // (0.3 - 0.4) / 0.25 + 0.4
        assert!(restored.pixel(0, 1).iter().all(|v| (v - 0.0).abs() < 1e-6));
        assert!(restored.pixel(0, 0).iter().all(|v| (v - 0.2).abs() < 1e-6));
    }

    #[test]
    fn test_rejects_invalid_floor_and_shape() {
        let image = ColorImage::uniform(2, 2, [0.3; 3]).unwrap();
        let t = Array2::from_elem((2, 2), 0.5f32);
        let light = AtmosphericLight([0.9; 3]);
        assert!(recover_radiance(&image, &t, &light, 0.0).is_err());
        assert!(recover_radiance(&image, &t, &light, 1.0).is_err());
        assert!(recover_radiance(&image, &Array2::zeros((2, 3)), &light, 0.1).is_err());
    }
}
