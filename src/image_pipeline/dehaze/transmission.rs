use ndarray::{Array2, Array3, Axis, Zip};

use crate::image_pipeline::common::error::{DehazeError, Result};
use crate::image_pipeline::common::types::{AtmosphericLight, ColorImage};
use crate::image_pipeline::dehaze::dark_channel::min_filter;
use crate::image_pipeline::dehaze::params::validate_patch_size;

/// Lower bound kept on every transmission value so recovery never divides by zero.
pub const MIN_TRANSMISSION: f32 = 1e-3;

/// Airlight components below this are treated as this during normalization.
const MIN_LIGHT: f32 = 1e-6;

/// Coarse transmission `t = 1 - omega * dark(I / A)`, clamped to
/// `[MIN_TRANSMISSION, 1]`. The user-facing `t0` floor is not applied here.
pub fn estimate_coarse_transmission(
    image: &ColorImage,
    light: &AtmosphericLight,
    patch_size: usize,
    omega: f32,
) -> Result<Array2<f32>> {
    validate_patch_size(patch_size)?;
    if !(omega > 0.0 && omega <= 1.0) {
        return Err(DehazeError::invalid_parameter(
            "omega",
            format!("must lie in (0, 1], got {}", omega),
        ));
    }

    let a = light.channels().map(|c| c.max(MIN_LIGHT));
    let mut normalized = Array3::<f32>::zeros((image.height(), image.width(), 3));
    Zip::from(normalized.lanes_mut(Axis(2)))
        .and(image.view().lanes(Axis(2)))
        .for_each(|mut out, px| {
            for c in 0..3 {
                out[c] = px[c] / a[c];
            }
        });

    let min_normalized = normalized
        .map_axis(Axis(2), |px| px.iter().fold(f32::INFINITY, |acc, &v| acc.min(v)));
    let dark = min_filter(&min_normalized, patch_size / 2);

    Ok(dark.mapv(|d| (1.0 - omega * d).clamp(MIN_TRANSMISSION, 1.0)))
}
