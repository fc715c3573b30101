use ndarray::Array2;

use crate::image_pipeline::common::error::{DehazeError, Result};
use crate::image_pipeline::common::types::{AtmosphericLight, ColorImage};
use crate::image_pipeline::dehaze::params::validate_percentile;

/// Estimates the airlight from the haziest pixels.
///
/// The top `ceil(percentile * N)` pixels by dark-channel value (at least one)
/// are selected, ties broken by ascending row-major position, and the
/// per-channel maximum of the original image over that set is returned.
pub fn estimate_atmospheric_light(
    image: &ColorImage,
    dark_channel: &Array2<f32>,
    percentile: f64,
) -> Result<AtmosphericLight> {
    validate_percentile(percentile)?;
    let (height, width) = dark_channel.dim();
    if (height, width) != (image.height(), image.width()) {
        return Err(DehazeError::InvalidImage(format!(
            "dark channel is {}x{}, image is {}x{}",
            width,
            height,
            image.width(),
            image.height()
        )));
    }
    let total = height * width;
    if total == 0 {
        return Err(DehazeError::InvalidDimensions(width, height));
    }

    let count = selection_size(percentile, total);

    let flat: Vec<f32> = dark_channel.iter().copied().collect();
    let mut order: Vec<usize> = (0..total).collect();
    let by_haze = |a: &usize, b: &usize| flat[*b].total_cmp(&flat[*a]).then(a.cmp(b));
    if count < total {
        order.select_nth_unstable_by(count - 1, by_haze);
        order.truncate(count);
    }

    let mut light = [0.0f32; 3];
    for index in order {
        let pixel = image.pixel(index / width, index % width);
        for (l, p) in light.iter_mut().zip(pixel) {
            *l = l.max(p);
        }
    }
    Ok(AtmosphericLight(light))
}

/// `ceil(percentile * total)`, at least one and at most `total`.
///
/// Products within rounding error of a whole number count as that number, so
/// 0.001 of 10 000 pixels selects exactly 10.
fn selection_size(percentile: f64, total: usize) -> usize {
    let scaled = percentile * total as f64;
    let nearest = scaled.round();
    let count = if (scaled - nearest).abs() <= scaled * 1e-9 {
        nearest
    } else {
        scaled.ceil()
    };
    (count as usize).clamp(1, total)
}
