use tracing::{debug, warn};

use crate::image_pipeline::common::error::{DehazeError, Result};
use crate::image_pipeline::common::types::ColorImage;
use crate::image_pipeline::io::reader::HazyImageReader;

/// Decodes any format the `image` crate recognises and normalizes it to
/// RGB samples in [0, 1]. Alpha is dropped and grayscale is replicated.
pub struct ImageCrateReader;

impl HazyImageReader for ImageCrateReader {
    fn read_image(&self, data: &[u8]) -> Result<ColorImage> {
        debug!("Decoding image data, size: {} bytes", data.len());

        let decoded = image::load_from_memory(data).map_err(|e| DehazeError::DecodeError(e.to_string()))?;
        let rgb = decoded.to_rgb32f();
        let (width, height) = (rgb.width() as usize, rgb.height() as usize);

        // float sources (HDR, EXR) can exceed the unit range
        let mut clipped = 0usize;
        let samples: Vec<f32> = rgb
            .into_raw()
            .into_iter()
            .map(|v| {
                if v.is_finite() && !(0.0..=1.0).contains(&v) {
                    clipped += 1;
                    v.clamp(0.0, 1.0)
                } else {
                    v
                }
            })
            .collect();
        if clipped > 0 {
            warn!("Clipped {} samples outside [0, 1]", clipped);
        }

        debug!("Successfully decoded image: {}x{}", width, height);
        ColorImage::from_interleaved(width, height, samples)
    }
}
