//! 8-bit PNG encoding, the displayable form of every artifact

use std::io::Write;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use ndarray::Array2;
use tracing::debug;

use crate::image_pipeline::common::error::{DehazeError, Result};
use crate::image_pipeline::common::types::ColorImage;
use crate::image_pipeline::io::types::WriterConfig;
use crate::image_pipeline::io::writer::{ArtifactWriter, map_to_u8};

pub struct PngWriter;

fn encode_png(samples: &[u8], width: usize, height: usize, color: ExtendedColorType) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(samples, width as u32, height as u32, color)
        .map_err(|e| DehazeError::EncodeError(e.to_string()))?;
    Ok(buffer)
}

pub fn encode_color_png(image: &ColorImage) -> Result<Vec<u8>> {
    encode_png(&image.to_rgb8(), image.width(), image.height(), ExtendedColorType::Rgb8)
}

pub fn encode_map_png(map: &Array2<f32>) -> Result<Vec<u8>> {
    let (height, width) = map.dim();
    encode_png(&map_to_u8(map), width, height, ExtendedColorType::L8)
}

impl ArtifactWriter for PngWriter {
    fn extension(&self) -> &'static str {
        "png"
    }

    fn write_color(&self, image: &ColorImage, output: &mut dyn Write, _config: &WriterConfig) -> Result<()> {
        debug!("Encoding PNG image: {}x{}", image.width(), image.height());
        output.write_all(&encode_color_png(image)?)?;
        Ok(())
    }

    fn write_map(&self, map: &Array2<f32>, output: &mut dyn Write, _config: &WriterConfig) -> Result<()> {
        output.write_all(&encode_map_png(map)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::dehaze::{Artifact, ArtifactKind};

    #[test]
    fn test_color_png_decodes_back() {
        let image = ColorImage::uniform(7, 2, [1.0, 0.0, 0.5]).unwrap();
        let decoded = image::load_from_memory(&encode_color_png(&image).unwrap())
            .unwrap()
            .to_rgb8();
        assert_eq!(decoded.dimensions(), (7, 2));
        assert_eq!(decoded.get_pixel(6, 1).0, [255, 0, 128]);
    }

    #[test]
    fn test_artifact_map_encodes_as_grayscale() {
        let artifact = Artifact::map(ArtifactKind::RefinedTransmission, Array2::from_elem((3, 4), 0.2));
        let decoded = image::load_from_memory(&artifact.encode_png().unwrap()).unwrap();
        assert_eq!(decoded.color(), image::ColorType::L8);
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }

    #[test]
    fn test_writer_streams_png_bytes() {
        let mut out = Vec::new();
        PngWriter
            .write_map(&Array2::zeros((2, 2)), &mut out, &WriterConfig::default())
            .unwrap();
        assert_eq!(&out[..8], b"\x89PNG\r\n\x1a\n");
    }
}
