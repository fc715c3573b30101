use std::io::{Cursor, Write};

use ndarray::Array2;
use tiff::encoder::colortype::{self, ColorType};
use tiff::encoder::compression::DeflateLevel;
use tiff::encoder::{Compression, TiffEncoder, TiffValue};
use tiff::tags::Predictor;
use tracing::debug;

use crate::image_pipeline::common::error::{DehazeError, Result};
use crate::image_pipeline::common::types::ColorImage;
use crate::image_pipeline::io::types::{BitDepth, TiffCompression, WriterConfig};
use crate::image_pipeline::io::writer::{ArtifactWriter, map_to_u16, map_to_u8};

pub struct StandardTiffWriter;

impl StandardTiffWriter {
    fn encode<C: ColorType>(
        width: usize,
        height: usize,
        data: &[C::Inner],
        output: &mut dyn Write,
        config: &WriterConfig,
    ) -> Result<()>
    where
        [C::Inner]: TiffValue,
    {
        let mut buffer = Vec::new();

        let compression = match config.compression {
            TiffCompression::None => Compression::Uncompressed,
            TiffCompression::Lzw => Compression::Lzw,
            TiffCompression::DeflateFast => Compression::Deflate(DeflateLevel::Fast),
            TiffCompression::DeflateBalanced => Compression::Deflate(DeflateLevel::Balanced),
            TiffCompression::DeflateBest => Compression::Deflate(DeflateLevel::Best),
        };

        let mut encoder = TiffEncoder::new(Cursor::new(&mut buffer))
            .map_err(|e| DehazeError::EncodeError(e.to_string()))?
            .with_compression(compression);

        if let Some(predictor_val) = config.predictor {
            let predictor = match predictor_val {
                2 => Predictor::Horizontal,
                _ => Predictor::None,
            };
            encoder = encoder.with_predictor(predictor);
        }

        encoder
            .write_image::<C>(width as u32, height as u32, data)
            .map_err(|e| DehazeError::EncodeError(e.to_string()))?;

        output.write_all(&buffer)?;
        Ok(())
    }
}

impl ArtifactWriter for StandardTiffWriter {
    fn extension(&self) -> &'static str {
        "tiff"
    }

    fn write_color(&self, image: &ColorImage, output: &mut dyn Write, config: &WriterConfig) -> Result<()> {
        debug!("Encoding RGB TIFF image: {}x{}", image.width(), image.height());
        match config.bit_depth {
            BitDepth::Sixteen => Self::encode::<colortype::RGB16>(
                image.width(),
                image.height(),
                &image.to_rgb16(),
                output,
                config,
            )?,
            BitDepth::Eight => Self::encode::<colortype::RGB8>(
                image.width(),
                image.height(),
                &image.to_rgb8(),
                output,
                config,
            )?,
        }
        debug!("TIFF encoding complete");
        Ok(())
    }

    fn write_map(&self, map: &Array2<f32>, output: &mut dyn Write, config: &WriterConfig) -> Result<()> {
        let (height, width) = map.dim();
        debug!("Encoding grayscale TIFF map: {}x{}", width, height);
        match config.bit_depth {
            BitDepth::Sixteen => {
                Self::encode::<colortype::Gray16>(width, height, &map_to_u16(map), output, config)
            }
            BitDepth::Eight => {
                Self::encode::<colortype::Gray8>(width, height, &map_to_u8(map), output, config)
            }
        }
    }
}
