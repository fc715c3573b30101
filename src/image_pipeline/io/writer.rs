use std::io::Write;

use ndarray::Array2;

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::common::types::ColorImage;
use crate::image_pipeline::io::types::WriterConfig;

pub trait ArtifactWriter {
    /// File extension (without dot) of the encoded output.
    fn extension(&self) -> &'static str;

    fn write_color(&self, image: &ColorImage, output: &mut dyn Write, config: &WriterConfig) -> Result<()>;

    /// Single-channel map such as a dark channel or transmission; values are clipped to [0, 1].
    fn write_map(&self, map: &Array2<f32>, output: &mut dyn Write, config: &WriterConfig) -> Result<()>;
}

pub(crate) fn map_to_u16(map: &Array2<f32>) -> Vec<u16> {
    map.iter()
        .map(|&v| (v.clamp(0.0, 1.0) * u16::MAX as f32).round() as u16)
        .collect()
}

pub(crate) fn map_to_u8(map: &Array2<f32>) -> Vec<u8> {
    map.iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect()
}
