use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::common::types::ColorImage;

pub trait HazyImageReader {
    fn read_image(&self, data: &[u8]) -> Result<ColorImage>;
}
