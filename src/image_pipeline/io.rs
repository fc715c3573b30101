//! Image I/O module
//!
//! Decoding of hazy inputs and encoding of restored images and intermediate
//! maps. The dehazing core never touches bytes; everything here adapts it to
//! files and streams.

mod image_reader;
pub mod png_writer;
mod reader;
mod tiff_writer;
pub mod types;
mod writer;

pub use image_reader::ImageCrateReader;
pub use png_writer::PngWriter;
pub use reader::HazyImageReader;
pub use tiff_writer::StandardTiffWriter;
pub use types::{BitDepth, TiffCompression, WriterConfig, WriterConfigBuilder};
pub use writer::ArtifactWriter;
