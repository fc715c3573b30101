//! Pipeline conversions module
//!
//! This module contains the orchestration from encoded input files to encoded
//! restored outputs.

mod dehaze_file;


pub use dehaze_file::DehazeFilePipeline;
