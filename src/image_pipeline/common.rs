//! Common utilities module
//!
//! This module contains the error type, image types and step timing shared
//! across the dehazing pipeline.

pub mod error;
pub mod timing;
pub mod types;

pub use error::{DehazeError, ErrorKind, Result};
pub use timing::{PipelineTimings, StepTiming, Timer};
pub use types::{AtmosphericLight, ColorImage};
