//! Image processing pipeline module
//!
//! Single image haze removal with the dark channel prior, parameter sweeps
//! over it, and the codecs and file orchestration around it.

pub mod common;
pub mod conversions;
pub mod dehaze;
pub mod experiment;
pub mod io;

pub use common::{AtmosphericLight, ColorImage, DehazeError, ErrorKind, PipelineTimings, Result};

pub use dehaze::{
    Artifact, ArtifactKind, ChannelObserver, DehazeOutput, DehazeParams, DehazeParamsBuilder, DehazePipeline,
    NullObserver, PipelineObserver, ProgressEvent, RefinementMethod, SoftMattingParams, default_params,
};

pub use experiment::{
    ExecutionMode, ExperimentGrid, ExperimentObserver, ExperimentRunner, ExperimentSummary, RunRecord,
};

pub use io::{
    ArtifactWriter, BitDepth, HazyImageReader, ImageCrateReader, PngWriter, StandardTiffWriter, TiffCompression,
    WriterConfig, WriterConfigBuilder,
};

pub use conversions::DehazeFilePipeline;
