use thiserror::Error;

/// Coarse classification of a [`DehazeError`], used by orchestrators to decide
/// whether a failure aborts a whole batch or only the run that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Numerical,
    Resource,
    Io,
}

#[derive(Error, Debug)]
pub enum DehazeError {
    #[error("Invalid parameter `{field}`: {reason}")]
    InvalidParameter { field: &'static str, reason: String },

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Numerical failure during {stage}: {reason}")]
    Numerical { stage: &'static str, reason: String },

    #[error("{strategy} refinement refused for {pixels} pixels (limit {limit})")]
    ResourceLimit {
        strategy: &'static str,
        pixels: usize,
        limit: usize,
    },

    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    #[error("Failed to encode image: {0}")]
    EncodeError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DehazeError {
    pub fn invalid_parameter(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field,
            reason: reason.into(),
        }
    }

    pub fn numerical(stage: &'static str, reason: impl Into<String>) -> Self {
        Self::Numerical {
            stage,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameter { .. } | Self::InvalidDimensions(..) | Self::InvalidImage(_) => {
                ErrorKind::Validation
            }
            Self::Numerical { .. } => ErrorKind::Numerical,
            Self::ResourceLimit { .. } => ErrorKind::Resource,
            Self::InputReadError(_)
            | Self::OutputWriteError(_)
            | Self::DecodeError(_)
            | Self::EncodeError(_)
            | Self::IoError(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, DehazeError>;
