//! Artifacts and progress emission
//!
//! The pipeline pushes every artifact to a [`PipelineObserver`] as soon as it
//! exists; how the observer transports it (SSE, files, a channel) is its own
//! business.

use std::sync::mpsc::Sender;

use ndarray::Array2;

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::common::types::ColorImage;
use crate::image_pipeline::io::png_writer;

/// Named pipeline outputs, listed in production order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactKind {
    DarkChannel,
    InitialTransmission,
    RefinedTransmission,
    FinalResult,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::DarkChannel,
        ArtifactKind::InitialTransmission,
        ArtifactKind::RefinedTransmission,
        ArtifactKind::FinalResult,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DarkChannel => "dark_channel",
            Self::InitialTransmission => "initial_transmission",
            Self::RefinedTransmission => "refined_transmission",
            Self::FinalResult => "final_result",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactData {
    /// Single-channel map (dark channel, transmission)
    Map(Array2<f32>),
    Color(ColorImage),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub data: ArtifactData,
}

impl Artifact {
    pub fn map(kind: ArtifactKind, map: Array2<f32>) -> Self {
        Self {
            kind,
            data: ArtifactData::Map(map),
        }
    }

    pub fn color(kind: ArtifactKind, image: ColorImage) -> Self {
        Self {
            kind,
            data: ArtifactData::Color(image),
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    pub fn dimensions(&self) -> (usize, usize) {
        match &self.data {
            ArtifactData::Map(map) => (map.ncols(), map.nrows()),
            ArtifactData::Color(image) => (image.width(), image.height()),
        }
    }

    /// Displayable 8-bit PNG encoding of this artifact.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        match &self.data {
            ArtifactData::Map(map) => png_writer::encode_map_png(map),
            ArtifactData::Color(image) => png_writer::encode_color_png(image),
        }
    }
}

/// Push-style subscriber for pipeline progress.
pub trait PipelineObserver {
    fn on_log(&self, _message: &str) {}

    fn on_artifact(&self, _artifact: &Artifact) {}

    /// When false the pipeline skips building artifacts it would only hand
    /// to this observer.
    fn wants_artifacts(&self) -> bool {
        true
    }
}

pub struct NullObserver;

impl PipelineObserver for NullObserver {
    fn wants_artifacts(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Log(String),
    Artifact(Artifact),
}

/// Forwards progress over a channel. A dropped receiver silently ends forwarding.
pub struct ChannelObserver {
    sender: Sender<ProgressEvent>,
}

impl ChannelObserver {
    pub fn new(sender: Sender<ProgressEvent>) -> Self {
        Self { sender }
    }
}

impl PipelineObserver for ChannelObserver {
    fn on_log(&self, message: &str) {
        let _ = self.sender.send(ProgressEvent::Log(message.to_string()));
    }

    fn on_artifact(&self, artifact: &Artifact) {
        let _ = self.sender.send(ProgressEvent::Artifact(artifact.clone()));
    }
}
