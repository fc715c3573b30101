//! Dark channel prior haze removal
//!
//! Stages, in data-flow order: [`dark_channel`], [`estimate_atmospheric_light`],
//! [`estimate_coarse_transmission`], a [`TransmissionRefiner`], and
//! [`recover_radiance`]. [`DehazePipeline`] runs them for one parameter set.

pub mod atmospheric;
pub mod dark_channel;
pub mod observer;
pub mod params;
pub mod pipeline;
pub mod radiance;
pub mod refine;
pub mod transmission;

#[cfg(test)]
mod tests;

pub use atmospheric::estimate_atmospheric_light;
pub use dark_channel::dark_channel;
pub use observer::{
    Artifact, ArtifactData, ArtifactKind, ChannelObserver, NullObserver, PipelineObserver,
    ProgressEvent,
};
pub use params::{DehazeParams, DehazeParamsBuilder, RefinementMethod, SoftMattingParams, default_params};
pub use pipeline::{DehazeOutput, DehazePipeline};
pub use radiance::recover_radiance;
pub use refine::{GuidedFilter, SoftMatting, TransmissionRefiner, box_mean, refiner_for};
pub use transmission::{MIN_TRANSMISSION, estimate_coarse_transmission};
