use ndarray::Array2;
use tracing::{debug, info, info_span, instrument};

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::common::timing::PipelineTimings;
use crate::image_pipeline::common::types::{AtmosphericLight, ColorImage};
use crate::image_pipeline::dehaze::atmospheric::estimate_atmospheric_light;
use crate::image_pipeline::dehaze::dark_channel::dark_channel;
use crate::image_pipeline::dehaze::observer::{Artifact, ArtifactKind, NullObserver, PipelineObserver};
use crate::image_pipeline::dehaze::params::DehazeParams;
use crate::image_pipeline::dehaze::radiance::recover_radiance;
use crate::image_pipeline::dehaze::refine::refiner_for;
use crate::image_pipeline::dehaze::transmission::estimate_coarse_transmission;

/// Result of one dehazing run
#[derive(Debug, Clone)]
pub struct DehazeOutput {
    pub restored: ColorImage,
    pub atmospheric_light: AtmosphericLight,
    /// Retained intermediates in production order (empty when disabled)
    pub intermediates: Vec<Artifact>,
    pub timings: PipelineTimings,
}

impl DehazeOutput {
    pub fn intermediate(&self, kind: ArtifactKind) -> Option<&Artifact> {
        self.intermediates.iter().find(|a| a.kind == kind)
    }
}

/// Dark channel prior restoration of a single image with one parameter set
///
/// Stages run strictly in order: dark channel, atmospheric light, coarse
/// transmission, refinement, radiance recovery. Each artifact is pushed to the
/// observer as soon as it is produced.
#[derive(Debug, Clone)]
pub struct DehazePipeline {
    params: DehazeParams,
    keep_intermediates: bool,
}

impl DehazePipeline {
    pub fn new(params: DehazeParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            keep_intermediates: true,
        })
    }

    /// Whether the dark channel and transmission maps are kept in the output.
    /// Observers receive them either way.
    pub fn with_intermediates(mut self, keep: bool) -> Self {
        self.keep_intermediates = keep;
        self
    }

    pub fn params(&self) -> &DehazeParams {
        &self.params
    }

    pub fn set_params(&mut self, params: DehazeParams) -> Result<()> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    pub fn run(&self, image: &ColorImage) -> Result<DehazeOutput> {
        self.run_with_observer(image, &NullObserver)
    }

    #[instrument(skip(self, image, observer), fields(width = image.width(), height = image.height()))]
    pub fn run_with_observer(
        &self,
        image: &ColorImage,
        observer: &dyn PipelineObserver,
    ) -> Result<DehazeOutput> {
        let params = &self.params;
        params.validate_for_image(image.width(), image.height())?;

        let mut timings = PipelineTimings::new();
        let mut intermediates = Vec::new();
        let log = |message: &str| {
            info!("{}", message);
            observer.on_log(message);
        };
        let notify = observer.wants_artifacts();
        let mut emit = |kind: ArtifactKind, map: &Array2<f32>| {
            if !notify && !self.keep_intermediates {
                return;
            }
            let artifact = Artifact::map(kind, map.clone());
            if notify {
                observer.on_artifact(&artifact);
            }
            if self.keep_intermediates {
                intermediates.push(artifact);
            }
        };

        log("Starting haze removal");

        log("Computing dark channel");
        let dark = {
            let _span = info_span!("dark_channel", patch_size = params.patch_size).entered();
            timings.measure("dark_channel", || dark_channel(image, params.patch_size))?
        };
        emit(ArtifactKind::DarkChannel, &dark);

        log("Estimating atmospheric light");
        let light = {
            let _span = info_span!("atmospheric_light").entered();
            timings.measure("atmospheric_light", || {
                estimate_atmospheric_light(image, &dark, params.atmospheric_light_percentile)
            })?
        };
        log(&format!("Atmospheric light A = {}", light));

        log("Estimating initial transmission");
        let coarse = {
            let _span = info_span!("initial_transmission", omega = params.omega).entered();
            timings.measure("initial_transmission", || {
                estimate_coarse_transmission(image, &light, params.patch_size, params.omega)
            })?
        };
        emit(ArtifactKind::InitialTransmission, &coarse);

        let refiner = refiner_for(params);
        log(&format!("Refining transmission with {}", refiner.name()));
        let refined = {
            let _span = info_span!("refine_transmission", strategy = refiner.name()).entered();
            timings.measure("refine_transmission", || refiner.refine(&coarse, image))?
        };
        emit(ArtifactKind::RefinedTransmission, &refined);

        log("Recovering scene radiance");
        let restored = {
            let _span = info_span!("recover_radiance", t0 = params.t0).entered();
            timings.measure("recover_radiance", || {
                recover_radiance(image, &refined, &light, params.t0)
            })?
        };
        if notify {
            observer.on_artifact(&Artifact::color(ArtifactKind::FinalResult, restored.clone()));
        }

        debug!(total_ms = timings.total_duration().as_secs_f64() * 1000.0, "stage timings");
        timings.log_summary();
        log("Haze removal complete");

        Ok(DehazeOutput {
            restored,
            atmospheric_light: light,
            intermediates,
            timings,
        })
    }
}
