use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::image_pipeline::{
    common::error::{DehazeError, Result},
    common::timing::PipelineTimings,
    dehaze::{ArtifactData, DehazeOutput, DehazeParams, DehazePipeline, NullObserver, PipelineObserver},
    io::{ArtifactWriter, HazyImageReader, ImageCrateReader, StandardTiffWriter, WriterConfig},
};

/// Reads a hazy image, restores it and encodes the result.
pub struct DehazeFilePipeline<R: HazyImageReader, W: ArtifactWriter> {
    reader: R,
    writer: W,
    pipeline: DehazePipeline,
    config: WriterConfig,
}

impl DehazeFilePipeline<ImageCrateReader, StandardTiffWriter> {
    pub fn new(params: DehazeParams, config: WriterConfig) -> Result<Self> {
        Self::with_custom(ImageCrateReader, StandardTiffWriter, params, config)
    }
}

impl<R: HazyImageReader, W: ArtifactWriter> DehazeFilePipeline<R, W> {
    pub fn with_custom(reader: R, writer: W, params: DehazeParams, config: WriterConfig) -> Result<Self> {
        let pipeline = DehazePipeline::new(params)?.with_intermediates(config.write_intermediates);
        Ok(Self {
            reader,
            writer,
            pipeline,
            config,
        })
    }

    fn dehaze_bytes(
        &self,
        input_data: &[u8],
        observer: &dyn PipelineObserver,
        timings: &mut PipelineTimings,
    ) -> Result<DehazeOutput> {
        let image = {
            let _span = tracing::info_span!("decode_image").entered();
            timings.measure("decode", || self.reader.read_image(input_data))?
        };

        let output = {
            let _span = tracing::info_span!("dehaze", width = image.width(), height = image.height()).entered();
            timings.measure("dehaze", || self.pipeline.run_with_observer(&image, observer))?
        };
        Ok(output)
    }

    /// Restores `input_data` and writes only the final image to `output`.
    #[instrument(skip(self, input_data, output), fields(input_size = input_data.len()))]
    pub fn process(&self, input_data: &[u8], output: &mut dyn Write) -> Result<PipelineTimings> {
        info!("Starting haze removal conversion");
        let mut timings = PipelineTimings::new();

        let result = self.dehaze_bytes(input_data, &NullObserver, &mut timings)?;

        {
            let _span = tracing::info_span!("encode_output").entered();
            timings.measure("encode", || self.writer.write_color(&result.restored, output, &self.config))?;
        }

        info!(
            width = result.restored.width(),
            height = result.restored.height(),
            "Conversion complete"
        );
        Ok(timings)
    }

    /// Restores the file at `input_path` into `output_path`.
    ///
    /// With `write_intermediates` set, every retained intermediate is written
    /// next to the output as `<stem>_<artifact>.<ext>`.
    #[instrument(skip(self, input_path, output_path, observer))]
    pub fn process_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: Q,
        observer: &dyn PipelineObserver,
    ) -> Result<PipelineTimings> {
        let input_path = input_path.as_ref();
        let output_path = output_path.as_ref();

        info!(
            input = %input_path.display(),
            output = %output_path.display(),
            "Converting file"
        );

        let mut timings = PipelineTimings::new();
        let input_data = {
            let _span = tracing::info_span!("read_input_file").entered();
            timings.measure("read", || {
                std::fs::read(input_path).map_err(|e| {
                    DehazeError::InputReadError(format!("{}: {}", input_path.display(), e))
                })
            })?
        };

        let result = self.dehaze_bytes(&input_data, observer, &mut timings)?;

        let _span = tracing::info_span!("write_outputs").entered();
        timings.measure("encode", || -> Result<()> {
            let mut file = create_output(output_path)?;
            self.writer.write_color(&result.restored, &mut file, &self.config)?;

            for artifact in &result.intermediates {
                let path = self.intermediate_path(output_path, artifact.name());
                let mut file = create_output(&path)?;
                match &artifact.data {
                    ArtifactData::Map(map) => self.writer.write_map(map, &mut file, &self.config)?,
                    ArtifactData::Color(image) => self.writer.write_color(image, &mut file, &self.config)?,
                }
                info!(path = %path.display(), "Wrote {}", artifact.name());
            }
            Ok(())
        })?;

        timings.log_summary();
        Ok(timings)
    }

    /// `<dir>/<stem>_<artifact>.<ext>` for an output path `<dir>/<stem>.<anything>`.
    pub fn intermediate_path(&self, output_path: &Path, artifact: &str) -> PathBuf {
        let stem = output_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        output_path.with_file_name(format!("{}_{}.{}", stem, artifact, self.writer.extension()))
    }

    pub fn params(&self) -> &DehazeParams {
        self.pipeline.params()
    }

    pub fn set_params(&mut self, params: DehazeParams) -> Result<()> {
        self.pipeline.set_params(params)
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: WriterConfig) {
        self.pipeline = self.pipeline.clone().with_intermediates(config.write_intermediates);
        self.config = config;
    }
}

fn create_output(path: &Path) -> Result<std::fs::File> {
    std::fs::File::create(path)
        .map_err(|e| DehazeError::OutputWriteError(format!("{}: {}", path.display(), e)))
}
