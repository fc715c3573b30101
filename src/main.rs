use std::path::PathBuf;

use anyhow::{Context, bail};
use dcp_dehaze_rs::image_pipeline::{DehazeFilePipeline, TiffCompression, WriterConfig, default_params};
use dcp_dehaze_rs::logger;

use tracing::info;

fn main() -> anyhow::Result<()> {
    logger::init();

    let mut positional = Vec::new();
    let mut write_intermediates = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--intermediates" => write_intermediates = true,
            _ => positional.push(PathBuf::from(arg)),
        }
    }
    let (input, output) = match positional.as_slice() {
        [input] => {
            let stem = input.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
            (input.clone(), input.with_file_name(format!("{}_dehazed.tiff", stem)))
        }
        [input, output] => (input.clone(), output.clone()),
        _ => bail!("usage: dcp_dehaze_rs <input> [output.tiff] [--intermediates]"),
    };

    info!("Starting dcp_dehaze...");

    let params = default_params();
    let config = WriterConfig::builder()
        .compression(TiffCompression::DeflateBalanced)
        .predictor(Some(2))
        .write_intermediates(write_intermediates)
        .build();
    let pipeline = DehazeFilePipeline::new(params, config).context("invalid default parameters")?;

    info!("Haze removal pipeline initialized");
    info!("Parameters: {}", pipeline.params());
    info!("Compression: {:?}", pipeline.config().compression);

    pipeline
        .process_file(&input, &output, &dcp_dehaze_rs::image_pipeline::NullObserver)
        .with_context(|| format!("failed to dehaze {}", input.display()))?;

    info!("Wrote {}", output.display());
    Ok(())
}
