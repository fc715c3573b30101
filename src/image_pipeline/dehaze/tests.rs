use std::sync::{Arc, Mutex};

use ndarray::Array3;

use crate::image_pipeline::common::error::DehazeError;
use crate::image_pipeline::common::types::ColorImage;
use crate::image_pipeline::dehaze::{
    Artifact, ArtifactKind, DehazeParams, DehazePipeline, PipelineObserver, RefinementMethod,
    SoftMattingParams,
};

const AIRLIGHT: f32 = 0.8;
const SIZE: usize = 100;
const SKY_ROWS: usize = 20;

#[derive(Default)]
struct RecordingObserver {
    logs: Arc<Mutex<Vec<String>>>,
    artifacts: Arc<Mutex<Vec<Artifact>>>,
}

impl PipelineObserver for RecordingObserver {
    fn on_log(&self, message: &str) {
        self.logs.lock().unwrap().push(message.to_string());
    }

    fn on_artifact(&self, artifact: &Artifact) {
        self.artifacts.lock().unwrap().push(artifact.clone());
    }
}

fn small_params() -> DehazeParams {
    DehazeParams::builder()
        .patch_size(3)
        .gf_radius(2)
        .atmospheric_light_percentile(0.01)
        .build()
}

/// Clear checkerboard (0.0 / 0.6) seen through haze whose transmission ramps
/// from 0.5 on the left to 0.9 on the right, under a band of pure airlight.
fn hazy_checkerboard() -> (ColorImage, Array3<f32>) {
    let clear = Array3::from_shape_fn((SIZE, SIZE, 3), |(y, x, _)| {
        if y < SKY_ROWS {
            AIRLIGHT
        } else if (x / 10 + y / 10) % 2 == 0 {
            0.0
        } else {
            0.6
        }
    });
    let hazy = Array3::from_shape_fn((SIZE, SIZE, 3), |(y, x, c)| {
        if y < SKY_ROWS {
            AIRLIGHT
        } else {
            let t = 0.5 + 0.4 * x as f32 / (SIZE - 1) as f32;
            clear[[y, x, c]] * t + AIRLIGHT * (1.0 - t)
        }
    });
    (ColorImage::new(hazy).unwrap(), clear)
}

fn mean_abs_error(image: &ColorImage, reference: &Array3<f32>, from_row: usize) -> f32 {
    let view = image.view();
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for ((y, x, c), &want) in reference.indexed_iter() {
        if y >= from_row {
            sum += (view[[y, x, c]] - want).abs() as f64;
            count += 1;
        }
    }
    (sum / count as f64) as f32
}

#[test]
fn test_uniform_images_are_fixed_points() {
    for method in [RefinementMethod::GuidedFilter, RefinementMethod::SoftMatting] {
        for rgb in [[0.0; 3], [1.0; 3]] {
            let image = ColorImage::uniform(12, 10, rgb).unwrap();
            let params = DehazeParams { refinement: method, ..small_params() };
            let output = DehazePipeline::new(params).unwrap().run(&image).unwrap();

            assert_eq!(output.atmospheric_light.channels(), rgb);
            for (&got, &want) in output.restored.view().iter().zip(image.view().iter()) {
                assert!((got - want).abs() < 1e-5, "{:?}: {} vs {}", method, got, want);
            }
        }
    }
}

#[test]
fn test_recovers_checkerboard_through_haze() {
    let (hazy, clear) = hazy_checkerboard();
    let params = DehazeParams::builder()
        .patch_size(15)
        .omega(1.0)
        .gf_radius(8)
        .gf_epsilon(1e-3)
        .build();
    let output = DehazePipeline::new(params).unwrap().run(&hazy).unwrap();

    for channel in output.atmospheric_light.channels() {
        assert!((channel - AIRLIGHT).abs() < 1e-6);
    }

    // rows near the sky edge pick up halo from the transmission jump
    let from_row = 45;
    let restored_error = mean_abs_error(&output.restored, &clear, from_row);
    let hazy_error = mean_abs_error(&hazy, &clear, from_row);
    assert!(restored_error < 0.06, "restored error {}", restored_error);
    assert!(restored_error < hazy_error / 2.0, "{} vs hazy {}", restored_error, hazy_error);

    let view = output.restored.view();
    let (mut dark, mut bright) = (Vec::new(), Vec::new());
    for y in from_row..SIZE {
        for x in 0..SIZE {
            if clear[[y, x, 0]] == 0.0 {
                dark.push(view[[y, x, 0]]);
            } else {
                bright.push(view[[y, x, 0]]);
            }
        }
    }
    let mean = |v: &[f32]| v.iter().sum::<f32>() / v.len() as f32;
    assert!(mean(&bright) - mean(&dark) > 0.45);
}

#[test]
fn test_identical_runs_are_bit_identical() {
    let (hazy, _) = hazy_checkerboard();
    let pipeline = DehazePipeline::new(DehazeParams::builder().gf_radius(6).build()).unwrap();
    let first = pipeline.run(&hazy).unwrap();
    let second = pipeline.run(&hazy).unwrap();
    assert_eq!(first.restored, second.restored);
    assert_eq!(first.intermediates, second.intermediates);
}

#[test]
fn test_artifacts_emitted_in_production_order() {
    crate::logger::init_for_tests();
    let (hazy, _) = hazy_checkerboard();
    let observer = RecordingObserver::default();
    let output = DehazePipeline::new(small_params())
        .unwrap()
        .run_with_observer(&hazy, &observer)
        .unwrap();

    let artifacts = observer.artifacts.lock().unwrap();
    let kinds: Vec<ArtifactKind> = artifacts.iter().map(|a| a.kind).collect();
    assert_eq!(kinds, ArtifactKind::ALL.to_vec());
    assert!(artifacts.iter().all(|a| a.dimensions() == (SIZE, SIZE)));

    let retained: Vec<ArtifactKind> = output.intermediates.iter().map(|a| a.kind).collect();
    assert_eq!(
        retained,
        vec![
            ArtifactKind::DarkChannel,
            ArtifactKind::InitialTransmission,
            ArtifactKind::RefinedTransmission
        ]
    );
    assert!(output.intermediate(ArtifactKind::DarkChannel).is_some());

    let logs = observer.logs.lock().unwrap();
    assert_eq!(logs.first().map(String::as_str), Some("Starting haze removal"));
    assert_eq!(logs.last().map(String::as_str), Some("Haze removal complete"));
    assert!(logs.iter().any(|l| l.starts_with("Atmospheric light A = [0.800")));
    assert!(logs.iter().any(|l| l == "Refining transmission with guided_filter"));

    for step in ["dark_channel", "atmospheric_light", "initial_transmission", "refine_transmission", "recover_radiance"] {
        assert!(output.timings.get_step(step).is_some(), "missing timing {}", step);
    }
}

#[test]
fn test_intermediates_can_be_dropped() {
    let image = ColorImage::uniform(8, 8, [0.4, 0.5, 0.6]).unwrap();
    let observer = RecordingObserver::default();
    let output = DehazePipeline::new(small_params())
        .unwrap()
        .with_intermediates(false)
        .run_with_observer(&image, &observer)
        .unwrap();
    assert!(output.intermediates.is_empty());
    assert_eq!(observer.artifacts.lock().unwrap().len(), 4);
}

/// Records logs only and declines artifacts.
#[derive(Default)]
struct LogOnlyObserver {
    inner: RecordingObserver,
}

impl PipelineObserver for LogOnlyObserver {
    fn on_log(&self, message: &str) {
        self.inner.on_log(message);
    }

    fn on_artifact(&self, artifact: &Artifact) {
        self.inner.on_artifact(artifact);
    }

    fn wants_artifacts(&self) -> bool {
        false
    }
}

#[test]
fn test_artifacts_skipped_for_observers_that_decline_them() {
    let image = ColorImage::uniform(8, 8, [0.4, 0.5, 0.6]).unwrap();
    let pipeline = DehazePipeline::new(small_params()).unwrap();

    let observer = LogOnlyObserver::default();
    let kept = pipeline.run_with_observer(&image, &observer).unwrap();
    assert!(observer.inner.artifacts.lock().unwrap().is_empty());
    assert_eq!(observer.inner.logs.lock().unwrap().last().map(String::as_str), Some("Haze removal complete"));
    assert_eq!(kept.intermediates.len(), 3);

    let dropped = pipeline
        .clone()
        .with_intermediates(false)
        .run_with_observer(&image, &observer)
        .unwrap();
    assert!(dropped.intermediates.is_empty());
    assert_eq!(dropped.restored, kept.restored);
}

#[test]
fn test_invalid_parameters_fail_before_any_work() {
    assert!(matches!(
        DehazePipeline::new(DehazeParams::builder().patch_size(4).build()),
        Err(DehazeError::InvalidParameter { field: "patch_size", .. })
    ));

    let image = ColorImage::uniform(20, 20, [0.5; 3]).unwrap();
    let params = DehazeParams::builder()
        .refinement(RefinementMethod::SoftMatting)
        .soft_matting(SoftMattingParams { max_pixels: 100, ..SoftMattingParams::default() })
        .build();
    let observer = RecordingObserver::default();
    let result = DehazePipeline::new(params).unwrap().run_with_observer(&image, &observer);

    assert!(matches!(result, Err(DehazeError::ResourceLimit { pixels: 400, .. })));
    assert!(observer.logs.lock().unwrap().is_empty());
    assert!(observer.artifacts.lock().unwrap().is_empty());
}

#[test]
fn test_set_params_validates() {
    let mut pipeline = DehazePipeline::new(DehazeParams::default()).unwrap();
    assert!(pipeline.set_params(DehazeParams::builder().t0(0.0).build()).is_err());
    assert_eq!(pipeline.params().t0, 0.1);
    pipeline.set_params(DehazeParams::builder().t0(0.2).build()).unwrap();
    assert_eq!(pipeline.params().t0, 0.2);
}

#[test]
fn test_soft_matting_pipeline_close_to_guided_filter() {
    let image = ColorImage::new(Array3::from_shape_fn((18, 18, 3), |(y, x, c)| {
        let base = 0.35 + 0.3 * (x as f32 / 17.0) + 0.1 * (y as f32 / 17.0);
        base + 0.05 * c as f32
    }))
    .unwrap();
    let gf = DehazePipeline::new(DehazeParams { gf_radius: 3, ..small_params() })
        .unwrap()
        .run(&image)
        .unwrap();
    let sm = DehazePipeline::new(DehazeParams {
        refinement: RefinementMethod::SoftMatting,
        ..small_params()
    })
    .unwrap()
    .run(&image)
    .unwrap();

    let error = mean_abs_error(&sm.restored, &gf.restored.view().to_owned(), 0);
    assert!(error < 0.05, "pipelines differ by {}", error);
}
