use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::image_pipeline::common::error::{DehazeError, Result};
use crate::image_pipeline::common::types::{AtmosphericLight, ColorImage};
use crate::image_pipeline::dehaze::{DehazeOutput, DehazeParams, DehazePipeline};
use crate::image_pipeline::experiment::grid::ExperimentGrid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    #[default]
    Sequential,
    /// Runs execute on the rayon pool; reports still arrive in run-index order
    Parallel,
}

/// Outcome of one successful run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub run_index: usize,
    pub params: DehazeParams,
    pub restored: ColorImage,
    pub atmospheric_light: AtmosphericLight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ExperimentSummary {
    pub total_runs: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

/// Receives experiment progress. Every call happens on the thread that
/// invoked [`ExperimentRunner::run`], in run-index order.
pub trait ExperimentObserver {
    fn on_start(&self, _total_runs: usize) {}

    fn on_log(&self, _message: &str) {}

    fn on_run_result(&self, _record: &RunRecord) {}

    fn on_run_failure(&self, _run_index: usize, _params: &DehazeParams, _error: &DehazeError) {}

    fn on_complete(&self, _summary: &ExperimentSummary) {}
}

/// `None` marks a run skipped by cancellation.
type RunOutcome = Option<Result<RunRecord>>;

pub struct ExperimentRunner {
    mode: ExecutionMode,
}

impl ExperimentRunner {
    pub fn new(mode: ExecutionMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Runs every combination of `grid` on `image`.
    ///
    /// All combinations are validated against the image before anything is
    /// reported, so an invalid grid fails without partial results. A failed
    /// run is reported and its siblings carry on. `cancel` is polled before
    /// each run starts; runs already in flight finish.
    pub fn run(
        &self,
        image: &ColorImage,
        grid: &ExperimentGrid,
        observer: &dyn ExperimentObserver,
        cancel: &AtomicBool,
    ) -> Result<ExperimentSummary> {
        self.run_with(image, grid, observer, cancel, |image, params| {
            DehazePipeline::new(*params)?.with_intermediates(false).run(image)
        })
    }

    #[instrument(skip_all, fields(mode = ?self.mode, total_runs = grid.total_runs()))]
    pub(crate) fn run_with<F>(
        &self,
        image: &ColorImage,
        grid: &ExperimentGrid,
        observer: &dyn ExperimentObserver,
        cancel: &AtomicBool,
        job: F,
    ) -> Result<ExperimentSummary>
    where
        F: Fn(&ColorImage, &DehazeParams) -> Result<DehazeOutput> + Sync,
    {
        let combinations: Vec<DehazeParams> = grid.combinations().collect();
        for (index, params) in combinations.iter().enumerate() {
            if let Err(e) = params.validate_for_image(image.width(), image.height()) {
                warn!(run_index = index, "Rejected combination: {}", e);
                return Err(e);
            }
        }

        let total_runs = combinations.len();
        let mut summary = ExperimentSummary {
            total_runs,
            ..ExperimentSummary::default()
        };
        info!("Starting experiment with {} combinations", total_runs);
        observer.on_start(total_runs);

        let log = |message: String| {
            info!("{}", message);
            observer.on_log(&message);
        };
        let announce = |index: usize, params: &DehazeParams| {
            log(format!("Computing combination {}/{}: {}", index + 1, total_runs, params));
        };
        let mut report = |index: usize, params: &DehazeParams, outcome: RunOutcome| match outcome {
            None => {
                summary.cancelled += 1;
                log(format!("Skipping combination {}/{}: cancelled", index + 1, total_runs));
            }
            Some(Ok(record)) => {
                summary.completed += 1;
                observer.on_run_result(&record);
            }
            Some(Err(e)) => {
                summary.failed += 1;
                warn!(run_index = index, "Combination failed: {}", e);
                observer.on_run_failure(index, params, &e);
            }
        };

        match self.mode {
            ExecutionMode::Sequential => {
                for (index, params) in combinations.iter().enumerate() {
                    let outcome = if cancel.load(Ordering::SeqCst) {
                        None
                    } else {
                        announce(index, params);
                        run_one(&job, image, index, params, cancel)
                    };
                    report(index, params, outcome);
                }
            }
            // runs start out of order, so each is announced when its report is due
            ExecutionMode::Parallel => {
                let (tx, rx) = mpsc::channel::<(usize, RunOutcome)>();
                std::thread::scope(|scope| {
                    let work = &combinations;
                    let job = &job;
                    scope.spawn(move || {
                        work.par_iter().enumerate().for_each_with(tx, |tx, (index, params)| {
                            // receiver only goes away if the reporting thread panicked
                            let _ = tx.send((index, run_one(job, image, index, params, cancel)));
                        });
                    });

                    let mut pending = BTreeMap::new();
                    let mut next = 0;
                    for (index, outcome) in rx {
                        pending.insert(index, outcome);
                        while let Some(outcome) = pending.remove(&next) {
                            if outcome.is_some() {
                                announce(next, &combinations[next]);
                            }
                            report(next, &combinations[next], outcome);
                            next += 1;
                        }
                    }
                });
            }
        }

        info!(
            completed = summary.completed,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "Experiment complete"
        );
        observer.on_complete(&summary);
        Ok(summary)
    }
}

impl Default for ExperimentRunner {
    fn default() -> Self {
        Self::new(ExecutionMode::default())
    }
}

fn run_one<F>(job: &F, image: &ColorImage, index: usize, params: &DehazeParams, cancel: &AtomicBool) -> RunOutcome
where
    F: Fn(&ColorImage, &DehazeParams) -> Result<DehazeOutput>,
{
    if cancel.load(Ordering::SeqCst) {
        return None;
    }
    let _span = tracing::info_span!("experiment_run", run_index = index).entered();
    let result = job(image, params).map(|output| RunRecord {
        run_index: index,
        params: *params,
        restored: output.restored,
        atmospheric_light: output.atmospheric_light,
    });
    Some(result)
}
