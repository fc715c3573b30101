//! Parameter sweeps
//!
//! An [`ExperimentGrid`] lists candidate values per parameter and the
//! [`ExperimentRunner`] restores one image once per combination.

pub mod grid;
pub mod runner;


pub use grid::ExperimentGrid;
pub use runner::{ExecutionMode, ExperimentObserver, ExperimentRunner, ExperimentSummary, RunRecord};
