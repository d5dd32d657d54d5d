//! Regression runner for the proptest verification subproject.
//!
//! The runner checks formatting, builds the workspace, then moves into the
//! `proptest` project to run its unit tests, a codegen-only model-checking
//! pass and the workspace documentation build. The first failing step stops
//! the run unless `KANI_REGRESSION_KEEP_GOING` is set to a non-empty value.
//!
//! Working directories and the search path are explicit values threaded
//! through each step; the process's own state is never changed.

pub mod driver;
pub mod env;
pub mod errors;
pub mod layout;
pub mod plan;
pub mod process;
pub mod runner;
pub mod telemetry;

pub use cli_defs::{Cli, RunnerConfig};
pub use driver::{run, run_with};
pub use env::Environment;
pub use errors::{RunnerError, StepError};
pub use runner::{RunOutcome, RunReport, RunSettings};
