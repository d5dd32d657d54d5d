//! Error types for runner setup and step execution.

use std::{io, path::PathBuf};

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::{plan::StepId, process::StepStatus};

/// Exit code a shell reports when a command cannot be found.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit code a shell reports when a command exists but cannot be executed.
pub const EXIT_NOT_EXECUTABLE: i32 = 126;
/// Exit code reported for setup failures and missing directories.
pub const EXIT_GENERAL_FAILURE: i32 = 1;

/// Failures that stop the runner before any step executes.
///
/// These are fatal whether or not keep-going mode is enabled.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// A required environment variable was not defined.
    #[error("required variable `{0}` is not set")]
    UndefinedVariable(String),
    /// The runner's own directory could not be determined.
    #[error("cannot locate the runner directory: {0}")]
    ScriptDir(#[source] io::Error),
    /// A path could not be represented as UTF-8.
    #[error("path {} is not valid UTF-8", .0.display())]
    NonUtf8Path(PathBuf),
    /// The augmented search path could not be assembled.
    #[error("invalid search path entry: {0}")]
    SearchPath(#[from] std::env::JoinPathsError),
    /// Writing the success banner failed.
    #[error("failed to write the success banner: {0}")]
    Banner(#[source] io::Error),
}

/// Why a single step did not succeed.
#[derive(Debug, Error)]
pub enum StepError {
    /// The step's command ran and exited unsuccessfully.
    #[error("step `{step}` exited with status {status}")]
    Failed {
        /// Step that failed.
        step: StepId,
        /// Status reported by the command.
        status: StepStatus,
    },
    /// The program was not found on the search path or is not executable.
    #[error("`{program}` was not found on the search path")]
    ProgramNotFound {
        /// Program name as configured.
        program: String,
    },
    /// The working directory for the step does not exist.
    #[error("working directory {dir} does not exist: {source}")]
    MissingDirectory {
        /// Directory the step should have run in.
        dir: Utf8PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: io::Error,
    },
    /// The operating system refused to start or wait for the program.
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        /// Program name as configured.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl StepError {
    /// Exit code a shell would report for this failure.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Failed { status, .. } => status.code(),
            Self::ProgramNotFound { .. } => EXIT_NOT_FOUND,
            Self::MissingDirectory { .. } => EXIT_GENERAL_FAILURE,
            Self::Spawn { .. } => EXIT_NOT_EXECUTABLE,
        }
    }
}
