//! Sequential execution of a [`Plan`] under the fail-fast or keep-going policy.
//!
//! Steps run one at a time, each exactly once. By default the first failure
//! aborts the run. In keep-going mode every step is attempted and failures are
//! only logged; the run still counts as having reached its end.

use std::{ffi::OsStr, io::Write};

use tracing::{error, info, warn};

use crate::{
    env::{Environment, KEEP_GOING_VAR},
    errors::{RunnerError, StepError},
    plan::{Plan, Step, StepAction, StepId},
    process::{LaunchContext, Launcher, StepStatus},
};

/// Lines of the banner printed when a run reaches its end.
pub const SUCCESS_BANNER: [&str; 2] = [
    "All proptest regression steps completed.",
    "Formatting, build, unit tests, codegen and documentation checks ran to the end.",
];

/// Run-wide settings, fixed at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSettings {
    /// Keep running later steps after a failure.
    pub continue_on_error: bool,
}

impl RunSettings {
    /// Read the settings from an environment snapshot.
    ///
    /// Keep-going mode is on when [`KEEP_GOING_VAR`] holds any non-empty value.
    #[must_use]
    pub fn from_environment(env: &Environment) -> Self {
        Self {
            continue_on_error: env.flag(KEEP_GOING_VAR),
        }
    }
}

/// Result of a single step.
#[derive(Debug)]
pub struct StepRecord {
    /// Which step ran.
    pub step: StepId,
    /// `Ok` with the status on success, otherwise why it failed.
    pub outcome: Result<StepStatus, StepError>,
}

impl StepRecord {
    /// Exit code the step contributes.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match &self.outcome {
            Ok(status) => status.code(),
            Err(err) => err.exit_code(),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every step was attempted.
    Completed,
    /// The run stopped at the given step.
    Aborted(StepId),
}

/// Everything that happened during a run.
#[derive(Debug)]
pub struct RunReport {
    records: Vec<StepRecord>,
    outcome: RunOutcome,
}

impl RunReport {
    /// Per-step results in execution order.
    #[must_use]
    pub fn records(&self) -> &[StepRecord] { &self.records }

    /// How the run ended.
    #[must_use]
    pub const fn outcome(&self) -> RunOutcome { self.outcome }

    /// Whether the run reached its final step and should print the banner.
    #[must_use]
    pub const fn reached_end(&self) -> bool { matches!(self.outcome, RunOutcome::Completed) }

    /// Steps that did not succeed.
    #[must_use]
    pub fn failures(&self) -> impl Iterator<Item = &StepRecord> {
        self.records.iter().filter(|record| record.outcome.is_err())
    }

    /// The runner's exit code.
    ///
    /// An aborted run reports the failing step's code. A completed run reports
    /// the code of the last step executed, which is zero when that step
    /// passed even if an earlier one failed in keep-going mode.
    #[must_use]
    pub fn exit_code(&self) -> i32 { self.records.last().map_or(0, StepRecord::exit_code) }
}

/// Execute `plan` with `launcher`, honouring `settings`.
///
/// Every program sees `search_path` as its `PATH`.
pub fn execute<L: Launcher>(
    plan: &Plan,
    settings: RunSettings,
    search_path: &OsStr,
    launcher: &mut L,
) -> RunReport {
    let mut records = Vec::with_capacity(plan.steps().len());
    for step in plan.steps() {
        info!(step = %step.id, dir = %step.working_dir, "running step");
        let outcome = run_step(step, search_path, launcher);
        let failed = outcome.as_ref().err().map(ToString::to_string);
        records.push(StepRecord {
            step: step.id,
            outcome,
        });
        match failed {
            None => info!(step = %step.id, "step passed"),
            Some(reason) if settings.continue_on_error => {
                warn!(step = %step.id, %reason, "step failed; continuing");
            }
            Some(reason) => {
                error!(step = %step.id, %reason, "step failed; aborting run");
                return RunReport {
                    records,
                    outcome: RunOutcome::Aborted(step.id),
                };
            }
        }
    }
    RunReport {
        records,
        outcome: RunOutcome::Completed,
    }
}

fn run_step<L: Launcher>(
    step: &Step,
    search_path: &OsStr,
    launcher: &mut L,
) -> Result<StepStatus, StepError> {
    let context = LaunchContext {
        working_dir: &step.working_dir,
        search_path,
    };
    let status = match &step.action {
        StepAction::EnterDirectory => launcher
            .enter_directory(&step.working_dir)
            .map(|()| StepStatus::SUCCESS)?,
        StepAction::Run(invocation) => launcher.launch(invocation, context)?,
        StepAction::Pipeline(stages) => launcher.launch_pipeline(stages, context)?,
    };
    if status.success() {
        Ok(status)
    } else {
        Err(StepError::Failed {
            step: step.id,
            status,
        })
    }
}

/// Write the success banner, framed by blank lines.
///
/// # Errors
///
/// Returns [`RunnerError::Banner`] when `out` cannot be written.
pub fn write_banner<W: Write>(out: &mut W) -> Result<(), RunnerError> {
    let [first, second] = SUCCESS_BANNER;
    writeln!(out)
        .and_then(|()| writeln!(out, "{first}"))
        .and_then(|()| writeln!(out, "{second}"))
        .and_then(|()| writeln!(out))
        .and_then(|()| out.flush())
        .map_err(RunnerError::Banner)
}

#[cfg(test)]
mod tests;
