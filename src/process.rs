//! Launching external programs for regression steps.
//!
//! The run loop talks to a [`Launcher`] rather than `std::process` directly.
//! [`ProcessLauncher`] is the production implementation; tests substitute a
//! recording fake.

use std::{
    ffi::OsStr,
    fmt,
    process::{Child, Command, ExitStatus, Stdio},
};

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};
use tracing::debug;

use crate::{errors::StepError, plan::Invocation};

/// Exit status of a step, normalised to a shell-style code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepStatus(i32);

impl StepStatus {
    /// Status of a step that succeeded.
    pub const SUCCESS: Self = Self(0);

    /// Wrap a raw exit code.
    #[must_use]
    pub const fn from_code(code: i32) -> Self { Self(code) }

    /// The shell-style exit code.
    #[must_use]
    pub const fn code(self) -> i32 { self.0 }

    /// Whether the step succeeded.
    #[must_use]
    pub const fn success(self) -> bool { self.0 == 0 }

    /// Convert a child's exit status; signal deaths become `128 + signal`.
    #[must_use]
    pub fn from_exit_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Self(128_i32.saturating_add(signal));
            }
        }
        Self(1)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Combine pipeline stage statuses: the first non-zero stage wins.
#[must_use]
pub fn fold_pipeline<I>(statuses: I) -> StepStatus
where
    I: IntoIterator<Item = StepStatus>,
{
    statuses
        .into_iter()
        .find(|status| !status.success())
        .unwrap_or(StepStatus::SUCCESS)
}

/// Where and how a step's programs run.
#[derive(Debug, Clone, Copy)]
pub struct LaunchContext<'a> {
    /// Working directory for the child processes.
    pub working_dir: &'a Utf8Path,
    /// Search path used to resolve programs and exported as `PATH`.
    pub search_path: &'a OsStr,
}

/// Executes the external side of each step.
pub trait Launcher {
    /// Confirm that `dir` exists and can serve as a working directory.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::MissingDirectory`] when it cannot be opened.
    fn enter_directory(&mut self, dir: &Utf8Path) -> Result<(), StepError>;

    /// Run one program to completion.
    ///
    /// # Errors
    ///
    /// Returns a [`StepError`] when the program cannot be located or started.
    /// A program that runs and fails is reported through the status.
    fn launch(
        &mut self,
        invocation: &Invocation,
        context: LaunchContext<'_>,
    ) -> Result<StepStatus, StepError>;

    /// Run `stages` connected stdout-to-stdin and fold their statuses.
    ///
    /// # Errors
    ///
    /// Returns a [`StepError`] when any stage cannot be located or started.
    fn launch_pipeline(
        &mut self,
        stages: &[Invocation],
        context: LaunchContext<'_>,
    ) -> Result<StepStatus, StepError>;
}

/// Launches real child processes with inherited stdio.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLauncher;

impl ProcessLauncher {
    fn command(invocation: &Invocation, context: LaunchContext<'_>) -> Result<Command, StepError> {
        open_dir(context.working_dir)?;
        let program = which::which_in(
            &invocation.program,
            Some(context.search_path),
            context.working_dir,
        )
        .map_err(|_| StepError::ProgramNotFound {
            program: invocation.program.clone(),
        })?;
        debug!(program = %program.display(), args = ?invocation.args, "spawning");
        let mut command = Command::new(program);
        command
            .args(&invocation.args)
            .current_dir(context.working_dir)
            .env("PATH", context.search_path);
        Ok(command)
    }

    fn spawn(command: &mut Command, invocation: &Invocation) -> Result<Child, StepError> {
        command.spawn().map_err(|source| StepError::Spawn {
            program: invocation.program.clone(),
            source,
        })
    }

    fn wait(child: &mut Child, invocation: &Invocation) -> Result<StepStatus, StepError> {
        child
            .wait()
            .map(StepStatus::from_exit_status)
            .map_err(|source| StepError::Spawn {
                program: invocation.program.clone(),
                source,
            })
    }
}

impl Launcher for ProcessLauncher {
    fn enter_directory(&mut self, dir: &Utf8Path) -> Result<(), StepError> { open_dir(dir) }

    fn launch(
        &mut self,
        invocation: &Invocation,
        context: LaunchContext<'_>,
    ) -> Result<StepStatus, StepError> {
        let mut command = Self::command(invocation, context)?;
        let mut child = Self::spawn(&mut command, invocation)?;
        Self::wait(&mut child, invocation)
    }

    fn launch_pipeline(
        &mut self,
        stages: &[Invocation],
        context: LaunchContext<'_>,
    ) -> Result<StepStatus, StepError> {
        let mut commands = stages
            .iter()
            .map(|invocation| Self::command(invocation, context).map(|command| (command, invocation)))
            .collect::<Result<Vec<_>, _>>()?;
        let mut children: Vec<(Child, &Invocation)> = Vec::with_capacity(stages.len());
        let mut upstream: Option<Stdio> = None;
        let last = commands.len().saturating_sub(1);
        for (position, (command, invocation)) in commands.iter_mut().enumerate() {
            let invocation = *invocation;
            if let Some(input) = upstream.take() {
                command.stdin(input);
            }
            if position < last {
                command.stdout(Stdio::piped());
            }
            match Self::spawn(command, invocation) {
                Ok(mut child) => {
                    upstream = child.stdout.take().map(Stdio::from);
                    children.push((child, invocation));
                }
                Err(err) => {
                    drop(upstream.take());
                    reap(children);
                    return Err(err);
                }
            }
        }
        let mut statuses = Vec::with_capacity(children.len());
        let mut failure = None;
        for (mut child, invocation) in children {
            match Self::wait(&mut child, invocation) {
                Ok(status) => statuses.push(status),
                Err(err) => {
                    failure.get_or_insert(err);
                }
            }
        }
        failure.map_or_else(|| Ok(fold_pipeline(statuses)), Err)
    }
}

/// Stop and collect children of a pipeline that could not be completed.
fn reap(children: Vec<(Child, &Invocation)>) {
    for (mut child, invocation) in children {
        if let Err(err) = child.kill() {
            debug!(program = %invocation.program, error = %err, "kill failed");
        }
        if let Err(err) = child.wait() {
            debug!(program = %invocation.program, error = %err, "wait failed");
        }
    }
}

fn open_dir(dir: &Utf8Path) -> Result<(), StepError> {
    Dir::open_ambient_dir(dir, ambient_authority())
        .map(drop)
        .map_err(|source| StepError::MissingDirectory {
            dir: dir.to_owned(),
            source,
        })
}
