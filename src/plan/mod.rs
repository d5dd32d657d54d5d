//! The fixed, ordered step plan for a regression run.
//!
//! Each [`Step`] carries the working directory it runs in, so no step ever
//! depends on where an earlier step left the process.

use std::fmt;

use camino::Utf8PathBuf;
use cli_defs::RunnerConfig;

use crate::layout::Layout;

/// Identifies a step of the regression sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepId {
    /// Formatting check through the co-located helper.
    FormatCheck,
    /// Workspace-wide build.
    Build,
    /// Switch to the proptest project directory.
    EnterProject,
    /// Unit tests for the proptest project.
    UnitTests,
    /// Model checker restricted to code generation.
    Codegen,
    /// Workspace documentation build.
    Docs,
}

impl StepId {
    /// Stable kebab-case name used in logs and errors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FormatCheck => "format-check",
            Self::Build => "build",
            Self::EnterProject => "enter-project",
            Self::UnitTests => "unit-tests",
            Self::Codegen => "codegen",
            Self::Docs => "docs",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name or path, resolved against the step's search path.
    pub program: String,
    /// Arguments passed verbatim.
    pub args: Vec<String>,
}

impl Invocation {
    /// Build an invocation from a program and arguments.
    #[must_use]
    pub fn new<P, I, A>(program: P, args: I) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// What a step does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Check that the step's working directory exists.
    EnterDirectory,
    /// Run a single program.
    Run(Invocation),
    /// Run programs connected stdout-to-stdin.
    Pipeline(Vec<Invocation>),
}

/// One entry in the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Which step this is.
    pub id: StepId,
    /// Directory the step runs in.
    pub working_dir: Utf8PathBuf,
    /// What the step does.
    pub action: StepAction,
}

/// Ordered steps for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    steps: Vec<Step>,
}

impl Plan {
    /// Wrap an explicit list of steps.
    #[must_use]
    pub const fn new(steps: Vec<Step>) -> Self { Self { steps } }

    /// The standard regression sequence.
    ///
    /// The format check and build run from the caller's directory; everything
    /// after entering the project runs inside the project directory.
    #[must_use]
    pub fn standard(layout: &Layout, config: &RunnerConfig) -> Self {
        let here = &layout.invocation_dir;
        let project = &layout.project_dir;
        let cargo =
            |args: &[&str]| StepAction::Run(Invocation::new(&*config.cargo, args.iter().copied()));
        Self::new(vec![
            Step {
                id: StepId::FormatCheck,
                working_dir: here.clone(),
                action: StepAction::Run(Invocation::new(&*config.fmt_helper, ["--check"])),
            },
            Step {
                id: StepId::Build,
                working_dir: here.clone(),
                action: cargo(&["build", "--workspace"]),
            },
            Step {
                id: StepId::EnterProject,
                working_dir: project.clone(),
                action: StepAction::EnterDirectory,
            },
            Step {
                id: StepId::UnitTests,
                working_dir: project.clone(),
                action: cargo(&["test"]),
            },
            Step {
                id: StepId::Codegen,
                working_dir: project.clone(),
                action: cargo(&["kani", "--only-codegen"]),
            },
            Step {
                id: StepId::Docs,
                working_dir: project.clone(),
                action: cargo(&[
                    "doc",
                    "--workspace",
                    "--no-deps",
                    "--exclude",
                    config.doc_exclude.as_str(),
                ]),
            },
        ])
    }

    /// Steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[Step] { &self.steps }

    /// Step identifiers in execution order.
    #[must_use]
    pub fn ids(&self) -> impl Iterator<Item = StepId> + '_ { self.steps.iter().map(|step| step.id) }
}
