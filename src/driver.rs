//! Entry points that tie configuration, layout, plan and execution together.
//!
//! The binary only calls [`run`]; tests drive [`run_with`] with an explicit
//! environment, launcher and output sink.

use std::{io::Write, process::ExitCode};

use anyhow::{Context, Result};
use camino::Utf8Path;
use clap::Parser;
use cli_defs::{Cli, RunnerConfig};
use ortho_config::OrthoConfig;
use tracing::{debug, info};

use crate::{
    env::Environment,
    errors::RunnerError,
    layout::{self, Layout},
    plan::Plan,
    process::{Launcher, ProcessLauncher},
    runner::{self, RunReport, RunSettings},
};

/// Parse arguments, layer configuration and run the regression sequence.
///
/// # Errors
///
/// Returns an error when configuration cannot be loaded or the run cannot be
/// set up. Step failures are reported through the returned exit code.
pub fn run() -> Result<ExitCode> {
    // clap answers --help and --version before configuration layering starts.
    let cli = Cli::parse();
    debug!(?cli, "parsed command line");
    let config = RunnerConfig::load_from_iter(std::env::args_os())
        .context("failed to load configuration")?;
    let env = Environment::from_process();
    let invocation_dir = layout::current_dir()?;
    let report = run_with(
        &config,
        &env,
        &invocation_dir,
        &mut ProcessLauncher,
        &mut std::io::stdout().lock(),
    )?;
    Ok(exit_code(&report))
}

/// Resolve the layout, build the plan and execute it.
///
/// The success banner goes to `out` when the run reaches its end.
///
/// # Errors
///
/// Returns a [`RunnerError`] when setup fails: an undefined required
/// variable, an unresolvable script directory, or a failed banner write.
/// These are fatal in keep-going mode too.
pub fn run_with<L, W>(
    config: &RunnerConfig,
    env: &Environment,
    invocation_dir: &Utf8Path,
    launcher: &mut L,
    out: &mut W,
) -> Result<RunReport, RunnerError>
where
    L: Launcher,
    W: Write,
{
    let settings = RunSettings::from_environment(env);
    let script_dir = layout::locate_script_dir(config.script_dir.as_deref(), invocation_dir)?;
    let search_path = env.search_path_with(&script_dir)?;
    let layout = Layout::resolve(&script_dir, invocation_dir, &config.project);
    debug!(?config, ?settings, "configuration resolved");

    let plan = Plan::standard(&layout, config);
    let report = runner::execute(&plan, settings, &search_path, launcher);
    if report.reached_end() {
        info!(failures = report.failures().count(), "regression run reached its end");
        runner::write_banner(out)?;
    }
    Ok(report)
}

/// Convert a report into the process exit code.
#[must_use]
pub fn exit_code(report: &RunReport) -> ExitCode {
    let code = report.exit_code().rem_euclid(256);
    ExitCode::from(u8::try_from(code).unwrap_or(u8::MAX))
}
