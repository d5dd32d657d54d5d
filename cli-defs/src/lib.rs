//! Shared CLI type definitions for proptest-regression build and runtime.
//!
//! This crate provides the configuration types used by both the `build.rs`
//! script (for man page generation) and the runner binary. Keeping them in a
//! separate crate lets the build script render the man page without pulling
//! in the runtime's process and logging dependencies.

// FIXME: File-wide suppressions are unavoidable here. Clap and OrthoConfig derive macros
// inject generated code throughout the module, and there is no mechanism to narrow
// the scope without restructuring the crate.
#![expect(
    non_snake_case,
    reason = "Clap/OrthoConfig derive macros generate helper modules with uppercase names"
)]
#![allow(
    missing_docs,
    reason = "OrthoConfig and Clap derive macros generate items that cannot be documented"
)]

use clap::{Args, Parser};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

/// Default name of the formatting helper that sits next to the runner.
pub const DEFAULT_FMT_HELPER: &str = "kani-fmt.sh";
/// Default cargo program.
pub const DEFAULT_CARGO: &str = "cargo";
/// Default project directory, relative to the runner's directory.
pub const DEFAULT_PROJECT: &str = "../proptest";
/// Package left out of the documentation build by default.
pub const DEFAULT_DOC_EXCLUDE: &str = "std";

/// Layered runner configuration.
///
/// Values come from defaults, a dotfile, `PROPTEST_REGRESSION_*` environment
/// variables and command-line flags, in increasing order of precedence.
#[derive(Args, OrthoConfig, Serialize, Deserialize, Default, Debug, Clone)]
#[ortho_config(prefix = "PROPTEST_REGRESSION_")]
pub struct RunnerConfig {
    /// Directory holding the runner and its formatting helper.
    ///
    /// Defaults to the directory of the running executable.
    #[arg(long)]
    pub script_dir: Option<String>,
    /// Formatting helper invoked with `--check`, looked up on the search path.
    #[ortho_config(default = DEFAULT_FMT_HELPER.to_owned())]
    #[arg(long, default_value_t = String::from(DEFAULT_FMT_HELPER))]
    pub fmt_helper: String,
    /// Cargo program used for build, test, model-checking and doc steps.
    #[ortho_config(default = DEFAULT_CARGO.to_owned())]
    #[arg(long, default_value_t = String::from(DEFAULT_CARGO))]
    pub cargo: String,
    /// Project directory, relative to the runner's directory.
    #[ortho_config(default = DEFAULT_PROJECT.to_owned())]
    #[arg(long, default_value_t = String::from(DEFAULT_PROJECT))]
    pub project: String,
    /// Package excluded from the workspace documentation build.
    #[ortho_config(default = DEFAULT_DOC_EXCLUDE.to_owned())]
    #[arg(long, default_value_t = String::from(DEFAULT_DOC_EXCLUDE))]
    pub doc_exclude: String,
}

impl RunnerConfig {
    /// Configuration with every default applied and no script directory.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            script_dir: None,
            fmt_helper: DEFAULT_FMT_HELPER.to_owned(),
            cargo: DEFAULT_CARGO.to_owned(),
            project: DEFAULT_PROJECT.to_owned(),
            doc_exclude: DEFAULT_DOC_EXCLUDE.to_owned(),
        }
    }
}

/// Top-level CLI entry point consumed by the binary and the man page build.
#[derive(Parser, Deserialize, Serialize, Debug, Clone)]
#[command(
    name = "proptest-regression",
    version,
    about = "Run the proptest regression sequence: format check, build, unit tests, codegen and docs",
    after_help = "Set KANI_REGRESSION_KEEP_GOING to any non-empty value to run every step even after a failure."
)]
pub struct Cli {
    /// Runner configuration overrides (merged with files and environment at runtime).
    #[command(flatten)]
    pub config: RunnerConfig,
}
