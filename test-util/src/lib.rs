//! Utilities for integration tests.
//!
//! The `test-util` crate builds a throwaway directory tree shaped like the
//! layout the runner expects, with shell-script stand-ins for the formatting
//! helper and cargo. Each stand-in appends its name, arguments and working
//! directory to a shared log and exits with a code the test chooses, so tests
//! can assert exactly which steps ran, where, and in what order.

use std::{fs, io::Write as _};

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use cli_defs::RunnerConfig;
use proptest_regression::{
    Environment,
    RunReport,
    env::{KEEP_GOING_VAR, PATH_VAR},
    process::ProcessLauncher,
    run_with,
};
use tempfile::TempDir;

/// Script directory, relative to the temporary root. The project root sits
/// three levels above it.
const SCRIPT_DIR: &str = "kani/library/harness/scripts";
/// Project directory, the sibling of [`SCRIPT_DIR`].
const PROJECT_DIR: &str = "kani/library/harness/proptest";
const FMT_HELPER: &str = "kani-fmt.sh";
/// Search path handed to the runner; enough for `/bin/sh` utilities.
pub const BASE_PATH: &str = "/usr/bin:/bin";

/// One call recorded by a fake tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedCall {
    /// `kani-fmt.sh` or `cargo`.
    pub program: String,
    /// Arguments joined by spaces.
    pub args: String,
    /// Physical working directory of the call.
    pub dir: Utf8PathBuf,
}

impl LoggedCall {
    /// Program and arguments as a single command line.
    #[must_use]
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args)
        }
    }
}

/// Output of a run against a [`FakeWorkspace`].
#[derive(Debug)]
pub struct FakeRun {
    /// What the runner reported.
    pub report: RunReport,
    /// Everything written to the runner's standard output.
    pub stdout: String,
}

/// Temporary directory tree with fake tools.
///
/// The tree is removed when this value is dropped.
pub struct FakeWorkspace {
    root: Utf8PathBuf,
    _temp_dir: TempDir,
}

impl FakeWorkspace {
    /// Create the tree and install passing fake tools.
    ///
    /// # Errors
    ///
    /// Returns an error when the temporary tree cannot be created.
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix("proptest-regression")
            .tempdir()
            .context("creating temporary workspace")?;
        let canonical = temp_dir
            .path()
            .canonicalize()
            .context("canonicalising temporary workspace")?;
        let root = Utf8PathBuf::from_path_buf(canonical)
            .map_err(|path| anyhow::anyhow!("non-UTF-8 temp dir {}", path.display()))?;
        let workspace = Self {
            root,
            _temp_dir: temp_dir,
        };
        for dir in [SCRIPT_DIR, PROJECT_DIR, "checkout", "bin", "exit-codes"] {
            fs::create_dir_all(workspace.root.join(dir))
                .with_context(|| format!("creating {dir}"))?;
        }
        workspace.install_tool(&workspace.script_dir().join(FMT_HELPER), FMT_HELPER, "fmt")?;
        workspace.install_tool(&workspace.cargo_path(), "cargo", "cargo-$1")?;
        Ok(workspace)
    }

    /// Directory the runner lives in.
    #[must_use]
    pub fn script_dir(&self) -> Utf8PathBuf { self.root.join(SCRIPT_DIR) }

    /// The `proptest` project directory.
    #[must_use]
    pub fn project_dir(&self) -> Utf8PathBuf { self.root.join(PROJECT_DIR) }

    /// Root of the enclosing project.
    #[must_use]
    pub fn project_root(&self) -> Utf8PathBuf { self.root.join("kani") }

    /// Directory the runner is started from.
    #[must_use]
    pub fn invocation_dir(&self) -> Utf8PathBuf { self.root.join("checkout") }

    /// Location of the fake cargo.
    #[must_use]
    pub fn cargo_path(&self) -> Utf8PathBuf { self.root.join("bin/cargo") }

    fn log_path(&self) -> Utf8PathBuf { self.root.join("tools.log") }

    fn install_tool(&self, path: &Utf8Path, label: &str, key: &str) -> Result<()> {
        let codes = self.root.join("exit-codes");
        let log = self.log_path();
        let script = format!(
            "#!/bin/sh\n\
             key=\"{key}\"\n\
             printf '%s\\t%s\\t%s\\n' '{label}' \"$*\" \"$(pwd -P)\" >> '{log}'\n\
             if [ -f \"{codes}/$key\" ]; then exit \"$(cat \"{codes}/$key\")\"; fi\n\
             exit 0\n"
        );
        let mut file = fs::File::create(path).with_context(|| format!("creating {path}"))?;
        file.write_all(script.as_bytes())
            .with_context(|| format!("writing {path}"))?;
        drop(file);
        make_executable(path)
    }

    /// Make the step identified by `key` exit with `code`.
    ///
    /// Keys are `fmt` for the formatting helper and `cargo-<subcommand>` for
    /// cargo, e.g. `cargo-build` or `cargo-kani`.
    ///
    /// # Errors
    ///
    /// Returns an error when the exit-code file cannot be written.
    pub fn fail(&self, key: &str, code: i32) -> Result<()> {
        let path = self.root.join("exit-codes").join(key);
        fs::write(&path, code.to_string()).with_context(|| format!("writing {path}"))
    }

    /// Delete the `proptest` project directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be removed.
    pub fn remove_project_dir(&self) -> Result<()> {
        fs::remove_dir_all(self.project_dir()).context("removing project dir")
    }

    /// Delete the formatting helper from the script directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the helper cannot be removed.
    pub fn remove_fmt_helper(&self) -> Result<()> {
        fs::remove_file(self.script_dir().join(FMT_HELPER)).context("removing fmt helper")
    }

    /// Runner configuration pointing at this tree.
    #[must_use]
    pub fn config(&self) -> RunnerConfig {
        RunnerConfig {
            script_dir: Some(self.script_dir().into_string()),
            cargo: self.cargo_path().into_string(),
            ..RunnerConfig::with_defaults()
        }
    }

    /// Environment with a minimal `PATH`, optionally in keep-going mode.
    #[must_use]
    pub fn environment(keep_going: bool) -> Environment {
        let mut vars = vec![(PATH_VAR, BASE_PATH)];
        if keep_going {
            vars.push((KEEP_GOING_VAR, "1"));
        }
        Environment::from_pairs(vars)
    }

    /// Run the regression sequence with real child processes.
    ///
    /// # Errors
    ///
    /// Returns an error when the runner fails during setup.
    pub fn run(&self, env: &Environment) -> Result<FakeRun> {
        let mut stdout = Vec::new();
        let report = run_with(
            &self.config(),
            env,
            &self.invocation_dir(),
            &mut ProcessLauncher,
            &mut stdout,
        )?;
        Ok(FakeRun {
            report,
            stdout: String::from_utf8(stdout).context("runner output is not UTF-8")?,
        })
    }

    /// Calls recorded by the fake tools, in order.
    ///
    /// # Errors
    ///
    /// Returns an error when the log exists but cannot be read.
    pub fn calls(&self) -> Result<Vec<LoggedCall>> {
        let log = self.log_path();
        if !log.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&log).with_context(|| format!("reading {log}"))?;
        Ok(text
            .lines()
            .filter_map(|line| {
                let mut fields = line.splitn(3, '\t');
                Some(LoggedCall {
                    program: fields.next()?.to_owned(),
                    args: fields.next()?.to_owned(),
                    dir: Utf8PathBuf::from(fields.next()?),
                })
            })
            .collect())
    }

    /// Command lines recorded by the fake tools, in order.
    ///
    /// # Errors
    ///
    /// Returns an error when the log cannot be read.
    pub fn command_lines(&self) -> Result<Vec<String>> {
        Ok(self.calls()?.iter().map(LoggedCall::command_line).collect())
    }
}

#[cfg(unix)]
fn make_executable(path: &Utf8Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("marking {path} executable"))
}

#[cfg(not(unix))]
fn make_executable(_path: &Utf8Path) -> Result<()> { Ok(()) }
