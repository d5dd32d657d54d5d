//! Snapshot of the process environment taken once at startup.
//!
//! Every lookup the runner performs goes through [`Environment`] so the run
//! never consults ambient process state mid-flight. Required variables are
//! strict: asking for one that is not defined is an error rather than an
//! empty value.

use std::{
    collections::BTreeMap,
    ffi::{OsStr, OsString},
};

use camino::Utf8Path;

use crate::errors::RunnerError;

/// Variable that switches the runner into keep-going mode when non-empty.
pub const KEEP_GOING_VAR: &str = "KANI_REGRESSION_KEEP_GOING";
/// Command search path variable.
pub const PATH_VAR: &str = "PATH";

/// Immutable view of environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<OsString, OsString>,
}

impl Environment {
    /// Capture the current process environment.
    #[must_use]
    pub fn from_process() -> Self { Self::from_pairs(std::env::vars_os()) }

    /// Build an environment from explicit key/value pairs.
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// Look up a variable that must be defined.
    ///
    /// A variable set to the empty string counts as defined.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::UndefinedVariable`] when `key` is absent.
    pub fn require(&self, key: &str) -> Result<&OsStr, RunnerError> {
        self.vars
            .get(OsStr::new(key))
            .map(OsString::as_os_str)
            .ok_or_else(|| RunnerError::UndefinedVariable(key.to_owned()))
    }

    /// Whether `key` is set to a non-empty value.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.vars
            .get(OsStr::new(key))
            .is_some_and(|value| !value.is_empty())
    }

    /// Build the child search path with `dir` placed ahead of `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::UndefinedVariable`] when `PATH` is not defined
    /// and [`RunnerError::SearchPath`] when an entry cannot be joined.
    pub fn search_path_with(&self, dir: &Utf8Path) -> Result<OsString, RunnerError> {
        let inherited = self.require(PATH_VAR)?;
        let entries = std::iter::once(dir.as_std_path().to_path_buf())
            .chain(std::env::split_paths(inherited));
        Ok(std::env::join_paths(entries)?)
    }
}
