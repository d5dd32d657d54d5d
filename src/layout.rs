//! Directory layout the regression run operates on.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::errors::RunnerError;

/// Number of directory levels between the script directory and the project root.
pub const PROJECT_ROOT_DEPTH: usize = 3;

/// Resolved directories for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Canonical directory holding the runner and its formatting helper.
    pub script_dir: Utf8PathBuf,
    /// Directory the runner was started from.
    pub invocation_dir: Utf8PathBuf,
    /// Project directory the test, codegen and doc steps run in.
    pub project_dir: Utf8PathBuf,
    /// Root of the enclosing project, three levels above `script_dir`.
    pub project_root: Utf8PathBuf,
}

impl Layout {
    /// Derive the layout from an already canonical script directory.
    ///
    /// `project` is interpreted relative to `script_dir`; `..` components are
    /// folded lexically so the result names the sibling directory directly.
    /// Climbing towards the project root stops at the filesystem root.
    #[must_use]
    pub fn resolve(script_dir: &Utf8Path, invocation_dir: &Utf8Path, project: &str) -> Self {
        let up = Utf8Path::new("..");
        let project_root =
            normalize(&(0..PROJECT_ROOT_DEPTH).fold(script_dir.to_owned(), |dir, _| dir.join(up)));
        let layout = Self {
            script_dir: script_dir.to_owned(),
            invocation_dir: invocation_dir.to_owned(),
            project_dir: normalize(&script_dir.join(project)),
            project_root,
        };
        debug!(
            script_dir = %layout.script_dir,
            project_dir = %layout.project_dir,
            project_root = %layout.project_root,
            "resolved layout"
        );
        layout
    }
}

/// Locate the runner's own directory.
///
/// A configured directory wins; relative values are taken from
/// `invocation_dir`. Without one, the directory of the running executable is
/// used. The result is canonicalised so later steps can find siblings no
/// matter where the caller started.
///
/// # Errors
///
/// Returns [`RunnerError::ScriptDir`] when the directory cannot be found or
/// canonicalised and [`RunnerError::NonUtf8Path`] for non-UTF-8 paths.
pub fn locate_script_dir(
    configured: Option<&str>,
    invocation_dir: &Utf8Path,
) -> Result<Utf8PathBuf, RunnerError> {
    let candidate = match configured {
        Some(dir) => invocation_dir.join(dir),
        None => executable_dir()?,
    };
    candidate
        .canonicalize_utf8()
        .map_err(RunnerError::ScriptDir)
}

/// Directory the current process was started in.
///
/// # Errors
///
/// Returns [`RunnerError::ScriptDir`] when the working directory is
/// unavailable and [`RunnerError::NonUtf8Path`] for non-UTF-8 paths.
pub fn current_dir() -> Result<Utf8PathBuf, RunnerError> {
    let dir = std::env::current_dir().map_err(RunnerError::ScriptDir)?;
    Utf8PathBuf::from_path_buf(dir).map_err(RunnerError::NonUtf8Path)
}

fn executable_dir() -> Result<Utf8PathBuf, RunnerError> {
    let exe = std::env::current_exe().map_err(RunnerError::ScriptDir)?;
    let exe = Utf8PathBuf::from_path_buf(exe).map_err(RunnerError::NonUtf8Path)?;
    exe.parent().map(Utf8Path::to_owned).ok_or_else(|| {
        RunnerError::ScriptDir(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{exe} has no parent directory"),
        ))
    })
}

fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    let mut out = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => match out.components().next_back() {
                Some(Utf8Component::Normal(_)) => {
                    out.pop();
                }
                Some(Utf8Component::RootDir | Utf8Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;

    #[rstest]
    fn project_root_sits_three_levels_up() {
        let layout = Layout::resolve(
            Utf8Path::new("/src/kani/library/harness/scripts"),
            Utf8Path::new("/home/dev"),
            "../proptest",
        );
        assert_eq!(layout.project_root, Utf8PathBuf::from("/src/kani"));
        assert_eq!(
            layout.project_dir,
            Utf8PathBuf::from("/src/kani/library/harness/proptest")
        );
        assert_eq!(layout.invocation_dir, Utf8PathBuf::from("/home/dev"));
    }

    #[rstest]
    #[case("/a/b", "/")]
    #[case("/usr/bin", "/")]
    #[case("/", "/")]
    #[case("/a/b/c", "/")]
    #[case("/a/b/c/d", "/a")]
    fn shallow_script_dir_clamps_project_root(#[case] script_dir: &str, #[case] root: &str) {
        let layout = Layout::resolve(Utf8Path::new(script_dir), Utf8Path::new("/"), "../proptest");
        assert_eq!(layout.project_root, Utf8PathBuf::from(root));
    }

    #[rstest]
    #[case("/a/b/./c", "/a/b/c")]
    #[case("/a/b/../c", "/a/c")]
    #[case("/a/b/scripts/../../proptest", "/a/proptest")]
    #[case("/../../a", "/a")]
    #[case("../a/../b", "../b")]
    fn normalize_folds_dot_components(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(Utf8Path::new(input)), Utf8PathBuf::from(expected));
    }

    #[rstest]
    fn configured_relative_dir_resolves_against_invocation_dir() {
        let tmp = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf8 tempdir");
        std::fs::create_dir_all(root.join("tools/scripts")).expect("mkdir");

        let located = locate_script_dir(Some("tools/scripts"), &root).expect("located");
        let expected = root
            .join("tools/scripts")
            .canonicalize_utf8()
            .expect("canonical");
        assert_eq!(located, expected);
    }

    #[rstest]
    fn missing_configured_dir_is_reported() {
        let tmp = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf8 tempdir");
        assert!(matches!(
            locate_script_dir(Some("absent"), &root),
            Err(RunnerError::ScriptDir(_))
        ));
    }
}
