//! Tests for the run loop and its failure policy.

use std::{collections::HashMap, ffi::OsString, io};

use camino::{Utf8Path, Utf8PathBuf};
use cli_defs::RunnerConfig;
use rstest::{fixture, rstest};

use super::*;
use crate::{layout::Layout, plan::Invocation};

/// Launcher that records calls and replays scripted results.
#[derive(Default)]
struct FakeLauncher {
    calls: Vec<(String, Utf8PathBuf)>,
    exit_codes: HashMap<String, i32>,
    missing_dirs: Vec<Utf8PathBuf>,
    seen_paths: Vec<OsString>,
}

impl FakeLauncher {
    fn failing(invocation: &str, code: i32) -> Self {
        let mut launcher = Self::default();
        launcher.exit_codes.insert(invocation.to_owned(), code);
        launcher
    }

    fn invoked(&self) -> Vec<&str> { self.calls.iter().map(|(cmd, _)| cmd.as_str()).collect() }

    fn check_dir(&self, dir: &Utf8Path) -> Result<(), StepError> {
        if self.missing_dirs.iter().any(|missing| missing == dir) {
            return Err(StepError::MissingDirectory {
                dir: dir.to_owned(),
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }
        Ok(())
    }
}

impl Launcher for FakeLauncher {
    fn enter_directory(&mut self, dir: &Utf8Path) -> Result<(), StepError> {
        self.calls.push(("cd".to_owned(), dir.to_owned()));
        self.check_dir(dir)
    }

    fn launch(
        &mut self,
        invocation: &Invocation,
        context: LaunchContext<'_>,
    ) -> Result<StepStatus, StepError> {
        let rendered = invocation.to_string();
        self.calls
            .push((rendered.clone(), context.working_dir.to_owned()));
        self.seen_paths.push(context.search_path.to_owned());
        self.check_dir(context.working_dir)?;
        let code = self.exit_codes.get(&rendered).copied().unwrap_or(0);
        Ok(StepStatus::from_code(code))
    }

    fn launch_pipeline(
        &mut self,
        stages: &[Invocation],
        context: LaunchContext<'_>,
    ) -> Result<StepStatus, StepError> {
        let mut statuses = Vec::new();
        for stage in stages {
            statuses.push(self.launch(stage, context)?);
        }
        Ok(crate::process::fold_pipeline(statuses))
    }
}

const COMMANDS: [&str; 5] = [
    "kani-fmt.sh --check",
    "cargo build --workspace",
    "cargo test",
    "cargo kani --only-codegen",
    "cargo doc --workspace --no-deps --exclude std",
];

#[fixture]
fn layout() -> Layout {
    Layout::resolve(
        Utf8Path::new("/src/kani/library/harness/scripts"),
        Utf8Path::new("/home/dev"),
        "../proptest",
    )
}

#[fixture]
fn plan(layout: Layout) -> Plan { Plan::standard(&layout, &RunnerConfig::with_defaults()) }

const FAIL_FAST: RunSettings = RunSettings {
    continue_on_error: false,
};
const KEEP_GOING: RunSettings = RunSettings {
    continue_on_error: true,
};

fn search_path() -> OsString { OsString::from("/src/kani/library/harness/scripts:/usr/bin") }

#[rstest]
fn all_steps_pass(plan: Plan) {
    let mut launcher = FakeLauncher::default();
    let report = execute(&plan, FAIL_FAST, &search_path(), &mut launcher);
    assert!(report.reached_end());
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.failures().count(), 0);
    let invoked = launcher.invoked();
    assert_eq!(invoked.first().copied(), Some(COMMANDS[0]));
    assert_eq!(invoked.len(), COMMANDS.len() + 1);
}

#[rstest]
#[case(0, 1)]
#[case(1, 101)]
#[case(2, 2)]
#[case(3, 3)]
#[case(4, 4)]
fn failure_stops_later_steps(plan: Plan, #[case] failing: usize, #[case] code: i32) {
    let command = COMMANDS[failing];
    let mut launcher = FakeLauncher::failing(command, code);
    let report = execute(&plan, FAIL_FAST, &search_path(), &mut launcher);

    assert!(!report.reached_end());
    assert_eq!(report.exit_code(), code);
    assert_eq!(launcher.invoked().last().copied(), Some(command));
    for later in &COMMANDS[failing + 1..] {
        assert!(
            !launcher.invoked().contains(later),
            "{later} ran after {command} failed"
        );
    }
}

#[rstest]
fn keep_going_runs_every_step(plan: Plan) {
    let mut launcher = FakeLauncher::failing("cargo build --workspace", 101);
    let report = execute(&plan, KEEP_GOING, &search_path(), &mut launcher);

    assert!(report.reached_end());
    assert_eq!(report.outcome(), RunOutcome::Completed);
    for command in COMMANDS {
        assert!(launcher.invoked().contains(&command), "{command} skipped");
    }
    let failed: Vec<_> = report.failures().map(|record| record.step).collect();
    assert_eq!(failed, vec![StepId::Build]);
    // The final step passed, so the run exits as it did.
    assert_eq!(report.exit_code(), 0);
}

#[rstest]
fn keep_going_exit_code_follows_the_final_step(plan: Plan) {
    let mut launcher =
        FakeLauncher::failing("cargo doc --workspace --no-deps --exclude std", 9);
    let report = execute(&plan, KEEP_GOING, &search_path(), &mut launcher);
    assert!(report.reached_end());
    assert_eq!(report.exit_code(), 9);
}

#[rstest]
fn missing_project_dir_aborts_at_enter(plan: Plan, layout: Layout) {
    let mut launcher = FakeLauncher {
        missing_dirs: vec![layout.project_dir.clone()],
        ..FakeLauncher::default()
    };
    let report = execute(&plan, FAIL_FAST, &search_path(), &mut launcher);
    assert_eq!(report.outcome(), RunOutcome::Aborted(StepId::EnterProject));
    assert_eq!(report.exit_code(), 1);
    assert!(matches!(
        report.records().last().map(|record| &record.outcome),
        Some(Err(StepError::MissingDirectory { .. }))
    ));
}

#[rstest]
fn missing_project_dir_fails_each_later_step_when_keeping_going(plan: Plan, layout: Layout) {
    let mut launcher = FakeLauncher {
        missing_dirs: vec![layout.project_dir.clone()],
        ..FakeLauncher::default()
    };
    let report = execute(&plan, KEEP_GOING, &search_path(), &mut launcher);
    let failed: Vec<_> = report.failures().map(|record| record.step).collect();
    assert_eq!(
        failed,
        vec![
            StepId::EnterProject,
            StepId::UnitTests,
            StepId::Codegen,
            StepId::Docs
        ]
    );
    // Nothing falls back to running in another directory.
    assert!(
        launcher
            .calls
            .iter()
            .skip(2)
            .all(|(_, dir)| *dir == layout.project_dir)
    );
}

#[rstest]
fn every_program_sees_the_search_path(plan: Plan) {
    let mut launcher = FakeLauncher::default();
    let _report = execute(&plan, FAIL_FAST, &search_path(), &mut launcher);
    assert!(launcher.seen_paths.iter().all(|path| *path == search_path()));
}

#[rstest]
fn pipeline_step_fails_on_upstream_stage() {
    let dir = Utf8PathBuf::from("/work");
    let plan = Plan::new(vec![Step {
        id: StepId::Docs,
        working_dir: dir,
        action: StepAction::Pipeline(vec![
            Invocation::new("cargo", ["doc"]),
            Invocation::new("tee", ["doc.log"]),
        ]),
    }]);
    let mut launcher = FakeLauncher::failing("cargo doc", 5);
    let report = execute(&plan, FAIL_FAST, &search_path(), &mut launcher);
    assert_eq!(report.exit_code(), 5);
    assert_eq!(launcher.invoked(), vec!["cargo doc", "tee doc.log"]);
}

#[rstest]
#[case(&[], false)]
#[case(&[(KEEP_GOING_VAR, "")], false)]
#[case(&[(KEEP_GOING_VAR, "1")], true)]
#[case(&[(KEEP_GOING_VAR, "false")], true)]
fn settings_follow_the_override_variable(
    #[case] vars: &[(&str, &str)],
    #[case] expected: bool,
) {
    let env = Environment::from_pairs(vars.iter().copied());
    assert_eq!(
        RunSettings::from_environment(&env).continue_on_error,
        expected
    );
}

#[rstest]
fn banner_is_framed_by_blank_lines() {
    let mut out = Vec::new();
    write_banner(&mut out).expect("banner");
    let text = String::from_utf8(out).expect("utf8");
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(
        lines,
        vec!["", SUCCESS_BANNER[0], SUCCESS_BANNER[1], ""]
    );
}
