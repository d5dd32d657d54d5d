//! Binary entry point for the proptest regression runner.
//!
//! The runtime logic lives in `proptest_regression::driver`; this binary only
//! installs logging and maps errors to an exit status.

use std::process::ExitCode;

#[expect(
    clippy::print_stderr,
    reason = "setup failures are reported before any logging context exists"
)]
fn main() -> ExitCode {
    proptest_regression::telemetry::init_tracing();
    match proptest_regression::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("proptest-regression: {e:#}");
            ExitCode::FAILURE
        }
    }
}
