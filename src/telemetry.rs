//! Logging setup for the runner binary.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a stderr fmt subscriber if one is not already active.
///
/// The filter honours `RUST_LOG` and falls back to `info`. Standard output is
/// left to the success banner.
pub fn init_tracing() {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        // Another subscriber may already be installed, e.g. by a test harness.
        if tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init()
            .is_err()
        {
            tracing::debug!("tracing subscriber already installed");
        }
    });
}
