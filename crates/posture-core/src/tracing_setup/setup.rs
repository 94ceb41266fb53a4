//! Subscriber installation.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the filter directive, e.g. `posture=debug`.
pub const LOG_ENV: &str = "POSTURE_LOG";

static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Install a global `fmt` subscriber filtered by `POSTURE_LOG` (default `info`).
///
/// Idempotent: only the first call attempts installation, and every call
/// returns that attempt's outcome. `false` means another global subscriber
/// was already in place.
pub fn init_tracing() -> bool {
    *INSTALLED.get_or_init(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
            .is_ok()
    })
}
