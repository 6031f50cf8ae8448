//! Logging setup for the `cascade` binary
//!
//! The library only emits `tracing` events; installing a subscriber is up
//! to the application.

use tracing_subscriber::{fmt, EnvFilter};

/// Install a stderr subscriber filtered by `RUST_LOG` (default: `warn`).
///
/// `verbose` raises the default to `debug`. Does nothing if a subscriber
/// is already installed.
pub fn init(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .try_init();
}

/// Subscriber for tests: debug level, captured by the test harness.
///
/// Only meant for test binaries; safe to call more than once.
#[doc(hidden)]
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
