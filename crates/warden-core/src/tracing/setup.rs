//! Tracing initialization and configuration.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Initialize the Warden tracing/logging system.
///
/// Reads the `WARDEN_LOG` environment variable for per-subsystem levels,
/// e.g. `WARDEN_LOG=warden_analysis::ensemble=debug,warden_storage=warn`.
/// Falls back to `warden=info` if unset or invalid.
///
/// Idempotent: later calls, or calls after another global subscriber was
/// installed, are no-ops.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("WARDEN_LOG")
            .unwrap_or_else(|_| EnvFilter::new("warden=info"));

        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(filter)
            .try_init();
    });
}

/// Initialize tracing with an explicit filter string (tests, embedding).
/// Ignored if a global subscriber is already installed.
pub fn init_tracing_with_filter(filter: &str) {
    INIT.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(EnvFilter::new(filter))
            .try_init();
    });
}
