//! Diagnostic logging.
//!
//! Logs go to stderr so they never mix with a report printed on stdout.
//! `API_GUARDIAN_LOG` takes the usual `EnvFilter` syntax
//! (`API_GUARDIAN_LOG=api_guardian::scanner=debug`) and overrides the level
//! given on the command line.

use std::sync::Once;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "API_GUARDIAN_LOG";

static INIT: Once = Once::new();

/// Installs the global subscriber. Only the first call has an effect.
pub fn init_tracing(default_level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(format!("api_guardian={default_level}")));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_names(true),
            )
            .with(filter)
            .init();
    });
}
