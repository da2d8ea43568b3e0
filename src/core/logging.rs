//! Structured logging setup
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the binary (or to tests that want output).

use crate::core::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber described by `config`.
///
/// `RUST_LOG` takes precedence over the configured level. Returns `false` when
/// a global subscriber was already installed, in which case nothing changes.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match config.format.as_str() {
        "json" => builder.json().try_init(),
        "compact" => builder.compact().try_init(),
        _ => builder.pretty().try_init(),
    };

    installed.is_ok()
}
