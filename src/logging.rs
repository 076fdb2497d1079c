//! Log output setup
//!
//! Logs go to stderr so that `lookup` output on stdout stays machine-readable.
//! `RUST_LOG` directives take precedence over the configured level.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Maps a configured level name to a filter, falling back to `info`
pub fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Some(LevelFilter::TRACE),
        "debug" => Some(LevelFilter::DEBUG),
        "info" => Some(LevelFilter::INFO),
        "warn" => Some(LevelFilter::WARN),
        "error" => Some(LevelFilter::ERROR),
        _ => None,
    }
}

/// Installs the global subscriber; later calls are ignored
pub fn init_logging(level: &str) {
    let default_level = parse_level(level).unwrap_or(LevelFilter::INFO);

    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter);

    if tracing_subscriber::registry().with(stderr_layer).try_init().is_ok()
        && parse_level(level).is_none()
    {
        tracing::warn!("Invalid log level '{}', defaulting to 'info'", level);
    }
}
