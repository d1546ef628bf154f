// --- File: crates/bookify_common/src/logging.rs ---
//! Logging utilities for the Bookify client.
//!
//! All crates log through `tracing` macros; this module only wires up the
//! subscriber once at start-up.

use std::path::Path;
use tracing::{error, info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber at INFO.
///
/// # Examples
///
/// ```
/// use bookify_common::logging;
///
/// logging::init();
/// ```
pub fn init() {
    init_with_level(Level::INFO);
}

/// Initialize the tracing subscriber with a specific log level.
///
/// `RUST_LOG` still applies; the level is added as a `bookify=<level>` directive.
/// Calling this more than once is harmless.
pub fn init_with_level(level: Level) {
    let result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_line_number(true))
        .with(filter_for(level))
        .try_init();

    if result.is_ok() {
        info!("Logging initialized at level: {}", level);
    }
}

/// Initialize logging to stdout and to a daily rolling file in `directory`.
///
/// The returned guard flushes the file writer on drop and must be kept alive
/// for as long as the application runs.
pub fn init_with_file(level: Level, directory: &Path) -> WorkerGuard {
    let appender = tracing_appender::rolling::daily(directory, "bookify.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_line_number(true))
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .with(filter_for(level))
        .try_init();

    if result.is_ok() {
        info!(
            "Logging initialized at level: {} (file output in {})",
            level,
            directory.display()
        );
    }
    guard
}

/// Parse a level name from configuration, falling back to INFO.
pub fn parse_level(name: &str) -> Level {
    name.parse().unwrap_or(Level::INFO)
}

fn filter_for(level: Level) -> EnvFilter {
    let filter = EnvFilter::from_default_env();
    match format!("bookify={}", level).parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

/// Log a result, with different messages for success and error cases.
///
/// Returns the original result so it can be used in a chain.
pub fn log_result<T, E: std::fmt::Display>(
    result: Result<T, E>,
    success_message: &str,
    error_context: &str,
) -> Result<T, E> {
    match &result {
        Ok(_) => info!("{}", success_message),
        Err(e) => error!("{}: {}", error_context, e),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_level_falls_back_to_info() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level("WARN"), Level::WARN);
        assert_eq!(parse_level("chatty"), Level::INFO);
    }

    #[test]
    fn log_result_passes_value_through() {
        let ok: Result<u8, String> = log_result(Ok(3), "done", "failed");
        assert_eq!(ok, Ok(3));
        let err: Result<u8, String> = log_result(Err("boom".into()), "done", "failed");
        assert_eq!(err, Err("boom".to_string()));
    }
}
