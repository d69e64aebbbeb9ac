//! Logging infrastructure for narrmix.
//!
//! This module provides:
//! - The injected [`LogSink`] interface used by every pipeline component
//! - Per-job loggers with file + callback output and a diagnostic tail
//! - Sinks that forward to `tracing`, capture in memory, or fan out
//! - Process-wide `tracing` setup for binaries
//!
//! # Example
//!
//! ```no_run
//! use narrmix_core::logging::{JobLogger, LogConfig, LogSinkExt};
//!
//! let logger = JobLogger::new("job-123", "/path/to/logs", LogConfig::default(), None).unwrap();
//!
//! logger.stage("Assemble");
//! logger.command("ffmpeg -y -f concat ...");
//! logger.success("Narration assembled");
//! ```

mod job_logger;
mod sink;
mod types;

pub use job_logger::JobLogger;
pub use sink::{FanoutSink, LogRecord, LogSink, LogSinkExt, MemorySink, TracingSink};
pub use types::{
    render_fields, LineCallback, LogConfig, LogLevel, MessagePrefix, EVENT_KEY, MESSAGE_KEY,
};

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the process-wide subscriber: stderr (stdout carries responses)
/// plus a daily `narrmix.log` in `logs_dir`. `RUST_LOG` overrides
/// `default_level`.
///
/// Keep the returned guard alive until exit so buffered lines are flushed.
pub fn init_tracing_with_file(default_level: LogLevel, logs_dir: &Path) -> WorkerGuard {
    let appender = tracing_appender::rolling::daily(logs_dir, "narrmix.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .with(env_filter(default_level))
        .init();

    guard
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

fn env_filter(default_level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_to_filter_works() {
        assert_eq!(LogLevel::Debug.as_str(), "debug");
        assert_eq!(LogLevel::Info.as_str(), "info");
    }

    #[test]
    fn env_filter_falls_back_to_default_level() {
        if std::env::var_os("RUST_LOG").is_none() {
            assert_eq!(env_filter(LogLevel::Warn).to_string(), "warn");
        }
    }

    #[test]
    fn tracing_sink_accepts_records() {
        init_test_tracing();
        TracingSink.warn("forwarded to tracing");
    }
}
