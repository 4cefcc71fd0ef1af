//! Structured logging setup for the analysis binaries
//!
//! The library only emits `tracing` events; installing a subscriber is left to the
//! binaries so that embedding applications keep control of their own logging.

use crate::config::LoggingConfig;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, InitError, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Logging initialization errors
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Log file appender error: {0}")]
    Appender(#[from] InitError),
}

/// Install the global subscriber described by `config`.
///
/// `RUST_LOG` overrides `config.level`. When `config.log_dir` is set, JSON lines are
/// also written to a daily-rotated file there; the returned guard must be held for the
/// lifetime of the program so buffered lines are flushed.
///
/// A subscriber that is already installed is left in place.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = Builder::new()
                .rotation(Rotation::DAILY)
                .filename_prefix("grid-eval")
                .filename_suffix("log")
                .max_log_files(config.max_files.max(1))
                .build(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().json().with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    let stderr_json = config
        .json
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let stderr_text = (!config.json).then(|| fmt::layer().with_writer(std::io::stderr));

    // Try to set as global default, but don't fail if already set
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_json)
        .with(stderr_text)
        .with(file_layer)
        .try_init();

    Ok(guard)
}
