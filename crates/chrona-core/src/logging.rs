use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use thiserror::Error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::time::{LocalTime, UtcTime};
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::config_directory;

/// Environment variable holding an `EnvFilter` directive; takes precedence over `RUST_LOG`.
pub const LOG_FILTER_ENV: &str = "CHRONA_LOG";
const LOG_FILE_NAME: &str = "chrona.log";

/// Controls where structured logs are published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingDestination {
    /// Human-readable lines on stderr only. The default for scheduled runs.
    StderrOnly,
    /// Stderr plus a JSON log file.
    FileAndStderr,
}

/// Keeps the file writer running. Dropping it flushes buffered lines to disk, so hold it
/// until the last event is logged and drop it before `std::process::exit`.
#[must_use = "dropping the guard stops the log file writer"]
#[derive(Debug)]
pub struct LoggingGuard {
    _worker: Option<WorkerGuard>,
    log_path: Option<PathBuf>,
}

impl LoggingGuard {
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }
}

static LOG_PATH: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Errors that can arise while standing up structured logging.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to prepare log directory: {0}")]
    Io(#[from] io::Error),
    #[error("invalid logging filter: {0}")]
    Filter(#[from] ParseError),
    #[error("failed to install logging subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global subscriber, writing the optional file under the config directory.
pub fn init_logging(destination: LoggingDestination) -> Result<LoggingGuard, LoggingError> {
    init_logging_in(destination, &config_directory().join("logs"))
}

/// Install the global subscriber with the log file placed in `log_dir`.
///
/// The first call wins; later calls return a guard that owns no writer but reports the
/// log file chosen by the first.
pub fn init_logging_in(
    destination: LoggingDestination,
    log_dir: &Path,
) -> Result<LoggingGuard, LoggingError> {
    if let Some(log_path) = LOG_PATH.get() {
        return Ok(LoggingGuard {
            _worker: None,
            log_path: log_path.clone(),
        });
    }

    let guard = install_logging(destination, log_dir)?;
    let _ = LOG_PATH.set(guard.log_path.clone());
    Ok(guard)
}

/// Log file selected during initialization, if any.
pub fn current_log_path() -> Option<&'static PathBuf> {
    LOG_PATH.get().and_then(Option::as_ref)
}

fn install_logging(
    destination: LoggingDestination,
    log_dir: &Path,
) -> Result<LoggingGuard, LoggingError> {
    let filter = build_filter()?;

    let (file_layer, guard, log_path) = match destination {
        LoggingDestination::FileAndStderr => {
            fs::create_dir_all(log_dir)?;
            let path = log_dir.join(LOG_FILE_NAME);
            let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE_NAME);
            let (writer, worker_guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .event_format(
                    tracing_subscriber::fmt::format()
                        .json()
                        .with_timer(UtcTime::rfc_3339())
                        .with_level(true)
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .with_writer(writer)
                .with_ansi(false)
                .boxed();
            (Some(layer), Some(worker_guard), Some(path))
        }
        LoggingDestination::StderrOnly => (None, None, None),
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .event_format(
            tracing_subscriber::fmt::format()
                .with_timer(LocalTime::rfc_3339())
                .with_level(true)
                .with_target(false)
                .with_ansi(false),
        )
        .with_writer(io::stderr)
        .with_ansi(false)
        .boxed();

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;

    if let Some(path) = log_path.as_ref() {
        info!(path = %path.display(), "Structured logging enabled");
    }

    Ok(LoggingGuard {
        _worker: guard,
        log_path,
    })
}

fn build_filter() -> Result<EnvFilter, ParseError> {
    if let Ok(spec) = env::var(LOG_FILTER_ENV) {
        if !spec.trim().is_empty() {
            return EnvFilter::try_new(spec);
        }
    }

    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new("info"),
    }
}
