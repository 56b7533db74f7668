//! Structured telemetry initialisation for the command-line tool.

use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to open the requested log file.
    #[error("failed to open log file '{path}': {source}")]
    LogFile {
        /// The path that could not be opened.
        path: PathBuf,
        /// The underlying filesystem error.
        source: io::Error,
    },
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Configures the global tracing subscriber when invoked for the first time.
///
/// Repeated calls are idempotent: the first invocation installs the global
/// subscriber and later invocations return without touching the global state
/// again. Logs go to stderr, or to `log_file` when one is given.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter expression does not parse, the
/// log file cannot be opened, or the subscriber cannot be installed.
pub fn initialise(level: &str, log_file: Option<&Path>) -> Result<(), TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(level, log_file))
        .map(|_| ())
}

fn install_subscriber(level: &str, log_file: Option<&Path>) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_new(level).map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        // Add a timestamp so runs interleaved by build tooling can be
        // correlated afterwards.
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339());

    let subscriber: Box<dyn Subscriber + Send + Sync> = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| TelemetryError::LogFile {
                    path: path.to_owned(),
                    source,
                })?;
            Box::new(
                builder
                    .with_writer(Arc::new(file))
                    .with_ansi(false)
                    .finish(),
            )
        }
        None => Box::new(
            builder
                .with_writer(io::stderr)
                // Avoid stray colour codes in non-TTY sinks while keeping
                // colour on interactive terminals.
                .with_ansi(io::stderr().is_terminal())
                .finish(),
        ),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}
