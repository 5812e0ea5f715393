//! Logging setup.
//!
//! `RUST_LOG` takes precedence over the level passed on the command line.
//! With a log file, output goes through a non-blocking writer and the
//! returned guard must be held until exit so buffered lines are flushed.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Errors from [`init_logging`].
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Invalid log file path: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("Cannot create log directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to install subscriber: {0}")]
    Install(String),
}

/// Install the global tracing subscriber.
pub fn init_logging(
    level: &str,
    log_file: Option<&Path>,
) -> Result<Option<WorkerGuard>, TelemetryError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let Some(log_file) = log_file else {
        builder
            .try_init()
            .map_err(|e| TelemetryError::Install(e.to_string()))?;
        return Ok(None);
    };

    let file_name = log_file
        .file_name()
        .ok_or_else(|| TelemetryError::InvalidPath(log_file.to_path_buf()))?
        .to_owned();
    let directory = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&directory).map_err(|source| TelemetryError::CreateDir {
        path: directory.clone(),
        source,
    })?;

    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    builder
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| TelemetryError::Install(e.to_string()))?;
    Ok(Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_path_without_file_name() {
        let err = init_logging("info", Some(Path::new("/"))).unwrap_err();
        assert!(matches!(err, TelemetryError::InvalidPath(_)));
    }
}
