//! Tracing subscriber setup.

use crate::errors::{ConveyorError, ConveyorResult};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LOG_DIRECTIVE: &str = "conveyor=info";

/// Where log lines go.
#[derive(Debug, Clone)]
pub enum LogTarget {
    Stderr,
    /// Append to a file through a background writer.
    File(PathBuf),
}

/// Install the global tracing subscriber.
///
/// Honours `RUST_LOG`. Calling it again after a subscriber is installed is a
/// no-op. For [`LogTarget::File`] the returned guard must be kept alive for
/// buffered lines to be flushed.
pub fn init_logging(target: &LogTarget) -> ConveyorResult<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));

    match target {
        LogTarget::Stderr => {
            let installed = tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init();
            if installed.is_err() {
                tracing::debug!("Global subscriber already installed, keeping it");
            }
            Ok(None)
        }
        LogTarget::File(path) => {
            let file_name = path.file_name().ok_or_else(|| {
                ConveyorError::Config(format!("log path {} has no file name", path.display()))
            })?;
            let dir = path.parent().map(PathBuf::from).unwrap_or_default();
            std::fs::create_dir_all(&dir)?;

            let appender = tracing_appender::rolling::never(&dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let installed = tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .try_init();
            if installed.is_err() {
                tracing::debug!("Global subscriber already installed, keeping it");
                return Ok(None);
            }
            Ok(Some(guard))
        }
    }
}
