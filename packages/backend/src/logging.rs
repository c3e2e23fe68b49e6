use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

const LOG_FILE_PREFIX: &str = "quest-backend.log";

/// Keeps the non-blocking file writer flushing; drop it only at shutdown.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn file_writer(log_dir: &Path) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    if let Err(err) = std::fs::create_dir_all(log_dir) {
        eprintln!("failed to create log directory {}: {err}", log_dir.display());
        return None;
    }
    let appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);
    Some(tracing_appender::non_blocking(appender))
}

/// Installs the global subscriber. Stdout always; a daily rolling file
/// as well when `LOG_DIR` is configured.
pub fn init_tracing(config: &Config) -> Option<FileLogGuard> {
    let stdout_layer = fmt::layer().with_target(true);

    let file = config.log_dir.as_deref().and_then(file_writer);
    match file {
        Some((writer, guard)) => {
            let file_layer = fmt::layer().with_writer(writer).with_ansi(false).with_target(true);
            tracing_subscriber::registry()
                .with(build_filter(&config.log_level))
                .with(stdout_layer)
                .with(file_layer)
                .init();
            tracing::debug!(dir = ?config.log_dir, "file logging enabled");
            Some(FileLogGuard { _guard: guard })
        }
        None => {
            tracing_subscriber::registry()
                .with(build_filter(&config.log_level))
                .with(stdout_layer)
                .init();
            None
        }
    }
}
