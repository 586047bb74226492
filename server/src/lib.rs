pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod payload;
pub mod server;
pub mod service;
pub mod transcribe;
pub mod vad;

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::LoggingConfig;

/// Application-specific environment variable for log filtering (overrides config).
pub const LOG_ENV_VAR: &str = "WHISPER_LOG";

/// Entry point for the server process: configures logging and runs the service.
pub async fn run() -> anyhow::Result<()> {
    let config = config::Config::load()?;

    let _guard = init_logging(&config.logging)?;

    // Route whisper.cpp and GGML logs through tracing
    whisper_rs::install_logging_hooks();

    service::run(config).await
}

/// Install the global subscriber. Logs go to stderr, or to `logging.file`
/// when set; the returned guard flushes the file writer on drop.
fn init_logging(logging: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    // WHISPER_LOG env var overrides config file level
    let filter = EnvFilter::builder()
        .with_env_var(LOG_ENV_VAR)
        .with_default_directive(logging.level.as_directive().parse()?)
        .from_env()?;

    let (file_layer, guard) = match &logging.file {
        Some(path) => {
            let log_dir = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let log_filename = path
                .file_name()
                .with_context(|| format!("Log path {} has no file name", path.display()))?;
            std::fs::create_dir_all(log_dir).context("Failed to create log directory")?;

            let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer().with_writer(non_blocking).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stderr_layer = file_layer
        .is_none()
        .then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .with(filter)
        .init();

    Ok(guard)
}
