use std::fs::OpenOptions;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::constants::{LOG_FILE_ENV, LOG_FILTER_ENV};

pub fn init_tracing() -> Result<()> {
    init_tracing_with_default("warn")
}

/// Install the global subscriber.
///
/// Stderr output is filtered by `CHIME_LOG` (falling back to
/// `default_filter`). Setting `CHIME_LOG_FILE` adds a debug-level file layer.
pub fn init_tracing_with_default(default_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter);

    let registry = tracing_subscriber::registry().with(stderr_layer);

    if let Ok(log_path) = std::env::var(LOG_FILE_ENV) {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open log file: {}", log_path))?;

        let file_layer = fmt::layer()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_filter(tracing_subscriber::filter::LevelFilter::DEBUG);

        registry
            .with(file_layer)
            .try_init()
            .context("Tracing subscriber already installed")?;
    } else {
        registry
            .try_init()
            .context("Tracing subscriber already installed")?;
    }
    Ok(())
}
