//! Log output for the TUI.
//!
//! The terminal belongs to the UI, so logs go to a file.

use crate::config::LibrisConfig;
use crate::error::TuiError;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV: &str = "LIBRIS_LOG";
const DEFAULT_DIRECTIVE: &str = "libris=info";

/// Filter from `LIBRIS_LOG`, or `libris=info` when unset or unparsable.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install the global subscriber, appending to `config.log_path`.
pub fn init_tracing(config: &LibrisConfig) -> Result<(), TuiError> {
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;

    let (json_layer, text_layer) = if config.log_json {
        let layer = fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(Mutex::new(file));
        (Some(layer), None)
    } else {
        let layer = fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(Mutex::new(file));
        (None, Some(layer))
    };

    tracing_subscriber::registry()
        .with(env_filter())
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| TuiError::Telemetry(e.to_string()))?;

    tracing::info!(
        log_path = %config.log_path.display(),
        json = config.log_json,
        "Telemetry initialized"
    );
    Ok(())
}
