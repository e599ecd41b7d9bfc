//! Error types for the TUI.

use crate::config::ConfigError;
use libris_core::LibrisError;

#[derive(Debug, thiserror::Error)]
pub enum TuiError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Core(#[from] LibrisError),
    #[error("HTTP client setup failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to initialize logging: {0}")]
    Telemetry(String),
}
