//! Configuration loading for the LIBRIS TUI.
//!
//! Every field is optional. Without a config file the app runs against the
//! public catalog with the built-in windows and stores its data under the
//! platform data directory.

use libris_core::{
    AUTHOR_STALE_TIME, CATALOG_BASE_URL, DEFAULT_GC_TIME, DEFAULT_STALE_TIME, PERSIST_MAX_AGE,
    PERSIST_THROTTLE,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "LIBRIS_CONFIG";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LibrisConfig {
    pub catalog_base_url: String,
    pub request_timeout_ms: u64,
    pub tick_rate_ms: u64,
    pub store_path: PathBuf,
    pub log_path: PathBuf,
    pub log_json: bool,
    pub cache: CacheSettings,
    pub persist: PersistSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    pub stale_time_secs: u64,
    pub gc_time_secs: u64,
    pub author_stale_time_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PersistSettings {
    pub enabled: bool,
    pub max_age_secs: u64,
    pub throttle_ms: u64,
    /// Snapshots written under a different buster are dropped on restore.
    pub buster: String,
    pub max_size_mb: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl Default for LibrisConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            catalog_base_url: CATALOG_BASE_URL.to_string(),
            request_timeout_ms: 10_000,
            tick_rate_ms: 250,
            store_path: data_dir.join("cache"),
            log_path: data_dir.join("libris.log"),
            log_json: false,
            cache: CacheSettings::default(),
            persist: PersistSettings::default(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            stale_time_secs: DEFAULT_STALE_TIME.as_secs(),
            gc_time_secs: DEFAULT_GC_TIME.as_secs(),
            author_stale_time_secs: AUTHOR_STALE_TIME.as_secs(),
        }
    }
}

impl Default for PersistSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_age_secs: PERSIST_MAX_AGE.as_secs(),
            throttle_ms: PERSIST_THROTTLE.as_millis() as u64,
            buster: String::new(),
            max_size_mb: 64,
        }
    }
}

impl CacheSettings {
    pub fn stale_time(&self) -> Duration {
        Duration::from_secs(self.stale_time_secs)
    }

    pub fn gc_time(&self) -> Duration {
        Duration::from_secs(self.gc_time_secs)
    }

    pub fn author_stale_time(&self) -> Duration {
        Duration::from_secs(self.author_stale_time_secs)
    }
}

impl PersistSettings {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

impl LibrisConfig {
    /// Load from `--config <path>` or `LIBRIS_CONFIG`, falling back to the
    /// defaults when neither is given.
    pub fn load() -> Result<Self, ConfigError> {
        let config = match config_path_from_args().or_else(config_path_from_env) {
            Some(path) => Self::from_path(&path)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.catalog_base_url.trim();
        if base.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "catalog_base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "catalog_base_url",
                reason: "must be an http(s) URL".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.tick_rate_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tick_rate_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.store_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "store_path",
                reason: "must not be empty".to_string(),
            });
        }
        if self.log_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "log_path",
                reason: "must not be empty".to_string(),
            });
        }
        if self.persist.enabled && self.persist.max_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "persist.max_size_mb",
                reason: "must be > 0".to_string(),
            });
        }
        if self.persist.enabled && self.persist.max_age_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "persist.max_age_secs",
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }
}

fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("org", "libris", "libris")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".libris"))
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV).ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}
