//! Inspector configuration file.

use std::path::{Path, PathBuf};

use accrue_store::StoreConfig;
use serde::{Deserialize, Serialize};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "ACCRUE_CONFIG";

/// Complete inspector configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InspectConfig {
    /// Store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    /// Overridden by `RUST_LOG` when set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl InspectConfig {
    /// Load configuration from the file named by `ACCRUE_CONFIG`.
    ///
    /// Falls back to defaults if the variable is unset.
    pub fn load() -> anyhow::Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from `path`.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a TOML document and validate the store section.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: InspectConfig = toml::from_str(content)?;
        config.store.validate()?;
        Ok(config)
    }

    fn config_path() -> Option<PathBuf> {
        std::env::var_os(CONFIG_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }
}
