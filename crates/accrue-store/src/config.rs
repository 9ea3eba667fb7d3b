//! Store configuration.
//!
//! Loaded from the `[store]` table of a TOML file. Every field has a default,
//! so an empty table opens an in-memory store with the usual pragmas.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Result, StoreError};

/// Accepted values for `PRAGMA synchronous`.
const SYNCHRONOUS_MODES: [&str; 4] = ["OFF", "NORMAL", "FULL", "EXTRA"];

/// SQLite store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file. Empty = in-memory database.
    #[serde(default)]
    pub path: String,
    /// Milliseconds to wait on a locked database.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u32,
    /// `PRAGMA synchronous`: "OFF" | "NORMAL" | "FULL" | "EXTRA".
    #[serde(default = "default_synchronous")]
    pub synchronous: String,
    /// Page cache size in KiB.
    #[serde(default = "default_cache_size_kib")]
    pub cache_size_kib: u32,
}

fn default_busy_timeout_ms() -> u32 {
    5000
}

fn default_synchronous() -> String {
    "NORMAL".to_string()
}

fn default_cache_size_kib() -> u32 {
    8000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            busy_timeout_ms: default_busy_timeout_ms(),
            synchronous: default_synchronous(),
            cache_size_kib: default_cache_size_kib(),
        }
    }
}

impl StoreConfig {
    /// Config for a database file at `path` with default pragmas.
    pub fn at(path: &Path) -> Self {
        Self {
            path: path.to_string_lossy().into_owned(),
            ..Self::default()
        }
    }

    /// Parse a standalone `StoreConfig` TOML document.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Config`] on malformed TOML or invalid values
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: StoreConfig =
            toml::from_str(content).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check field values before they are interpolated into pragmas.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Config`] if `synchronous` is not a known mode
    pub fn validate(&self) -> Result<()> {
        if !SYNCHRONOUS_MODES.contains(&self.synchronous.as_str()) {
            return Err(StoreError::Config(format!(
                "unknown synchronous mode {:?}",
                self.synchronous
            )));
        }
        Ok(())
    }

    /// Database path, or `None` for an in-memory store.
    pub fn db_path(&self) -> Option<PathBuf> {
        if self.path.is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert!(config.db_path().is_none());
        assert_eq!(config.busy_timeout_ms, 5000);
        assert_eq!(config.synchronous, "NORMAL");
        config.validate().expect("default is valid");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = StoreConfig::from_toml_str(r#"path = "/var/lib/accrue/ledger.db""#)
            .expect("parse");
        assert_eq!(
            config.db_path(),
            Some(PathBuf::from("/var/lib/accrue/ledger.db"))
        );
        assert_eq!(config.cache_size_kib, 8000);
    }

    #[test]
    fn test_unknown_synchronous_rejected() {
        let result = StoreConfig::from_toml_str(r#"synchronous = "SOMETIMES""#);
        assert!(matches!(result, Err(StoreError::Config(_))));
    }

    #[test]
    fn test_config_serialization() {
        let config = StoreConfig::at(Path::new("ledger.db"));
        let toml_str = toml::to_string(&config).expect("serialize");
        let parsed = StoreConfig::from_toml_str(&toml_str).expect("parse");
        assert_eq!(parsed, config);
    }
}
