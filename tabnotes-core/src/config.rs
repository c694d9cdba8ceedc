use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Debounce window between the last edit and the autosave write.
pub const DEFAULT_QUIESCENCE_MS: u64 = 1000;

/// Advisory storage ceiling used for usage warnings (10 MiB).
pub const STORAGE_CAPACITY_BYTES: u64 = 10 * 1024 * 1024;

pub const STORAGE_WARNING_PERCENT: f64 = 80.0;

pub const DEFAULT_STORAGE_URI: &str = "memory://tabnotes";
pub const DEFAULT_STORAGE_PATH: &str = "storage.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub uri: String,
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_STORAGE_URI.to_string(),
            path: DEFAULT_STORAGE_PATH.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub autosave_quiescence_ms: u64,
    pub storage_capacity_bytes: u64,
    pub storage_warning_percent: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            autosave_quiescence_ms: DEFAULT_QUIESCENCE_MS,
            storage_capacity_bytes: STORAGE_CAPACITY_BYTES,
            storage_warning_percent: STORAGE_WARNING_PERCENT,
        }
    }
}

impl Config {
    /// Parses a JSON config document. Missing fields fall back to defaults.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let config: Config = serde_json::from_slice(bytes)?;
        config.validate()?;
        Ok(config)
    }

    pub fn quiescence(&self) -> Duration {
        Duration::from_millis(self.autosave_quiescence_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.autosave_quiescence_ms == 0 {
            return Err(Error::Validation(
                "autosave_quiescence_ms must be positive".to_string(),
            ));
        }
        if self.storage_capacity_bytes == 0 {
            return Err(Error::Validation(
                "storage_capacity_bytes must be positive".to_string(),
            ));
        }
        if !(self.storage_warning_percent > 0.0 && self.storage_warning_percent <= 100.0) {
            return Err(Error::Validation(format!(
                "storage_warning_percent out of range: {}",
                self.storage_warning_percent
            )));
        }
        if self.storage.path.trim().is_empty() {
            return Err(Error::Validation("storage.path is empty".to_string()));
        }
        Ok(())
    }
}
