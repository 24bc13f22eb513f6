//! Store configuration: where the settings file lives and how writes are paced

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// File name of the persisted settings document
pub const SETTINGS_FILE_NAME: &str = "user_settings.json";

/// Upper bound on the persisted document size (protects against hostile or corrupted files)
pub const MAX_DOCUMENT_SIZE: u64 = 10 * 1024;

/// Quiescence window before a debounced save hits the disk
pub const DEFAULT_SAVE_DELAY_MS: u64 = 500;

/// Options for a [`SettingsStore`](super::SettingsStore)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the JSON settings document
    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,

    /// Debounce window for persisting `set` calls, in milliseconds
    #[serde(default = "default_save_delay_ms")]
    pub save_delay_ms: u64,

    /// Documents larger than this many bytes are rejected on load
    #[serde(default = "default_max_document_size")]
    pub max_document_size: u64,
}

fn default_settings_path() -> PathBuf {
    StoreConfig::base_dir().join(SETTINGS_FILE_NAME)
}

fn default_save_delay_ms() -> u64 {
    DEFAULT_SAVE_DELAY_MS
}

fn default_max_document_size() -> u64 {
    MAX_DOCUMENT_SIZE
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            settings_path: default_settings_path(),
            save_delay_ms: default_save_delay_ms(),
            max_document_size: default_max_document_size(),
        }
    }
}

impl StoreConfig {
    /// Application base directory (<config dir>/whisperflow, or ./.whisperflow)
    pub fn base_dir() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("whisperflow"))
            .unwrap_or_else(|| PathBuf::from(".whisperflow"))
    }

    /// Default options with an explicit settings file
    pub fn at(path: impl AsRef<Path>) -> Self {
        Self {
            settings_path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn with_save_delay(mut self, delay: Duration) -> Self {
        self.save_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_max_document_size(mut self, bytes: u64) -> Self {
        self.max_document_size = bytes;
        self
    }

    pub fn save_delay(&self) -> Duration {
        Duration::from_millis(self.save_delay_ms)
    }
}
