//! Error types for settings persistence

use std::path::PathBuf;

/// Errors reported by the persistence layer.
///
/// None of these are fatal: the store keeps serving its in-memory record
/// whatever happens on disk. Field values outside their domain are never
/// reported here, they are replaced by the field default during parsing.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// No settings file yet (first run)
    #[error("Settings file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Settings file too large ({size} bytes, max {max}): {}", .path.display())]
    TooLarge { path: PathBuf, size: u64, max: u64 },

    /// Malformed JSON or a top level that is not a field/value mapping
    #[error("Invalid settings document {}: {reason}", .path.display())]
    InvalidDocument { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl SettingsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidDocument {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True when the file exists but its content was rejected
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::TooLarge { .. } | Self::InvalidDocument { .. })
    }
}
