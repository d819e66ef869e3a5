use std::path::PathBuf;
use thiserror::Error;

/// Errors raised when loading or validating synchronization settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid JSON for `SyncSettings`.
    #[error("Failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid settings: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),
}
