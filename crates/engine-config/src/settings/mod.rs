use crate::settings::error::SettingsError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod error;
pub mod validated;
pub mod validator;

/// Raw synchronization settings as read from a JSON file or the command line.
///
/// Every field is optional here; [`validator::SettingsValidator`] decides what is required.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSettings {
    pub job_id: Option<String>,
    /// CSV file to read entities from.
    pub source: Option<PathBuf>,
    /// Directory of the sled-backed target store.
    pub target: Option<PathBuf>,
    pub state_dir: Option<PathBuf>,
    pub unique_column: Option<String>,
    /// Column holding the entity version. A hash of the whole row is used when absent.
    pub version_column: Option<String>,
    pub delimiter: Option<char>,
    /// Absent means the whole stream is reconciled in one non-resumable pass.
    pub batch_size: Option<usize>,
    pub max_entities: Option<usize>,
    pub dry_run: bool,
    pub always_overwrite: bool,
    pub stop_on_error: bool,
    pub delete_unprocessed: bool,
}

impl SyncSettings {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded settings file");
        Ok(settings)
    }

    /// Layers `overrides` on top of `self`. Values set in `overrides` win; flags can only be
    /// switched on.
    pub fn merge(self, overrides: SyncSettings) -> Self {
        SyncSettings {
            job_id: overrides.job_id.or(self.job_id),
            source: overrides.source.or(self.source),
            target: overrides.target.or(self.target),
            state_dir: overrides.state_dir.or(self.state_dir),
            unique_column: overrides.unique_column.or(self.unique_column),
            version_column: overrides.version_column.or(self.version_column),
            delimiter: overrides.delimiter.or(self.delimiter),
            batch_size: overrides.batch_size.or(self.batch_size),
            max_entities: overrides.max_entities.or(self.max_entities),
            dry_run: self.dry_run || overrides.dry_run,
            always_overwrite: self.always_overwrite || overrides.always_overwrite,
            stop_on_error: self.stop_on_error || overrides.stop_on_error,
            delete_unprocessed: self.delete_unprocessed || overrides.delete_unprocessed,
        }
    }
}
