use serde::{Deserialize, Serialize};

/// Behavior switches of a single run. Not persisted.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunPolicy {
    /// Run every decision and count every outcome, but never write to the target.
    pub dry_run: bool,
    /// Update existing entities even when versions match.
    pub always_overwrite: bool,
    /// Turn the first per-entity failure into an aborted run.
    pub stop_on_error: bool,
    /// Delete target entities that the completed stream never mentioned.
    pub delete_unprocessed: bool,
}

impl RunPolicy {
    pub fn with_dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    pub fn with_always_overwrite(mut self, enabled: bool) -> Self {
        self.always_overwrite = enabled;
        self
    }

    pub fn with_stop_on_error(mut self, enabled: bool) -> Self {
        self.stop_on_error = enabled;
        self
    }

    pub fn with_delete_unprocessed(mut self, enabled: bool) -> Self {
        self.delete_unprocessed = enabled;
        self
    }
}
