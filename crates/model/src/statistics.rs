use serde::{Deserialize, Serialize};

/// Counters of one reconciliation run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessStatistics {
    pub incoming_total: u64,
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
    pub deleted: u64,
    /// Entities whose read or write failed and were left untouched.
    pub failed: u64,
}

impl ProcessStatistics {
    /// Content changes and no-ops; deletions are reported on their own.
    pub fn processed_total(&self) -> u64 {
        self.created + self.updated + self.skipped
    }

    pub fn has_changes(&self) -> bool {
        self.created + self.updated + self.deleted > 0
    }

    /// Rows for a two-column report table.
    pub fn rows(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("Incoming", self.incoming_total),
            ("Processed", self.processed_total()),
            ("Created", self.created),
            ("Updated", self.updated),
            ("Skipped", self.skipped),
            ("Deleted", self.deleted),
            ("Failed", self.failed),
        ]
    }
}
