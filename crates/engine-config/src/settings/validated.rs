use model::policy::RunPolicy;
use std::path::PathBuf;

/// Immutable, validated configuration of one synchronization job.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSettings {
    pub job_id: String,
    pub source: PathBuf,
    pub target: PathBuf,
    pub state_dir: PathBuf,
    pub unique_column: String,
    pub version_column: Option<String>,
    pub delimiter: char,
    /// `None` runs the non-batched pass.
    pub batch_size: Option<usize>,
    pub max_entities: Option<usize>,
    pub policy: RunPolicy,
}

impl ValidatedSettings {
    pub fn is_batched(&self) -> bool {
        self.batch_size.is_some()
    }

    pub fn is_dry_run(&self) -> bool {
        self.policy.dry_run
    }
}
