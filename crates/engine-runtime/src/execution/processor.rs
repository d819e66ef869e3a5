use crate::execution::job::SyncJob;
use engine_config::report::summary::RunResult;
use engine_core::error::{ReconcileError, RunAborted};
use model::{pagination::state::BatchState, policy::RunPolicy};
use tracing::info;

/// Run entrypoint of a [`SyncJob`].
///
/// Holds the policy switches and the one-shot restart flag. Every run works on a copy of the
/// policy taken when it starts.
pub struct SyncProcessor {
    job: SyncJob,
    policy: RunPolicy,
    restart_requested: bool,
}

impl SyncProcessor {
    pub fn new(job: SyncJob) -> Self {
        Self {
            job,
            policy: RunPolicy::default(),
            restart_requested: false,
        }
    }

    pub fn with_policy(mut self, policy: RunPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn job(&self) -> &SyncJob {
        &self.job
    }

    pub fn policy(&self) -> RunPolicy {
        self.policy
    }

    pub fn enable_dry_run(&mut self, enabled: bool) {
        self.policy.dry_run = enabled;
    }

    pub fn change_overwrite_status(&mut self, enabled: bool) {
        self.policy.always_overwrite = enabled;
    }

    pub fn change_stop_on_error(&mut self, enabled: bool) {
        self.policy.stop_on_error = enabled;
    }

    pub fn change_delete_status(&mut self, enabled: bool) {
        self.policy.delete_unprocessed = enabled;
    }

    /// The next batched run ignores persisted progress. Consumed by that run.
    pub fn force_restart(&mut self) {
        info!(job = %self.job.key(), "Restart requested");
        self.restart_requested = true;
    }

    pub fn restart_requested(&self) -> bool {
        self.restart_requested
    }

    /// Reconciles the whole stream in one pass.
    pub async fn process(&self, locator: &str) -> Result<RunResult, RunAborted> {
        self.job.run_full(locator, self.policy).await
    }

    /// Reconciles the next batch of the stream, resuming persisted progress when it still
    /// matches the source.
    pub async fn process_batch(
        &mut self,
        locator: &str,
        batch_size: usize,
        max_entities: Option<usize>,
    ) -> Result<RunResult, RunAborted> {
        let policy = self.policy;
        let Some(batches) = self.job.batch_manager(policy) else {
            return Err(self.job.reject(policy, missing_batch_store(&self.job)));
        };

        if self.restart_requested {
            batches.force_restart();
        }
        let result = self
            .job
            .run_batch(locator, policy, &batches, batch_size, max_entities)
            .await;
        self.restart_requested = batches.restart_pending();
        result
    }

    /// Persisted progress of the job under the current policy.
    pub async fn progress(&self) -> Result<Option<BatchState>, ReconcileError> {
        let batches = self
            .job
            .batch_manager(self.policy)
            .ok_or_else(|| missing_batch_store(&self.job))?;
        Ok(batches.load().await?)
    }

    /// Discards the persisted progress and tracking index of the job, for live and dry runs.
    pub async fn reset(&mut self) -> Result<(), ReconcileError> {
        self.job.clear_state().await?;
        self.restart_requested = false;
        info!(job = %self.job.key(), "Persisted synchronization state cleared");
        Ok(())
    }
}

fn missing_batch_store(job: &SyncJob) -> ReconcileError {
    ReconcileError::DependencyUnavailable(format!("batch state store for job '{}'", job.key()))
}
