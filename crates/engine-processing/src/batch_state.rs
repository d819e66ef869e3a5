use engine_core::{error::StateStoreError, state::BatchStateStore};
use model::pagination::state::{BatchState, ResetReason, SourceDescriptor};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::{info, warn};

/// The batch state a run works on, and whether it continues earlier progress.
#[derive(Debug, Clone)]
pub struct ResumeDecision {
    pub state: BatchState,
    /// `None` when persisted progress was resumed.
    pub reset: Option<ResetReason>,
}

impl ResumeDecision {
    pub fn is_resumed(&self) -> bool {
        self.reset.is_none()
    }
}

/// Loads, validates and persists the pagination progress of one job.
pub struct BatchStateManager {
    key: String,
    store: Arc<dyn BatchStateStore>,
    force_restart: AtomicBool,
}

impl BatchStateManager {
    pub fn new(key: impl Into<String>, store: Arc<dyn BatchStateStore>) -> Self {
        Self {
            key: key.into(),
            store,
            force_restart: AtomicBool::new(false),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Makes the next [`read_current`](Self::read_current) ignore persisted progress.
    pub fn force_restart(&self) {
        self.force_restart.store(true, Ordering::SeqCst);
    }

    pub fn restart_pending(&self) -> bool {
        self.force_restart.load(Ordering::SeqCst)
    }

    /// Returns the state the next batch should be read with.
    ///
    /// Persisted progress is reused only when it is unfinished and was recorded for the same
    /// batch size, pagination mode, entity limit and source fingerprint.
    pub async fn read_current(
        &self,
        batch_size: usize,
        descriptor: &SourceDescriptor,
        max_entities: Option<usize>,
    ) -> Result<ResumeDecision, StateStoreError> {
        if self.force_restart.swap(false, Ordering::SeqCst) {
            // Drop the old record right away so an early failure cannot resurrect it.
            self.store.clear_batch_state(&self.key).await?;
            info!(job = %self.key, "Restart forced, discarding batch progress");
            return Ok(self.fresh(batch_size, descriptor, max_entities, ResetReason::ForcedRestart));
        }

        let Some(state) = self.store.load_batch_state(&self.key).await? else {
            info!(job = %self.key, "No batch state found, starting from the first batch");
            return Ok(self.fresh(batch_size, descriptor, max_entities, ResetReason::NoState));
        };

        match state.reset_reason(batch_size, descriptor, max_entities) {
            None => {
                info!(
                    job = %self.key,
                    batch = state.current_batch,
                    total = ?state.total_batches,
                    entities_read = state.entities_read,
                    "Resuming from batch state"
                );
                Ok(ResumeDecision { state, reset: None })
            }
            Some(ResetReason::PreviousRunComplete) => {
                info!(job = %self.key, "Previous run completed, starting a new one");
                Ok(self.fresh(
                    batch_size,
                    descriptor,
                    max_entities,
                    ResetReason::PreviousRunComplete,
                ))
            }
            Some(reason) => {
                warn!(
                    job = %self.key,
                    reason = %reason,
                    stored = %state.fingerprint,
                    current = %descriptor.fingerprint,
                    "Discarding stale batch progress"
                );
                Ok(self.fresh(batch_size, descriptor, max_entities, reason))
            }
        }
    }

    /// Persists progress after a batch was fully processed.
    pub async fn commit(&self, state: &BatchState) -> Result<(), StateStoreError> {
        self.store.save_batch_state(&self.key, state).await
    }

    pub async fn load(&self) -> Result<Option<BatchState>, StateStoreError> {
        self.store.load_batch_state(&self.key).await
    }

    fn fresh(
        &self,
        batch_size: usize,
        descriptor: &SourceDescriptor,
        max_entities: Option<usize>,
        reason: ResetReason,
    ) -> ResumeDecision {
        ResumeDecision {
            state: BatchState::fresh(batch_size, descriptor, max_entities),
            reset: Some(reason),
        }
    }
}
