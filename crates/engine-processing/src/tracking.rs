use engine_core::{
    connectors::target::TargetStore,
    error::{ReconcileError, StateStoreError, WriteOperation},
    statistics::StatisticsRecorder,
    state::TrackingIndexStore,
};
use model::{policy::RunPolicy, records::entity::IndexId, tracking::TrackingIndex};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Loads and persists the tracking index of one destructive job.
pub struct TrackingManager {
    key: String,
    store: Option<Arc<dyn TrackingIndexStore>>,
}

impl TrackingManager {
    pub fn new(key: impl Into<String>, store: Option<Arc<dyn TrackingIndexStore>>) -> Self {
        Self {
            key: key.into(),
            store,
        }
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// Rebuilds the index from the full target on the first batch of a run, resumes the
    /// persisted one on any later batch.
    pub async fn prepare(
        &self,
        target: &dyn TargetStore,
        first_batch: bool,
    ) -> Result<TrackingIndex, ReconcileError> {
        if first_batch {
            let ids = target
                .read_all_identifiers()
                .await
                .map_err(ReconcileError::Target)?;
            let index = TrackingIndex::from_identifiers(ids);
            info!(job = %self.key, entries = index.len(), "Built tracking index from target");
            return Ok(index);
        }

        let store = self.require_store()?;
        let index = store
            .load_tracking_index(&self.key)
            .await?
            .ok_or_else(|| StateStoreError::MissingTrackingIndex {
                key: self.key.clone(),
            })?;
        debug!(
            job = %self.key,
            entries = index.len(),
            seen = index.seen_count(),
            "Resumed tracking index"
        );
        Ok(index)
    }

    pub async fn persist(&self, index: &TrackingIndex) -> Result<(), StateStoreError> {
        match &self.store {
            Some(store) => store.save_tracking_index(&self.key, index).await,
            None => Ok(()),
        }
    }

    /// Removes the persisted index so the next run starts from a fresh target read.
    pub async fn clear(&self) -> Result<(), StateStoreError> {
        match &self.store {
            Some(store) => store.clear_tracking_index(&self.key).await,
            None => Ok(()),
        }
    }

    fn require_store(&self) -> Result<&Arc<dyn TrackingIndexStore>, ReconcileError> {
        self.store.as_ref().ok_or_else(|| {
            ReconcileError::DependencyUnavailable(format!(
                "tracking index store for job '{}'",
                self.key
            ))
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub deleted: Vec<IndexId>,
    pub failed: Vec<IndexId>,
    /// Set when unresolved lookups made deletion unsafe.
    pub blocked: bool,
}

/// Deletes every target entity the completed stream never mentioned.
///
/// Must only be called once the whole stream is complete. Refuses to delete anything when some
/// target lookups failed during the run, since those entities would look absent.
pub async fn sweep_unseen(
    target: &dyn TargetStore,
    index: &TrackingIndex,
    policy: RunPolicy,
    statistics: &StatisticsRecorder,
) -> Result<SweepReport, ReconcileError> {
    let mut report = SweepReport::default();

    if index.has_unresolved() {
        error!(
            unresolved = index.unresolved().len(),
            first = ?index.unresolved().iter().next(),
            "Skipping destructive sweep, some target lookups failed during this run"
        );
        report.blocked = true;
        return Ok(report);
    }

    for id in index.unseen() {
        let label = format!("#{id}");
        let existing = match target.read_by_index_identifier(id).await {
            Ok(existing) => existing,
            Err(source) => {
                let err = ReconcileError::EntityReadFailure {
                    unique_identifier: label,
                    source,
                };
                handle_failure(err, policy, statistics)?;
                report.failed.push(id);
                continue;
            }
        };

        let Some(entity) = existing else {
            debug!(index_identifier = id, "Entity already gone, nothing to delete");
            continue;
        };

        if !policy.dry_run
            && let Err(source) = target.delete(id).await
        {
            let err = ReconcileError::EntityWriteFailure {
                unique_identifier: entity.unique_identifier.clone(),
                operation: WriteOperation::Delete,
                source,
            };
            handle_failure(err, policy, statistics)?;
            report.failed.push(id);
            continue;
        }

        info!(
            unique_identifier = %entity.unique_identifier,
            index_identifier = id,
            dry_run = policy.dry_run,
            "Deleted entity absent from source"
        );
        statistics.record_deleted();
        report.deleted.push(id);
    }

    Ok(report)
}

fn handle_failure(
    err: ReconcileError,
    policy: RunPolicy,
    statistics: &StatisticsRecorder,
) -> Result<(), ReconcileError> {
    if policy.stop_on_error {
        return Err(err);
    }
    warn!(error = %err, "Sweep failure recorded, continuing");
    statistics.record_failed();
    Ok(())
}
