use engine_core::{
    connectors::target::TargetStore,
    error::{ReconcileError, StoreError, WriteOperation},
    statistics::StatisticsRecorder,
};
use model::{
    policy::RunPolicy,
    records::entity::{IndexId, SyncEntity},
    tracking::TrackingIndex,
};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityOutcome {
    /// `index_identifier` is `0` in dry runs, nothing was assigned.
    Created { index_identifier: IndexId },
    Updated { index_identifier: IndexId },
    Skipped { index_identifier: IndexId },
}

/// Applies the create / update / skip decision to one incoming entity.
pub struct EntityReconciler {
    target: Arc<dyn TargetStore>,
    statistics: StatisticsRecorder,
    policy: RunPolicy,
}

impl EntityReconciler {
    pub fn new(
        target: Arc<dyn TargetStore>,
        statistics: StatisticsRecorder,
        policy: RunPolicy,
    ) -> Self {
        Self {
            target,
            statistics,
            policy,
        }
    }

    /// Reconciles `entity` against the target.
    ///
    /// Counters always reflect the intended action; writes are suppressed in dry runs. A target
    /// entity that exists is marked seen before any write is attempted, so a failed update never
    /// makes it look absent to the destructive sweep.
    pub async fn reconcile(
        &self,
        mut entity: SyncEntity,
        tracking: Option<&mut TrackingIndex>,
    ) -> Result<EntityOutcome, ReconcileError> {
        let existing = self
            .target
            .read_by_unique_identifier(&entity.unique_identifier)
            .await
            .map_err(|source| ReconcileError::EntityReadFailure {
                unique_identifier: entity.unique_identifier.clone(),
                source,
            })?;

        match existing {
            Some(stored) => {
                entity.index_identifier = stored.index_identifier;
                if let Some(index) = tracking {
                    index.mark_seen(stored.index_identifier);
                }

                if !self.policy.always_overwrite && !entity.differs_from(&stored) {
                    debug!(
                        unique_identifier = %entity.unique_identifier,
                        version = %entity.version,
                        "Entity unchanged, skipping"
                    );
                    self.statistics.record_skipped();
                    return Ok(EntityOutcome::Skipped {
                        index_identifier: entity.index_identifier,
                    });
                }

                if !self.policy.dry_run {
                    self.target
                        .update(&entity)
                        .await
                        .map_err(|source| write_failure(&entity, WriteOperation::Update, source))?;
                }
                debug!(
                    unique_identifier = %entity.unique_identifier,
                    index_identifier = entity.index_identifier,
                    from = %stored.version,
                    to = %entity.version,
                    dry_run = self.policy.dry_run,
                    "Entity updated"
                );
                self.statistics.record_updated();
                Ok(EntityOutcome::Updated {
                    index_identifier: entity.index_identifier,
                })
            }
            None => {
                if !self.policy.dry_run {
                    let id = self
                        .target
                        .create(&entity)
                        .await
                        .map_err(|source| write_failure(&entity, WriteOperation::Create, source))?;
                    entity.index_identifier = id;
                    if let Some(index) = tracking {
                        index.mark_seen(id);
                    }
                }
                debug!(
                    unique_identifier = %entity.unique_identifier,
                    index_identifier = entity.index_identifier,
                    dry_run = self.policy.dry_run,
                    "Entity created"
                );
                self.statistics.record_created();
                Ok(EntityOutcome::Created {
                    index_identifier: entity.index_identifier,
                })
            }
        }
    }
}

fn write_failure(
    entity: &SyncEntity,
    operation: WriteOperation,
    source: StoreError,
) -> ReconcileError {
    ReconcileError::EntityWriteFailure {
        unique_identifier: entity.unique_identifier.clone(),
        operation,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::memory::target::MemoryTargetStore;

    async fn seeded() -> Arc<MemoryTargetStore> {
        let store = Arc::new(MemoryTargetStore::new());
        store.insert(SyncEntity::new("/about", "v1")).await;
        store
    }

    fn build(
        target: Arc<MemoryTargetStore>,
        policy: RunPolicy,
    ) -> (EntityReconciler, StatisticsRecorder) {
        let stats = StatisticsRecorder::new();
        (EntityReconciler::new(target, stats.clone(), policy), stats)
    }

    #[tokio::test]
    async fn updates_when_version_changes() {
        let target = seeded().await;
        let (reconciler, stats) = build(target.clone(), RunPolicy::default());

        let outcome = reconciler
            .reconcile(SyncEntity::new("/about", "v2"), None)
            .await
            .unwrap();

        assert_eq!(outcome, EntityOutcome::Updated { index_identifier: 1 });
        assert_eq!(stats.snapshot().updated, 1);
        let stored = target.get("/about").await.unwrap();
        assert_eq!(stored.version, "v2");
        assert_eq!(stored.index_identifier, 1);
    }

    #[tokio::test]
    async fn skips_equal_versions_unless_overwriting() {
        let target = seeded().await;
        let (reconciler, stats) = build(target.clone(), RunPolicy::default());
        reconciler
            .reconcile(SyncEntity::new("/about", "v1"), None)
            .await
            .unwrap();
        assert_eq!(stats.snapshot().skipped, 1);
        assert_eq!(target.calls().await.updates, 0);

        let (overwriting, stats) =
            build(target.clone(), RunPolicy::default().with_always_overwrite(true));
        overwriting
            .reconcile(SyncEntity::new("/about", "v1"), None)
            .await
            .unwrap();
        assert_eq!(stats.snapshot().updated, 1);
        assert_eq!(target.calls().await.updates, 1);
    }

    #[tokio::test]
    async fn creates_and_tracks_new_entities() {
        let target = seeded().await;
        let (reconciler, stats) = build(target.clone(), RunPolicy::default());
        let mut index = TrackingIndex::from_identifiers([1]);

        let outcome = reconciler
            .reconcile(SyncEntity::new("/contact", "v1"), Some(&mut index))
            .await
            .unwrap();

        assert_eq!(outcome, EntityOutcome::Created { index_identifier: 2 });
        assert_eq!(stats.snapshot().created, 1);
        assert!(index.is_seen(2));
        assert_eq!(index.unseen(), vec![1]);
    }

    #[tokio::test]
    async fn dry_run_counts_without_writing() {
        let target = seeded().await;
        let (reconciler, stats) = build(target.clone(), RunPolicy::default().with_dry_run(true));

        reconciler
            .reconcile(SyncEntity::new("/about", "v2"), None)
            .await
            .unwrap();
        let created = reconciler
            .reconcile(SyncEntity::new("/new", "v1"), None)
            .await
            .unwrap();

        assert_eq!(created, EntityOutcome::Created { index_identifier: 0 });
        let snapshot = stats.snapshot();
        assert_eq!((snapshot.created, snapshot.updated), (1, 1));
        let calls = target.calls().await;
        assert_eq!((calls.creates, calls.updates, calls.deletes), (0, 0, 0));
        assert_eq!(target.get("/about").await.unwrap().version, "v1");
    }

    #[tokio::test]
    async fn failed_update_still_marks_entity_seen() {
        let target = seeded().await;
        target.fail_writes_for("/about").await;
        let (reconciler, stats) = build(target.clone(), RunPolicy::default());
        let mut index = TrackingIndex::from_identifiers([1]);

        let err = reconciler
            .reconcile(SyncEntity::new("/about", "v2"), Some(&mut index))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::EntityWriteFailure {
                operation: WriteOperation::Update,
                ..
            }
        ));
        assert!(index.is_seen(1));
        assert_eq!(stats.snapshot().updated, 0);
    }
}
