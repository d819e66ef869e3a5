use crate::error::backend;
use async_trait::async_trait;
use engine_core::{connectors::target::TargetStore, error::StoreError};
use model::records::entity::{IndexId, SyncEntity};
use std::collections::{BTreeMap, HashSet};
use tokio::sync::Mutex;

/// Write calls received by a [`MemoryTargetStore`], failed ones included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
}

#[derive(Default)]
struct Inner {
    entities: BTreeMap<IndexId, SyncEntity>,
    next_id: IndexId,
    calls: CallCounts,
    failing_reads: HashSet<String>,
    failing_writes: HashSet<String>,
}

impl Inner {
    fn find(&self, unique_identifier: &str) -> Option<&SyncEntity> {
        self.entities
            .values()
            .find(|e| e.unique_identifier == unique_identifier)
    }

    fn assign_id(&mut self) -> IndexId {
        self.next_id += 1;
        self.next_id
    }
}

/// Target store held in memory, with write accounting and failure injection.
#[derive(Default)]
pub struct MemoryTargetStore {
    inner: Mutex<Inner>,
}

impl MemoryTargetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an entity without counting it as a create call.
    pub async fn insert(&self, mut entity: SyncEntity) -> IndexId {
        let mut inner = self.inner.lock().await;
        let id = inner.assign_id();
        entity.index_identifier = id;
        inner.entities.insert(id, entity);
        id
    }

    pub async fn get(&self, unique_identifier: &str) -> Option<SyncEntity> {
        self.inner.lock().await.find(unique_identifier).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entities.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn calls(&self) -> CallCounts {
        self.inner.lock().await.calls
    }

    pub async fn fail_reads_for(&self, unique_identifier: &str) {
        self.inner
            .lock()
            .await
            .failing_reads
            .insert(unique_identifier.to_string());
    }

    pub async fn fail_writes_for(&self, unique_identifier: &str) {
        self.inner
            .lock()
            .await
            .failing_writes
            .insert(unique_identifier.to_string());
    }

    pub async fn clear_failures(&self) {
        let mut inner = self.inner.lock().await;
        inner.failing_reads.clear();
        inner.failing_writes.clear();
    }
}

#[async_trait]
impl TargetStore for MemoryTargetStore {
    async fn read_by_unique_identifier(
        &self,
        unique_identifier: &str,
    ) -> Result<Option<SyncEntity>, StoreError> {
        let inner = self.inner.lock().await;
        if inner.failing_reads.contains(unique_identifier) {
            return Err(backend(format!("read of '{unique_identifier}' refused")));
        }
        Ok(inner.find(unique_identifier).cloned())
    }

    async fn read_by_index_identifier(
        &self,
        id: IndexId,
    ) -> Result<Option<SyncEntity>, StoreError> {
        Ok(self.inner.lock().await.entities.get(&id).cloned())
    }

    async fn create(&self, entity: &SyncEntity) -> Result<IndexId, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.calls.creates += 1;
        if inner.failing_writes.contains(&entity.unique_identifier) {
            return Err(backend(format!("create of '{}' refused", entity.unique_identifier)));
        }
        if inner.find(&entity.unique_identifier).is_some() {
            return Err(StoreError::Conflict(entity.unique_identifier.clone()));
        }

        let id = inner.assign_id();
        let mut stored = entity.clone();
        stored.index_identifier = id;
        inner.entities.insert(id, stored);
        Ok(id)
    }

    async fn update(&self, entity: &SyncEntity) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.calls.updates += 1;
        if inner.failing_writes.contains(&entity.unique_identifier) {
            return Err(backend(format!("update of '{}' refused", entity.unique_identifier)));
        }
        match inner.entities.get_mut(&entity.index_identifier) {
            Some(stored) => {
                *stored = entity.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(entity.index_identifier)),
        }
    }

    async fn delete(&self, id: IndexId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.calls.deletes += 1;
        let Some(stored) = inner.entities.get(&id) else {
            return Err(StoreError::NotFound(id));
        };
        if inner.failing_writes.contains(&stored.unique_identifier) {
            return Err(backend(format!("delete of '{}' refused", stored.unique_identifier)));
        }
        inner.entities.remove(&id);
        Ok(())
    }

    async fn read_all_identifiers(&self) -> Result<Vec<IndexId>, StoreError> {
        Ok(self.inner.lock().await.entities.keys().copied().collect())
    }
}
