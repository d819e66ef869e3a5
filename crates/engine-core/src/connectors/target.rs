use crate::error::StoreError;
use async_trait::async_trait;
use model::records::entity::{IndexId, SyncEntity};

/// The store entities are reconciled into.
#[async_trait]
pub trait TargetStore: Send + Sync {
    async fn read_by_unique_identifier(
        &self,
        unique_identifier: &str,
    ) -> Result<Option<SyncEntity>, StoreError>;

    async fn read_by_index_identifier(&self, id: IndexId)
    -> Result<Option<SyncEntity>, StoreError>;

    /// Creates the entity and returns the identifier the store assigned to it.
    async fn create(&self, entity: &SyncEntity) -> Result<IndexId, StoreError>;

    /// Overwrites the entity identified by `entity.index_identifier`.
    async fn update(&self, entity: &SyncEntity) -> Result<(), StoreError>;

    async fn delete(&self, id: IndexId) -> Result<(), StoreError>;

    /// Every identifier currently in the store, used to seed a tracking index.
    async fn read_all_identifiers(&self) -> Result<Vec<IndexId>, StoreError>;
}
