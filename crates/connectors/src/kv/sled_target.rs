use crate::error::{backend, serialization};
use async_trait::async_trait;
use engine_core::{connectors::target::TargetStore, error::StoreError};
use model::records::entity::{IndexId, SyncEntity};
use sled::{
    Transactional,
    transaction::{ConflictableTransactionError, TransactionError},
};
use std::path::Path;

/// Target store persisted in a sled database.
///
/// Entities live in the `entities` tree keyed by big-endian index id and are JSON encoded; the
/// `by_uid` tree maps unique identifiers to index ids.
pub struct SledTargetStore {
    db: sled::Db,
    entities: sled::Tree,
    by_uid: sled::Tree,
}

impl SledTargetStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        let entities = db.open_tree("entities")?;
        let by_uid = db.open_tree("by_uid")?;
        Ok(Self {
            db,
            entities,
            by_uid,
        })
    }

    pub async fn flush(&self) -> Result<(), StoreError> {
        self.db.flush_async().await.map_err(backend)?;
        Ok(())
    }

    fn decode(bytes: &[u8]) -> Result<SyncEntity, StoreError> {
        serde_json::from_slice(bytes).map_err(serialization)
    }

    fn id_from(bytes: &[u8]) -> Result<IndexId, StoreError> {
        let raw: [u8; 8] = bytes
            .try_into()
            .map_err(|_| serialization(format!("bad index key of {} bytes", bytes.len())))?;
        Ok(IndexId::from_be_bytes(raw))
    }
}

fn abort_reason(err: TransactionError<StoreError>) -> StoreError {
    match err {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => backend(e),
    }
}

#[async_trait]
impl TargetStore for SledTargetStore {
    async fn read_by_unique_identifier(
        &self,
        unique_identifier: &str,
    ) -> Result<Option<SyncEntity>, StoreError> {
        let Some(id) = self
            .by_uid
            .get(unique_identifier.as_bytes())
            .map_err(backend)?
        else {
            return Ok(None);
        };
        self.read_by_index_identifier(Self::id_from(&id)?).await
    }

    async fn read_by_index_identifier(
        &self,
        id: IndexId,
    ) -> Result<Option<SyncEntity>, StoreError> {
        match self.entities.get(id.to_be_bytes()).map_err(backend)? {
            Some(bytes) => Self::decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    async fn create(&self, entity: &SyncEntity) -> Result<IndexId, StoreError> {
        let id = self.db.generate_id().map_err(backend)? + 1;
        let mut stored = entity.clone();
        stored.index_identifier = id;
        let bytes = serde_json::to_vec(&stored).map_err(serialization)?;
        let uid = entity.unique_identifier.as_bytes();

        (&self.entities, &self.by_uid)
            .transaction(|(entities, by_uid)| {
                if by_uid.get(uid)?.is_some() {
                    return Err(ConflictableTransactionError::Abort(StoreError::Conflict(
                        entity.unique_identifier.clone(),
                    )));
                }
                entities.insert(id.to_be_bytes().to_vec(), bytes.clone())?;
                by_uid.insert(uid, id.to_be_bytes().to_vec())?;
                Ok(())
            })
            .map_err(abort_reason)?;

        Ok(id)
    }

    async fn update(&self, entity: &SyncEntity) -> Result<(), StoreError> {
        let id = entity.index_identifier;
        if self.read_by_index_identifier(id).await?.is_none() {
            return Err(StoreError::NotFound(id));
        }
        let bytes = serde_json::to_vec(entity).map_err(serialization)?;
        self.entities
            .insert(id.to_be_bytes(), bytes)
            .map_err(backend)?;
        Ok(())
    }

    async fn delete(&self, id: IndexId) -> Result<(), StoreError> {
        let Some(stored) = self.read_by_index_identifier(id).await? else {
            return Err(StoreError::NotFound(id));
        };
        let uid = stored.unique_identifier.as_bytes();

        (&self.entities, &self.by_uid)
            .transaction(|(entities, by_uid)| {
                entities.remove(id.to_be_bytes().to_vec())?;
                by_uid.remove(uid)?;
                Ok::<(), ConflictableTransactionError<StoreError>>(())
            })
            .map_err(abort_reason)?;
        Ok(())
    }

    async fn read_all_identifiers(&self) -> Result<Vec<IndexId>, StoreError> {
        self.entities
            .iter()
            .keys()
            .map(|key| Self::id_from(&key.map_err(backend)?))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn creates_reads_updates_and_deletes() {
        let dir = tempdir().unwrap();
        let store = SledTargetStore::open(dir.path()).unwrap();

        let entity = SyncEntity::new("/about", "v1").with_payload(json!({ "title": "About" }));
        let id = store.create(&entity).await.unwrap();
        assert_ne!(id, 0);

        let stored = store.read_by_unique_identifier("/about").await.unwrap().unwrap();
        assert_eq!(stored.index_identifier, id);
        assert_eq!(stored.payload["title"], "About");

        store
            .update(&SyncEntity::new("/about", "v2").with_index_identifier(id))
            .await
            .unwrap();
        assert_eq!(
            store.read_by_index_identifier(id).await.unwrap().unwrap().version,
            "v2"
        );
        assert_eq!(store.read_all_identifiers().await.unwrap(), vec![id]);

        store.delete(id).await.unwrap();
        assert!(store.read_by_unique_identifier("/about").await.unwrap().is_none());
        assert!(store.read_all_identifiers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_duplicate_unique_identifiers() {
        let dir = tempdir().unwrap();
        let store = SledTargetStore::open(dir.path()).unwrap();

        store.create(&SyncEntity::new("/a", "v1")).await.unwrap();
        let err = store.create(&SyncEntity::new("/a", "v1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(uid) if uid == "/a"));

        let err = store
            .update(&SyncEntity::new("/b", "v1").with_index_identifier(99))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(99)));
    }
}
