use crate::{
    error::StateStoreError,
    state::{BatchStateStore, TrackingIndexStore},
};
use async_trait::async_trait;
use model::{pagination::state::BatchState, tracking::TrackingIndex};
use serde::{Serialize, de::DeserializeOwned};
use std::path::Path;

/// Both state records of every job in one sled database.
pub struct SledStateStore {
    db: sled::Db,
}

impl SledStateStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    #[inline]
    fn batch_key(key: &str) -> String {
        format!("batch:{key}")
    }

    #[inline]
    fn tracking_key(key: &str) -> String {
        format!("tracking:{key}")
    }

    fn load<T: DeserializeOwned>(
        &self,
        db_key: &str,
        key: &str,
    ) -> Result<Option<T>, StateStoreError> {
        let load_err = |message: String| StateStoreError::Load {
            key: key.to_string(),
            message,
        };

        match self.db.get(db_key).map_err(|e| load_err(e.to_string()))? {
            Some(bytes) => bincode::deserialize(&bytes)
                .map(Some)
                .map_err(|e| load_err(e.to_string())),
            None => Ok(None),
        }
    }

    async fn save<T: Serialize + Sync>(
        &self,
        db_key: &str,
        key: &str,
        value: &T,
    ) -> Result<(), StateStoreError> {
        let save_err = |message: String| StateStoreError::Save {
            key: key.to_string(),
            message,
        };

        let bytes = bincode::serialize(value).map_err(|e| save_err(e.to_string()))?;
        self.db
            .insert(db_key, bytes)
            .map_err(|e| save_err(e.to_string()))?;
        // State must survive the process; the next invocation resumes from it.
        self.db
            .flush_async()
            .await
            .map_err(|e| save_err(e.to_string()))?;
        Ok(())
    }

    async fn clear(&self, db_key: &str, key: &str) -> Result<(), StateStoreError> {
        let clear_err = |message: String| StateStoreError::Clear {
            key: key.to_string(),
            message,
        };

        self.db.remove(db_key).map_err(|e| clear_err(e.to_string()))?;
        self.db
            .flush_async()
            .await
            .map_err(|e| clear_err(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl BatchStateStore for SledStateStore {
    async fn load_batch_state(&self, key: &str) -> Result<Option<BatchState>, StateStoreError> {
        self.load(&Self::batch_key(key), key)
    }

    async fn save_batch_state(
        &self,
        key: &str,
        state: &BatchState,
    ) -> Result<(), StateStoreError> {
        self.save(&Self::batch_key(key), key, state).await
    }

    async fn clear_batch_state(&self, key: &str) -> Result<(), StateStoreError> {
        self.clear(&Self::batch_key(key), key).await
    }
}

#[async_trait]
impl TrackingIndexStore for SledStateStore {
    async fn load_tracking_index(
        &self,
        key: &str,
    ) -> Result<Option<TrackingIndex>, StateStoreError> {
        self.load(&Self::tracking_key(key), key)
    }

    async fn save_tracking_index(
        &self,
        key: &str,
        index: &TrackingIndex,
    ) -> Result<(), StateStoreError> {
        self.save(&Self::tracking_key(key), key, index).await
    }

    async fn clear_tracking_index(&self, key: &str) -> Result<(), StateStoreError> {
        self.clear(&Self::tracking_key(key), key).await
    }
}
