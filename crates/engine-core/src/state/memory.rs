use crate::{
    error::StateStoreError,
    state::{BatchStateStore, TrackingIndexStore},
};
use async_trait::async_trait;
use model::{pagination::state::BatchState, tracking::TrackingIndex};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Process-local state store, for embedding and tests.
#[derive(Default)]
pub struct MemoryStateStore {
    batches: Mutex<HashMap<String, BatchState>>,
    indexes: Mutex<HashMap<String, TrackingIndex>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BatchStateStore for MemoryStateStore {
    async fn load_batch_state(&self, key: &str) -> Result<Option<BatchState>, StateStoreError> {
        Ok(self.batches.lock().await.get(key).cloned())
    }

    async fn save_batch_state(
        &self,
        key: &str,
        state: &BatchState,
    ) -> Result<(), StateStoreError> {
        self.batches
            .lock()
            .await
            .insert(key.to_string(), state.clone());
        Ok(())
    }

    async fn clear_batch_state(&self, key: &str) -> Result<(), StateStoreError> {
        self.batches.lock().await.remove(key);
        Ok(())
    }
}

#[async_trait]
impl TrackingIndexStore for MemoryStateStore {
    async fn load_tracking_index(
        &self,
        key: &str,
    ) -> Result<Option<TrackingIndex>, StateStoreError> {
        Ok(self.indexes.lock().await.get(key).cloned())
    }

    async fn save_tracking_index(
        &self,
        key: &str,
        index: &TrackingIndex,
    ) -> Result<(), StateStoreError> {
        self.indexes
            .lock()
            .await
            .insert(key.to_string(), index.clone());
        Ok(())
    }

    async fn clear_tracking_index(&self, key: &str) -> Result<(), StateStoreError> {
        self.indexes.lock().await.remove(key);
        Ok(())
    }
}
