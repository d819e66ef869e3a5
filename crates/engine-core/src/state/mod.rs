use crate::error::StateStoreError;
use async_trait::async_trait;
use model::{pagination::state::BatchState, tracking::TrackingIndex};

pub mod memory;
pub mod sled_store;

/// Persists pagination progress by job key.
#[async_trait]
pub trait BatchStateStore: Send + Sync {
    async fn load_batch_state(&self, key: &str) -> Result<Option<BatchState>, StateStoreError>;
    async fn save_batch_state(&self, key: &str, state: &BatchState)
    -> Result<(), StateStoreError>;
    async fn clear_batch_state(&self, key: &str) -> Result<(), StateStoreError>;
}

/// Persists the "seen this run" index of a destructive job by key.
#[async_trait]
pub trait TrackingIndexStore: Send + Sync {
    async fn load_tracking_index(&self, key: &str)
    -> Result<Option<TrackingIndex>, StateStoreError>;
    async fn save_tracking_index(
        &self,
        key: &str,
        index: &TrackingIndex,
    ) -> Result<(), StateStoreError>;
    async fn clear_tracking_index(&self, key: &str) -> Result<(), StateStoreError>;
}
