use crate::error::{SourceError, TransformError};
use async_trait::async_trait;
use model::{
    pagination::{cursor::PageRequest, state::SourceDescriptor},
    records::{
        batch::{RawRecord, SourcePage},
        entity::SyncEntity,
    },
};

/// Where raw entities come from.
#[async_trait]
pub trait ExternalSource: Send + Sync {
    /// Reports pagination model, length and fingerprint without reading entities.
    async fn describe(&self, locator: &str) -> Result<SourceDescriptor, SourceError>;

    async fn read_batch(
        &self,
        locator: &str,
        request: &PageRequest,
    ) -> Result<SourcePage, SourceError>;
}

/// Turns raw records into entities. Must be pure: same input, same output.
pub trait EntityTransform: Send + Sync {
    fn transform(&self, records: Vec<RawRecord>) -> Result<Vec<SyncEntity>, TransformError>;
}

impl<F> EntityTransform for F
where
    F: Fn(Vec<RawRecord>) -> Result<Vec<SyncEntity>, TransformError> + Send + Sync,
{
    fn transform(&self, records: Vec<RawRecord>) -> Result<Vec<SyncEntity>, TransformError> {
        self(records)
    }
}

/// Reads records that already have the shape of a [`SyncEntity`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeTransform;

impl EntityTransform for SerdeTransform {
    fn transform(&self, records: Vec<RawRecord>) -> Result<Vec<SyncEntity>, TransformError> {
        records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                serde_json::from_value(record).map_err(|e| TransformError::InvalidRecord {
                    index,
                    message: e.to_string(),
                })
            })
            .collect()
    }
}
