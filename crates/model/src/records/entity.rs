use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Identifier assigned by the target store. `0` means the entity does not exist there yet.
pub type IndexId = u64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntityError {
    #[error("Entity has an empty unique identifier")]
    EmptyUniqueIdentifier,

    #[error("Entity '{0}' has a unique identifier with surrounding whitespace")]
    UntrimmedUniqueIdentifier(String),
}

/// A unit of content exchanged between the external source and the target store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SyncEntity {
    /// Cross-system stable key (legacy URL, external id, ...).
    pub unique_identifier: String,
    /// Target-store-assigned identifier, `0` until created.
    #[serde(default)]
    pub index_identifier: IndexId,
    /// Opaque token compared for equality only.
    pub version: String,
    /// Content carried to the target store untouched.
    #[serde(default)]
    pub payload: Value,
}

impl SyncEntity {
    pub fn new(unique_identifier: impl Into<String>, version: impl Into<String>) -> Self {
        SyncEntity {
            unique_identifier: unique_identifier.into(),
            index_identifier: 0,
            version: version.into(),
            payload: Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_index_identifier(mut self, id: IndexId) -> Self {
        self.index_identifier = id;
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.index_identifier != 0
    }

    /// Checks the contract every source must honor before an entity is reconciled.
    pub fn validate(&self) -> Result<(), EntityError> {
        if self.unique_identifier.is_empty() {
            return Err(EntityError::EmptyUniqueIdentifier);
        }
        if self.unique_identifier.trim() != self.unique_identifier {
            return Err(EntityError::UntrimmedUniqueIdentifier(
                self.unique_identifier.clone(),
            ));
        }
        Ok(())
    }

    /// Versions are tokens: equal means unchanged, anything else means changed.
    pub fn differs_from(&self, other: &SyncEntity) -> bool {
        self.version != other.version
    }
}
