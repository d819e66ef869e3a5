use model::{records::entity::IndexId, statistics::ProcessStatistics};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Source not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read source '{locator}': {message}")]
    Read { locator: String, message: String },

    #[error("Unsupported page request for {mode} source: {request}")]
    UnsupportedRequest { mode: String, request: String },

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Entity {0} not found")]
    NotFound(IndexId),

    #[error("Entity '{0}' already exists")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum StateStoreError {
    #[error("Failed to load state '{key}': {message}")]
    Load { key: String, message: String },

    #[error("Failed to save state '{key}': {message}")]
    Save { key: String, message: String },

    #[error("Failed to clear state '{key}': {message}")]
    Clear { key: String, message: String },

    #[error("Tracking index '{key}' is missing for a run that is already past its first batch")]
    MissingTrackingIndex { key: String },
}

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Record {index} is missing field '{field}'")]
    MissingField { index: usize, field: String },

    #[error("Record {index} is invalid: {message}")]
    InvalidRecord { index: usize, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOperation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for WriteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteOperation::Create => f.write_str("create"),
            WriteOperation::Update => f.write_str("update"),
            WriteOperation::Delete => f.write_str("delete"),
        }
    }
}

/// Failures raised while reconciling a stream against the target store.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Invalid source stream: {0}")]
    StreamInvalid(String),

    #[error("Failed to read target entity '{unique_identifier}': {source}")]
    EntityReadFailure {
        unique_identifier: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to {operation} target entity '{unique_identifier}': {source}")]
    EntityWriteFailure {
        unique_identifier: String,
        operation: WriteOperation,
        #[source]
        source: StoreError,
    },

    #[error("Target store error: {0}")]
    Target(#[source] StoreError),

    #[error("Required dependency unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("State store error: {0}")]
    State(#[from] StateStoreError),
}

impl ReconcileError {
    /// Per-entity failures may be recovered locally; everything else ends the run.
    pub fn is_entity_level(&self) -> bool {
        matches!(
            self,
            ReconcileError::EntityReadFailure { .. } | ReconcileError::EntityWriteFailure { .. }
        )
    }
}

impl From<TransformError> for ReconcileError {
    fn from(err: TransformError) -> Self {
        ReconcileError::StreamInvalid(err.to_string())
    }
}

/// A run that stopped early. Statistics gathered before the failure are kept for inspection.
#[derive(Error, Debug)]
#[error("Synchronization '{job}' aborted: {source}")]
pub struct RunAborted {
    pub job: String,
    pub statistics: ProcessStatistics,
    #[source]
    pub source: ReconcileError,
}

impl RunAborted {
    pub fn new(
        job: impl Into<String>,
        statistics: ProcessStatistics,
        source: ReconcileError,
    ) -> Self {
        RunAborted {
            job: job.into(),
            statistics,
            source,
        }
    }

    pub fn cause(&self) -> &ReconcileError {
        &self.source
    }
}
