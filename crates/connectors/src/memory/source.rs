use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engine_core::{connectors::source::ExternalSource, error::SourceError};
use model::{
    pagination::{
        cursor::{PageRequest, PaginationMode},
        state::{SourceDescriptor, SourceFingerprint},
    },
    records::batch::{RawRecord, SourcePage},
};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Source backed by a vector of records, paginated either by count or by cursor tokens.
///
/// Cursor tokens are the stringified position of the next record.
pub struct MemorySource {
    uri: String,
    mode: PaginationMode,
    records: Mutex<Vec<RawRecord>>,
    modified: Mutex<Option<DateTime<Utc>>>,
    reads: AtomicUsize,
}

impl MemorySource {
    pub fn counted(uri: impl Into<String>, records: Vec<RawRecord>) -> Self {
        Self::new(uri, PaginationMode::Counted, records)
    }

    pub fn cursor(uri: impl Into<String>, records: Vec<RawRecord>) -> Self {
        Self::new(uri, PaginationMode::Cursor, records)
    }

    fn new(uri: impl Into<String>, mode: PaginationMode, records: Vec<RawRecord>) -> Self {
        MemorySource {
            uri: uri.into(),
            mode,
            records: Mutex::new(records),
            modified: Mutex::new(None),
            reads: AtomicUsize::new(0),
        }
    }

    /// Replaces the content, changing the fingerprint.
    pub async fn replace(&self, records: Vec<RawRecord>) {
        *self.records.lock().await = records;
        *self.modified.lock().await = Some(Utc::now());
    }

    /// Number of `read_batch` calls served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn check_locator(&self, locator: &str) -> Result<(), SourceError> {
        if locator != self.uri {
            return Err(SourceError::NotFound(locator.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ExternalSource for MemorySource {
    async fn describe(&self, locator: &str) -> Result<SourceDescriptor, SourceError> {
        self.check_locator(locator)?;
        let length = self.records.lock().await.len();

        let mut fingerprint = SourceFingerprint::new(&self.uri);
        if let Some(at) = *self.modified.lock().await {
            fingerprint = fingerprint.with_last_modified(at);
        }
        let length = match self.mode {
            PaginationMode::Counted => {
                fingerprint = fingerprint.with_length(length as u64);
                Some(length)
            }
            PaginationMode::Cursor => None,
        };

        Ok(SourceDescriptor {
            fingerprint,
            mode: self.mode,
            length,
        })
    }

    async fn read_batch(
        &self,
        locator: &str,
        request: &PageRequest,
    ) -> Result<SourcePage, SourceError> {
        self.check_locator(locator)?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        let records = self.records.lock().await;

        match (self.mode, request) {
            (_, PageRequest::All) => Ok(SourcePage {
                records: records.clone(),
                next_offset: None,
                is_complete: true,
            }),
            (PaginationMode::Counted, PageRequest::Offset { start, limit }) => {
                let start = (*start).min(records.len());
                let end = (start + limit).min(records.len());
                Ok(SourcePage {
                    records: records[start..end].to_vec(),
                    next_offset: None,
                    is_complete: end >= records.len(),
                })
            }
            (PaginationMode::Cursor, PageRequest::Cursor { token, limit }) => {
                let start = match token {
                    None => 0,
                    Some(token) => token
                        .parse::<usize>()
                        .map_err(|_| SourceError::InvalidCursor(token.clone()))?,
                };
                let start = start.min(records.len());
                let end = (start + limit).min(records.len());
                let is_complete = end >= records.len();
                Ok(SourcePage {
                    records: records[start..end].to_vec(),
                    next_offset: (!is_complete).then(|| end.to_string()),
                    is_complete,
                })
            }
            (mode, request) => Err(SourceError::UnsupportedRequest {
                mode: mode.to_string(),
                request: request.to_string(),
            }),
        }
    }
}
