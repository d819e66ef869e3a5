use crate::{
    pagination::cursor::{PageRequest, PaginationMode},
    records::batch::SourcePage,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt};

/// Cheap summary of a source used to notice that it changed shape between runs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SourceFingerprint {
    pub uri: String,
    pub length: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl SourceFingerprint {
    pub fn new(uri: impl Into<String>) -> Self {
        SourceFingerprint {
            uri: uri.into(),
            length: None,
            last_modified: None,
        }
    }

    pub fn with_length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_last_modified(mut self, at: DateTime<Utc>) -> Self {
        self.last_modified = Some(at);
        self
    }
}

impl fmt::Display for SourceFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri)?;
        if let Some(length) = self.length {
            write!(f, " len={length}")?;
        }
        if let Some(at) = self.last_modified {
            write!(f, " modified={}", at.to_rfc3339())?;
        }
        Ok(())
    }
}

/// Metadata a source reports before any entity is read.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDescriptor {
    pub fingerprint: SourceFingerprint,
    pub mode: PaginationMode,
    /// Number of raw records. Required for counted pagination.
    pub length: Option<usize>,
}

/// Why persisted progress was thrown away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetReason {
    NoState,
    ForcedRestart,
    PreviousRunComplete,
    BatchSizeChanged { stored: usize, requested: usize },
    FingerprintChanged,
    ModeChanged,
    LimitChanged,
}

impl fmt::Display for ResetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetReason::NoState => f.write_str("no persisted state"),
            ResetReason::ForcedRestart => f.write_str("restart forced"),
            ResetReason::PreviousRunComplete => f.write_str("previous run completed"),
            ResetReason::BatchSizeChanged { stored, requested } => {
                write!(f, "batch size changed from {stored} to {requested}")
            }
            ResetReason::FingerprintChanged => f.write_str("source fingerprint changed"),
            ResetReason::ModeChanged => f.write_str("pagination mode changed"),
            ResetReason::LimitChanged => f.write_str("entity limit changed"),
        }
    }
}

/// Pagination progress of one synchronization job.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BatchState {
    pub batch_size: usize,
    pub mode: PaginationMode,
    /// 1-based batch number; `0` once a counted stream has moved past its last batch.
    pub current_batch: usize,
    pub total_batches: Option<usize>,
    pub processed_batches: BTreeSet<usize>,
    pub next_offset: Option<String>,
    pub is_complete: bool,
    pub fingerprint: SourceFingerprint,
    /// Logical stream length (source length capped by `max_entities`), counted mode only.
    pub stream_length: Option<usize>,
    pub max_entities: Option<usize>,
    pub entities_read: u64,
    pub updated_at: DateTime<Utc>,
}

impl BatchState {
    /// Starts a new walk over the source described by `descriptor`.
    pub fn fresh(
        batch_size: usize,
        descriptor: &SourceDescriptor,
        max_entities: Option<usize>,
    ) -> Self {
        let batch_size = batch_size.max(1);
        let (stream_length, total_batches) = match descriptor.mode {
            PaginationMode::Counted => {
                let length = descriptor.length.unwrap_or(0);
                let length = max_entities.map_or(length, |max| length.min(max));
                (Some(length), Some(length.div_ceil(batch_size).max(1)))
            }
            PaginationMode::Cursor => (None, None),
        };

        BatchState {
            batch_size,
            mode: descriptor.mode,
            current_batch: 1,
            total_batches,
            processed_batches: BTreeSet::new(),
            next_offset: None,
            is_complete: false,
            fingerprint: descriptor.fingerprint.clone(),
            stream_length,
            max_entities,
            entities_read: 0,
            updated_at: Utc::now(),
        }
    }

    /// Returns the reason this state cannot be resumed, or `None` if it can.
    pub fn reset_reason(
        &self,
        batch_size: usize,
        descriptor: &SourceDescriptor,
        max_entities: Option<usize>,
    ) -> Option<ResetReason> {
        if self.is_complete {
            Some(ResetReason::PreviousRunComplete)
        } else if self.batch_size != batch_size.max(1) {
            Some(ResetReason::BatchSizeChanged {
                stored: self.batch_size,
                requested: batch_size,
            })
        } else if self.mode != descriptor.mode {
            Some(ResetReason::ModeChanged)
        } else if self.fingerprint != descriptor.fingerprint {
            Some(ResetReason::FingerprintChanged)
        } else if self.max_entities != max_entities {
            Some(ResetReason::LimitChanged)
        } else {
            None
        }
    }

    /// True while nothing of the current walk has been processed yet.
    pub fn is_first_batch(&self) -> bool {
        self.processed_batches.is_empty() && self.entities_read == 0
    }

    pub fn start_index(&self) -> usize {
        self.current_batch.saturating_sub(1) * self.batch_size
    }

    /// End of the current batch, bounded by the stream length recorded when the walk started.
    pub fn end_index(&self) -> usize {
        let end = self.start_index() + self.batch_size;
        self.stream_length.map_or(end, |length| end.min(length))
    }

    /// Number of records the current batch is expected to hold (counted mode).
    pub fn expected_len(&self) -> Option<usize> {
        match self.mode {
            PaginationMode::Counted => Some(self.end_index().saturating_sub(self.start_index())),
            PaginationMode::Cursor => None,
        }
    }

    pub fn page_request(&self) -> PageRequest {
        match self.mode {
            PaginationMode::Counted => PageRequest::Offset {
                start: self.start_index(),
                limit: self.end_index().saturating_sub(self.start_index()),
            },
            PaginationMode::Cursor => {
                let remaining = self
                    .max_entities
                    .map(|max| max.saturating_sub(self.entities_read as usize));
                PageRequest::Cursor {
                    token: self.next_offset.clone(),
                    limit: remaining.map_or(self.batch_size, |r| r.min(self.batch_size)),
                }
            }
        }
    }

    /// Records the current batch as processed and moves to the next one.
    pub fn advance(&mut self, page: &SourcePage) {
        self.processed_batches.insert(self.current_batch);
        self.entities_read += page.len() as u64;
        self.updated_at = Utc::now();

        match self.mode {
            PaginationMode::Counted => {
                let total = self.total_batches.unwrap_or(1);
                if self.current_batch >= total {
                    self.current_batch = 0;
                    self.is_complete = true;
                } else {
                    self.current_batch += 1;
                }
            }
            PaginationMode::Cursor => {
                let limit_reached = self
                    .max_entities
                    .is_some_and(|max| self.entities_read >= max as u64);
                self.next_offset = page.next_offset.clone();
                self.is_complete = page.is_complete || limit_reached;
                self.current_batch += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn counted(length: usize) -> SourceDescriptor {
        SourceDescriptor {
            fingerprint: SourceFingerprint::new("file:///posts.csv").with_length(length as u64),
            mode: PaginationMode::Counted,
            length: Some(length),
        }
    }

    fn page(n: usize) -> SourcePage {
        SourcePage::new((0..n).map(|i| json!({ "id": i })).collect())
    }

    #[test]
    fn counts_batches_with_minimum_of_one() {
        assert_eq!(BatchState::fresh(10, &counted(25), None).total_batches, Some(3));
        assert_eq!(BatchState::fresh(10, &counted(30), None).total_batches, Some(3));
        assert_eq!(BatchState::fresh(10, &counted(0), None).total_batches, Some(1));
        assert_eq!(BatchState::fresh(10, &counted(25), Some(5)).total_batches, Some(1));
    }

    #[test]
    fn walks_counted_batches_to_completion() {
        let mut state = BatchState::fresh(10, &counted(25), None);
        assert!(state.is_first_batch());
        assert_eq!(
            state.page_request(),
            PageRequest::Offset { start: 0, limit: 10 }
        );

        state.advance(&page(10));
        state.advance(&page(10));
        assert_eq!(state.current_batch, 3);
        assert_eq!(
            state.page_request(),
            PageRequest::Offset { start: 20, limit: 5 }
        );
        assert!(!state.is_complete);

        state.advance(&page(5));
        assert_eq!(state.current_batch, 0);
        assert!(state.is_complete);
        assert_eq!(state.entities_read, 25);
        assert_eq!(state.processed_batches.len(), 3);
    }

    #[test]
    fn cursor_completion_comes_from_source_or_limit() {
        let descriptor = SourceDescriptor {
            fingerprint: SourceFingerprint::new("https://cms.example/api/posts"),
            mode: PaginationMode::Cursor,
            length: None,
        };
        let mut state = BatchState::fresh(2, &descriptor, Some(3));
        assert_eq!(state.total_batches, None);

        let mut first = page(2);
        first.next_offset = Some("t1".into());
        state.advance(&first);
        assert!(!state.is_complete);
        assert_eq!(
            state.page_request(),
            PageRequest::Cursor {
                token: Some("t1".into()),
                limit: 1
            }
        );

        let mut second = page(1);
        second.next_offset = Some("t2".into());
        state.advance(&second);
        assert!(state.is_complete, "entity limit reached");
    }

    #[test]
    fn detects_reasons_to_discard_progress() {
        let mut state = BatchState::fresh(10, &counted(50), None);
        state.advance(&page(10));

        assert_eq!(state.reset_reason(10, &counted(50), None), None);
        assert_eq!(
            state.reset_reason(20, &counted(50), None),
            Some(ResetReason::BatchSizeChanged {
                stored: 10,
                requested: 20
            })
        );
        assert_eq!(
            state.reset_reason(10, &counted(49), None),
            Some(ResetReason::FingerprintChanged)
        );
        assert_eq!(
            state.reset_reason(10, &counted(50), Some(5)),
            Some(ResetReason::LimitChanged)
        );

        state.is_complete = true;
        assert_eq!(
            state.reset_reason(10, &counted(50), None),
            Some(ResetReason::PreviousRunComplete)
        );
    }

    #[test]
    fn survives_bincode_roundtrip() {
        let mut state = BatchState::fresh(3, &counted(7), None);
        state.advance(&page(3));
        let bytes = bincode::serialize(&state).unwrap();
        let back: BatchState = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, state);
    }
}
