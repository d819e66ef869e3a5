use serde::{Deserialize, Serialize};
use std::fmt;

/// How a source walks through its entities.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaginationMode {
    /// Numbered batches computed from a known source length.
    Counted,
    /// Opaque continuation tokens handed out by the source.
    Cursor,
}

impl fmt::Display for PaginationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaginationMode::Counted => f.write_str("counted"),
            PaginationMode::Cursor => f.write_str("cursor"),
        }
    }
}

/// What the engine asks a source for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    /// The whole entity set in one read (non-batched runs).
    All,

    /// Records `[start, start + limit)` of a counted source.
    Offset { start: usize, limit: usize },

    /// Up to `limit` records after `token`; `None` starts at the beginning.
    Cursor { token: Option<String>, limit: usize },
}

impl PageRequest {
    pub fn limit(&self) -> Option<usize> {
        match self {
            PageRequest::All => None,
            PageRequest::Offset { limit, .. } | PageRequest::Cursor { limit, .. } => Some(*limit),
        }
    }
}

impl fmt::Display for PageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageRequest::All => f.write_str("all"),
            PageRequest::Offset { start, limit } => write!(f, "offset {start} (+{limit})"),
            PageRequest::Cursor { token, limit } => match token {
                Some(token) => write!(f, "cursor '{token}' (+{limit})"),
                None => write!(f, "cursor <start> (+{limit})"),
            },
        }
    }
}
