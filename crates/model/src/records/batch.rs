use serde_json::Value;

/// One raw item as handed over by a source, before the entity transform runs.
pub type RawRecord = Value;

/// A page of raw records returned by a source.
#[derive(Debug, Clone, Default)]
pub struct SourcePage {
    pub records: Vec<RawRecord>,
    /// Continuation token for cursor pagination. `None` for counted sources.
    pub next_offset: Option<String>,
    /// Source-reported completion flag (cursor pagination) or end-of-data marker.
    pub is_complete: bool,
}

impl SourcePage {
    pub fn new(records: Vec<RawRecord>) -> Self {
        SourcePage {
            records,
            next_offset: None,
            is_complete: false,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
