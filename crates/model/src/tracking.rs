use crate::records::entity::IndexId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Which target entities were encountered during the current walk over the source.
///
/// Built from a full read of the target (every id `false`), flipped to `true` as entities are
/// reconciled, and consulted once the stream is complete to find entities that disappeared.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackingIndex {
    entries: BTreeMap<IndexId, bool>,
    /// Unique identifiers whose target lookup failed; their target ids are unknown.
    #[serde(default)]
    unresolved: BTreeSet<String>,
}

impl TrackingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_identifiers(ids: impl IntoIterator<Item = IndexId>) -> Self {
        TrackingIndex {
            entries: ids
                .into_iter()
                .filter(|id| *id != 0)
                .map(|id| (id, false))
                .collect(),
            unresolved: BTreeSet::new(),
        }
    }

    /// Marks `id` as seen. Ids unknown to the index (freshly created entities) are added.
    pub fn mark_seen(&mut self, id: IndexId) {
        if id != 0 {
            self.entries.insert(id, true);
        }
    }

    pub fn mark_unresolved(&mut self, unique_identifier: impl Into<String>) {
        self.unresolved.insert(unique_identifier.into());
    }

    pub fn is_seen(&self, id: IndexId) -> bool {
        self.entries.get(&id).copied().unwrap_or(false)
    }

    /// Target ids that were never encountered, in ascending order.
    pub fn unseen(&self) -> Vec<IndexId> {
        self.entries
            .iter()
            .filter(|(id, seen)| **id != 0 && !**seen)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn unresolved(&self) -> &BTreeSet<String> {
        &self.unresolved
    }

    pub fn has_unresolved(&self) -> bool {
        !self.unresolved.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn seen_count(&self) -> usize {
        self.entries.values().filter(|seen| **seen).count()
    }
}
