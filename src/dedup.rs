//! Per-feed set of entry identifiers already observed.
//!
//! Grows monotonically for the life of its watcher; never pruned, never
//! persisted. A restart re-seeds from scratch.

use std::collections::HashSet;

use crate::feed::FeedEntry;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenIds {
    ids: HashSet<String>,
}

impl SeenIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_new(&self, id: &str) -> bool {
        !self.ids.contains(id)
    }

    /// Insert `id`. Returns `true` if it was not present before.
    pub fn record(&mut self, id: &str) -> bool {
        if self.ids.contains(id) {
            return false;
        }
        self.ids.insert(id.to_string())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Seeding branch: record every entry, report none as new.
    /// Returns how many identifiers were added.
    pub fn seed(&mut self, entries: &[FeedEntry]) -> usize {
        entries.iter().filter(|e| self.record(&e.id)).count()
    }

    /// Steady-state branch: record unseen entries and return them in the
    /// order they were given (document order).
    pub fn admit(&mut self, entries: Vec<FeedEntry>) -> Vec<FeedEntry> {
        entries
            .into_iter()
            .filter(|e| self.is_new(&e.id) && self.record(&e.id))
            .collect()
    }
}
