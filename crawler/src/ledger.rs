use crate::models::Record;
use std::collections::HashSet;

/// Profile links already collected for the active work unit
#[derive(Debug, Default)]
pub struct DedupLedger {
    seen: HashSet<String>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger seeded from records restored from a checkpoint
    pub fn seeded(records: &[Record]) -> Self {
        Self {
            seen: records.iter().map(|r| r.profile_link.clone()).collect(),
        }
    }

    pub fn contains(&self, link: &str) -> bool {
        self.seen.contains(link)
    }

    /// Record a link, returning false if it was already present
    pub fn insert(&mut self, link: impl Into<String>) -> bool {
        self.seen.insert(link.into())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
