//! Append-only result log.
//!
//! Entries are pushed as `Pending` in input order and resolved in place, so a
//! position handed out once keeps pointing at the same record for the whole run.

use campaign_core::ResultEntry;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LogError {
    #[error("Result log is full ({0} entries)")]
    Full(usize),

    #[error("No pending entry at position {0}")]
    NotPending(usize),
}

#[derive(Debug, Clone, Default)]
pub struct ResultLog {
    entries: Vec<ResultEntry>,
    capacity: usize,
}

impl ResultLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a pending entry and return its stable position.
    pub fn push_pending(&mut self, entry: ResultEntry) -> Result<usize, LogError> {
        if self.entries.len() >= self.capacity {
            return Err(LogError::Full(self.capacity));
        }
        self.entries.push(entry);
        Ok(self.entries.len() - 1)
    }

    /// Resolve a pending entry. Resolved entries are never rewritten.
    pub fn resolve<F>(&mut self, index: usize, resolve: F) -> Result<&ResultEntry, LogError>
    where
        F: FnOnce(ResultEntry) -> ResultEntry,
    {
        let slot = self
            .entries
            .get_mut(index)
            .filter(|entry| entry.is_pending())
            .ok_or(LogError::NotPending(index))?;
        *slot = resolve(slot.clone());
        Ok(slot)
    }

    pub fn entries(&self) -> &[ResultEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<ResultEntry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use campaign_core::{CustomerRecord, EntryOutcome, Tone};

    use super::*;

    fn pending(id: &str) -> ResultEntry {
        ResultEntry::pending(&CustomerRecord::from_pairs(1, [("id", id)]), Tone::Bold)
    }

    #[test]
    fn positions_follow_insertion_order() {
        let mut log = ResultLog::with_capacity(3);
        assert_eq!(log.push_pending(pending("A")).unwrap(), 0);
        assert_eq!(log.push_pending(pending("B")).unwrap(), 1);
        let ids: Vec<_> = log.entries().iter().map(|e| e.customer_id()).collect();
        assert_eq!(ids, ["A", "B"]);
    }

    #[test]
    fn capacity_is_enforced() {
        let mut log = ResultLog::with_capacity(1);
        log.push_pending(pending("A")).unwrap();
        assert_eq!(log.push_pending(pending("B")), Err(LogError::Full(1)));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn resolve_only_once() {
        let mut log = ResultLog::with_capacity(2);
        let index = log.push_pending(pending("A")).unwrap();

        let resolved = log.resolve(index, |e| e.skipped(3, "rate limited")).unwrap();
        assert_eq!(resolved.outcome(), EntryOutcome::SkippedAfterRetries);

        assert_eq!(
            log.resolve(index, |e| e.skipped(1, "again")).unwrap_err(),
            LogError::NotPending(index)
        );
        assert_eq!(log.resolve(7, |e| e).unwrap_err(), LogError::NotPending(7));
    }
}
