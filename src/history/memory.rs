//! History kept in memory, for tests and runs without a history file.

use parking_lot::RwLock;

use super::{HistoryEntry, HistoryError, HistoryStore, query};

/// History kept in memory for the life of the process.
pub struct MemoryHistory {
    entries: RwLock<Vec<HistoryEntry>>,
}

impl MemoryHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }
}

impl HistoryStore for MemoryHistory {
    fn append(&self, entry: &HistoryEntry) -> Result<(), HistoryError> {
        self.entries.write().push(entry.clone());
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let mut entries = self.entries.read().clone();
        query::sort_newest_first(&mut entries);
        Ok(entries)
    }

    fn clear(&self) -> Result<(), HistoryError> {
        self.entries.write().clear();
        Ok(())
    }
}
