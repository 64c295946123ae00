//! Calculation history.
//!
//! Every evaluation is appended as a [`HistoryEntry`]. The calculator only
//! ever appends, through a [`HistoryRecorder`] that writes on a background
//! thread. Listing, searching and clearing are used by the history views.

mod file;
mod legacy;
mod memory;
pub mod query;
mod recorder;

pub use file::FileHistory;
pub use legacy::{RECORD_SEPARATOR, import_legacy, parse_legacy};
pub use memory::MemoryHistory;
pub use recorder::HistoryRecorder;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("history serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// One finished calculation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Epoch milliseconds.
    pub timestamp: i64,
    /// `"<expression>=<result>"`.
    pub calculation: String,
}

impl HistoryEntry {
    pub fn new(timestamp: i64, calculation: impl Into<String>) -> Self {
        Self {
            timestamp,
            calculation: calculation.into(),
        }
    }

    /// The part before the last `=`.
    pub fn expression(&self) -> &str {
        self.calculation
            .rsplit_once('=')
            .map_or(self.calculation.as_str(), |(expr, _)| expr)
    }

    /// The part after the last `=`, if there is one.
    pub fn result(&self) -> Option<&str> {
        self.calculation.rsplit_once('=').map(|(_, result)| result)
    }
}

/// Current time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Storage backend for history entries.
///
/// Implementations serialize their own writes; callers may list while
/// another thread appends.
pub trait HistoryStore: Send + Sync {
    fn append(&self, entry: &HistoryEntry) -> Result<(), HistoryError>;

    /// All entries, newest first.
    fn list_all(&self) -> Result<Vec<HistoryEntry>, HistoryError>;

    /// Entries whose calculation contains `query`, ignoring case. Newest first.
    fn search(&self, query: &str) -> Result<Vec<HistoryEntry>, HistoryError> {
        Ok(query::search(&self.list_all()?, query))
    }

    fn clear(&self) -> Result<(), HistoryError>;
}
