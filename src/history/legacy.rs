//! Import of history saved by older releases.
//!
//! Old releases kept history as a single preference string: records joined
//! by `|||`, each `"<epoch ms>;<calculation>"`. Some kept one record per
//! line instead, so newlines separate records too.

use tracing::info;

use super::{HistoryEntry, HistoryError, HistoryStore};

pub const RECORD_SEPARATOR: &str = "|||";

/// Parse legacy records. Records without a usable timestamp get `now`.
pub fn parse_legacy(raw: &str, now: i64) -> Vec<HistoryEntry> {
    raw.split(RECORD_SEPARATOR)
        .flat_map(|chunk| chunk.lines())
        .filter(|record| !record.trim().is_empty())
        .map(|record| match record.split_once(';') {
            Some((timestamp, calculation)) => HistoryEntry::new(
                timestamp.trim().parse().unwrap_or(now),
                calculation,
            ),
            None => HistoryEntry::new(now, record),
        })
        .collect()
}

/// Append every legacy record to `store`. Returns how many were imported.
pub fn import_legacy(
    store: &dyn HistoryStore,
    raw: &str,
    now: i64,
) -> Result<usize, HistoryError> {
    let entries = parse_legacy(raw, now);
    for entry in &entries {
        store.append(entry)?;
    }

    info!(count = entries.len(), "imported legacy history");
    Ok(entries.len())
}
