//! History stored as JSON lines, one entry per line.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{info, warn};

use super::{HistoryEntry, HistoryError, HistoryStore, query};

const FILE_NAME: &str = "history.jsonl";

/// File-backed history.
pub struct FileHistory {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileHistory {
    /// Open (or prepare to create) the history file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// `<data dir>/simplecalc/history.jsonl`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("simplecalc").join(FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = lineno + 1,
                    error = %e,
                    "skipping unreadable history line"
                ),
            }
        }

        Ok(entries)
    }
}

impl HistoryStore for FileHistory {
    fn append(&self, entry: &HistoryEntry) -> Result<(), HistoryError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let mut entries = self.read_entries()?;
        query::sort_newest_first(&mut entries);
        Ok(entries)
    }

    fn clear(&self) -> Result<(), HistoryError> {
        let _guard = self.write_lock.lock();
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "cleared history");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileHistory::open(dir.path().join("nested").join(FILE_NAME)).unwrap();
        assert!(store.list_all().unwrap().is_empty());

        store.append(&HistoryEntry::new(1, "1+1=2")).unwrap();
        store.append(&HistoryEntry::new(2, "6×7=42")).unwrap();

        let reopened = FileHistory::open(store.path()).unwrap();
        let entries = reopened.list_all().unwrap();
        assert_eq!(
            entries,
            vec![
                HistoryEntry::new(2, "6×7=42"),
                HistoryEntry::new(1, "1+1=2")
            ]
        );
        assert_eq!(reopened.search("42").unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);
        fs::write(
            &path,
            "{\"timestamp\":5,\"calculation\":\"2+2=4\"}\nnot json\n\n",
        )
        .unwrap();

        let store = FileHistory::open(&path).unwrap();
        assert_eq!(store.list_all().unwrap(), vec![HistoryEntry::new(5, "2+2=4")]);
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileHistory::open(dir.path().join(FILE_NAME)).unwrap();
        store.clear().unwrap();

        store.append(&HistoryEntry::new(1, "3-1=2")).unwrap();
        store.clear().unwrap();
        assert!(!store.path().exists());
        assert!(store.list_all().unwrap().is_empty());
    }
}
