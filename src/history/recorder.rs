//! Background history writer.
//!
//! Evaluations must not wait on storage, so entries are queued on a channel
//! and appended by a dedicated thread. Dropping the recorder drains the
//! queue and joins the thread.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use flume::Sender;
use tracing::{debug, warn};

use super::{HistoryEntry, HistoryError, HistoryStore};

pub struct HistoryRecorder {
    tx: Option<Sender<HistoryEntry>>,
    worker: Option<JoinHandle<()>>,
}

impl HistoryRecorder {
    /// Start the writer thread for `store`.
    pub fn spawn(store: Arc<dyn HistoryStore>) -> Result<Self, HistoryError> {
        let (tx, rx) = flume::unbounded::<HistoryEntry>();

        let worker = thread::Builder::new()
            .name("history-writer".into())
            .spawn(move || {
                for entry in rx.iter() {
                    if let Err(e) = store.append(&entry) {
                        warn!(
                            calculation = %entry.calculation,
                            error = %e,
                            "failed to save history entry"
                        );
                    }
                }
                debug!("history writer finished");
            })?;

        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
        })
    }

    /// Queue an entry. Never blocks; failures are logged.
    pub fn record(&self, entry: HistoryEntry) {
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.send(entry).is_err() {
            warn!("history writer has stopped; entry dropped");
        }
    }

    /// Wait until every queued entry has been written.
    pub fn shutdown(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        // Closing the channel ends the worker's loop once the queue is empty.
        self.tx.take();
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            warn!("history writer panicked");
        }
    }
}

impl Drop for HistoryRecorder {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryHistory;

    struct FailingStore;

    impl HistoryStore for FailingStore {
        fn append(&self, _entry: &HistoryEntry) -> Result<(), HistoryError> {
            Err(std::io::Error::other("disk full").into())
        }

        fn list_all(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
            Ok(Vec::new())
        }

        fn clear(&self) -> Result<(), HistoryError> {
            Ok(())
        }
    }

    #[test]
    fn test_shutdown_flushes_queue() {
        let store = Arc::new(MemoryHistory::new());
        let recorder = HistoryRecorder::spawn(store.clone()).unwrap();
        for i in 0..100 {
            recorder.record(HistoryEntry::new(i, format!("{i}+0={i}")));
        }
        recorder.shutdown();

        assert_eq!(store.len(), 100);
        assert_eq!(store.list_all().unwrap()[0].calculation, "99+0=99");
    }

    #[test]
    fn test_append_failures_are_swallowed() {
        let recorder = HistoryRecorder::spawn(Arc::new(FailingStore)).unwrap();
        recorder.record(HistoryEntry::new(1, "1+1=2"));
        recorder.shutdown();
    }
}
