use crate::error::Result;
use serde::{Deserialize, Serialize};
use sled::Db;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEntry {
    pub id: u64,
    pub high_water: u64,
    pub last_chunk_id: Option<u64>,
    /// Unix milliseconds.
    pub timestamp: u64,
    pub note: String,
}

/// Append-only history of index commits, newest last.
pub struct CommitLog {
    db: Db,
    log: sled::Tree,
}

impl CommitLog {
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path)?;
        Self::new(db)
    }

    /// Like [`open`](Self::open), retrying for up to `wait` while another
    /// process (a reader listing history) holds the journal lock.
    pub fn open_waiting(path: &Path, wait: Duration) -> Result<Self> {
        let deadline = Instant::now() + wait;
        loop {
            match sled::open(path) {
                Ok(db) => return Self::new(db),
                Err(sled::Error::Io(e)) if Instant::now() < deadline => {
                    debug!("journal {} busy: {}", path.display(), e);
                    thread::sleep(Duration::from_millis(20));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn new(db: Db) -> Result<Self> {
        Ok(Self {
            log: db.open_tree("commit_log")?,
            db,
        })
    }

    pub fn next_id(&self) -> Result<u64> {
        Ok(self.db.generate_id()?)
    }

    pub fn append(&self, entry: &CommitEntry) -> Result<()> {
        let bytes = bincode::serialize(entry)?;
        // Big-endian keys keep sled's iteration order chronological.
        self.log.insert(entry.id.to_be_bytes(), bytes)?;
        self.log.flush()?;
        Ok(())
    }

    /// Most recent entries first.
    pub fn list(&self, limit: usize) -> Result<Vec<CommitEntry>> {
        let mut out = Vec::new();
        for item in self.log.iter().rev().take(limit) {
            let (_, v) = item?;
            if let Ok(entry) = bincode::deserialize::<CommitEntry>(&v) {
                out.push(entry);
            }
        }
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Drop the underlying tree so later appends fail.
    #[cfg(test)]
    pub(crate) fn break_for_test(&self) {
        self.db.drop_tree("commit_log").unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(log: &CommitLog, high_water: u64, note: &str) -> CommitEntry {
        CommitEntry {
            id: log.next_id().unwrap(),
            high_water,
            last_chunk_id: None,
            timestamp: 0,
            note: note.to_string(),
        }
    }

    #[test]
    fn test_list_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let log = CommitLog::open(dir.path()).unwrap();
        for (hw, note) in [(1, "first"), (4, "second"), (9, "third")] {
            let e = entry(&log, hw, note);
            log.append(&e).unwrap();
        }

        let notes: Vec<String> = log.list(2).unwrap().into_iter().map(|e| e.note).collect();
        assert_eq!(notes, vec!["third", "second"]);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_open_waiting_gets_lock_once_released() {
        let dir = tempfile::tempdir().unwrap();
        let held = CommitLog::open(dir.path()).unwrap();
        assert!(CommitLog::open(dir.path()).is_err());

        let path = dir.path().to_path_buf();
        let waiter =
            thread::spawn(move || CommitLog::open_waiting(&path, Duration::from_secs(5)).is_ok());
        thread::sleep(Duration::from_millis(100));
        drop(held);
        assert!(waiter.join().unwrap());
    }
}
