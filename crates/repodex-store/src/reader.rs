use crate::commit_log::{CommitEntry, CommitLog};
use crate::error::{Result, StoreError};
use crate::schema::StoreSchema;
use crate::snapshot::ReadHandle;
use crate::storage::{classify, ensure_exists, read_marks, CommitMarks, JOURNAL_DIR, RECORDS_DIR};
use std::path::{Path, PathBuf};
use tantivy::directory::MmapDirectory;
use tantivy::{Index, IndexReader, ReloadPolicy, TantivyError};
use tracing::debug;

const SNAPSHOT_ATTEMPTS: usize = 8;

/// Read-only access to an index, for processes that never write.
///
/// Takes no writer lock, so readers and the single writer do not block each
/// other. Each [`snapshot`](Self::snapshot) sees the newest commit.
pub struct StoreReader {
    path: PathBuf,
    index: Index,
    reader: IndexReader,
    fields: StoreSchema,
}

impl StoreReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        ensure_exists(path)?;

        let directory = MmapDirectory::open(path.join(RECORDS_DIR)).map_err(TantivyError::from)?;
        let index = Index::open(directory).map_err(|e| classify(path, e))?;
        read_marks(&index, path, None)?;
        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        Ok(Self {
            path: path.to_path_buf(),
            index,
            reader,
            fields: StoreSchema::build(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Marks of the newest commit.
    pub fn marks(&self) -> Result<CommitMarks> {
        read_marks(&self.index, &self.path, None)
    }

    /// Consistent view of the newest commit. Marks are read before and
    /// after the searcher is taken; a commit landing in between retries.
    pub fn snapshot(&self) -> Result<ReadHandle> {
        for _ in 0..SNAPSHOT_ATTEMPTS {
            let before = self.marks()?;
            self.reader.reload()?;
            let searcher = self.reader.searcher();
            let after = self.marks()?;
            if before == after {
                return Ok(ReadHandle::new(
                    self.index.clone(),
                    searcher,
                    self.fields.clone(),
                    after,
                ));
            }
            debug!("{} changed while taking a snapshot", self.path.display());
        }
        Err(StoreError::Unsettled {
            path: self.path.clone(),
        })
    }

    /// Newest journal entries first, or `None` while a writer holds the
    /// journal.
    pub fn recent_commits(&self, limit: usize) -> Result<Option<Vec<CommitEntry>>> {
        let journal = self.path.join(JOURNAL_DIR);
        if !journal.exists() {
            return Ok(Some(Vec::new()));
        }
        match CommitLog::open(&journal) {
            Ok(log) => Ok(Some(log.list(limit)?)),
            Err(StoreError::Journal(sled::Error::Io(e))) => {
                debug!("journal {} busy: {}", journal.display(), e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
