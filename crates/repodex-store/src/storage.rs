use crate::commit_log::{CommitEntry, CommitLog};
use crate::error::{Result, StoreError};
use crate::schema::StoreSchema;
use crate::snapshot::ReadHandle;
use repodex_core::{now_millis, ArtifactCoordinate, ArtifactRecord, StoreEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, RwLock};
use std::time::Duration;
use tantivy::directory::error::LockError;
use tantivy::directory::MmapDirectory;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyError};
use tracing::{debug, info, warn};

/// On-disk layout version carried in every commit payload.
pub const FORMAT_VERSION: u32 = 1;

pub(crate) const RECORDS_DIR: &str = "records";
pub(crate) const JOURNAL_DIR: &str = "journal";
const WRITER_MEMORY: usize = 50_000_000;
/// How long a writer waits for a reader to let go of the journal.
const JOURNAL_WAIT: Duration = Duration::from_secs(2);

/// Continuity marks persisted atomically with each commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMarks {
    pub format_version: u32,
    pub repository_id: String,
    /// Highest record version the store has observed.
    pub high_water: u64,
    /// Last incremental chunk folded into this store, if any.
    pub last_chunk_id: Option<u64>,
}

impl CommitMarks {
    fn empty(repository_id: &str) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            repository_id: repository_id.to_string(),
            high_water: 0,
            last_chunk_id: None,
        }
    }
}

struct WriterState {
    writer: IndexWriter,
    /// Entries written since the last commit, by coordinate key.
    pending: BTreeMap<String, StoreEntry>,
    high_water: u64,
    last_chunk_id: Option<u64>,
}

/// Single-writer artifact index.
///
/// The tantivy writer lock is held from `open` to `close`, so a second
/// writer on the same path fails with [`StoreError::Locked`]. Writes go
/// through `&self`; readers take [`snapshot`](Self::snapshot)s, and other
/// processes read through [`StoreReader`](crate::StoreReader).
pub struct IndexStore {
    path: PathBuf,
    repository_id: String,
    index: Index,
    reader: IndexReader,
    fields: StoreSchema,
    state: Mutex<WriterState>,
    committed: RwLock<CommitMarks>,
    journal: CommitLog,
}

impl IndexStore {
    /// Open or create the index for `repository_id` under `path`.
    pub fn open(path: impl AsRef<Path>, repository_id: &str) -> Result<Self> {
        Self::open_with(path.as_ref(), Some(repository_id))
    }

    /// Open an index that must already exist, adopting its repository id.
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        ensure_exists(path)?;
        Self::open_with(path, None)
    }

    fn open_with(path: &Path, repository_id: Option<&str>) -> Result<Self> {
        let records = path.join(RECORDS_DIR);
        fs::create_dir_all(&records).map_err(|e| StoreError::Io {
            path: records.clone(),
            source: e,
        })?;

        let fields = StoreSchema::build();
        let directory = MmapDirectory::open(&records).map_err(TantivyError::from)?;
        let index = Index::open_or_create(directory, fields.schema.clone())
            .map_err(|e| classify(path, e))?;

        let writer: IndexWriter = index
            .writer(WRITER_MEMORY)
            .map_err(|e| classify(path, e))?;
        let marks = read_marks(&index, path, repository_id)?;
        let reader: IndexReader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let journal = CommitLog::open_waiting(&path.join(JOURNAL_DIR), JOURNAL_WAIT)?;

        info!(
            "opened index {} for repository '{}' at version {}",
            path.display(),
            marks.repository_id,
            marks.high_water
        );

        Ok(Self {
            path: path.to_path_buf(),
            repository_id: marks.repository_id.clone(),
            index,
            reader,
            fields,
            state: Mutex::new(WriterState {
                writer,
                pending: BTreeMap::new(),
                high_water: marks.high_water,
                last_chunk_id: marks.last_chunk_id,
            }),
            committed: RwLock::new(marks),
            journal,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn repository_id(&self) -> &str {
        &self.repository_id
    }

    pub fn journal(&self) -> &CommitLog {
        &self.journal
    }

    /// Marks of the last commit.
    pub fn committed_marks(&self) -> Result<CommitMarks> {
        Ok(self.read_committed()?.clone())
    }

    pub fn high_water(&self) -> Result<u64> {
        Ok(self.read_committed()?.high_water)
    }

    pub fn last_chunk_id(&self) -> Result<Option<u64>> {
        Ok(self.read_committed()?.last_chunk_id)
    }

    /// High-water mark including uncommitted writes.
    pub fn pending_high_water(&self) -> Result<u64> {
        Ok(self.lock_state()?.high_water)
    }

    pub fn pending_len(&self) -> Result<usize> {
        Ok(self.lock_state()?.pending.len())
    }

    /// Current entry for `coordinate`, uncommitted writes included.
    pub fn get(&self, coordinate: &ArtifactCoordinate) -> Result<Option<StoreEntry>> {
        let state = self.lock_state()?;
        self.lookup(&state, coordinate)
    }

    /// Insert or replace the record for its coordinate. Returns the version
    /// assigned to it.
    pub fn upsert(&self, mut record: ArtifactRecord) -> Result<u64> {
        let mut state = self.lock_state()?;
        let version = state.high_water + 1;
        record.record_version = version;
        debug!("upsert {} at version {}", record.coordinate, version);
        self.write_entry(&mut state, StoreEntry::Live(record))?;
        state.high_water = version;
        Ok(version)
    }

    /// Tombstone the record for `coordinate`. Returns `false` (and writes
    /// nothing) when no live record exists.
    pub fn delete(&self, coordinate: &ArtifactCoordinate) -> Result<bool> {
        let mut state = self.lock_state()?;
        let live = matches!(self.lookup(&state, coordinate)?, Some(StoreEntry::Live(_)));
        if !live {
            return Ok(false);
        }
        let version = state.high_water + 1;
        debug!("delete {} at version {}", coordinate, version);
        self.write_entry(
            &mut state,
            StoreEntry::Tombstone {
                coordinate: coordinate.clone(),
                record_version: version,
            },
        )?;
        state.high_water = version;
        Ok(true)
    }

    /// Write an entry as-is, keeping its version.
    pub fn import(&self, entry: StoreEntry) -> Result<()> {
        let mut state = self.lock_state()?;
        let version = entry.record_version();
        self.write_entry(&mut state, entry)?;
        state.high_water = state.high_water.max(version);
        Ok(())
    }

    pub fn set_high_water(&self, version: u64) -> Result<()> {
        let mut state = self.lock_state()?;
        if version < state.high_water {
            return Err(StoreError::HighWaterRegression {
                current: state.high_water,
                requested: version,
            });
        }
        state.high_water = version;
        Ok(())
    }

    pub fn mark_chunk_applied(&self, chunk_id: u64) -> Result<()> {
        let mut state = self.lock_state()?;
        state.last_chunk_id = Some(state.last_chunk_id.map_or(chunk_id, |c| c.max(chunk_id)));
        Ok(())
    }

    /// Flush pending writes as one atomic unit and make them visible to new
    /// snapshots. Returns the committed marks. The journal entry is written
    /// after the commit is durable; failing to write it only logs a warning.
    pub fn commit(&self, note: &str) -> Result<CommitMarks> {
        let mut state = self.lock_state()?;
        let marks = CommitMarks {
            format_version: FORMAT_VERSION,
            repository_id: self.repository_id.clone(),
            high_water: state.high_water,
            last_chunk_id: state.last_chunk_id,
        };
        let payload = serde_json::to_string(&marks).map_err(|e| StoreError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        let mut prepared = state.writer.prepare_commit()?;
        prepared.set_payload(&payload);
        prepared.commit()?;
        let written = std::mem::take(&mut state.pending).len();

        {
            let mut committed = self
                .committed
                .write()
                .map_err(|_| StoreError::Poisoned)?;
            self.reader.reload()?;
            *committed = marks.clone();
        }

        if let Err(e) = self.record_commit(&marks, note) {
            warn!(
                "commit at version {} not journaled in {}: {}",
                marks.high_water,
                self.path.display(),
                e
            );
        }
        info!(
            "committed {} entries, high-water {} ({})",
            written, marks.high_water, note
        );
        Ok(marks)
    }

    fn record_commit(&self, marks: &CommitMarks, note: &str) -> Result<()> {
        let entry = CommitEntry {
            id: self.journal.next_id()?,
            high_water: marks.high_water,
            last_chunk_id: marks.last_chunk_id,
            timestamp: now_millis(),
            note: note.to_string(),
        };
        self.journal.append(&entry)
    }

    /// Discard everything written since the last commit.
    pub fn rollback(&self) -> Result<()> {
        let mut state = self.lock_state()?;
        state.writer.rollback()?;
        let committed = self.read_committed()?;
        if !state.pending.is_empty() {
            warn!("discarding {} uncommitted entries", state.pending.len());
        }
        state.pending.clear();
        state.high_water = committed.high_water;
        state.last_chunk_id = committed.last_chunk_id;
        Ok(())
    }

    /// Consistent view of the last commit.
    pub fn snapshot(&self) -> Result<ReadHandle> {
        let committed = self.read_committed()?;
        let searcher = self.reader.searcher();
        Ok(ReadHandle::new(
            self.index.clone(),
            searcher,
            self.fields.clone(),
            committed.clone(),
        ))
    }

    /// Release the writer lock. Uncommitted writes are lost.
    pub fn close(self) -> Result<()> {
        let state = self.state.into_inner().map_err(|_| StoreError::Poisoned)?;
        if !state.pending.is_empty() {
            warn!(
                "closing {} with {} uncommitted entries",
                self.path.display(),
                state.pending.len()
            );
        }
        state.writer.wait_merging_threads()?;
        debug!("closed index {}", self.path.display());
        Ok(())
    }

    fn lookup(
        &self,
        state: &WriterState,
        coordinate: &ArtifactCoordinate,
    ) -> Result<Option<StoreEntry>> {
        if let Some(entry) = state.pending.get(&coordinate.key()) {
            return Ok(Some(entry.clone()));
        }
        self.snapshot()?.get(coordinate)
    }

    fn write_entry(&self, state: &mut WriterState, entry: StoreEntry) -> Result<()> {
        let key = entry.coordinate().key();
        let document = self.fields.document(&entry)?;
        state.writer.delete_term(self.fields.key_term(&key));
        state.writer.add_document(document)?;
        state.pending.insert(key, entry);
        Ok(())
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, WriterState>> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }

    fn read_committed(&self) -> Result<std::sync::RwLockReadGuard<'_, CommitMarks>> {
        self.committed.read().map_err(|_| StoreError::Poisoned)
    }
}

pub(crate) fn ensure_exists(path: &Path) -> Result<()> {
    if path.join(RECORDS_DIR).join("meta.json").exists() {
        Ok(())
    } else {
        Err(StoreError::NotFound {
            path: path.to_path_buf(),
        })
    }
}

pub(crate) fn classify(path: &Path, err: TantivyError) -> StoreError {
    match &err {
        TantivyError::LockFailure(LockError::LockBusy, _) => {
            return StoreError::Locked {
                path: path.to_path_buf(),
            }
        }
        TantivyError::SchemaError(_)
        | TantivyError::DataCorruption(_)
        | TantivyError::IncompatibleIndex(_)
        | TantivyError::OpenReadError(_) => {
            return StoreError::Corrupt {
                path: path.to_path_buf(),
                reason: err.to_string(),
            }
        }
        _ => {}
    }
    StoreError::Tantivy(err)
}

pub(crate) fn read_marks(
    index: &Index,
    path: &Path,
    expected: Option<&str>,
) -> Result<CommitMarks> {
    let corrupt = |reason: String| StoreError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    let payload = index.load_metas().map_err(|e| classify(path, e))?.payload;
    let marks = match (payload, expected) {
        (None, Some(id)) => return Ok(CommitMarks::empty(id)),
        (None, None) => return Err(corrupt("index has never been committed".to_string())),
        (Some(json), _) => serde_json::from_str::<CommitMarks>(&json)
            .map_err(|e| corrupt(format!("unreadable commit payload: {e}")))?,
    };

    if marks.format_version != FORMAT_VERSION {
        return Err(corrupt(format!(
            "unsupported format version {} (expected {})",
            marks.format_version, FORMAT_VERSION
        )));
    }
    if let Some(id) = expected {
        if marks.repository_id != id {
            return Err(corrupt(format!(
                "index belongs to repository '{}', not '{}'",
                marks.repository_id, id
            )));
        }
    }
    Ok(marks)
}
