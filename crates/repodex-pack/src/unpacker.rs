// Chunk unpacker
use crate::checksum::verify_sha256;
use crate::error::{PackError, Result};
use crate::format::{read_header, BaselineHeader, ChunkEntry, ChunkHeader, PackReader};
use crate::manifest::{ChunkDescriptor, ChunkManifest};
use repodex_core::{ArtifactRecord, StoreEntry};
use repodex_store::IndexStore;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What a store at some version needs to catch up with a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdatePlan {
    UpToDate,
    /// Apply these, in order.
    Chunks(Vec<ChunkDescriptor>),
    /// Retained chunks no longer reach back to the store's version.
    NeedsBaseline,
}

/// A chunk that passed validation and still has to be applied.
struct PlannedChunk {
    path: PathBuf,
    header: ChunkHeader,
}

/// Continuity state while walking chunk headers.
struct Cursor {
    high_water: u64,
    applied: Option<u64>,
    last_seen: Option<u64>,
}

impl Cursor {
    /// `Ok(true)` when the chunk must be applied, `Ok(false)` when the
    /// store already holds its changes (including a repeat of the previous
    /// chunk). A lower id than one already seen is only accepted if covered.
    fn admit(&mut self, header: &ChunkHeader) -> Result<bool> {
        let expected_from = self.high_water;
        let discontinuity = |follows| PackError::ManifestDiscontinuity {
            chunk_id: header.chunk_id,
            expected_from,
            found_from: header.from_version,
            follows,
        };

        let covered = self.applied.is_some_and(|id| header.chunk_id <= id)
            || header.to_version <= self.high_water;
        if let Some(last) = self.last_seen {
            if header.chunk_id < last && header.to_version > self.high_water {
                return Err(discontinuity(Some(last)));
            }
        }
        self.last_seen = self.last_seen.max(Some(header.chunk_id));

        if covered {
            debug!("chunk {} already applied", header.chunk_id);
            return Ok(false);
        }
        if header.from_version != self.high_water {
            return Err(discontinuity(None));
        }
        self.high_water = header.to_version;
        self.applied = Some(header.chunk_id);
        Ok(true)
    }
}

/// Read and check every chunk header before anything is written.
fn plan_chunks(
    repository_id: &str,
    high_water: u64,
    applied: Option<u64>,
    paths: &[PathBuf],
) -> Result<Vec<PlannedChunk>> {
    let mut cursor = Cursor {
        high_water,
        applied,
        last_seen: None,
    };
    let mut planned = Vec::new();
    for path in paths {
        let reader = PackReader::<ChunkHeader>::open(path)?;
        reader.expect_repository(repository_id)?;
        let header = reader.header().clone();
        if cursor.admit(&header)? {
            planned.push(PlannedChunk {
                path: path.clone(),
                header,
            });
        }
    }
    Ok(planned)
}

fn apply_chunk(store: &IndexStore, chunk: &PlannedChunk) -> Result<()> {
    let mut reader = PackReader::<ChunkHeader>::open(&chunk.path)?;
    while let Some(entry) = reader.next_body::<ChunkEntry>()? {
        store.import(StoreEntry::from(entry))?;
    }
    store.set_high_water(chunk.header.to_version)?;
    store.mark_chunk_applied(chunk.header.chunk_id)?;
    debug!(
        "applied chunk {} ({} entries)",
        chunk.header.chunk_id, chunk.header.entry_count
    );
    Ok(())
}

/// Rebuild a store at `target` from a baseline and the chunks that follow it.
///
/// Headers are validated up front. The store is assembled in a staging
/// folder next to `target` and only moved into place once committed, so a
/// failure leaves whatever was at `target` untouched.
pub fn unpack(
    baseline: &Path,
    chunks: &[PathBuf],
    target: &Path,
    repository_id: Option<&str>,
) -> Result<IndexStore> {
    let mut reader = PackReader::<BaselineHeader>::open(baseline)?;
    if let Some(id) = repository_id {
        reader.expect_repository(id)?;
    }
    let header = reader.header().clone();
    let planned = plan_chunks(
        &header.repository_id,
        header.high_water,
        header.chunk_id,
        chunks,
    )?;

    let staging = staging_path(target);
    if staging.exists() {
        warn!("removing stale staging folder {}", staging.display());
        remove_dir(&staging)?;
    }

    let built = IndexStore::open(&staging, &header.repository_id)
        .map_err(PackError::from)
        .and_then(|store| {
            let loaded = load_staged(&store, &header, &mut reader, &planned);
            let closed = store.close().map_err(PackError::from);
            loaded.and(closed)
        });

    if let Err(e) = built {
        if let Err(cleanup) = remove_dir(&staging) {
            warn!("failed to discard {}: {}", staging.display(), cleanup);
        }
        return Err(e);
    }

    swap_into_place(&staging, target)?;

    let store = IndexStore::open(target, &header.repository_id)?;
    info!(
        "unpacked '{}' into {} at version {}",
        store.repository_id(),
        target.display(),
        store.high_water()?
    );
    Ok(store)
}

fn load_staged(
    store: &IndexStore,
    header: &BaselineHeader,
    reader: &mut PackReader<BaselineHeader>,
    planned: &[PlannedChunk],
) -> Result<()> {
    while let Some(record) = reader.next_body::<ArtifactRecord>()? {
        store.import(StoreEntry::Live(record))?;
    }
    store.set_high_water(header.high_water)?;
    if let Some(id) = header.chunk_id {
        store.mark_chunk_applied(id)?;
    }
    for chunk in planned {
        apply_chunk(store, chunk)?;
    }
    store.commit(&format!(
        "unpack: baseline at version {}, {} chunks",
        header.high_water,
        planned.len()
    ))?;
    Ok(())
}

/// Apply chunks to an open store in one commit. Returns how many were
/// applied; chunks the store already holds are skipped.
pub fn apply_chunks(store: &IndexStore, paths: &[PathBuf]) -> Result<usize> {
    let planned = plan_chunks(
        store.repository_id(),
        store.high_water()?,
        store.last_chunk_id()?,
        paths,
    )?;
    if planned.is_empty() {
        return Ok(0);
    }

    let applied = planned
        .iter()
        .try_for_each(|chunk| apply_chunk(store, chunk))
        .and_then(|()| {
            let note = format!("update: {} chunks", planned.len());
            store.commit(&note).map_err(PackError::from)
        });
    if let Err(e) = applied {
        store.rollback()?;
        return Err(e);
    }

    info!(
        "applied {} chunks, '{}' now at version {}",
        planned.len(),
        store.repository_id(),
        store.high_water()?
    );
    Ok(planned.len())
}

/// Decide how a store at `high_water` catches up with `manifest`.
pub fn plan_update(manifest: &ChunkManifest, high_water: u64) -> UpdatePlan {
    if high_water >= manifest.high_water() {
        return UpdatePlan::UpToDate;
    }
    let mut running = high_water;
    let mut needed = Vec::new();
    for chunk in manifest.chunks_after(high_water) {
        if chunk.from_version != running {
            return UpdatePlan::NeedsBaseline;
        }
        running = chunk.to_version;
        needed.push(chunk.clone());
    }
    if running == manifest.high_water() {
        UpdatePlan::Chunks(needed)
    } else {
        UpdatePlan::NeedsBaseline
    }
}

/// Rebuild a store at `target` from the baseline published in `dir`.
pub fn unpack_published(dir: &Path, target: &Path) -> Result<IndexStore> {
    let manifest = load_published(dir)?;
    let baseline = dir.join(&manifest.baseline.file);
    verify_sha256(&baseline, &manifest.baseline.sha256)?;
    unpack(&baseline, &[], target, Some(&manifest.repository_id))
}

/// Bring `store` up to what `dir` publishes using chunks only.
///
/// Returns the plan that was followed. On `NeedsBaseline` nothing is
/// applied and the caller has to rebuild with [`unpack_published`].
pub fn update_from_published(store: &IndexStore, dir: &Path) -> Result<UpdatePlan> {
    let manifest = load_published(dir)?;
    if manifest.repository_id != store.repository_id() {
        return Err(PackError::RepositoryMismatch {
            path: ChunkManifest::path_in(dir),
            expected: store.repository_id().to_string(),
            found: manifest.repository_id,
        });
    }

    let plan = plan_update(&manifest, store.high_water()?);
    match &plan {
        UpdatePlan::UpToDate => info!("'{}' is up to date", store.repository_id()),
        UpdatePlan::NeedsBaseline => info!(
            "'{}' at version {} is older than the retained chunks",
            store.repository_id(),
            store.high_water()?
        ),
        UpdatePlan::Chunks(chunks) => {
            let mut paths = Vec::with_capacity(chunks.len());
            for chunk in chunks {
                let path = dir.join(&chunk.file);
                verify_sha256(&path, &chunk.sha256)?;
                paths.push(path);
            }
            apply_chunks(store, &paths)?;
        }
    }
    Ok(plan)
}

/// Header of a baseline file, without reading its records.
pub fn baseline_header(path: &Path) -> Result<BaselineHeader> {
    read_header(path)
}

fn load_published(dir: &Path) -> Result<ChunkManifest> {
    ChunkManifest::load(dir)?.ok_or_else(|| PackError::NoManifest {
        path: dir.to_path_buf(),
    })
}

/// Move the committed `staging` store onto `target`. An existing store is
/// set aside first and put back if the move fails.
fn swap_into_place(staging: &Path, target: &Path) -> Result<()> {
    let displaced = if target.exists() {
        let aside = sibling_path(target, ".previous");
        remove_dir(&aside)?;
        fs::rename(target, &aside).map_err(|e| PackError::io(target, e))?;
        Some(aside)
    } else {
        None
    };

    if let Err(e) = fs::rename(staging, target) {
        if let Some(aside) = &displaced {
            if let Err(restore) = fs::rename(aside, target) {
                warn!(
                    "failed to restore {} from {}: {}",
                    target.display(),
                    aside.display(),
                    restore
                );
            }
        }
        if let Err(cleanup) = remove_dir(staging) {
            warn!("failed to discard {}: {}", staging.display(), cleanup);
        }
        return Err(PackError::io(target, e));
    }

    if let Some(aside) = displaced {
        if let Err(e) = remove_dir(&aside) {
            warn!("failed to remove {}: {}", aside.display(), e);
        }
    }
    Ok(())
}

fn staging_path(target: &Path) -> PathBuf {
    sibling_path(target, ".partial")
}

fn sibling_path(target: &Path, suffix: &str) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn remove_dir(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(PackError::io(path, e)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn header(chunk_id: u64, from_version: u64, to_version: u64) -> ChunkHeader {
        ChunkHeader {
            format_version: crate::format::PACK_FORMAT_VERSION,
            repository_id: "central".to_string(),
            chunk_id,
            from_version,
            to_version,
            entry_count: 0,
            created_at_ms: 0,
        }
    }

    fn cursor(high_water: u64, applied: Option<u64>) -> Cursor {
        Cursor {
            high_water,
            applied,
            last_seen: None,
        }
    }

    #[test]
    fn test_cursor_accepts_contiguous_chunks() {
        let mut c = cursor(2, None);
        assert!(c.admit(&header(1, 2, 4)).unwrap());
        assert!(c.admit(&header(2, 4, 9)).unwrap());
        assert_eq!(c.high_water, 9);
        assert_eq!(c.applied, Some(2));
    }

    #[test]
    fn test_cursor_skips_covered_chunks() {
        let mut c = cursor(9, Some(2));
        assert!(!c.admit(&header(1, 2, 4)).unwrap());
        assert!(!c.admit(&header(2, 4, 9)).unwrap());
        assert!(c.admit(&header(3, 9, 11)).unwrap());
    }

    #[test]
    fn test_cursor_rejects_gap_and_reorder() {
        let err = cursor(2, None).admit(&header(1, 3, 5)).unwrap_err();
        assert!(matches!(
            err,
            PackError::ManifestDiscontinuity {
                chunk_id: 1,
                expected_from: 2,
                found_from: 3,
                follows: None
            }
        ));

        let mut c = cursor(0, None);
        assert!(c.admit(&header(2, 0, 4)).unwrap());
        assert!(matches!(
            c.admit(&header(1, 4, 6)),
            Err(PackError::ManifestDiscontinuity {
                chunk_id: 1,
                follows: Some(2),
                ..
            })
        ));
    }

    #[test]
    fn test_cursor_skips_repeated_chunk() {
        let mut c = cursor(2, None);
        assert!(c.admit(&header(1, 2, 4)).unwrap());
        assert!(!c.admit(&header(1, 2, 4)).unwrap());
        assert!(c.admit(&header(2, 4, 6)).unwrap());
        assert!(!c.admit(&header(2, 4, 6)).unwrap());
        assert!(!c.admit(&header(1, 2, 4)).unwrap());
        assert_eq!((c.high_water, c.applied), (6, Some(2)));
    }

    #[test]
    fn test_swap_replaces_existing_target() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("index.partial");
        let target = dir.path().join("index");
        fs::create_dir(&staging).unwrap();
        fs::write(staging.join("new"), b"n").unwrap();
        fs::create_dir(&target).unwrap();
        fs::write(target.join("old"), b"o").unwrap();

        swap_into_place(&staging, &target).unwrap();
        assert!(target.join("new").exists());
        assert!(!target.join("old").exists());
        assert!(!staging.exists());
        assert!(!dir.path().join("index.previous").exists());
    }

    #[test]
    fn test_failed_swap_restores_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("index");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("old"), b"o").unwrap();

        let missing = dir.path().join("index.partial");
        assert!(swap_into_place(&missing, &target).is_err());
        assert!(target.join("old").exists());
        assert!(!dir.path().join("index.previous").exists());
    }

    #[test]
    fn test_staging_path_is_a_sibling() {
        assert_eq!(
            staging_path(Path::new("/var/index")),
            PathBuf::from("/var/index.partial")
        );
    }
}
