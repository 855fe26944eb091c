use crate::error::{PackError, Result};
use crate::format::{write_synced, MANIFEST_FILE, PACK_FORMAT_VERSION};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineDescriptor {
    pub file: String,
    pub high_water: u64,
    pub record_count: u64,
    /// Newest chunk already folded into the baseline.
    pub chunk_id: Option<u64>,
    pub sha256: String,
    pub size: u64,
    pub created_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDescriptor {
    pub id: u64,
    pub file: String,
    /// Versions in `(from_version, to_version]`.
    pub from_version: u64,
    pub to_version: u64,
    pub entry_count: u64,
    pub sha256: String,
    pub size: u64,
    pub created_at_ms: u64,
}

/// Index of a published output directory. Written last on every pack, so a
/// reader never sees a manifest naming files that are not in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkManifest {
    pub format_version: u32,
    pub repository_id: String,
    /// Number of publishes into this directory; names the baseline file.
    #[serde(default)]
    pub generation: u64,
    pub baseline: BaselineDescriptor,
    /// Retained chunks, ascending by id.
    pub chunks: Vec<ChunkDescriptor>,
    /// Id the next chunk will take. Never decreases.
    pub next_chunk_id: u64,
}

impl ChunkManifest {
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(MANIFEST_FILE)
    }

    /// Version the published files bring a consumer up to.
    pub fn high_water(&self) -> u64 {
        self.baseline.high_water
    }

    /// Retained chunks a store at `high_water` has not seen yet.
    pub fn chunks_after(&self, high_water: u64) -> impl Iterator<Item = &ChunkDescriptor> {
        self.chunks.iter().filter(move |c| c.to_version > high_water)
    }

    /// Read the manifest in `dir`, `None` when nothing was published yet.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = Self::path_in(dir);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).map_err(|e| PackError::io(&path, e))?;
        let manifest: ChunkManifest =
            serde_json::from_slice(&bytes).map_err(|e| PackError::Manifest {
                path: path.clone(),
                source: e,
            })?;
        if manifest.format_version != PACK_FORMAT_VERSION {
            return Err(PackError::IncompatibleFormat {
                path,
                found: manifest.format_version,
                expected: PACK_FORMAT_VERSION,
            });
        }
        Ok(Some(manifest))
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = Self::path_in(dir);
        let bytes = serde_json::to_vec_pretty(self).map_err(|e| PackError::Manifest {
            path: path.clone(),
            source: e,
        })?;
        let tmp = path.with_extension("json.tmp");
        let saved = write_synced(&tmp, &bytes)
            .and_then(|()| fs::rename(&tmp, &path).map_err(|e| PackError::io(&path, e)));
        if saved.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        saved
    }
}

/// How many incremental chunks a publish keeps around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetentionPolicy {
    #[default]
    KeepAll,
    KeepLast(usize),
}

impl RetentionPolicy {
    pub fn from_max_chunks(max_chunks: Option<usize>) -> Self {
        max_chunks.map_or(Self::KeepAll, Self::KeepLast)
    }

    /// Chunks to drop from `chunks` (ascending by id), oldest first.
    pub fn select_pruned(&self, chunks: &[ChunkDescriptor]) -> Vec<ChunkDescriptor> {
        match *self {
            Self::KeepAll => Vec::new(),
            Self::KeepLast(keep) => {
                let drop = chunks.len().saturating_sub(keep);
                chunks[..drop].to_vec()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chunk(id: u64) -> ChunkDescriptor {
        ChunkDescriptor {
            id,
            file: crate::format::chunk_file_name(id),
            from_version: id * 10,
            to_version: id * 10 + 10,
            entry_count: 1,
            sha256: String::new(),
            size: 0,
            created_at_ms: 0,
        }
    }

    fn manifest(chunks: Vec<ChunkDescriptor>) -> ChunkManifest {
        ChunkManifest {
            format_version: PACK_FORMAT_VERSION,
            repository_id: "central".to_string(),
            generation: 7,
            baseline: BaselineDescriptor {
                file: crate::format::baseline_file_name(7),
                high_water: 40,
                record_count: 3,
                chunk_id: Some(3),
                sha256: "ab".to_string(),
                size: 12,
                created_at_ms: 1,
            },
            next_chunk_id: 4,
            chunks,
        }
    }

    #[test]
    fn test_keep_last_drops_oldest() {
        let chunks = vec![chunk(1), chunk(2), chunk(3)];
        let ids = |v: Vec<ChunkDescriptor>| v.into_iter().map(|c| c.id).collect::<Vec<_>>();

        assert_eq!(ids(RetentionPolicy::KeepLast(2).select_pruned(&chunks)), vec![1]);
        assert_eq!(ids(RetentionPolicy::KeepLast(0).select_pruned(&chunks)), vec![1, 2, 3]);
        assert!(RetentionPolicy::KeepLast(5).select_pruned(&chunks).is_empty());
        assert!(RetentionPolicy::KeepAll.select_pruned(&chunks).is_empty());
        assert_eq!(RetentionPolicy::from_max_chunks(None), RetentionPolicy::KeepAll);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(ChunkManifest::load(dir.path()).unwrap(), None);

        let written = manifest(vec![chunk(1), chunk(2), chunk(3)]);
        written.save(dir.path()).unwrap();
        assert!(!dir.path().join("repodex-index.manifest.json.tmp").exists());

        let read = ChunkManifest::load(dir.path()).unwrap().unwrap();
        assert_eq!(read, written);
        assert_eq!(read.chunks_after(25).map(|c| c.id).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_garbage_manifest() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(ChunkManifest::path_in(dir.path()), "{not json").unwrap();
        assert!(matches!(
            ChunkManifest::load(dir.path()),
            Err(PackError::Manifest { .. })
        ));
    }
}
