// Chunk packager
use crate::checksum::{sidecar_paths, sidecars, FileDigests};
use crate::error::{PackError, Result};
use crate::format::{
    baseline_file_name, chunk_file_name, write_pack_file, write_synced, BaselineHeader,
    ChunkEntry, ChunkHeader, PACK_FORMAT_VERSION,
};
use crate::manifest::{BaselineDescriptor, ChunkDescriptor, ChunkManifest, RetentionPolicy};
use repodex_config::PackagingConfig;
use repodex_core::now_millis;
use repodex_store::{IndexStore, ReadHandle};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where and how to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagingRequest {
    pub output_dir: PathBuf,
    pub create_checksums: bool,
    pub create_incremental_chunks: bool,
    pub max_chunks: Option<usize>,
}

impl PackagingRequest {
    /// Baseline only, no sidecars, unlimited retention.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            create_checksums: false,
            create_incremental_chunks: false,
            max_chunks: None,
        }
    }

    /// `None` when the configuration names no output folder.
    pub fn from_config(config: &PackagingConfig) -> Option<Self> {
        Some(Self {
            output_dir: config.output_dir.clone()?,
            create_checksums: config.create_checksums,
            create_incremental_chunks: config.create_incremental_chunks,
            max_chunks: config.max_chunks,
        })
    }

    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy::from_max_chunks(self.max_chunks)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackOutcome {
    pub baseline: PathBuf,
    pub new_chunk: Option<PathBuf>,
    /// Chunks dropped from the manifest by this run.
    pub pruned: Vec<ChunkDescriptor>,
    pub manifest: ChunkManifest,
}

/// A file written under a temporary name, waiting to be moved into place.
struct Staged {
    tmp: PathBuf,
    path: PathBuf,
}

/// Files of one publish. Dropping it before [`StagedFiles::commit`] removes
/// the temporaries and every file already moved into place.
struct StagedFiles {
    checksums: bool,
    pending: Vec<Staged>,
    published: Vec<PathBuf>,
}

impl StagedFiles {
    fn new(checksums: bool) -> Self {
        Self {
            checksums,
            pending: Vec::new(),
            published: Vec::new(),
        }
    }

    /// Write `path` (and its sidecars when asked) under temporary names.
    fn stage<F>(&mut self, path: PathBuf, write: F) -> Result<FileDigests>
    where
        F: FnOnce(&Path) -> Result<FileDigests>,
    {
        let tmp = tmp_path(&path);
        let digests = match write(&tmp) {
            Ok(digests) => digests,
            Err(e) => {
                remove_quietly(&tmp);
                return Err(e);
            }
        };
        self.pending.push(Staged { tmp, path: path.clone() });

        if self.checksums {
            for (sidecar, digest) in sidecars(&path, &digests) {
                let tmp = tmp_path(&sidecar);
                self.pending.push(Staged {
                    tmp: tmp.clone(),
                    path: sidecar,
                });
                write_synced(&tmp, digest.as_bytes())?;
            }
        }
        Ok(digests)
    }

    /// Rename every temporary into place, in staging order.
    fn publish(&mut self) -> Result<()> {
        let mut pending = std::mem::take(&mut self.pending).into_iter();
        while let Some(file) = pending.next() {
            if let Err(e) = fs::rename(&file.tmp, &file.path) {
                let err = PackError::io(&file.path, e);
                self.pending.push(file);
                self.pending.extend(pending);
                return Err(err);
            }
            self.published.push(file.path);
        }
        Ok(())
    }

    /// Keep the published files.
    fn commit(mut self) {
        self.published.clear();
    }
}

impl Drop for StagedFiles {
    fn drop(&mut self) {
        for file in &self.pending {
            remove_quietly(&file.tmp);
        }
        for path in &self.published {
            debug!("rolling back {}", path.display());
            remove_quietly(path);
        }
    }
}

/// Publish `snapshot` into `request.output_dir`.
///
/// A new baseline is always written. With incremental chunks enabled and a
/// `prior` manifest, everything written since the prior publish goes into
/// one new chunk. New files never reuse a name the prior manifest points
/// at, and the manifest is replaced only after every new file is in place.
/// The prior baseline and pruned chunk files are deleted after that. On
/// failure the new files are removed and the prior publish stays as it was.
pub fn pack(
    snapshot: &ReadHandle,
    prior: Option<&ChunkManifest>,
    request: &PackagingRequest,
) -> Result<PackOutcome> {
    let repository_id = snapshot.repository_id().to_string();
    let high_water = snapshot.high_water();
    let out = &request.output_dir;

    if let Some(prior) = prior {
        if prior.repository_id != repository_id {
            return Err(PackError::RepositoryMismatch {
                path: ChunkManifest::path_in(out),
                expected: repository_id,
                found: prior.repository_id.clone(),
            });
        }
        if high_water < prior.high_water() {
            return Err(PackError::StaleSnapshot {
                snapshot: high_water,
                published: prior.high_water(),
            });
        }
    }

    fs::create_dir_all(out).map_err(|e| PackError::io(out, e))?;
    let created_at_ms = now_millis();
    let generation = prior.map_or(1, |p| p.generation + 1);
    let mut staged = StagedFiles::new(request.create_checksums);

    let mut next_chunk_id = prior.map_or(1, |p| p.next_chunk_id);
    let mut chunks = Vec::new();
    let mut new_chunk = None;
    let mut dropped = Vec::new();

    match prior {
        Some(prior) if request.create_incremental_chunks => {
            chunks = prior.chunks.clone();
            if high_water > prior.high_water() {
                let descriptor = stage_chunk(
                    &mut staged,
                    snapshot,
                    prior.high_water(),
                    next_chunk_id,
                    created_at_ms,
                    out,
                )?;
                next_chunk_id += 1;
                new_chunk = Some(out.join(&descriptor.file));
                chunks.push(descriptor);
            }
        }
        Some(prior) => {
            if !prior.chunks.is_empty() {
                info!(
                    "incremental chunks disabled, dropping {} published chunks",
                    prior.chunks.len()
                );
            }
            dropped = prior.chunks.clone();
        }
        None => {}
    }

    let baseline_chunk_id = if request.create_incremental_chunks {
        chunks
            .last()
            .map(|c| c.id)
            .or_else(|| prior.and_then(|p| p.baseline.chunk_id))
    } else {
        None
    };

    let pruned_by_policy = request.retention().select_pruned(&chunks);
    chunks.drain(..pruned_by_policy.len());
    dropped.extend(pruned_by_policy);

    let baseline = stage_baseline(
        &mut staged,
        snapshot,
        generation,
        baseline_chunk_id,
        created_at_ms,
        out,
    )?;

    staged.publish()?;

    let manifest = ChunkManifest {
        format_version: PACK_FORMAT_VERSION,
        repository_id,
        generation,
        baseline,
        chunks,
        next_chunk_id,
    };
    manifest.save(out)?;
    staged.commit();

    if let Some(prior) = prior {
        if prior.baseline.file != manifest.baseline.file {
            delete_published(&out.join(&prior.baseline.file));
        }
    }
    for chunk in &dropped {
        delete_published(&out.join(&chunk.file));
    }

    info!(
        "published '{}' at version {}: {} records, {} chunks retained, {} pruned",
        manifest.repository_id,
        manifest.high_water(),
        manifest.baseline.record_count,
        manifest.chunks.len(),
        dropped.len()
    );

    Ok(PackOutcome {
        baseline: out.join(&manifest.baseline.file),
        new_chunk,
        pruned: dropped,
        manifest,
    })
}

/// Pack the last commit of `store` on top of whatever `request.output_dir`
/// already holds.
pub fn pack_directory(store: &IndexStore, request: &PackagingRequest) -> Result<PackOutcome> {
    let prior = ChunkManifest::load(&request.output_dir)?;
    let snapshot = store.snapshot()?;
    let outcome = pack(&snapshot, prior.as_ref(), request);
    snapshot.release();
    outcome
}

fn stage_baseline(
    staged: &mut StagedFiles,
    snapshot: &ReadHandle,
    generation: u64,
    chunk_id: Option<u64>,
    created_at_ms: u64,
    out: &Path,
) -> Result<BaselineDescriptor> {
    let records = snapshot.live_records()?;
    let header = BaselineHeader {
        format_version: PACK_FORMAT_VERSION,
        repository_id: snapshot.repository_id().to_string(),
        record_count: records.len() as u64,
        high_water: snapshot.high_water(),
        chunk_id,
        created_at_ms,
    };
    debug!("baseline with {} records at version {}", header.record_count, header.high_water);

    let file = baseline_file_name(generation);
    let digests = staged.stage(out.join(&file), |tmp| {
        write_pack_file(tmp, &header, &records)
    })?;

    Ok(BaselineDescriptor {
        file,
        high_water: header.high_water,
        record_count: header.record_count,
        chunk_id,
        sha256: digests.sha256,
        size: digests.size,
        created_at_ms,
    })
}

fn stage_chunk(
    staged: &mut StagedFiles,
    snapshot: &ReadHandle,
    from_version: u64,
    chunk_id: u64,
    created_at_ms: u64,
    out: &Path,
) -> Result<ChunkDescriptor> {
    let entries: Vec<ChunkEntry> = snapshot
        .entries_since(from_version)?
        .into_iter()
        .map(ChunkEntry::from)
        .collect();
    let header = ChunkHeader {
        format_version: PACK_FORMAT_VERSION,
        repository_id: snapshot.repository_id().to_string(),
        chunk_id,
        from_version,
        to_version: snapshot.high_water(),
        entry_count: entries.len() as u64,
        created_at_ms,
    };
    debug!(
        "chunk {} with {} entries covering ({}, {}]",
        chunk_id, header.entry_count, header.from_version, header.to_version
    );

    let file = chunk_file_name(chunk_id);
    let digests = staged.stage(out.join(&file), |tmp| {
        write_pack_file(tmp, &header, &entries)
    })?;

    Ok(ChunkDescriptor {
        id: chunk_id,
        file,
        from_version,
        to_version: header.to_version,
        entry_count: header.entry_count,
        sha256: digests.sha256,
        size: digests.size,
        created_at_ms,
    })
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("failed to remove {}: {}", path.display(), e);
        }
    }
}

/// A published file and its sidecars.
fn delete_published(path: &Path) {
    debug!("pruning {}", path.display());
    remove_quietly(path);
    for sidecar in sidecar_paths(path) {
        remove_quietly(&sidecar);
    }
}
