// Repository scanner
use crate::context::IndexingContext;
use crate::error::{PipelineError, Result};
use ignore::WalkBuilder;
use rayon::prelude::*;
use repodex_core::{
    ArtifactExtractor, ArtifactRecord, CancellationToken, ChangeKind, ExtractionError,
    ScanFailure, ScanResult, StoreEntry,
};
use repodex_store::ReadHandle;
use std::path::{Component, Path};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Receives scan events on the scanning thread, in path order.
///
/// `discovered` and `removed` may fail; the scan stops and surfaces the
/// error. Extraction failures arrive through `error` and never stop a scan.
pub trait ScanListener {
    fn started(&mut self, _root: &Path) {}

    fn discovered(&mut self, _record: &ArtifactRecord, _change: ChangeKind) -> Result<()> {
        Ok(())
    }

    /// A stored record whose backing file is gone.
    fn removed(&mut self, _record: &ArtifactRecord) -> Result<()> {
        Ok(())
    }

    fn error(&mut self, _path: &str, _cause: &str) {}

    fn finished(&mut self, _result: &ScanResult) {}
}

impl ScanListener for () {}

struct Candidate {
    relative_path: String,
    extractor: Arc<dyn ArtifactExtractor>,
}

type Extracted = std::result::Result<Option<ArtifactRecord>, ExtractionError>;

/// Walk the repository, extract every candidate file and classify the
/// records against the last commit. Never writes to the store.
pub fn scan(
    context: &IndexingContext,
    listener: &mut dyn ScanListener,
    cancel: &CancellationToken,
) -> Result<ScanResult> {
    let root = context.root();
    let snapshot = context.store().snapshot()?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(context.threads())
        .build()?;

    info!("scanning {}", root.display());
    listener.started(root);

    let mut result = ScanResult::default();
    let candidates = collect_candidates(context, &mut result, listener);
    result.total_files = candidates.len();

    for batch in batches(&candidates, context.batch_size()) {
        if cancel.is_cancelled() {
            info!("scan of {} cancelled", root.display());
            return Err(PipelineError::Cancelled);
        }

        let extracted: Vec<Extracted> = pool.install(|| {
            batch
                .par_iter()
                .map(|c| c.extractor.extract(root, &c.relative_path))
                .collect()
        });

        for (candidate, outcome) in batch.iter().zip(extracted) {
            match outcome {
                Ok(Some(record)) => {
                    let change = classify(&snapshot, &record)?;
                    debug!("{:?} {}", change, record.coordinate);
                    result.record_change(change);
                    listener.discovered(&record, change)?;
                }
                Ok(None) => debug!("nothing to index in {}", candidate.relative_path),
                Err(e) => {
                    warn!("{}", e);
                    let cause = e.to_string();
                    listener.error(&candidate.relative_path, &cause);
                    result.errors.push(ScanFailure {
                        path: candidate.relative_path.clone(),
                        cause,
                    });
                }
            }
        }
    }

    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }
    for record in snapshot.live_records()? {
        if !root.join(&record.path).is_file() {
            debug!("removed {}", record.coordinate);
            result.deleted += 1;
            listener.removed(&record)?;
        }
    }
    snapshot.release();

    info!(
        "scanned {} files: {} added, {} updated, {} unchanged, {} deleted, {} errors",
        result.total_files,
        result.added,
        result.updated,
        result.unchanged,
        result.deleted,
        result.errors.len()
    );
    listener.finished(&result);
    Ok(result)
}

fn classify(snapshot: &ReadHandle, record: &ArtifactRecord) -> Result<ChangeKind> {
    Ok(match snapshot.get(&record.coordinate)? {
        Some(StoreEntry::Live(existing)) if existing.same_content(record) => ChangeKind::Unchanged,
        Some(StoreEntry::Live(_)) => ChangeKind::Updated,
        Some(StoreEntry::Tombstone { .. }) | None => ChangeKind::Added,
    })
}

/// Files in deterministic walk order that pass the globs and are accepted
/// by an active extractor.
fn collect_candidates(
    context: &IndexingContext,
    result: &mut ScanResult,
    listener: &mut dyn ScanListener,
) -> Vec<Candidate> {
    let root = context.root();
    let walker = WalkBuilder::new(root)
        .hidden(true)
        .parents(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut candidates = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = walk_error_path(&err)
                    .map(|p| relative_path(root, p))
                    .unwrap_or_default();
                warn!("error walking {}: {}", root.display(), err);
                let cause = err.to_string();
                listener.error(&path, &cause);
                result.errors.push(ScanFailure { path, cause });
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let rel = relative_path(root, entry.path());
        if !context.is_selected(&rel) {
            continue;
        }
        if let Some(extractor) = context.extractor_for(&rel) {
            candidates.push(Candidate {
                relative_path: rel,
                extractor: Arc::clone(extractor),
            });
        }
    }
    candidates
}

/// Consecutive candidates sharing a parent directory, at most `size` each.
fn batches(candidates: &[Candidate], size: usize) -> Vec<&[Candidate]> {
    let mut out = Vec::new();
    let mut start = 0;
    for i in 1..=candidates.len() {
        let boundary = i == candidates.len()
            || i - start == size
            || parent(&candidates[i].relative_path) != parent(&candidates[start].relative_path);
        if boundary {
            out.push(&candidates[start..i]);
            start = i;
        }
    }
    out
}

fn parent(relative_path: &str) -> &str {
    relative_path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn walk_error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            walk_error_path(err)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use repodex_core::extractor::MinimalExtractor;

    fn candidates(paths: &[&str]) -> Vec<Candidate> {
        paths
            .iter()
            .map(|p| Candidate {
                relative_path: p.to_string(),
                extractor: Arc::new(MinimalExtractor),
            })
            .collect()
    }

    fn shape(batches: &[&[Candidate]]) -> Vec<Vec<String>> {
        batches
            .iter()
            .map(|b| b.iter().map(|c| c.relative_path.clone()).collect())
            .collect()
    }

    #[test]
    fn test_batches_split_on_directory_and_size() {
        let all = candidates(&["a/1/x.jar", "a/1/y.jar", "a/1/z.jar", "a/2/x.jar", "b.jar"]);
        let split = batches(&all, 2);
        assert_eq!(
            shape(&split),
            vec![
                vec!["a/1/x.jar", "a/1/y.jar"],
                vec!["a/1/z.jar"],
                vec!["a/2/x.jar"],
                vec!["b.jar"],
            ]
        );
    }

    #[test]
    fn test_batches_empty() {
        assert!(batches(&[], 4).is_empty());
    }

    #[test]
    fn test_relative_path_uses_forward_slashes() {
        let root = Path::new("/repo");
        assert_eq!(
            relative_path(root, &root.join("org").join("lib").join("x.jar")),
            "org/lib/x.jar"
        );
    }
}
