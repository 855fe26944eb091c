use crate::error::{PipelineError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use repodex_config::{Config, ScanConfig};
use repodex_core::{ArtifactExtractor, ExtractorRegistry};
use repodex_store::IndexStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Everything needed to open an [`IndexingContext`].
#[derive(Debug, Clone, PartialEq)]
pub struct ContextSpec {
    pub repository_id: String,
    pub repository_root: PathBuf,
    pub index_dir: PathBuf,
    /// `default`, `full`, or a comma-separated list of extractor names.
    pub extractors: String,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub threads: usize,
    pub batch_size: usize,
}

impl ContextSpec {
    pub fn new(
        repository_id: impl Into<String>,
        repository_root: impl Into<PathBuf>,
        index_dir: impl Into<PathBuf>,
    ) -> Self {
        let scan = ScanConfig::default();
        Self {
            repository_id: repository_id.into(),
            repository_root: repository_root.into(),
            index_dir: index_dir.into(),
            extractors: scan.extractors,
            include: scan.include,
            exclude: scan.exclude,
            threads: scan.threads,
            batch_size: scan.batch_size,
        }
    }

    pub fn with_extractors(mut self, selection: impl Into<String>) -> Self {
        self.extractors = selection.into();
        self
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let root = config
            .repository
            .root
            .clone()
            .ok_or(PipelineError::MissingSetting("repository.root"))?;
        let index_dir = config
            .repository
            .index_dir
            .clone()
            .ok_or(PipelineError::MissingSetting("repository.index_dir"))?;
        let id = config
            .repository
            .effective_id()
            .ok_or(PipelineError::MissingSetting("repository.id"))?;

        Ok(Self {
            repository_id: id,
            repository_root: root,
            index_dir,
            extractors: config.scan.extractors.clone(),
            include: config.scan.include.clone(),
            exclude: config.scan.exclude.clone(),
            threads: config.scan.threads,
            batch_size: config.scan.batch_size,
        })
    }
}

/// One indexing run's resources: the repository, the active extractors and
/// the open index store.
///
/// The store is released by [`close`](Self::close) or, failing that, on drop.
pub struct IndexingContext {
    repository_id: String,
    root: PathBuf,
    index_dir: PathBuf,
    extractors: Vec<Arc<dyn ArtifactExtractor>>,
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
    threads: usize,
    batch_size: usize,
    store: Option<IndexStore>,
}

impl IndexingContext {
    pub fn open(spec: ContextSpec, registry: &ExtractorRegistry) -> Result<Self> {
        let extractors = registry.resolve(&spec.extractors)?;
        if !spec.repository_root.is_dir() {
            return Err(PipelineError::InvalidRepository {
                path: spec.repository_root,
            });
        }
        let include = build_globset(&spec.include)?;
        let exclude = build_globset(&spec.exclude)?;
        let store = IndexStore::open(&spec.index_dir, &spec.repository_id)?;

        info!(
            "indexing context for '{}' ({}) with extractors [{}]",
            spec.repository_id,
            spec.repository_root.display(),
            extractors
                .iter()
                .map(|e| e.name())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            repository_id: spec.repository_id,
            root: spec.repository_root,
            index_dir: spec.index_dir,
            extractors,
            include,
            exclude,
            threads: spec.threads,
            batch_size: spec.batch_size.max(1),
            store: Some(store),
        })
    }

    pub fn repository_id(&self) -> &str {
        &self.repository_id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    pub fn extractors(&self) -> &[Arc<dyn ArtifactExtractor>] {
        &self.extractors
    }

    pub fn extractor_names(&self) -> Vec<String> {
        self.extractors.iter().map(|e| e.name().to_string()).collect()
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn store(&self) -> &IndexStore {
        self.store
            .as_ref()
            .expect("store is only taken by close or drop")
    }

    /// Whether include/exclude patterns admit `relative_path`.
    pub fn is_selected(&self, relative_path: &str) -> bool {
        if let Some(set) = &self.include {
            if !set.is_match(relative_path) {
                return false;
            }
        }
        if let Some(set) = &self.exclude {
            if set.is_match(relative_path) {
                return false;
            }
        }
        true
    }

    /// First active extractor accepting `relative_path`.
    pub fn extractor_for(&self, relative_path: &str) -> Option<&Arc<dyn ArtifactExtractor>> {
        self.extractors.iter().find(|e| e.accepts(relative_path))
    }

    pub fn close(mut self) -> Result<()> {
        match self.store.take() {
            Some(store) => Ok(store.close()?),
            None => Ok(()),
        }
    }
}

impl Drop for IndexingContext {
    fn drop(&mut self) {
        if let Some(store) = self.store.take() {
            if let Err(e) = store.close() {
                warn!("failed to release index {}: {}", self.index_dir.display(), e);
            }
        }
    }
}

pub fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| PipelineError::Glob {
            pattern: pattern.clone(),
            source: e,
        })?;
        builder.add(glob);
    }
    let set = builder.build().map_err(|e| PipelineError::Glob {
        pattern: patterns.join(","),
        source: e,
    })?;
    Ok(Some(set))
}
