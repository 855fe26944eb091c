//! Pluggable artifact extraction.
//!
//! An extractor turns one repository file into an [`ArtifactRecord`]. The
//! [`ExtractorRegistry`] maps names to extractors and resolves the selection
//! syntax used on the command line (`default`, `full`, or `a,b,c`).

pub mod layout;
pub mod pom;

use crate::error::{ExtractionError, UnknownExtractor};
use crate::models::ArtifactRecord;
use std::path::Path;
use std::sync::Arc;

pub use layout::MinimalExtractor;
pub use pom::PomExtractor;

pub trait ArtifactExtractor: Send + Sync {
    fn name(&self) -> &str;

    /// Cheap filename test; no I/O.
    fn accepts(&self, relative_path: &str) -> bool;

    /// `Ok(None)` means the file was accepted but carries nothing to index.
    fn extract(
        &self,
        root: &Path,
        relative_path: &str,
    ) -> Result<Option<ArtifactRecord>, ExtractionError>;
}

/// Selection resolving to the `pom` and `min` extractors.
pub const DEFAULT_SELECTION: &str = "default";
/// Selection resolving to every registered extractor.
pub const FULL_SELECTION: &str = "full";

const DEFAULT_EXTRACTORS: &[&str] = &[pom::NAME, layout::NAME];

/// Name -> extractor table, in registration order.
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    entries: Vec<Arc<dyn ArtifactExtractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(MinimalExtractor));
        registry.register(Arc::new(PomExtractor));
        registry
    }

    /// Adds an extractor; one with the same name is replaced in place.
    pub fn register(&mut self, extractor: Arc<dyn ArtifactExtractor>) {
        match self
            .entries
            .iter_mut()
            .find(|existing| existing.name() == extractor.name())
        {
            Some(slot) => *slot = extractor,
            None => self.entries.push(extractor),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ArtifactExtractor>> {
        self.entries.iter().find(|e| e.name() == name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name().to_string()).collect()
    }

    /// Resolve a selection into the ordered list of active extractors.
    pub fn resolve(&self, selection: &str) -> Result<Vec<Arc<dyn ArtifactExtractor>>, UnknownExtractor> {
        match selection.trim() {
            FULL_SELECTION => Ok(self.entries.clone()),
            DEFAULT_SELECTION | "" => DEFAULT_EXTRACTORS
                .iter()
                .map(|name| self.lookup(name))
                .collect(),
            list => list
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| self.lookup(name))
                .collect(),
        }
    }

    fn lookup(&self, name: &str) -> Result<Arc<dyn ArtifactExtractor>, UnknownExtractor> {
        self.get(name).ok_or_else(|| UnknownExtractor {
            name: name.to_string(),
            available: self.names(),
        })
    }
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("extractors", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(list: &[Arc<dyn ArtifactExtractor>]) -> Vec<&str> {
        list.iter().map(|e| e.name()).collect()
    }

    #[test]
    fn test_default_selection() {
        let registry = ExtractorRegistry::with_builtins();
        let active = registry.resolve("default").unwrap();
        assert_eq!(names(&active), vec!["pom", "min"]);
    }

    #[test]
    fn test_full_selection_uses_registration_order() {
        let registry = ExtractorRegistry::with_builtins();
        let active = registry.resolve("full").unwrap();
        assert_eq!(names(&active), vec!["min", "pom"]);
    }

    #[test]
    fn test_explicit_list() {
        let registry = ExtractorRegistry::with_builtins();
        let active = registry.resolve(" min , ").unwrap();
        assert_eq!(names(&active), vec!["min"]);
    }

    #[test]
    fn test_unknown_extractor() {
        let registry = ExtractorRegistry::with_builtins();
        let err = registry.resolve("min,osgi").err().unwrap();
        assert_eq!(err.name, "osgi");
        assert!(err.to_string().contains("min, pom"));
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = ExtractorRegistry::with_builtins();
        registry.register(Arc::new(MinimalExtractor));
        assert_eq!(registry.names(), vec!["min", "pom"]);
    }
}
