use crate::error::Result;
use crate::scanner::ScanListener;
use repodex_core::{ArtifactRecord, ChangeKind, ScanResult};
use repodex_store::IndexStore;
use std::path::Path;

/// Applies scan events to the store, then forwards them to `inner`.
///
/// Nothing is committed here; the caller owns the transaction.
pub struct IndexUpdater<'a, L: ScanListener + ?Sized> {
    store: &'a IndexStore,
    inner: &'a mut L,
}

impl<'a, L: ScanListener + ?Sized> IndexUpdater<'a, L> {
    pub fn new(store: &'a IndexStore, inner: &'a mut L) -> Self {
        Self { store, inner }
    }
}

impl<L: ScanListener + ?Sized> ScanListener for IndexUpdater<'_, L> {
    fn started(&mut self, root: &Path) {
        self.inner.started(root);
    }

    fn discovered(&mut self, record: &ArtifactRecord, change: ChangeKind) -> Result<()> {
        if change != ChangeKind::Unchanged {
            self.store.upsert(record.clone())?;
        }
        self.inner.discovered(record, change)
    }

    fn removed(&mut self, record: &ArtifactRecord) -> Result<()> {
        self.store.delete(&record.coordinate)?;
        self.inner.removed(record)
    }

    fn error(&mut self, path: &str, cause: &str) {
        self.inner.error(path, cause);
    }

    fn finished(&mut self, result: &ScanResult) {
        self.inner.finished(result);
    }
}
