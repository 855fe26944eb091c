use crate::context::IndexingContext;
use crate::error::Result;
use crate::scanner::{scan, ScanListener};
use crate::update::IndexUpdater;
use repodex_core::{CancellationToken, ScanResult};
use tracing::{info, warn};

/// Scan the repository and apply every change to the store in one commit.
///
/// Extraction errors are reported through `listener` and in the result. On
/// cancellation or a store failure the uncommitted batch is rolled back and
/// the index is left as it was.
pub fn index_repository(
    context: &IndexingContext,
    listener: &mut dyn ScanListener,
    cancel: &CancellationToken,
) -> Result<ScanResult> {
    let store = context.store();
    let outcome = {
        let mut updater = IndexUpdater::new(store, listener);
        scan(context, &mut updater, cancel)
    };

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            if let Err(rollback) = store.rollback() {
                warn!("rollback after failed scan also failed: {}", rollback);
            }
            return Err(e);
        }
    };

    let note = summary_note(&result);
    if let Err(e) = store.commit(&note) {
        if let Err(rollback) = store.rollback() {
            warn!("rollback after failed commit also failed: {}", rollback);
        }
        return Err(e.into());
    }
    info!("indexed '{}': {}", context.repository_id(), note);
    Ok(result)
}

fn summary_note(result: &ScanResult) -> String {
    format!(
        "scan: {} added, {} updated, {} deleted, {} errors",
        result.added,
        result.updated,
        result.deleted,
        result.errors.len()
    )
}
