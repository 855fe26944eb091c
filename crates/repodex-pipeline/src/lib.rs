//! Indexing pipeline: open a context, scan the repository, apply the
//! changes to the index store.

pub mod context;
pub mod error;
pub mod run;
pub mod scanner;
pub mod update;

pub use context::{ContextSpec, IndexingContext};
pub use error::{PipelineError, Result};
pub use run::index_repository;
pub use scanner::{scan, ScanListener};
pub use update::IndexUpdater;
