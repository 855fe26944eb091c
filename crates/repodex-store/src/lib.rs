//! Persistent artifact index.
//!
//! Records live in a tantivy index (one document per coordinate, live or
//! tombstoned); commit marks travel in the tantivy commit payload and a sled
//! journal keeps a human-readable history of commits. [`StoreReader`] reads
//! an index without taking the writer lock.

pub mod commit_log;
pub mod error;
pub mod reader;
pub mod schema;
pub mod snapshot;
pub mod storage;

pub use commit_log::{CommitEntry, CommitLog};
pub use error::{Result, StoreError};
pub use reader::StoreReader;
pub use snapshot::ReadHandle;
pub use storage::{CommitMarks, IndexStore, FORMAT_VERSION};
