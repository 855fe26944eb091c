use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("index at {path} is locked by another writer")]
    Locked { path: PathBuf },

    #[error("index at {path} is unreadable or incompatible: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("no index found at {path}")]
    NotFound { path: PathBuf },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("search engine error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("invalid query: {0}")]
    Query(#[from] tantivy::query::QueryParserError),

    #[error("failed to decode stored entry: {0}")]
    Decode(#[from] bincode::Error),

    #[error("commit journal error: {0}")]
    Journal(#[from] sled::Error),

    #[error("high-water mark cannot move back from {current} to {requested}")]
    HighWaterRegression { current: u64, requested: u64 },

    #[error("index at {path} kept changing while a snapshot was taken")]
    Unsettled { path: PathBuf },

    #[error("store state poisoned by a panicked writer")]
    Poisoned,
}
