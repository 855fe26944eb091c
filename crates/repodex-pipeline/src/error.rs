use repodex_core::UnknownExtractor;
use repodex_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    UnknownExtractor(#[from] UnknownExtractor),

    #[error("repository root {path} is not a directory")]
    InvalidRepository { path: PathBuf },

    #[error("missing setting: {0}")]
    MissingSetting(&'static str),

    #[error("invalid glob pattern '{pattern}': {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("failed to start extraction workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("scan cancelled")]
    Cancelled,
}
