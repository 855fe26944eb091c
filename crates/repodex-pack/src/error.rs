use repodex_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PackError>;

#[derive(Debug, Error)]
pub enum PackError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{path} is not a valid index file: {reason}")]
    Format { path: PathBuf, reason: String },

    #[error("{path} has format version {found}, expected {expected}")]
    IncompatibleFormat {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("{path} belongs to repository '{found}', expected '{expected}'")]
    RepositoryMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("chunk {chunk_id} {}", describe_discontinuity(.expected_from, .found_from, .follows))]
    ManifestDiscontinuity {
        chunk_id: u64,
        expected_from: u64,
        found_from: u64,
        /// Higher chunk id this one was listed after, when out of order.
        follows: Option<u64>,
    },

    #[error("index at version {snapshot} is older than the published baseline at version {published}")]
    StaleSnapshot { snapshot: u64, published: u64 },

    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("invalid manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no published index in {path}")]
    NoManifest { path: PathBuf },
}

fn describe_discontinuity(expected_from: &u64, found_from: &u64, follows: &Option<u64>) -> String {
    match follows {
        Some(previous) => format!("is listed after chunk {previous}"),
        None => format!(
            "starts after version {found_from}, but the index is at version {expected_from}"
        ),
    }
}

impl PackError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PackError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PackError::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
