use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single extractor on a single file. Never fatal for a scan.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} does not follow the repository layout: {reason}")]
    Layout { path: String, reason: String },

    #[error("invalid artifact metadata in {path}: {message}")]
    Metadata { path: String, message: String },
}

#[derive(Debug, Error)]
#[error("unknown extractor '{name}' (available: {})", .available.join(", "))]
pub struct UnknownExtractor {
    pub name: String,
    pub available: Vec<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoordinateError {
    #[error("expected group:artifact:extension[:classifier]:version, got '{0}'")]
    Malformed(String),

    #[error("malformed coordinate key '{0}'")]
    MalformedKey(String),
}
