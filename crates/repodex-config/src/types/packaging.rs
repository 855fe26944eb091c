//! Index packaging configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where and how the baseline and incremental chunks are published
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackagingConfig {
    /// Folder receiving the baseline, chunk files and manifest
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Write `.md5` / `.sha1` files next to every published file
    #[serde(default)]
    pub create_checksums: bool,

    /// Emit incremental chunks in addition to the baseline
    #[serde(default)]
    pub create_incremental_chunks: bool,

    /// Number of chunks to keep (unlimited when absent)
    #[serde(default)]
    pub max_chunks: Option<usize>,
}

impl crate::validation::Validate for PackagingConfig {
    fn validate(&self) -> crate::error::Result<()> {
        if let Some(max) = self.max_chunks {
            crate::validation::validate_min("packaging.max_chunks", max, 0)?;
        }
        Ok(())
    }
}
