//! Repository identity and on-disk locations

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which repository is indexed and where its index lives
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Repository name/id. Defaults to the index directory name.
    #[serde(default)]
    pub id: Option<String>,

    /// Root of the artifact tree to scan
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Folder holding the index (created if missing)
    #[serde(default)]
    pub index_dir: Option<PathBuf>,
}

impl RepositoryConfig {
    /// Effective repository id: explicit id, else the index folder name.
    pub fn effective_id(&self) -> Option<String> {
        if let Some(id) = &self.id {
            return Some(id.clone());
        }
        self.index_dir
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
    }
}

impl crate::validation::Validate for RepositoryConfig {
    fn validate(&self) -> crate::error::Result<()> {
        use crate::error::ConfigError;

        if let Some(id) = &self.id {
            if id.trim().is_empty() {
                return Err(ConfigError::ValidationError {
                    field: "repository.id".to_string(),
                    message: "Repository id cannot be blank".to_string(),
                });
            }
            if id.contains('|') {
                return Err(ConfigError::ValidationError {
                    field: "repository.id".to_string(),
                    message: "Repository id cannot contain '|'".to_string(),
                });
            }
        }

        for (field, path) in [
            ("repository.root", &self.root),
            ("repository.index_dir", &self.index_dir),
        ] {
            if path.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
                return Err(ConfigError::ValidationError {
                    field: field.to_string(),
                    message: "Path cannot be empty".to_string(),
                });
            }
        }

        Ok(())
    }
}
