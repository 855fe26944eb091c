//! Configuration type definitions
//!
//! Each section is self-contained with validation and sensible defaults.

pub mod packaging;
pub mod repository;
pub mod scan;

pub use packaging::PackagingConfig;
pub use repository::RepositoryConfig;
pub use scan::ScanConfig;

use serde::{Deserialize, Serialize};

/// Main configuration struct aggregating all settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Repository identity and locations
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Repository scanning behavior
    #[serde(default)]
    pub scan: ScanConfig,

    /// Index packaging (baseline + incremental chunks)
    #[serde(default)]
    pub packaging: PackagingConfig,
}

impl crate::validation::Validate for Config {
    fn validate(&self) -> crate::error::Result<()> {
        self.repository.validate()?;
        self.scan.validate()?;
        self.packaging.validate()?;
        Ok(())
    }
}
