//! Repository scanning configuration

use serde::{Deserialize, Serialize};

/// Controls which files are visited and how extraction is parallelized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Extractor selection: `default`, `full`, or a comma-separated list of names
    #[serde(default = "default_extractors")]
    pub extractors: String,

    /// Glob patterns (relative to the repository root) to restrict scanning to
    ///
    /// Empty means every file is a candidate.
    #[serde(default)]
    pub include: Vec<String>,

    /// Glob patterns to skip
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Extraction worker threads (0 = one per available core)
    #[serde(default)]
    pub threads: usize,

    /// Maximum number of files extracted per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extractors: default_extractors(),
            include: vec![],
            exclude: vec![],
            threads: 0,
            batch_size: default_batch_size(),
        }
    }
}

impl crate::validation::Validate for ScanConfig {
    fn validate(&self) -> crate::error::Result<()> {
        use crate::error::ConfigError;
        use crate::validation::{validate_min, validate_patterns};

        if self.extractors.split(',').all(|name| name.trim().is_empty()) {
            return Err(ConfigError::ValidationError {
                field: "scan.extractors".to_string(),
                message: "At least one extractor must be selected".to_string(),
            });
        }
        validate_patterns("scan.include", &self.include)?;
        validate_patterns("scan.exclude", &self.exclude)?;
        validate_min("scan.batch_size", self.batch_size, 0)?;

        Ok(())
    }
}

pub(crate) fn default_extractors() -> String {
    "default".to_string()
}

pub(crate) fn default_batch_size() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Validate;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ScanConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_batch_size_invalid() {
        let config = ScanConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_extractor_list_invalid() {
        let config = ScanConfig {
            extractors: " , ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = ScanConfig {
            include: vec!["org/**".to_string()],
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        let deserialized: ScanConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config, deserialized);
    }
}
