//! Configuration loading from various sources

pub mod env;
pub mod file;
pub mod formats;
pub mod merge;

use crate::{Config, Result, Validate};
use std::path::{Path, PathBuf};

/// Format for configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format (.yml, .yaml)
    Yaml,
    /// TOML format (.toml)
    Toml,
    /// JSON format (.json)
    Json,
}

/// Configuration source for layered loading
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Load from a file
    File(PathBuf),
    /// Load from environment variables
    Environment,
    /// Explicit config object (for programmatic use and CLI flags)
    Explicit(Config),
}

/// Builder for loading and merging configurations
///
/// Supports layered configuration with proper precedence:
/// defaults < file < environment < explicit overrides
///
/// # Example
///
/// ```no_run
/// use repodex_config::loader::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .with_file(".repodex.toml")
///     .with_env()
///     .build()?;
/// # Ok::<(), repodex_config::ConfigError>(())
/// ```
pub struct ConfigBuilder {
    sources: Vec<ConfigSource>,
}

impl ConfigBuilder {
    /// Create a new config builder starting with defaults
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Add a file source
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.sources
            .push(ConfigSource::File(path.as_ref().to_path_buf()));
        self
    }

    /// Add environment variable overlay
    pub fn with_env(mut self) -> Self {
        self.sources.push(ConfigSource::Environment);
        self
    }

    /// Add explicit config overlay
    pub fn with_config(mut self, config: Config) -> Self {
        self.sources.push(ConfigSource::Explicit(config));
        self
    }

    /// Build and validate the final configuration
    ///
    /// Merges all sources in order, with later sources taking precedence.
    pub fn build(self) -> Result<Config> {
        let mut config = Config::default();

        for source in self.sources {
            match source {
                ConfigSource::File(path) => {
                    let file_config = file::load_from_file(&path)?;
                    config = merge::merge(config, file_config);
                }
                ConfigSource::Environment => {
                    if let Some(env_config) = env::from_env()? {
                        config = merge::merge(config, env_config);
                    }
                }
                ConfigSource::Explicit(explicit_config) => {
                    config = merge::merge(config, explicit_config);
                }
            }
        }

        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// File names checked by [`Config::load`], in order.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    ".repodex.toml",
    ".repodex.yml",
    ".repodex.yaml",
    ".repodex.json",
];

impl Config {
    /// Load configuration from default locations
    ///
    /// Uses the first existing file of [`DEFAULT_CONFIG_FILES`] in the
    /// current directory, falling back to defaults, then applies the
    /// environment overlay.
    pub fn load() -> Result<Self> {
        let mut builder = ConfigBuilder::new();

        if let Some(path) = DEFAULT_CONFIG_FILES
            .iter()
            .find(|path| Path::new(path).exists())
        {
            builder = builder.with_file(path);
        }

        builder.with_env().build()
    }

    /// Load configuration from a specific file plus the environment overlay
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        ConfigBuilder::new().with_file(path).with_env().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PackagingConfig, RepositoryConfig};
    use std::io::Write;

    #[test]
    fn test_builder_default() {
        let config = ConfigBuilder::new().build().unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_explicit_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[repository]\nid = \"from-file\"\n\n[packaging]\nmax_chunks = 4"
        )
        .unwrap();

        let explicit = Config {
            repository: RepositoryConfig {
                id: Some("from-cli".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        let config = ConfigBuilder::new()
            .with_file(file.path())
            .with_config(explicit)
            .build()
            .unwrap();

        assert_eq!(config.repository.id.as_deref(), Some("from-cli"));
        assert_eq!(config.packaging.max_chunks, Some(4));
    }

    #[test]
    fn test_invalid_overlay_rejected() {
        let explicit = Config {
            packaging: PackagingConfig {
                max_chunks: Some(0),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(ConfigBuilder::new().with_config(explicit).build().is_err());
    }
}
