//! Configuration management for repodex
//!
//! This crate provides a validated configuration system with support for:
//! - Multiple formats (YAML, TOML, JSON)
//! - Config validation with helpful error messages
//! - Config merging (file + environment + explicit overrides)
//!
//! # Example
//!
//! ```no_run
//! use repodex_config::Config;
//!
//! // Load from default location (.repodex.{toml,yml,yaml,json})
//! let config = Config::load()?;
//!
//! // Or load from specific file
//! let config = Config::from_file("path/to/repodex.toml")?;
//!
//! let extractors = config.scan.extractors.clone();
//! let keep = config.packaging.max_chunks;
//! # Ok::<(), repodex_config::ConfigError>(())
//! ```

pub mod error;
pub mod loader;
pub mod types;
pub mod validation;

pub use error::{ConfigError, Result};
pub use loader::ConfigBuilder;
pub use types::*;

/// Trait for config validation
pub use validation::Validate;
