//! Environment variable configuration overlay
//!
//! Supports environment variables in the format:
//! `REPODEX_<section>_<field>=value`
//!
//! Examples:
//! - `REPODEX_REPOSITORY_ID=central`
//! - `REPODEX_SCAN_EXTRACTORS=min,pom`
//! - `REPODEX_PACKAGING_MAX_CHUNKS=30`

use crate::{error::ConfigError, types::*, Config, Result};
use std::env;
use std::path::PathBuf;
use tracing::warn;

const PREFIX: &str = "REPODEX_";

/// Parse configuration from the process environment
pub fn from_env() -> Result<Option<Config>> {
    from_vars(env::vars())
}

/// Parse configuration from an explicit set of `(key, value)` pairs
///
/// Keys without the `REPODEX_` prefix are ignored. Unparseable values are
/// logged and skipped.
pub fn from_vars<I>(vars: I) -> Result<Option<Config>>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut config = Config::default();
    let mut found_any = false;

    for (key, value) in vars.into_iter().filter(|(k, _)| k.starts_with(PREFIX)) {
        found_any = true;
        if let Err(e) = apply_env_var(&mut config, &key, &value) {
            warn!("ignoring {}: {}", key, e);
        }
    }

    Ok(found_any.then_some(config))
}

/// Apply a single environment variable to config
fn apply_env_var(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let key = key.strip_prefix(PREFIX).unwrap_or(key);

    let (section, field) = key.split_once('_').ok_or_else(|| ConfigError::EnvVarError {
        var: key.to_string(),
        message: "Expected format: REPODEX_<section>_<field>".to_string(),
    })?;
    let section = section.to_lowercase();
    let field = field.to_lowercase();

    match section.as_str() {
        "repository" => apply_repository_var(&mut config.repository, &field, value),
        "scan" => apply_scan_var(&mut config.scan, &field, value),
        "packaging" => apply_packaging_var(&mut config.packaging, &field, value),
        _ => Err(ConfigError::EnvVarError {
            var: key.to_string(),
            message: format!("Unknown section: {}", section),
        }),
    }
}

fn apply_repository_var(config: &mut RepositoryConfig, field: &str, value: &str) -> Result<()> {
    match field {
        "id" => config.id = Some(value.to_string()),
        "root" => config.root = Some(PathBuf::from(value)),
        "index_dir" => config.index_dir = Some(PathBuf::from(value)),
        _ => return Err(unknown_field("REPOSITORY", field)),
    }
    Ok(())
}

fn apply_scan_var(config: &mut ScanConfig, field: &str, value: &str) -> Result<()> {
    match field {
        "extractors" => config.extractors = value.to_string(),
        "include" => config.include = split_list(value),
        "exclude" => config.exclude = split_list(value),
        "threads" => config.threads = parse_usize("SCAN_THREADS", value)?,
        "batch_size" => config.batch_size = parse_usize("SCAN_BATCH_SIZE", value)?,
        _ => return Err(unknown_field("SCAN", field)),
    }
    Ok(())
}

fn apply_packaging_var(config: &mut PackagingConfig, field: &str, value: &str) -> Result<()> {
    match field {
        "output_dir" => config.output_dir = Some(PathBuf::from(value)),
        "create_checksums" => {
            config.create_checksums = parse_bool("PACKAGING_CREATE_CHECKSUMS", value)?
        }
        "create_incremental_chunks" => {
            config.create_incremental_chunks =
                parse_bool("PACKAGING_CREATE_INCREMENTAL_CHUNKS", value)?
        }
        "max_chunks" => config.max_chunks = Some(parse_usize("PACKAGING_MAX_CHUNKS", value)?),
        _ => return Err(unknown_field("PACKAGING", field)),
    }
    Ok(())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_usize(var: &str, value: &str) -> Result<usize> {
    value.trim().parse().map_err(|_| ConfigError::EnvVarError {
        var: format!("{PREFIX}{var}"),
        message: format!("Invalid integer: {}", value),
    })
}

fn parse_bool(var: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::EnvVarError {
            var: format!("{PREFIX}{var}"),
            message: format!("Invalid boolean: {}", value),
        }),
    }
}

fn unknown_field(section: &str, field: &str) -> ConfigError {
    ConfigError::EnvVarError {
        var: format!("{PREFIX}{}_{}", section, field.to_uppercase()),
        message: format!("Unknown field: {}", field),
    }
}
