//! Maven-2 repository layout parsing and the minimal `min` extractor.
//!
//! `group/path/artifact/version/artifact-version[-classifier].ext`

use super::ArtifactExtractor;
use crate::error::ExtractionError;
use crate::models::{unix_millis, ArtifactCoordinate, ArtifactRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::debug;

pub const NAME: &str = "min";

const ARCHIVE_EXTENSIONS: &[&str] = &[
    "tar.gz", "tar.bz2", "tgz", "jar", "war", "ear", "aar", "rar", "zip", "pom",
];

const SIDECAR_SUFFIXES: &[&str] = &[".sha1", ".sha256", ".sha512", ".md5", ".asc"];

/// `20240101.120000-3` in timestamped snapshot file names.
static SNAPSHOT_STAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{8}\.\d{6}-\d+").expect("valid snapshot pattern"));

/// Files that live in the repository but never describe an artifact.
pub fn is_ignored(relative_path: &str) -> bool {
    let file_name = file_name(relative_path);
    file_name.starts_with("maven-metadata")
        || file_name == "_remote.repositories"
        || file_name.ends_with(".lastUpdated")
        || SIDECAR_SUFFIXES.iter().any(|s| file_name.ends_with(s))
}

pub fn has_archive_extension(relative_path: &str) -> bool {
    let file_name = file_name(relative_path);
    ARCHIVE_EXTENSIONS
        .iter()
        .any(|ext| file_name.len() > ext.len() + 1 && file_name.ends_with(&format!(".{ext}")))
}

fn file_name(relative_path: &str) -> &str {
    relative_path.rsplit('/').next().unwrap_or(relative_path)
}

/// Derive the coordinate of a file from its position in the layout.
pub fn parse_coordinate(relative_path: &str) -> Result<ArtifactCoordinate, ExtractionError> {
    let violation = |reason: &str| ExtractionError::Layout {
        path: relative_path.to_string(),
        reason: reason.to_string(),
    };

    let parts: Vec<&str> = relative_path.split('/').collect();
    if parts.len() < 4 || parts.iter().any(|p| p.is_empty()) {
        return Err(violation("expected group/artifact/version/file"));
    }
    let n = parts.len();
    let (file_name, version, artifact_id) = (parts[n - 1], parts[n - 2], parts[n - 3]);
    let group_id = parts[..n - 3].join(".");

    let after_artifact = file_name
        .strip_prefix(artifact_id)
        .and_then(|rest| rest.strip_prefix('-'))
        .ok_or_else(|| violation("file name does not start with the artifact id"))?;
    let after_version = strip_version(after_artifact, version)
        .ok_or_else(|| violation("file name does not carry the directory version"))?;

    let (stem, extension) = split_extension(after_version)
        .ok_or_else(|| violation("file name has no extension"))?;
    let classifier = match stem {
        "" => None,
        s => match s.strip_prefix('-') {
            Some(c) if !c.is_empty() => Some(c.to_string()),
            _ => return Err(violation("unexpected text between version and extension")),
        },
    };

    let mut coordinate = ArtifactCoordinate::new(group_id, artifact_id, version, extension);
    coordinate.classifier = classifier;
    Ok(coordinate)
}

fn strip_version<'a>(rest: &'a str, version: &str) -> Option<&'a str> {
    if let Some(after) = rest.strip_prefix(version) {
        return Some(after);
    }
    // A SNAPSHOT directory may hold timestamped files.
    let base = version.strip_suffix("-SNAPSHOT")?;
    let stamped = rest.strip_prefix(base)?.strip_prefix('-')?;
    let stamp = SNAPSHOT_STAMP.find(stamped)?;
    Some(&stamped[stamp.end()..])
}

/// Splits `-classifier.ext` into (`-classifier`, `ext`).
fn split_extension(rest: &str) -> Option<(&str, &str)> {
    for compound in ["tar.gz", "tar.bz2"] {
        if let Some(stem) = rest.strip_suffix(compound).and_then(|s| s.strip_suffix('.')) {
            return Some((stem, compound));
        }
    }
    let (stem, ext) = rest.rsplit_once('.')?;
    (!ext.is_empty()).then_some((stem, ext))
}

/// Coordinate plus filesystem facts: size, mtime and the `.sha1` sidecar.
pub fn base_record(root: &Path, relative_path: &str) -> Result<ArtifactRecord, ExtractionError> {
    let coordinate = parse_coordinate(relative_path)?;
    let full_path = root.join(relative_path);
    let metadata = fs::metadata(&full_path).map_err(|e| ExtractionError::Io {
        path: full_path.clone(),
        source: e,
    })?;

    let mut record = ArtifactRecord::new(coordinate, relative_path);
    record.size = metadata.len();
    record.last_modified = metadata.modified().map(unix_millis).unwrap_or(0);
    record.sha1 = read_sha1_sidecar(root, relative_path);
    Ok(record)
}

fn read_sha1_sidecar(root: &Path, relative_path: &str) -> Option<String> {
    let sidecar = root.join(format!("{relative_path}.sha1"));
    let content = fs::read_to_string(&sidecar).ok()?;
    let digest = content.split_whitespace().next()?.to_ascii_lowercase();
    if digest.len() == 40 && digest.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(digest)
    } else {
        debug!("ignoring malformed checksum file {}", sidecar.display());
        None
    }
}

/// Indexes every archive by its layout position and file metadata only.
#[derive(Debug, Default, Clone, Copy)]
pub struct MinimalExtractor;

impl ArtifactExtractor for MinimalExtractor {
    fn name(&self) -> &str {
        NAME
    }

    fn accepts(&self, relative_path: &str) -> bool {
        !is_ignored(relative_path) && has_archive_extension(relative_path)
    }

    fn extract(
        &self,
        root: &Path,
        relative_path: &str,
    ) -> Result<Option<ArtifactRecord>, ExtractionError> {
        base_record(root, relative_path).map(Some)
    }
}
