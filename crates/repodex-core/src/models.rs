use crate::error::CoordinateError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Placeholder used in coordinate keys for an absent classifier.
const NO_CLASSIFIER: &str = "NA";

/// Identity of one artifact file in the repository.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtifactCoordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    pub extension: String,
}

impl ArtifactCoordinate {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            classifier: None,
            extension: extension.into(),
        }
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    /// Canonical unique key, `group|artifact|version|classifier|extension`.
    pub fn key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.group_id,
            self.artifact_id,
            self.version,
            self.classifier.as_deref().unwrap_or(NO_CLASSIFIER),
            self.extension
        )
    }

    pub fn from_key(key: &str) -> Result<Self, CoordinateError> {
        let parts: Vec<&str> = key.split('|').collect();
        match parts.as_slice() {
            [g, a, v, c, e] if !g.is_empty() && !a.is_empty() && !v.is_empty() && !e.is_empty() => {
                Ok(Self {
                    group_id: g.to_string(),
                    artifact_id: a.to_string(),
                    version: v.to_string(),
                    classifier: (*c != NO_CLASSIFIER).then(|| c.to_string()),
                    extension: e.to_string(),
                })
            }
            _ => Err(CoordinateError::MalformedKey(key.to_string())),
        }
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.extension)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{}", classifier)?;
        }
        write!(f, ":{}", self.version)
    }
}

impl FromStr for ArtifactCoordinate {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(CoordinateError::Malformed(s.to_string()));
        }
        match parts.as_slice() {
            [g, a, e, v] => Ok(Self::new(*g, *a, *v, *e)),
            [g, a, e, c, v] => Ok(Self::new(*g, *a, *v, *e).with_classifier(*c)),
            _ => Err(CoordinateError::Malformed(s.to_string())),
        }
    }
}

/// Everything the index knows about one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub coordinate: ArtifactCoordinate,
    /// Repository-relative, `/`-separated path of the backing file.
    pub path: String,
    pub packaging: String,
    pub size: u64,
    /// Modification time in unix milliseconds.
    pub last_modified: u64,
    pub sha1: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub plugin_prefix: Option<String>,
    /// Logical timestamp of the last write, assigned by the store.
    pub record_version: u64,
}

impl ArtifactRecord {
    pub fn new(coordinate: ArtifactCoordinate, path: impl Into<String>) -> Self {
        let packaging = coordinate.extension.clone();
        Self {
            coordinate,
            path: path.into(),
            packaging,
            size: 0,
            last_modified: 0,
            sha1: None,
            name: None,
            description: None,
            plugin_prefix: None,
            record_version: 0,
        }
    }

    /// Field-wise equality ignoring `record_version`.
    pub fn same_content(&self, other: &ArtifactRecord) -> bool {
        self.coordinate == other.coordinate
            && self.path == other.path
            && self.packaging == other.packaging
            && self.size == other.size
            && self.last_modified == other.last_modified
            && self.sha1 == other.sha1
            && self.name == other.name
            && self.description == other.description
            && self.plugin_prefix == other.plugin_prefix
    }
}

/// What the store keeps for a coordinate. Tombstones survive deletion so
/// later packaging runs can publish the delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreEntry {
    Live(ArtifactRecord),
    Tombstone {
        coordinate: ArtifactCoordinate,
        record_version: u64,
    },
}

impl StoreEntry {
    pub fn coordinate(&self) -> &ArtifactCoordinate {
        match self {
            StoreEntry::Live(record) => &record.coordinate,
            StoreEntry::Tombstone { coordinate, .. } => coordinate,
        }
    }

    pub fn record_version(&self) -> u64 {
        match self {
            StoreEntry::Live(record) => record.record_version,
            StoreEntry::Tombstone { record_version, .. } => *record_version,
        }
    }

    pub fn as_live(&self) -> Option<&ArtifactRecord> {
        match self {
            StoreEntry::Live(record) => Some(record),
            StoreEntry::Tombstone { .. } => None,
        }
    }

    pub fn into_live(self) -> Option<ArtifactRecord> {
        match self {
            StoreEntry::Live(record) => Some(record),
            StoreEntry::Tombstone { .. } => None,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, StoreEntry::Tombstone { .. })
    }
}

/// How a discovered record relates to what the store already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Added,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFailure {
    pub path: String,
    pub cause: String,
}

/// Per-run scan counters. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub total_files: usize,
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub errors: Vec<ScanFailure>,
}

impl ScanResult {
    pub fn record_change(&mut self, change: ChangeKind) {
        match change {
            ChangeKind::Added => self.added += 1,
            ChangeKind::Updated => self.updated += 1,
            ChangeKind::Unchanged => self.unchanged += 1,
        }
    }

    pub fn has_changes(&self) -> bool {
        self.added + self.updated + self.deleted > 0
    }
}

/// Unix milliseconds of `time`, 0 for times before the epoch.
pub fn unix_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub fn now_millis() -> u64 {
    unix_millis(SystemTime::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_key_round_trip() {
        let plain = ArtifactCoordinate::new("org.example", "lib", "1.0", "jar");
        assert_eq!(plain.key(), "org.example|lib|1.0|NA|jar");
        assert_eq!(ArtifactCoordinate::from_key(&plain.key()).unwrap(), plain);

        let sources = plain.clone().with_classifier("sources");
        assert_eq!(sources.key(), "org.example|lib|1.0|sources|jar");
        assert_eq!(ArtifactCoordinate::from_key(&sources.key()).unwrap(), sources);
    }

    #[test]
    fn test_display_and_parse() {
        let coord = ArtifactCoordinate::new("org.example", "lib", "1.0", "jar")
            .with_classifier("tests");
        assert_eq!(coord.to_string(), "org.example:lib:jar:tests:1.0");
        assert_eq!("org.example:lib:jar:tests:1.0".parse::<ArtifactCoordinate>().unwrap(), coord);
        assert_eq!(
            "org.example:lib:pom:2.0".parse::<ArtifactCoordinate>().unwrap(),
            ArtifactCoordinate::new("org.example", "lib", "2.0", "pom")
        );
        assert!("org.example:lib".parse::<ArtifactCoordinate>().is_err());
        assert!("org.example::jar:1.0".parse::<ArtifactCoordinate>().is_err());
    }

    #[test]
    fn test_same_content_ignores_version() {
        let coord = ArtifactCoordinate::new("g", "a", "1", "jar");
        let mut a = ArtifactRecord::new(coord, "g/a/1/a-1.jar");
        a.record_version = 3;
        let mut b = a.clone();
        b.record_version = 9;
        assert!(a.same_content(&b));
        b.size = 10;
        assert!(!a.same_content(&b));
    }

    #[test]
    fn test_scan_result_counters() {
        let mut result = ScanResult::default();
        assert!(!result.has_changes());
        result.record_change(ChangeKind::Unchanged);
        assert!(!result.has_changes());
        result.record_change(ChangeKind::Updated);
        assert_eq!(result.updated, 1);
        assert!(result.has_changes());
    }
}
