//! `pom` extractor: layout coordinate plus project metadata from the POM.

use super::layout::{base_record, is_ignored};
use super::ArtifactExtractor;
use crate::error::ExtractionError;
use crate::models::ArtifactRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

pub const NAME: &str = "pom";

const PLUGIN_PACKAGING: &str = "maven-plugin";

/// Sections whose `<name>`/`<packaging>` children must not be mistaken for
/// the project's own. Outer sections come first.
const FOREIGN_SECTIONS: &[&str] = &[
    "parent",
    "dependencyManagement",
    "distributionManagement",
    "build",
    "reporting",
    "profiles",
    "dependencies",
    "modules",
    "licenses",
    "developers",
    "contributors",
    "organization",
    "scm",
    "issueManagement",
    "ciManagement",
    "mailingLists",
    "repositories",
    "pluginRepositories",
];

static COMMENTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment pattern"));

static GOAL_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<goalPrefix>\s*([^<\s]+)\s*</goalPrefix>").expect("valid goalPrefix pattern")
});

fn strip_section(xml: &str, tag: &str) -> String {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut out = String::with_capacity(xml.len());
    let mut rest = xml;
    while let Some(start) = find_open_tag(rest, &open) {
        out.push_str(&rest[..start]);
        rest = match rest[start..].find(&close) {
            Some(end) => &rest[start + end + close.len()..],
            None => "",
        };
    }
    out.push_str(rest);
    out
}

/// Position of `<tag>` or `<tag attr..>`, not `<tagSuffix>`.
fn find_open_tag(xml: &str, open: &str) -> Option<usize> {
    let mut offset = 0;
    while let Some(pos) = xml[offset..].find(open) {
        let at = offset + pos;
        match xml[at + open.len()..].chars().next() {
            Some('>') | Some(' ') | Some('\n') | Some('\t') | Some('\r') => return Some(at),
            _ => offset = at + open.len(),
        }
    }
    None
}

fn element(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    let value = xml[start..end].split_whitespace().collect::<Vec<_>>().join(" ");
    (!value.is_empty()).then_some(value)
}

/// `maven-foo-plugin` -> `foo`, `foo-maven-plugin` -> `foo`.
pub fn derive_plugin_prefix(artifact_id: &str) -> Option<String> {
    let prefix = artifact_id
        .strip_prefix("maven-")
        .and_then(|s| s.strip_suffix("-plugin"))
        .or_else(|| artifact_id.strip_suffix("-maven-plugin"))?;
    (!prefix.is_empty()).then(|| prefix.to_string())
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PomExtractor;

impl ArtifactExtractor for PomExtractor {
    fn name(&self) -> &str {
        NAME
    }

    fn accepts(&self, relative_path: &str) -> bool {
        !is_ignored(relative_path) && relative_path.ends_with(".pom")
    }

    fn extract(
        &self,
        root: &Path,
        relative_path: &str,
    ) -> Result<Option<ArtifactRecord>, ExtractionError> {
        let mut record = base_record(root, relative_path)?;

        let full_path = root.join(relative_path);
        let bytes = fs::read(&full_path).map_err(|e| ExtractionError::Io {
            path: full_path.clone(),
            source: e,
        })?;
        let metadata_error = |message: &str| ExtractionError::Metadata {
            path: relative_path.to_string(),
            message: message.to_string(),
        };
        let content = String::from_utf8(bytes).map_err(|_| metadata_error("not UTF-8"))?;

        let without_comments = COMMENTS.replace_all(&content, "");
        if !without_comments.contains("<project") || !without_comments.contains("</project>") {
            return Err(metadata_error("no <project> element"));
        }
        let goal_prefix = GOAL_PREFIX
            .captures(&without_comments)
            .map(|caps| caps[1].to_string());
        let own = FOREIGN_SECTIONS
            .iter()
            .fold(without_comments.into_owned(), |xml, tag| strip_section(&xml, tag));

        record.packaging = element(&own, "packaging").unwrap_or_else(|| "jar".to_string());
        record.name = element(&own, "name");
        record.description = element(&own, "description");
        if record.packaging == PLUGIN_PACKAGING {
            record.plugin_prefix =
                goal_prefix.or_else(|| derive_plugin_prefix(&record.coordinate.artifact_id));
        }

        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_derive_plugin_prefix() {
        assert_eq!(derive_plugin_prefix("maven-compiler-plugin").as_deref(), Some("compiler"));
        assert_eq!(derive_plugin_prefix("jetty-maven-plugin").as_deref(), Some("jetty"));
        assert_eq!(derive_plugin_prefix("maven-plugin"), None);
        assert_eq!(derive_plugin_prefix("commons-lang"), None);
    }

    #[test]
    fn test_element_normalizes_whitespace() {
        let xml = "<description>\n  A small\n  library\n</description>";
        assert_eq!(element(xml, "description").as_deref(), Some("A small library"));
        assert_eq!(element("<name></name>", "name"), None);
    }

    #[test]
    fn test_strip_section_keeps_project_fields() {
        let xml = "<project><parent><name>Parent</name></parent><name>Child</name>\
                   <parentage>x</parentage></project>";
        let own = strip_section(xml, "parent");
        assert_eq!(element(&own, "name").as_deref(), Some("Child"));
        assert!(own.contains("<parentage>"));
    }

    #[test]
    fn test_accepts_only_poms() {
        assert!(PomExtractor.accepts("org/a/1.0/a-1.0.pom"));
        assert!(!PomExtractor.accepts("org/a/1.0/a-1.0.pom.sha1"));
        assert!(!PomExtractor.accepts("org/a/1.0/a-1.0.jar"));
    }
}
