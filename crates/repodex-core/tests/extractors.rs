use pretty_assertions::assert_eq;
use repodex_core::{ArtifactCoordinate, ExtractionError, ExtractorRegistry, StoreEntry};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

const PLUGIN_POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <parent>
    <groupId>org.example</groupId>
    <artifactId>parent</artifactId>
    <version>3</version>
    <name>Parent project</name>
  </parent>
  <groupId>org.example.plugins</groupId>
  <artifactId>maven-greeting-plugin</artifactId>
  <version>1.2</version>
  <packaging>maven-plugin</packaging>
  <name>Greeting Plugin</name>
  <description>
    Says hello
    during the build.
  </description>
  <dependencies>
    <dependency>
      <groupId>org.example</groupId>
      <artifactId>api</artifactId>
      <version>1.0</version>
      <name>not the project name</name>
    </dependency>
  </dependencies>
</project>
"#;

#[test]
fn test_min_reads_file_facts_and_sha1_sidecar() {
    let dir = TempDir::new().unwrap();
    let rel = "org/example/lib/1.0/lib-1.0-sources.jar";
    write(dir.path(), rel, "0123456789");
    write(
        dir.path(),
        &format!("{rel}.sha1"),
        "A9993E364706816ABA3E25717850C26C9CD0D89D  lib-1.0-sources.jar\n",
    );

    let min = ExtractorRegistry::with_builtins().get("min").unwrap();
    let record = min.extract(dir.path(), rel).unwrap().unwrap();

    assert_eq!(
        record.coordinate,
        ArtifactCoordinate::new("org.example", "lib", "1.0", "jar").with_classifier("sources")
    );
    assert_eq!(record.path, rel);
    assert_eq!(record.packaging, "jar");
    assert_eq!(record.size, 10);
    assert!(record.last_modified > 0);
    assert_eq!(
        record.sha1.as_deref(),
        Some("a9993e364706816aba3e25717850c26c9cd0d89d")
    );
    assert_eq!(record.record_version, 0);
}

#[test]
fn test_pom_extracts_project_metadata() {
    let dir = TempDir::new().unwrap();
    let rel = "org/example/plugins/maven-greeting-plugin/1.2/maven-greeting-plugin-1.2.pom";
    write(dir.path(), rel, PLUGIN_POM);

    let pom = ExtractorRegistry::with_builtins().get("pom").unwrap();
    let record = pom.extract(dir.path(), rel).unwrap().unwrap();

    assert_eq!(record.coordinate.group_id, "org.example.plugins");
    assert_eq!(record.coordinate.extension, "pom");
    assert_eq!(record.packaging, "maven-plugin");
    assert_eq!(record.name.as_deref(), Some("Greeting Plugin"));
    assert_eq!(record.description.as_deref(), Some("Says hello during the build."));
    assert_eq!(record.plugin_prefix.as_deref(), Some("greeting"));
    assert_eq!(record.sha1, None);
}

#[test]
fn test_pom_goal_prefix_wins() {
    let dir = TempDir::new().unwrap();
    let rel = "org/example/tool-maven-plugin/2.0/tool-maven-plugin-2.0.pom";
    let pom_xml = r#"<project>
  <packaging>maven-plugin</packaging>
  <build><plugins><plugin>
    <artifactId>maven-plugin-plugin</artifactId>
    <configuration><goalPrefix>tl</goalPrefix></configuration>
  </plugin></plugins></build>
</project>"#;
    write(dir.path(), rel, pom_xml);

    let pom = ExtractorRegistry::with_builtins().get("pom").unwrap();
    let record = pom.extract(dir.path(), rel).unwrap().unwrap();
    assert_eq!(record.plugin_prefix.as_deref(), Some("tl"));
}

#[test]
fn test_pom_defaults_packaging_to_jar() {
    let dir = TempDir::new().unwrap();
    let rel = "com/acme/util/0.1/util-0.1.pom";
    write(dir.path(), rel, "<project><!-- <packaging>war</packaging> --></project>");

    let pom = ExtractorRegistry::with_builtins().get("pom").unwrap();
    let record = pom.extract(dir.path(), rel).unwrap().unwrap();
    assert_eq!(record.packaging, "jar");
    assert_eq!(record.plugin_prefix, None);
}

#[test]
fn test_pom_rejects_non_project_content() {
    let dir = TempDir::new().unwrap();
    let rel = "com/acme/util/0.1/util-0.1.pom";
    write(dir.path(), rel, "this is not xml");

    let pom = ExtractorRegistry::with_builtins().get("pom").unwrap();
    let err = pom.extract(dir.path(), rel).unwrap_err();
    assert!(matches!(err, ExtractionError::Metadata { .. }));
}

#[test]
fn test_min_reports_layout_violation() {
    let dir = TempDir::new().unwrap();
    let rel = "org/example/bad/1.0/bad.jar";
    write(dir.path(), rel, "x");

    let min = ExtractorRegistry::with_builtins().get("min").unwrap();
    assert!(min.accepts(rel));
    let err = min.extract(dir.path(), rel).unwrap_err();
    assert!(matches!(err, ExtractionError::Layout { .. }));
    assert!(err.to_string().contains("bad.jar"));
}

#[test]
fn test_records_survive_bincode() {
    let dir = TempDir::new().unwrap();
    let rel = "org/example/plugins/maven-greeting-plugin/1.2/maven-greeting-plugin-1.2.pom";
    write(dir.path(), rel, PLUGIN_POM);
    let pom = ExtractorRegistry::with_builtins().get("pom").unwrap();
    let record = pom.extract(dir.path(), rel).unwrap().unwrap();

    let entry = StoreEntry::Live(record);
    let bytes = bincode::serialize(&entry).unwrap();
    let decoded: StoreEntry = bincode::deserialize(&bytes).unwrap();
    assert_eq!(decoded, entry);
}
