use pretty_assertions::assert_eq;
use repodex_core::{ArtifactCoordinate, ArtifactRecord, StoreEntry};
use repodex_store::{IndexStore, StoreError, StoreReader};
use std::fs;
use tempfile::TempDir;

fn coord(artifact: &str, version: &str) -> ArtifactCoordinate {
    ArtifactCoordinate::new("org.example", artifact, version, "jar")
}

fn record(artifact: &str, version: &str) -> ArtifactRecord {
    let coordinate = coord(artifact, version);
    let path = format!("org/example/{artifact}/{version}/{artifact}-{version}.jar");
    let mut record = ArtifactRecord::new(coordinate, path);
    record.size = 42;
    record
}

#[test]
fn test_upsert_commit_and_read_back() {
    let dir = TempDir::new().unwrap();
    let store = IndexStore::open(dir.path(), "central").unwrap();

    assert_eq!(store.upsert(record("alpha", "1.0")).unwrap(), 1);
    assert_eq!(store.upsert(record("beta", "1.0")).unwrap(), 2);
    store.commit("initial").unwrap();

    let snapshot = store.snapshot().unwrap();
    assert_eq!(snapshot.len().unwrap(), 2);
    assert_eq!(snapshot.high_water(), 2);
    assert_eq!(snapshot.repository_id(), "central");
    let alpha = snapshot.get_live(&coord("alpha", "1.0")).unwrap().unwrap();
    assert_eq!(alpha.size, 42);
    assert_eq!(alpha.record_version, 1);
}

#[test]
fn test_second_write_replaces_record() {
    let dir = TempDir::new().unwrap();
    let store = IndexStore::open(dir.path(), "central").unwrap();
    store.upsert(record("alpha", "1.0")).unwrap();
    store.commit("first").unwrap();

    let mut changed = record("alpha", "1.0");
    changed.size = 7;
    assert_eq!(store.upsert(changed).unwrap(), 2);
    store.commit("second").unwrap();

    let snapshot = store.snapshot().unwrap();
    assert_eq!(snapshot.len().unwrap(), 1);
    let alpha = snapshot.get_live(&coord("alpha", "1.0")).unwrap().unwrap();
    assert_eq!(alpha.size, 7);
    assert_eq!(alpha.record_version, 2);
}

#[test]
fn test_repeated_upserts_in_one_batch_keep_last() {
    let dir = TempDir::new().unwrap();
    let store = IndexStore::open(dir.path(), "central").unwrap();
    for size in [1, 2, 3] {
        let mut r = record("alpha", "1.0");
        r.size = size;
        store.upsert(r).unwrap();
    }
    store.commit("batch").unwrap();

    let records = store.snapshot().unwrap().live_records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].size, 3);
    assert_eq!(records[0].record_version, 3);
}

#[test]
fn test_delete_writes_tombstone() {
    let dir = TempDir::new().unwrap();
    let store = IndexStore::open(dir.path(), "central").unwrap();
    store.upsert(record("alpha", "1.0")).unwrap();
    store.upsert(record("beta", "1.0")).unwrap();
    store.commit("seed").unwrap();

    assert!(store.delete(&coord("beta", "1.0")).unwrap());
    store.commit("delete beta").unwrap();

    let snapshot = store.snapshot().unwrap();
    assert_eq!(snapshot.len().unwrap(), 1);
    assert_eq!(
        snapshot.get(&coord("beta", "1.0")).unwrap(),
        Some(StoreEntry::Tombstone {
            coordinate: coord("beta", "1.0"),
            record_version: 3,
        })
    );
    let since = snapshot.entries_since(2).unwrap();
    assert_eq!(since.len(), 1);
    assert!(since[0].is_tombstone());
}

#[test]
fn test_delete_absent_is_noop() {
    let dir = TempDir::new().unwrap();
    let store = IndexStore::open(dir.path(), "central").unwrap();
    store.upsert(record("alpha", "1.0")).unwrap();

    assert!(!store.delete(&coord("missing", "1.0")).unwrap());
    assert!(store.delete(&coord("alpha", "1.0")).unwrap());
    // Already tombstoned.
    assert!(!store.delete(&coord("alpha", "1.0")).unwrap());
    assert_eq!(store.pending_high_water().unwrap(), 2);
}

#[test]
fn test_snapshot_is_isolated_from_later_commits() {
    let dir = TempDir::new().unwrap();
    let store = IndexStore::open(dir.path(), "central").unwrap();
    store.upsert(record("alpha", "1.0")).unwrap();
    store.commit("one").unwrap();

    let before = store.snapshot().unwrap();
    store.upsert(record("beta", "1.0")).unwrap();
    assert_eq!(store.snapshot().unwrap().len().unwrap(), 1);
    store.commit("two").unwrap();

    assert_eq!(before.len().unwrap(), 1);
    assert_eq!(before.high_water(), 1);
    assert!(before.get(&coord("beta", "1.0")).unwrap().is_none());
    before.release();

    let after = store.snapshot().unwrap();
    assert_eq!(after.len().unwrap(), 2);
}

#[test]
fn test_rollback_discards_pending() {
    let dir = TempDir::new().unwrap();
    let store = IndexStore::open(dir.path(), "central").unwrap();
    store.upsert(record("alpha", "1.0")).unwrap();
    store.commit("one").unwrap();

    store.upsert(record("beta", "1.0")).unwrap();
    store.delete(&coord("alpha", "1.0")).unwrap();
    store.rollback().unwrap();

    assert_eq!(store.pending_high_water().unwrap(), 1);
    assert_eq!(store.pending_len().unwrap(), 0);
    store.commit("after rollback").unwrap();
    let records = store.snapshot().unwrap().live_records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].coordinate, coord("alpha", "1.0"));
}

#[test]
fn test_uncommitted_writes_do_not_survive_close() {
    let dir = TempDir::new().unwrap();
    {
        let store = IndexStore::open(dir.path(), "central").unwrap();
        store.upsert(record("alpha", "1.0")).unwrap();
        store.commit("one").unwrap();
        store.upsert(record("beta", "1.0")).unwrap();
        store.close().unwrap();
    }

    let store = IndexStore::open_existing(dir.path()).unwrap();
    assert_eq!(store.repository_id(), "central");
    assert_eq!(store.high_water().unwrap(), 1);
    assert_eq!(store.snapshot().unwrap().len().unwrap(), 1);
}

#[test]
fn test_second_writer_is_locked_out() {
    let dir = TempDir::new().unwrap();
    let first = IndexStore::open(dir.path(), "central").unwrap();

    let err = IndexStore::open(dir.path(), "central").err().unwrap();
    assert!(matches!(err, StoreError::Locked { .. }), "got {err}");

    first.close().unwrap();
    assert!(IndexStore::open(dir.path(), "central").is_ok());
}

#[test]
fn test_garbage_meta_is_corrupt() {
    let dir = TempDir::new().unwrap();
    let records = dir.path().join("records");
    fs::create_dir_all(&records).unwrap();
    fs::write(records.join("meta.json"), b"{ not json").unwrap();

    let err = IndexStore::open(dir.path(), "central").err().unwrap();
    assert!(matches!(err, StoreError::Corrupt { .. }), "got {err}");
}

#[test]
fn test_foreign_repository_is_corrupt() {
    let dir = TempDir::new().unwrap();
    let store = IndexStore::open(dir.path(), "central").unwrap();
    store.upsert(record("alpha", "1.0")).unwrap();
    store.commit("one").unwrap();
    store.close().unwrap();

    let err = IndexStore::open(dir.path(), "snapshots").err().unwrap();
    assert!(matches!(err, StoreError::Corrupt { .. }), "got {err}");
}

#[test]
fn test_open_existing_requires_index() {
    let dir = TempDir::new().unwrap();
    let err = IndexStore::open_existing(dir.path().join("nothing")).err().unwrap();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[test]
fn test_import_and_continuity_marks() {
    let dir = TempDir::new().unwrap();
    let store = IndexStore::open(dir.path(), "central").unwrap();

    let mut imported = record("alpha", "1.0");
    imported.record_version = 17;
    store.import(StoreEntry::Live(imported)).unwrap();
    assert_eq!(store.pending_high_water().unwrap(), 17);

    store.set_high_water(20).unwrap();
    let err = store.set_high_water(5).unwrap_err();
    assert!(matches!(err, StoreError::HighWaterRegression { current: 20, requested: 5 }));
    store.mark_chunk_applied(3).unwrap();
    store.commit("imported").unwrap();
    store.close().unwrap();

    let store = IndexStore::open(dir.path(), "central").unwrap();
    assert_eq!(store.high_water().unwrap(), 20);
    assert_eq!(store.last_chunk_id().unwrap(), Some(3));
    let alpha = store.get(&coord("alpha", "1.0")).unwrap().unwrap();
    assert_eq!(alpha.record_version(), 17);
    // Fresh writes continue past the high-water mark.
    assert_eq!(store.upsert(record("beta", "1.0")).unwrap(), 21);
}

#[test]
fn test_search_matches_metadata() {
    let dir = TempDir::new().unwrap();
    let store = IndexStore::open(dir.path(), "central").unwrap();
    let mut plugin = record("maven-greeting-plugin", "1.2");
    plugin.name = Some("Greeting Plugin".to_string());
    plugin.plugin_prefix = Some("greeting".to_string());
    store.upsert(plugin).unwrap();
    store.upsert(record("commons", "2.0")).unwrap();
    store.commit("seed").unwrap();

    let snapshot = store.snapshot().unwrap();
    let hits = snapshot.search("greeting", 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].1.coordinate.artifact_id, "maven-greeting-plugin");

    let by_artifact = snapshot.search("commons", 10).unwrap();
    assert_eq!(by_artifact.len(), 1);
}

#[test]
fn test_journal_records_commits() {
    let dir = TempDir::new().unwrap();
    let store = IndexStore::open(dir.path(), "central").unwrap();
    store.upsert(record("alpha", "1.0")).unwrap();
    store.commit("first").unwrap();
    store.upsert(record("beta", "1.0")).unwrap();
    store.commit("second").unwrap();

    let entries = store.journal().list(10).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].note, "second");
    assert_eq!(entries[0].high_water, 2);
    assert_eq!(entries[1].note, "first");
}

#[test]
fn test_reader_and_writer_do_not_block_each_other() {
    let dir = TempDir::new().unwrap();
    {
        let store = IndexStore::open(dir.path(), "central").unwrap();
        store.upsert(record("alpha", "1.0")).unwrap();
        store.commit("seed").unwrap();
        store.close().unwrap();
    }

    let reader = StoreReader::open(dir.path()).unwrap();
    let before = reader.snapshot().unwrap();
    assert_eq!(before.repository_id(), "central");

    let writer = IndexStore::open(dir.path(), "central").unwrap();
    writer.upsert(record("beta", "1.0")).unwrap();
    writer.commit("second").unwrap();

    let second_reader = StoreReader::open(dir.path()).unwrap();
    let after = reader.snapshot().unwrap();
    assert_eq!(before.len().unwrap(), 1);
    assert_eq!(after.len().unwrap(), 2);
    assert_eq!(after.high_water(), 2);
    assert_eq!(second_reader.marks().unwrap().high_water, 2);

    // The journal belongs to the writer while it is open.
    assert_eq!(reader.recent_commits(5).unwrap(), None);
    writer.close().unwrap();
    let notes: Vec<String> = reader
        .recent_commits(5)
        .unwrap()
        .unwrap()
        .into_iter()
        .map(|e| e.note)
        .collect();
    assert_eq!(notes, vec!["second", "seed"]);
}

#[test]
fn test_reader_requires_index() {
    let dir = TempDir::new().unwrap();
    let err = StoreReader::open(dir.path().join("nothing")).err().unwrap();
    assert!(matches!(err, StoreError::NotFound { .. }));
}
