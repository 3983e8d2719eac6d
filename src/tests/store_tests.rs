// Store Tests - key-value stores and session ids

use super::helpers::FailingStore;
use crate::session::{session_id_for, session_key};
use crate::store::*;
use tempfile::{NamedTempFile, tempdir};
use tokio_test::{assert_err, assert_ok};

#[test]
fn test_memory_store_get_set() {
    let store = MemoryStore::new();
    assert!(store.is_empty());
    assert_eq!(store.get("missing").unwrap(), None);

    store.set("widget-state-s1-example.com", "collapsed").unwrap();
    store.set("widget-state-s1-example.com", "closed").unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(
        store.get("widget-state-s1-example.com").unwrap().as_deref(),
        Some("closed")
    );
}

#[test]
fn test_json_file_store_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("state.json");

    {
        let store = JsonFileStore::open(&path).expect("Failed to open store");
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "expanded").expect("Failed to save");
    }

    let reopened = JsonFileStore::open(&path).expect("Failed to reopen store");
    assert_eq!(reopened.get("k").unwrap().as_deref(), Some("expanded"));
}

#[test]
fn test_json_file_store_empty_file() {
    let file = NamedTempFile::new().unwrap();
    let store = assert_ok!(JsonFileStore::open(file.path()));
    assert_eq!(store.get("anything").unwrap(), None);
}

#[test]
fn test_json_file_store_rejects_garbage() {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), "not json").unwrap();
    assert_err!(JsonFileStore::open(file.path()));
}

#[test]
fn test_json_file_store_failed_write_keeps_old_value() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state").join("widget.json");

    let store = JsonFileStore::open(&path).unwrap();
    store.set("k", "expanded").unwrap();

    // Replace the directory with a plain file so the next write fails
    std::fs::remove_dir_all(dir.path().join("state")).unwrap();
    std::fs::write(dir.path().join("state"), "blocker").unwrap();

    assert_err!(store.set("k", "closed"));
    assert_err!(store.set("other", "collapsed"));
    assert_eq!(store.get("k").unwrap().as_deref(), Some("expanded"));
    assert_eq!(store.get("other").unwrap(), None);
}

#[test]
fn test_sqlite_store_upserts() {
    let store = SqliteStore::open_in_memory().expect("Failed to open database");

    store.set("k", "expanded").unwrap();
    store.set("k", "collapsed").unwrap();

    assert_eq!(store.get("k").unwrap().as_deref(), Some("collapsed"));
    assert_eq!(store.get("other").unwrap(), None);
}

#[test]
fn test_sqlite_store_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("widget.db");

    {
        let store = SqliteStore::open(&path).unwrap();
        store.set("widget-state-s1-example.com", "closed").unwrap();
    }

    let reopened = SqliteStore::open(&path).unwrap();
    assert_eq!(
        reopened.get("widget-state-s1-example.com").unwrap().as_deref(),
        Some("closed")
    );
}

// Session ids

#[test]
fn test_session_id_is_stable_per_site() {
    let store = MemoryStore::new();

    let first = session_id_for(&store, "s1");
    let second = session_id_for(&store, "s1");
    let other_site = session_id_for(&store, "s2");

    assert_eq!(first, second);
    assert_ne!(first, other_site);
    assert_eq!(store.get(&session_key("s1")).unwrap(), Some(first.clone()));
    assert!(uuid::Uuid::parse_str(&first).is_ok());
}

#[test]
fn test_session_id_without_store_is_temporary() {
    let first = session_id_for(&FailingStore, "s1");
    let second = session_id_for(&FailingStore, "s1");

    assert_ne!(first, second);
}
