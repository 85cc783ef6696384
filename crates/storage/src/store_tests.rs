// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn table_names(store: &StateStore) -> Vec<String> {
    let conn = store.conn.lock().unwrap();
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .unwrap();
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    names
}

#[test]
fn open_creates_location_and_tables() {
    let dir = tempfile::tempdir().unwrap();
    let location = dir.path().join("nested/checkpoint");

    let store = StateStore::open(&location).unwrap();

    assert!(location.join(DATABASE_FILE).is_file());
    assert_eq!(store.location(), location.as_path());
    let names = table_names(&store);
    assert!(names.contains(&WAL_TABLE.to_string()));
    assert!(names.contains(&COMMIT_TABLE.to_string()));
    assert!(names.contains(&SCHEMA_TABLE.to_string()));
}

#[test]
fn open_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = StateStore::open(dir.path()).unwrap();
        store.wal_append("unit-1").unwrap();
    }

    let store = StateStore::open(dir.path()).unwrap();
    let entries = store.wal_entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].key, "unit-1");
}

#[test]
fn quote_escapes_embedded_quotes() {
    assert_eq!(quote("plain"), "\"plain\"");
    assert_eq!(quote("we\"ird"), "\"we\"\"ird\"");
}

#[test]
fn busy_failures_are_transient() {
    let busy = rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
        None,
    );
    let missing = rusqlite::Error::QueryReturnedNoRows;
    assert!(is_transient(&busy));
    assert!(!is_transient(&missing));
}
