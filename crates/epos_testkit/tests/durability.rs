//! Durable storage across close and reopen.

use epos_codec::Value;
use epos_core::{BackendKind, Config, CoreError, Database, StorageMode};
use epos_storage::{FileBackend, FileOptions, StorageBackend};
use epos_testkit::prelude::*;
use std::fs;

#[test]
fn data_survives_close_and_reopen() {
    let db = TestDatabase::file();
    let coll = db.coll("people").unwrap();
    let id = coll.insert(&samples::person_value()).unwrap();
    let towel = coll.insert(&samples::towel()).unwrap();
    coll.update(towel, &Value::from("replaced")).unwrap();

    let db = db.reopen();
    let coll = db.coll("people").unwrap();
    assert_eq!(coll.get(id).unwrap(), samples::person_value());
    assert_eq!(coll.get(towel).unwrap(), Value::from("replaced"));
}

#[test]
fn flushed_data_survives_drop() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = Database::open_with_config("flushed", file_config(dir.path())).unwrap();
        db.coll("c").unwrap().insert(&Value::from(7i64)).unwrap();
        db.flush().unwrap();
    }

    let db = Database::open_with_config("flushed", file_config(dir.path())).unwrap();
    assert_eq!(db.coll("c").unwrap().get(1).unwrap(), Value::from(7i64));
}

#[test]
fn counter_recovers_past_deleted_maximum() {
    let db = TestDatabase::file();
    let coll = db.coll("c").unwrap();
    for i in 0..5i64 {
        coll.insert(&Value::from(i)).unwrap();
    }
    coll.delete(5).unwrap();
    coll.delete(4).unwrap();

    let db = db.reopen();
    let coll = db.coll("c").unwrap();
    assert_eq!(coll.next_id(), 6);
    assert_eq!(coll.insert(&Value::Null).unwrap(), 6);
}

#[test]
fn counter_recovers_after_every_record_deleted_and_compacted() {
    let db = TestDatabase::file();
    let coll = db.coll("c").unwrap();
    for _ in 0..3 {
        coll.insert(&Value::Null).unwrap();
    }
    for id in 1..=3 {
        coll.delete(id).unwrap();
    }
    db.compact().unwrap();

    let db = db.reopen();
    let coll = db.coll("c").unwrap();
    assert!(coll.is_empty().unwrap());
    assert_eq!(coll.insert(&Value::Null).unwrap(), 4);
}

#[test]
fn many_close_reopen_cycles_keep_ids_monotonic() {
    let mut db = TestDatabase::file();
    let mut last = 0;
    for round in 0..5i64 {
        let coll = db.coll("c").unwrap();
        let id = coll.insert(&Value::from(round)).unwrap();
        assert!(id > last);
        if round % 2 == 1 {
            coll.delete(id).unwrap();
        }
        last = id;
        db = db.reopen();
    }
    assert_eq!(db.coll("c").unwrap().len().unwrap(), 3);
}

#[test]
fn removed_database_reopens_empty() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_with_config("gone", file_config(dir.path())).unwrap();
    scenarios::populate(&db, "test", 5);
    db.remove().unwrap();
    drop(db);

    let db = Database::open_with_config("gone", file_config(dir.path())).unwrap();
    assert!(db.collection_names().unwrap().is_empty());
    let coll = db.coll("test").unwrap();
    assert_eq!(coll.iter().count(), 0);
    assert_eq!(coll.insert(&Value::Null).unwrap(), 1);
}

#[test]
fn corrupt_record_is_isolated_during_iteration() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = Database::open_with_config("db", file_config(dir.path())).unwrap();
        scenarios::populate(&db, "test", 3);
        db.close().unwrap();
    }

    // A frame with a valid checksum whose payload is not a record.
    {
        let backend =
            FileBackend::open(&dir.path().join("db.epos"), FileOptions::default()).unwrap();
        backend.put("test", 2, &[0xEE, 0x00]).unwrap();
        backend.close().unwrap();
    }

    let db = Database::open_with_config("db", file_config(dir.path())).unwrap();
    let coll = db.coll("test").unwrap();
    let results: Vec<_> = coll.iter().collect();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().0, 1);
    assert!(matches!(
        results[1],
        Err(CoreError::CorruptRecord { id: 2, .. })
    ));
    assert_eq!(results[2].as_ref().unwrap().0, 3);

    assert!(matches!(coll.get(2), Err(CoreError::CorruptRecord { .. })));
    coll.update(2, &Value::from("repaired")).unwrap();
    assert_eq!(coll.get(2).unwrap(), Value::from("repaired"));
}

fn auto_config(root: &std::path::Path) -> Config {
    Config::default().root(root).mode(StorageMode::Auto)
}

#[test]
fn damaged_record_is_isolated_in_every_mode() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = Database::open_with_config("db", file_config(dir.path())).unwrap();
        scenarios::populate(&db, "test", 3);
    }

    // Last payload byte of the first frame.
    let log = dir.path().join("db.epos").join("data.log");
    let mut bytes = fs::read(&log).unwrap();
    let first = u32::from_le_bytes(bytes[..4].try_into().unwrap()) as usize;
    bytes[first - 5] ^= 0xFF;
    fs::write(&log, &bytes).unwrap();

    for config in [file_config(dir.path()), auto_config(dir.path())] {
        let db = Database::open_with_config("db", config).unwrap();
        assert_eq!(db.backend_kind(), BackendKind::Durable);

        let coll = db.coll("test").unwrap();
        assert!(matches!(coll.get(1), Err(CoreError::CorruptRecord { id: 1, .. })));
        assert_eq!(coll.get(2).unwrap().get("index"), Some(&Value::Int(1)));
        assert_eq!(coll.len().unwrap(), 3);
        db.close().unwrap();
    }

    let db = Database::open_with_config("db", auto_config(dir.path())).unwrap();
    assert_eq!(db.coll("test").unwrap().insert(&Value::Null).unwrap(), 4);
}

#[test]
fn damaged_header_fails_open_without_fallback() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = Database::open_with_config("db", file_config(dir.path())).unwrap();
        scenarios::populate(&db, "test", 5);
    }

    let log = dir.path().join("db.epos").join("data.log");
    let mut bytes = fs::read(&log).unwrap();
    bytes[3] ^= 0x01;
    fs::write(&log, &bytes).unwrap();

    for config in [file_config(dir.path()), auto_config(dir.path())] {
        let result = Database::open_with_config("db", config);
        assert!(matches!(result, Err(CoreError::StorageUnavailable { .. })));
    }
    assert_eq!(fs::read(&log).unwrap(), bytes);
}

#[test]
fn torn_tail_loses_only_the_last_write() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = Database::open_with_config("db", file_config(dir.path())).unwrap();
        scenarios::populate(&db, "test", 3);
    }

    let log = dir.path().join("db.epos").join("data.log");
    let len = fs::metadata(&log).unwrap().len();
    fs::OpenOptions::new()
        .write(true)
        .open(&log)
        .unwrap()
        .set_len(len - 2)
        .unwrap();

    let db = Database::open_with_config("db", file_config(dir.path())).unwrap();
    let coll = db.coll("test").unwrap();
    assert_eq!(coll.len().unwrap(), 2);
    assert_eq!(coll.insert(&Value::Null).unwrap(), 3);
}
