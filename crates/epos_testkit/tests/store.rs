//! End-to-end collection behaviour over both backends.

use epos_codec::{SharedValue, Value};
use epos_core::{CoreError, Database, StorageMode};
use epos_testkit::prelude::*;

fn both() -> [TestDatabase; 2] {
    [TestDatabase::memory(), TestDatabase::file()]
}

#[test]
fn store_and_remove() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(dir.path()).mode(StorageMode::Auto);
    let db = Database::open_with_config("testdb1", config).unwrap();

    let coll = db.coll("test").unwrap();
    let first = coll.insert_as(&["hello", "world!"]).unwrap();
    assert_eq!(first, 1);

    #[derive(serde::Serialize)]
    #[allow(non_snake_case)]
    struct Pair {
        X: &'static str,
        Y: &'static str,
    }
    let second = coll
        .insert_as(&Pair {
            X: "pan-galactic",
            Y: "gargle-blaster",
        })
        .unwrap();
    assert_eq!(second, 2);
    assert_eq!(coll.get(second).unwrap(), samples::towel());

    db.remove().unwrap();
    assert!(!dir.path().join("testdb1.epos").exists());
}

#[test]
fn crud_on_every_backend() {
    for db in both() {
        let coll = db.coll("things").unwrap();

        let id = coll.insert(&samples::towel()).unwrap();
        assert_eq!(coll.get(id).unwrap(), samples::towel());

        let v2 = Value::record([("X", "so long"), ("Y", "thanks for all the fish")]);
        coll.update(id, &v2).unwrap();
        assert_eq!(coll.get(id).unwrap(), v2);

        coll.delete(id).unwrap();
        assert!(matches!(coll.get(id), Err(CoreError::NotFound { .. })));
        assert!(matches!(coll.delete(id), Err(CoreError::NotFound { .. })));
        assert!(matches!(coll.update(id, &v2), Err(CoreError::NotFound { .. })));
    }
}

#[test]
fn identifiers_are_one_to_n_in_call_order() {
    for db in both() {
        let coll = db.coll("seq").unwrap();
        let ids: Vec<u64> = (0..50i64).map(|i| coll.insert(&Value::from(i)).unwrap()).collect();
        assert_eq!(ids, (1..=50).collect::<Vec<u64>>());

        coll.delete(50).unwrap();
        coll.delete(17).unwrap();
        assert_eq!(coll.insert(&Value::Null).unwrap(), 51);
    }
}

#[test]
fn typed_round_trip() {
    for db in both() {
        let people = db.coll("people").unwrap();
        let id = people.insert_as(&samples::person()).unwrap();
        assert_eq!(people.get(id).unwrap(), samples::person_value());

        let back: samples::Person = people.get_as(id).unwrap();
        assert_eq!(back, samples::person());
    }
}

#[test]
fn cyclic_value_is_rejected_without_consuming_an_id() {
    for db in both() {
        let coll = db.coll("graph").unwrap();
        assert_eq!(coll.insert(&Value::from("before")).unwrap(), 1);

        let a = SharedValue::new(Value::Null);
        let b = SharedValue::new(Value::sequence([Value::Shared(a.clone())]));
        a.set(Value::record([("next", Value::Shared(b.clone()))]));

        let err = coll.insert(&Value::Shared(a.clone())).unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedType { .. }));
        a.set(Value::Null);

        assert_eq!(coll.insert(&Value::from("after")).unwrap(), 2);
    }
}

#[test]
fn shared_dag_is_stored_as_a_tree() {
    let db = TestDatabase::memory();
    let coll = db.coll("dag").unwrap();

    let leaf = SharedValue::new(Value::from("shared"));
    let value = Value::sequence([Value::Shared(leaf.clone()), Value::Shared(leaf)]);
    let id = coll.insert(&value).unwrap();

    assert_eq!(
        coll.get(id).unwrap(),
        Value::sequence(["shared", "shared"])
    );
}

#[test]
fn iterate_visits_every_live_record() {
    for db in both() {
        scenarios::populate(&db, "test", 10);
        let coll = db.coll("test").unwrap();
        for id in [2, 4, 6] {
            coll.delete(id).unwrap();
        }

        let ids: Vec<u64> = coll.iter().map(|r| r.unwrap().0).collect();
        assert_eq!(ids, vec![1, 3, 5, 7, 8, 9, 10]);
        assert_eq!(coll.len().unwrap(), 7);
    }
}

#[test]
fn closed_database_rejects_everything() {
    for db in both() {
        let coll = db.coll("c").unwrap();
        let id = coll.insert(&Value::Null).unwrap();
        db.close().unwrap();

        assert!(matches!(coll.insert(&Value::Null), Err(CoreError::DatabaseClosed)));
        assert!(matches!(coll.update(id, &Value::Null), Err(CoreError::DatabaseClosed)));
        assert!(matches!(coll.delete(id), Err(CoreError::DatabaseClosed)));
        assert!(matches!(coll.get(id), Err(CoreError::DatabaseClosed)));
        assert!(matches!(coll.iter().next(), Some(Err(CoreError::DatabaseClosed))));
        assert!(matches!(db.coll("other"), Err(CoreError::DatabaseClosed)));

        db.close().unwrap();
        db.remove().unwrap();
    }
}
