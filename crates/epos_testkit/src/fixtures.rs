//! Test fixtures and database helpers.
//!
//! Provides convenience functions for setting up test databases
//! and common test scenarios.

use epos_core::{Config, Database, StorageMode};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Name used for every fixture database.
pub const TEST_DB_NAME: &str = "testdb";

/// A test database with automatic cleanup.
pub struct TestDatabase {
    /// The database instance.
    pub db: Database,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestDatabase {
    /// Creates a new in-memory test database.
    pub fn memory() -> Self {
        Self {
            db: Database::open_in_memory(TEST_DB_NAME)
                .expect("Failed to open in-memory database"),
            temp_dir: None,
        }
    }

    /// Creates a new durable test database in a temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open_with_config(TEST_DB_NAME, file_config(temp_dir.path()))
            .expect("Failed to open file database");

        Self {
            db,
            temp_dir: Some(temp_dir),
        }
    }

    /// Closes the database and opens it again from the same directory.
    ///
    /// In-memory databases come back empty.
    pub fn reopen(self) -> Self {
        let Self { db, temp_dir } = self;
        db.close().expect("Failed to close database");
        drop(db);

        let db = match &temp_dir {
            Some(dir) => Database::open_with_config(TEST_DB_NAME, file_config(dir.path())),
            None => Database::open_in_memory(TEST_DB_NAME),
        }
        .expect("Failed to reopen database");
        Self { db, temp_dir }
    }

    /// Returns the root directory if file-based, None if in-memory.
    pub fn root(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Returns the database directory if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self.db.path().map(Path::to_path_buf)
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Configuration for a durable database under `root`.
pub fn file_config(root: &Path) -> Config {
    Config::default().root(root).mode(StorageMode::File)
}

/// Runs a test with a temporary in-memory database.
///
/// # Example
///
/// ```rust
/// use epos_testkit::with_temp_db;
///
/// with_temp_db(|db| {
///     let things = db.coll("things").unwrap();
///     assert_eq!(things.insert_as(&42u8).unwrap(), 1);
/// });
/// ```
pub fn with_temp_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database) -> R,
{
    let test_db = TestDatabase::memory();
    f(&test_db.db)
}

/// Runs a test with a temporary durable database.
pub fn with_file_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database, &Path) -> R,
{
    let test_db = TestDatabase::file();
    let path = test_db.path().expect("File database should have a path");
    f(&test_db.db, &path)
}

/// Sample records.
pub mod samples {
    use epos_codec::Value;
    use serde::{Deserialize, Serialize};

    /// A person record with mixed field kinds.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[allow(non_snake_case)]
    pub struct Person {
        /// Full name.
        pub Name: String,
        /// Age in years.
        pub Age: u32,
        /// Social security number.
        pub SSN: String,
        /// Favourite numbers.
        pub LuckyNumbers: Vec<i32>,
    }

    /// The canonical sample person.
    pub fn person() -> Person {
        Person {
            Name: "John J. McWhackadoodle".into(),
            Age: 29,
            SSN: "078-05-1120".into(),
            LuckyNumbers: vec![23, 43],
        }
    }

    /// The sample person as a [`Value`].
    pub fn person_value() -> Value {
        Value::record([
            ("Name", Value::from("John J. McWhackadoodle")),
            ("Age", Value::Int(29)),
            ("SSN", Value::from("078-05-1120")),
            ("LuckyNumbers", Value::sequence([23i64, 43])),
        ])
    }

    /// A two-field record.
    pub fn towel() -> Value {
        Value::record([("X", "pan-galactic"), ("Y", "gargle-blaster")])
    }
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use epos_codec::Value;

    /// Creates a database whose `test` collection holds `count` records,
    /// record `i` (id `i + 1`) being `{"index": i}`.
    pub fn populated_database(count: usize) -> TestDatabase {
        let test_db = TestDatabase::memory();
        populate(&test_db, "test", count);
        test_db
    }

    /// Creates a database with `collection_count` collections of one record
    /// each.
    pub fn multi_collection_database(collection_count: usize) -> (TestDatabase, Vec<String>) {
        let test_db = TestDatabase::memory();
        let names: Vec<String> = (0..collection_count)
            .map(|i| format!("collection_{i}"))
            .collect();

        for (i, name) in names.iter().enumerate() {
            test_db
                .coll(name)
                .expect("Failed to open collection")
                .insert(&Value::record([("collection", i as i64)]))
                .expect("Failed to insert record");
        }

        (test_db, names)
    }

    /// Inserts `count` records `{"index": i}` into `collection`.
    pub fn populate(db: &Database, collection: &str, count: usize) {
        let coll = db.coll(collection).expect("Failed to open collection");
        for i in 0..count {
            coll.insert(&Value::record([("index", i as i64)]))
                .expect("Failed to insert record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epos_core::BackendKind;

    #[test]
    fn memory_fixture_is_volatile() {
        let test_db = TestDatabase::memory();
        assert_eq!(test_db.backend_kind(), BackendKind::Volatile);
        assert!(test_db.root().is_none());
        assert!(test_db.path().is_none());
    }

    #[test]
    fn file_fixture_is_durable() {
        let test_db = TestDatabase::file();
        assert_eq!(test_db.backend_kind(), BackendKind::Durable);
        assert!(test_db.path().unwrap().is_dir());
    }

    #[test]
    fn reopen_keeps_file_data() {
        let test_db = TestDatabase::file();
        scenarios::populate(&test_db, "test", 3);
        let test_db = test_db.reopen();
        assert_eq!(test_db.coll("test").unwrap().len().unwrap(), 3);
    }

    #[test]
    fn populated_scenario() {
        let test_db = scenarios::populated_database(10);
        let coll = test_db.coll("test").unwrap();
        assert_eq!(coll.len().unwrap(), 10);
        assert_eq!(coll.get(10).unwrap().get("index"), Some(&epos_codec::Value::Int(9)));
    }

    #[test]
    fn multi_collection_scenario() {
        let (test_db, names) = scenarios::multi_collection_database(3);
        assert_eq!(test_db.collection_names().unwrap(), names);
    }

    #[test]
    fn sample_person_converts_to_value() {
        assert_eq!(
            epos_codec::to_value(&samples::person()).unwrap(),
            samples::person_value()
        );
    }
}
