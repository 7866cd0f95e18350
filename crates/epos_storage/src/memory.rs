//! In-memory storage backend.

use crate::backend::{BackendKind, RecordIds, StorageBackend};
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
struct MemCollection {
    records: BTreeMap<u64, Vec<u8>>,
    high_water: u64,
}

/// An in-memory storage backend.
///
/// This backend stores all data in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral databases that don't need persistence
///
/// `flush` is a no-op; `close` and `destroy` drop every record.
///
/// # Thread Safety
///
/// This backend is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use epos_storage::{InMemoryBackend, StorageBackend};
///
/// let backend = InMemoryBackend::new();
/// backend.put("users", 1, b"record").unwrap();
/// assert_eq!(backend.get("users", 1).unwrap(), Some(b"record".to_vec()));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    collections: RwLock<HashMap<String, MemCollection>>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of live records across all collections.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.collections
            .read()
            .values()
            .map(|c| c.records.len())
            .sum()
    }
}

impl StorageBackend for InMemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Volatile
    }

    fn put(&self, collection: &str, id: u64, record: &[u8]) -> StorageResult<()> {
        let mut collections = self.collections.write();
        let entry = collections.entry(collection.to_string()).or_default();
        entry.records.insert(id, record.to_vec());
        entry.high_water = entry.high_water.max(id);
        Ok(())
    }

    fn get(&self, collection: &str, id: u64) -> StorageResult<Option<Vec<u8>>> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .and_then(|c| c.records.get(&id).cloned()))
    }

    fn contains(&self, collection: &str, id: u64) -> StorageResult<bool> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .is_some_and(|c| c.records.contains_key(&id)))
    }

    fn delete(&self, collection: &str, id: u64) -> StorageResult<()> {
        let mut collections = self.collections.write();
        collections
            .get_mut(collection)
            .and_then(|c| c.records.remove(&id))
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound {
                collection: collection.to_string(),
                id,
            })
    }

    fn ids(&self, collection: &str) -> StorageResult<RecordIds> {
        let collections = self.collections.read();
        Ok(collections.get(collection).map_or_else(RecordIds::empty, |c| {
            RecordIds::new(c.records.keys().copied().collect())
        }))
    }

    fn high_water_mark(&self, collection: &str) -> Option<u64> {
        self.collections
            .read()
            .get(collection)
            .map(|c| c.high_water)
            .filter(|&hw| hw > 0)
    }

    fn collections(&self) -> StorageResult<Vec<String>> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn flush(&self) -> StorageResult<()> {
        // In-memory backend has no pending writes
        Ok(())
    }

    fn close(&self) -> StorageResult<()> {
        self.collections.write().clear();
        Ok(())
    }

    fn destroy(&self) -> StorageResult<()> {
        self.collections.write().clear();
        Ok(())
    }
}
