//! Storage backend trait definition.

use crate::error::StorageResult;
use std::fmt;

/// Whether a backend keeps its data across process restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Data lives in process memory and is lost on exit.
    Volatile,
    /// Data lives on disk and survives a reopen.
    Durable,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Volatile => f.write_str("volatile"),
            Self::Durable => f.write_str("durable"),
        }
    }
}

/// A record store partitioned by collection name and identifier.
///
/// Backends are **opaque byte stores**: they never interpret record bytes.
/// One backend instance serves every collection of a database.
///
/// # Invariants
///
/// - `get` returns exactly the bytes of the last `put` for that key
/// - a single `put`/`delete` is atomic with respect to concurrent readers
/// - `high_water_mark` never decreases, not even on `delete`
/// - after `flush` returns, accepted writes survive a reopen (durable only)
/// - Backends must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - Volatile
/// - [`super::FileBackend`] - Durable
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Returns whether this backend is volatile or durable.
    fn kind(&self) -> BackendKind;

    /// Stores a record, replacing any previous record with the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is closed or an I/O error occurs.
    fn put(&self, collection: &str, id: u64, record: &[u8]) -> StorageResult<()>;

    /// Reads a record.
    ///
    /// Returns `None` if no record with that id exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is closed, the stored bytes fail
    /// verification, or an I/O error occurs.
    fn get(&self, collection: &str, id: u64) -> StorageResult<Option<Vec<u8>>>;

    /// Returns true if a record with that id exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is closed.
    fn contains(&self, collection: &str, id: u64) -> StorageResult<bool>;

    /// Removes a record.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`](crate::StorageError::NotFound) if
    /// the record does not exist.
    fn delete(&self, collection: &str, id: u64) -> StorageResult<()>;

    /// Returns the ids of all live records in a collection.
    ///
    /// Ids are ascending. Each call starts a fresh pass over a snapshot
    /// taken at the time of the call.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is closed.
    fn ids(&self, collection: &str) -> StorageResult<RecordIds>;

    /// Returns the highest id ever written to a collection, deleted or not.
    ///
    /// Returns `None` for a collection that has never been written to.
    fn high_water_mark(&self, collection: &str) -> Option<u64>;

    /// Returns the names of all collections known to the backend, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is closed.
    fn collections(&self) -> StorageResult<Vec<String>>;

    /// Forces accepted writes to their durability target.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&self) -> StorageResult<()>;

    /// Reclaims space taken by overwritten and deleted records.
    ///
    /// Must not change what any read observes.
    ///
    /// # Errors
    ///
    /// Returns an error if rewriting the medium fails.
    fn compact(&self) -> StorageResult<()> {
        Ok(())
    }

    /// Flushes and releases the medium. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails; the backend is closed
    /// regardless.
    fn close(&self) -> StorageResult<()>;

    /// Irreversibly discards all state held by this backend.
    ///
    /// Implies `close`. Succeeds if there is nothing left to discard.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be erased.
    fn destroy(&self) -> StorageResult<()>;
}

/// Snapshot of record ids in a collection, in ascending order.
#[derive(Debug, Clone)]
pub struct RecordIds(std::vec::IntoIter<u64>);

impl RecordIds {
    /// Creates an id sequence from a sorted list.
    #[must_use]
    pub fn new(ids: Vec<u64>) -> Self {
        Self(ids.into_iter())
    }

    /// Creates an empty id sequence.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl Iterator for RecordIds {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        self.0.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl ExactSizeIterator for RecordIds {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_ids_iterate_in_order() {
        let ids = RecordIds::new(vec![1, 3, 7]);
        assert_eq!(ids.len(), 3);
        assert_eq!(ids.collect::<Vec<_>>(), vec![1, 3, 7]);
        assert_eq!(RecordIds::empty().count(), 0);
    }

    #[test]
    fn backend_kind_display() {
        assert_eq!(BackendKind::Volatile.to_string(), "volatile");
        assert_eq!(BackendKind::Durable.to_string(), "durable");
    }
}
