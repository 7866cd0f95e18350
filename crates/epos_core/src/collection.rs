//! Collections: named sets of records addressed by identifier.

use crate::allocator::IdAllocator;
use crate::database::DbInner;
use crate::error::{CoreError, CoreResult};
use epos_codec::{decode, encode, from_value, to_value, Value};
use epos_storage::RecordIds;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Per-collection state shared by every handle to the collection.
#[derive(Debug)]
pub(crate) struct CollectionState {
    name: String,
    ids: IdAllocator,
    /// Serializes existence checks with the write that follows them.
    writes: Mutex<()>,
}

impl CollectionState {
    pub(crate) fn new(name: String, ids: IdAllocator) -> Self {
        Self {
            name,
            ids,
            writes: Mutex::new(()),
        }
    }
}

/// A handle to a named collection of a [`Database`](crate::Database).
///
/// Handles are cheap to clone; all clones and every handle obtained from
/// [`Database::coll`](crate::Database::coll) with the same name see the
/// same records and share one identifier allocator.
///
/// Records are whole [`Value`]s. Host types go through the `*_as` methods,
/// which convert via serde.
///
/// # Example
///
/// ```rust
/// use epos_core::Database;
/// use epos_codec::Value;
///
/// let db = Database::open_in_memory("example")?;
/// let things = db.coll("things")?;
///
/// let id = things.insert(&Value::sequence(["hello", "world!"]))?;
/// things.update(id, &Value::from("replaced"))?;
/// assert_eq!(things.get(id)?, Value::from("replaced"));
///
/// for entry in things.iter() {
///     let (id, value) = entry?;
///     println!("{id}: {value:?}");
/// }
/// # Ok::<(), epos_core::CoreError>(())
/// ```
#[derive(Clone)]
pub struct Collection {
    db: Arc<DbInner>,
    state: Arc<CollectionState>,
}

impl Collection {
    pub(crate) fn new(db: Arc<DbInner>, state: Arc<CollectionState>) -> Self {
        Self { db, state }
    }

    /// Returns the collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Stores a value under a fresh identifier and returns the identifier.
    ///
    /// The value is encoded before an identifier is taken, so a value that
    /// cannot be encoded leaves the allocator untouched.
    ///
    /// # Errors
    ///
    /// - `UnsupportedType` if the value cannot be encoded (for example a
    ///   shared node that contains itself)
    /// - `DatabaseClosed` after the database was closed
    pub fn insert(&self, value: &Value) -> CoreResult<u64> {
        let record = encode(value).map_err(CoreError::unsupported_type)?;
        let backend = self.db.backend()?;
        let id = self.state.ids.next().ok_or_else(|| CoreError::IdsExhausted {
            collection: self.state.name.clone(),
        })?;
        backend
            .put(&self.state.name, id, &record)
            .map_err(|e| CoreError::from_record_access(e, &self.state.name, id))?;
        Ok(id)
    }

    /// Replaces the record stored under `id`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if `id` was never assigned or has been deleted
    /// - `UnsupportedType` if the value cannot be encoded
    /// - `DatabaseClosed` after the database was closed
    pub fn update(&self, id: u64, value: &Value) -> CoreResult<()> {
        let record = encode(value).map_err(CoreError::unsupported_type)?;
        let backend = self.db.backend()?;
        let name = &self.state.name;

        let _writes = self.state.writes.lock();
        let exists = backend
            .contains(name, id)
            .map_err(|e| CoreError::from_record_access(e, name, id))?;
        if !exists {
            return Err(CoreError::not_found(name, id));
        }
        backend
            .put(name, id, &record)
            .map_err(|e| CoreError::from_record_access(e, name, id))
    }

    /// Removes the record stored under `id`. The identifier stays retired.
    ///
    /// # Errors
    ///
    /// - `NotFound` if there is no such record
    /// - `DatabaseClosed` after the database was closed
    pub fn delete(&self, id: u64) -> CoreResult<()> {
        let backend = self.db.backend()?;
        let name = &self.state.name;

        let _writes = self.state.writes.lock();
        backend
            .delete(name, id)
            .map_err(|e| CoreError::from_record_access(e, name, id))
    }

    /// Reads the record stored under `id`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if there is no such record
    /// - `CorruptRecord` if the stored bytes cannot be decoded
    /// - `DatabaseClosed` after the database was closed
    pub fn get(&self, id: u64) -> CoreResult<Value> {
        let backend = self.db.backend()?;
        read_record(&*backend, &self.state.name, id)?
            .ok_or_else(|| CoreError::not_found(&self.state.name, id))
    }

    /// Returns true if a record is stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseClosed` after the database was closed.
    pub fn contains(&self, id: u64) -> CoreResult<bool> {
        let backend = self.db.backend()?;
        backend
            .contains(&self.state.name, id)
            .map_err(|e| CoreError::from_record_access(e, &self.state.name, id))
    }

    /// Returns the number of records in the collection.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseClosed` after the database was closed.
    pub fn len(&self) -> CoreResult<usize> {
        Ok(self.db.backend()?.ids(&self.state.name)?.len())
    }

    /// Returns true if the collection holds no records.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseClosed` after the database was closed.
    pub fn is_empty(&self) -> CoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Returns the identifier the next successful insert will receive,
    /// unless another insert takes it first.
    #[must_use]
    pub fn next_id(&self) -> u64 {
        self.state.ids.peek()
    }

    /// Iterates over `(id, value)` pairs in ascending id order.
    ///
    /// The set of identifiers is captured when this is called; records
    /// deleted afterwards are skipped, records inserted afterwards are not
    /// visited. A record that cannot be decoded yields a `CorruptRecord`
    /// error for its element and iteration continues. If the database is
    /// closed, the iterator yields one `DatabaseClosed` error and ends.
    pub fn iter(&self) -> Iter {
        let snapshot = self
            .db
            .backend()
            .and_then(|backend| backend.ids(&self.state.name).map_err(CoreError::from));
        match snapshot {
            Ok(ids) => Iter {
                collection: self.clone(),
                ids,
                pending: None,
                done: false,
            },
            Err(e) => Iter {
                collection: self.clone(),
                ids: RecordIds::empty(),
                pending: Some(e),
                done: false,
            },
        }
    }

    /// Converts a host value and inserts it.
    ///
    /// # Errors
    ///
    /// See [`insert`](Self::insert); conversion failures are `UnsupportedType`.
    pub fn insert_as<T: Serialize + ?Sized>(&self, value: &T) -> CoreResult<u64> {
        let value = to_value(value).map_err(CoreError::unsupported_type)?;
        self.insert(&value)
    }

    /// Converts a host value and replaces the record stored under `id`.
    ///
    /// # Errors
    ///
    /// See [`update`](Self::update); conversion failures are `UnsupportedType`.
    pub fn update_as<T: Serialize + ?Sized>(&self, id: u64, value: &T) -> CoreResult<()> {
        let value = to_value(value).map_err(CoreError::unsupported_type)?;
        self.update(id, &value)
    }

    /// Reads the record stored under `id` and converts it to a host type.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get); a record whose shape does not fit `T` is
    /// `UnsupportedType`.
    pub fn get_as<T: DeserializeOwned>(&self, id: u64) -> CoreResult<T> {
        let value = self.get(id)?;
        from_value(&value).map_err(CoreError::unsupported_type)
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.state.name)
            .field("next_id", &self.state.ids.peek())
            .finish_non_exhaustive()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = CoreResult<(u64, Value)>;
    type IntoIter = Iter;

    fn into_iter(self) -> Iter {
        self.iter()
    }
}

/// Iterator over the records of a collection.
///
/// Created by [`Collection::iter`].
#[derive(Debug)]
pub struct Iter {
    collection: Collection,
    ids: RecordIds,
    pending: Option<CoreError>,
    done: bool,
}

impl Iterator for Iter {
    type Item = CoreResult<(u64, Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending.take() {
            self.done = true;
            return Some(Err(err));
        }
        if self.done {
            return None;
        }

        let name = &self.collection.state.name;
        for id in self.ids.by_ref() {
            let backend = match self.collection.db.backend() {
                Ok(backend) => backend,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };
            match read_record(&*backend, name, id) {
                Ok(Some(value)) => return Some(Ok((id, value))),
                // Deleted since the pass started.
                Ok(None) => continue,
                Err(CoreError::DatabaseClosed) => {
                    self.done = true;
                    return Some(Err(CoreError::DatabaseClosed));
                }
                Err(e) => return Some(Err(e)),
            }
        }
        self.done = true;
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        let extra = usize::from(self.pending.is_some());
        (0, Some(self.ids.len() + extra))
    }
}

fn read_record(
    backend: &dyn epos_storage::StorageBackend,
    collection: &str,
    id: u64,
) -> CoreResult<Option<Value>> {
    let Some(bytes) = backend
        .get(collection, id)
        .map_err(|e| CoreError::from_record_access(e, collection, id))?
    else {
        return Ok(None);
    };
    decode(&bytes)
        .map(Some)
        .map_err(|e| CoreError::corrupt_record(collection, id, e.to_string()))
}
