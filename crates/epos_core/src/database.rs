//! Database lifecycle: open, collection registry, close and remove.

use crate::allocator::IdAllocator;
use crate::collection::{Collection, CollectionState};
use crate::config::{Config, StorageMode};
use crate::error::{CoreError, CoreResult};
use epos_storage::{BackendKind, FileBackend, FileOptions, InMemoryBackend, StorageBackend};
use parking_lot::{MappedRwLockReadGuard, Mutex, RwLock, RwLockReadGuard};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Suffix of the directory holding a durable database.
pub const DATABASE_DIR_SUFFIX: &str = "epos";

/// The main database handle.
///
/// `Database` owns one storage backend, chosen once at open time, and the
/// registry of collections created on first reference.
///
/// # Opening a Database
///
/// ```rust,no_run
/// use epos_core::{Database, StorageMode};
/// use epos_codec::Value;
///
/// let db = Database::open("testdb", StorageMode::Auto)?;
///
/// let users = db.coll("users")?;
/// let id = users.insert(&Value::record([("X", "pan-galactic"), ("Y", "gargle-blaster")]))?;
/// assert_eq!(id, 1);
///
/// // Close gracefully
/// db.close()?;
/// # Ok::<(), epos_core::CoreError>(())
/// ```
///
/// # Lifecycle
///
/// - [`close`](Self::close) flushes the backend and rejects every later
///   collection operation with [`CoreError::DatabaseClosed`]
/// - [`remove`](Self::remove) closes and then erases everything the
///   database ever stored
/// - dropping the handle closes it
///
/// # Thread Safety
///
/// `Database` and [`Collection`] are `Send + Sync`. Data operations share a
/// read lock on the backend; `close` and `remove` take it exclusively and so
/// wait for in-flight operations to finish.
pub struct Database {
    inner: Arc<DbInner>,
}

/// State shared between a database and its collections.
pub(crate) struct DbInner {
    name: String,
    kind: BackendKind,
    path: Option<PathBuf>,
    state: RwLock<DbState>,
    collections: Mutex<HashMap<String, Arc<CollectionState>>>,
}

struct DbState {
    open: bool,
    backend: Box<dyn StorageBackend>,
}

impl DbInner {
    /// Borrows the backend for one operation.
    ///
    /// The returned guard keeps `close` and `remove` waiting until dropped.
    pub(crate) fn backend(&self) -> CoreResult<MappedRwLockReadGuard<'_, dyn StorageBackend>> {
        let state = self.state.read();
        if !state.open {
            return Err(CoreError::DatabaseClosed);
        }
        Ok(RwLockReadGuard::map(state, |s| s.backend.as_ref()))
    }
}

impl Database {
    /// Opens a database with the default configuration and the given mode.
    ///
    /// Durable databases live in `./<name>.epos/`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `name` cannot be used as a directory name (`InvalidName`)
    /// - `mode` is [`StorageMode::File`] and the directory cannot be
    ///   created, locked or replayed (`StorageUnavailable`)
    /// - `mode` is [`StorageMode::Auto`] and the existing log is damaged
    ///   beyond replay (`StorageUnavailable`)
    pub fn open(name: &str, mode: StorageMode) -> CoreResult<Self> {
        Self::open_with_config(name, Config::default().mode(mode))
    }

    /// Opens a database with custom configuration.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use epos_core::{Config, Database, StorageMode};
    ///
    /// let config = Config::default()
    ///     .root("/var/lib/myapp")
    ///     .mode(StorageMode::File)
    ///     .sync_writes(true);
    ///
    /// let db = Database::open_with_config("inventory", config)?;
    /// # Ok::<(), epos_core::CoreError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// See [`open`](Self::open).
    pub fn open_with_config(name: &str, config: Config) -> CoreResult<Self> {
        validate_database_name(name)?;
        let path = config
            .root
            .join(format!("{name}.{DATABASE_DIR_SUFFIX}"));

        // The durable open is attempted once; its outcome fixes the backend
        // for the lifetime of this handle.
        let attempt = config.mode.wants_durable().then(|| {
            FileBackend::open(&path, FileOptions::default().sync_writes(config.sync_writes))
        });
        let resolved = config.mode.resolve(matches!(attempt, Some(Ok(_))));

        let backend: Box<dyn StorageBackend> = match (resolved, attempt) {
            (Some(BackendKind::Durable), Some(Ok(file))) => Box::new(file),
            (None, Some(Err(source))) => {
                return Err(CoreError::StorageUnavailable { path, source });
            }
            // A damaged log is never swapped for an empty volatile store.
            (_, Some(Err(source))) if source.is_corruption() => {
                return Err(CoreError::StorageUnavailable { path, source });
            }
            (_, attempt) => {
                if let Some(Err(e)) = attempt {
                    warn!(
                        database = name,
                        path = %path.display(),
                        error = %e,
                        "durable storage unavailable, falling back to memory"
                    );
                }
                Box::new(InMemoryBackend::new())
            }
        };

        let kind = backend.kind();
        let path = (kind == BackendKind::Durable).then_some(path);
        info!(
            database = name,
            backend = %kind,
            path = ?path,
            "opened database"
        );

        Ok(Self {
            inner: Arc::new(DbInner {
                name: name.to_string(),
                kind,
                path,
                state: RwLock::new(DbState {
                    open: true,
                    backend,
                }),
                collections: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// Opens a volatile database.
    ///
    /// Shorthand for `Database::open(name, StorageMode::Memory)`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` if `name` is not a valid database name.
    pub fn open_in_memory(name: &str) -> CoreResult<Self> {
        Self::open(name, StorageMode::Memory)
    }

    /// Returns the collection with this name, creating it on first reference.
    ///
    /// Repeated calls with the same name return handles to the same
    /// collection, sharing one identifier allocator. A collection's
    /// allocator is restored from the backend the first time it is
    /// referenced after open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseClosed` after [`close`](Self::close), or
    /// `InvalidName` for an empty or oversized name.
    pub fn coll(&self, name: &str) -> CoreResult<Collection> {
        validate_collection_name(name)?;
        let backend = self.inner.backend()?;

        let mut collections = self.inner.collections.lock();
        let state = collections
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(CollectionState::new(
                    name.to_string(),
                    IdAllocator::starting_after(backend.high_water_mark(name)),
                ))
            })
            .clone();
        drop(collections);
        drop(backend);

        Ok(Collection::new(Arc::clone(&self.inner), state))
    }

    /// Returns the names of all collections, stored or referenced, sorted.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseClosed` after [`close`](Self::close).
    pub fn collection_names(&self) -> CoreResult<Vec<String>> {
        let backend = self.inner.backend()?;
        let mut names = backend.collections()?;
        names.extend(self.inner.collections.lock().keys().cloned());
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Forces accepted writes to disk.
    ///
    /// A no-op for volatile databases.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseClosed` after [`close`](Self::close), or `Storage`
    /// if syncing fails.
    pub fn flush(&self) -> CoreResult<()> {
        self.inner.backend()?.flush()?;
        Ok(())
    }

    /// Rewrites durable storage to drop overwritten and deleted records.
    ///
    /// Does not change what any read observes, and deleted identifiers stay
    /// retired. A no-op for volatile databases.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseClosed` after [`close`](Self::close), or `Storage`
    /// if rewriting fails.
    pub fn compact(&self) -> CoreResult<()> {
        self.inner.backend()?.compact()?;
        Ok(())
    }

    /// Flushes and closes the database.
    ///
    /// Idempotent. The database is closed when this returns, even if the
    /// final flush failed.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the final flush fails.
    pub fn close(&self) -> CoreResult<()> {
        let mut state = self.inner.state.write();
        if !state.open {
            return Ok(());
        }
        state.open = false;
        state.backend.close()?;
        info!(database = %self.inner.name, "closed database");
        Ok(())
    }

    /// Closes the database and erases everything it stored.
    ///
    /// A later open of the same name starts empty. Safe to call on a
    /// closed database and to call twice.
    ///
    /// # Errors
    ///
    /// Returns `RemoveFailed` if the medium cannot be erased; the database
    /// is closed either way.
    pub fn remove(&self) -> CoreResult<()> {
        let mut state = self.inner.state.write();
        state.open = false;
        state
            .backend
            .destroy()
            .map_err(|source| CoreError::RemoveFailed {
                name: self.inner.name.clone(),
                source,
            })?;
        self.inner.collections.lock().clear();
        info!(database = %self.inner.name, "removed database");
        Ok(())
    }

    /// Returns the database name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the backend chosen at open time.
    #[must_use]
    pub fn backend_kind(&self) -> BackendKind {
        self.inner.kind
    }

    /// Returns the directory of a durable database.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    /// Checks if the database is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.state.read().open
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.inner.name)
            .field("backend", &self.inner.kind)
            .field("is_open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn validate_database_name(name: &str) -> CoreResult<()> {
    if name.is_empty() {
        return Err(CoreError::invalid_name(name, "name is empty"));
    }
    if name == "." || name == ".." {
        return Err(CoreError::invalid_name(name, "name is a relative path"));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(CoreError::invalid_name(
            name,
            "name contains a path separator or NUL",
        ));
    }
    Ok(())
}

fn validate_collection_name(name: &str) -> CoreResult<()> {
    if name.is_empty() {
        return Err(CoreError::invalid_name(name, "name is empty"));
    }
    if name.len() > usize::from(u16::MAX) {
        return Err(CoreError::invalid_name(name, "name is longer than 65535 bytes"));
    }
    Ok(())
}
