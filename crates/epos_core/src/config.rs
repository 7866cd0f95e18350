//! Database configuration.

use epos_storage::BackendKind;
use std::path::PathBuf;

/// Where a database keeps its records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StorageMode {
    /// Durable when the on-disk artifact can be created and locked, volatile
    /// otherwise. A damaged existing log fails the open instead.
    #[default]
    Auto,
    /// Always volatile.
    Memory,
    /// Always durable; opening fails if the artifact cannot be created.
    File,
}

impl StorageMode {
    /// Decides the backend for this mode.
    ///
    /// `durable_available` is the outcome of trying to open the durable
    /// artifact. Returns `None` when `File` was requested but the artifact
    /// is unavailable.
    #[must_use]
    pub const fn resolve(self, durable_available: bool) -> Option<BackendKind> {
        match (self, durable_available) {
            (Self::Memory, _) | (Self::Auto, false) => Some(BackendKind::Volatile),
            (Self::Auto | Self::File, true) => Some(BackendKind::Durable),
            (Self::File, false) => None,
        }
    }

    /// Returns true if this mode attempts to open the durable artifact.
    #[must_use]
    pub const fn wants_durable(self) -> bool {
        !matches!(self, Self::Memory)
    }
}

/// Configuration for opening a database.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory under which durable databases are created.
    pub root: PathBuf,

    /// Requested storage mode.
    pub mode: StorageMode,

    /// Whether to sync the log after every write (safer but slower).
    ///
    /// `flush` and `close` always sync.
    pub sync_writes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            mode: StorageMode::Auto,
            sync_writes: false,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the directory durable databases live under.
    #[must_use]
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Sets the storage mode.
    #[must_use]
    pub const fn mode(mut self, mode: StorageMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets whether to sync the log on every write.
    #[must_use]
    pub const fn sync_writes(mut self, value: bool) -> Self {
        self.sync_writes = value;
        self
    }
}
