//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The record does not exist in the collection.
    #[error("record {id} not found in collection {collection:?}")]
    NotFound {
        /// Collection that was searched.
        collection: String,
        /// Identifier that was not found.
        id: u64,
    },

    /// The storage medium is corrupted.
    #[error("storage corrupted at offset {offset}: {message}")]
    Corrupted {
        /// Byte offset of the damaged frame.
        offset: u64,
        /// Description of the damage.
        message: String,
    },

    /// A stored frame failed its checksum.
    #[error("checksum mismatch at offset {offset}: stored {stored:08x}, computed {computed:08x}")]
    ChecksumMismatch {
        /// Byte offset of the frame.
        offset: u64,
        /// Payload checksum stored in the frame.
        stored: u32,
        /// Checksum computed over the payload read back.
        computed: u32,
    },

    /// Another handle holds the exclusive lock on the storage directory.
    #[error("storage locked: {}", path.display())]
    Locked {
        /// The locked directory.
        path: PathBuf,
    },

    /// A collection name is too long to be stored.
    #[error("collection name is {len} bytes, limit is {max}")]
    NameTooLong {
        /// Length of the name in bytes.
        len: usize,
        /// Maximum allowed length in bytes.
        max: usize,
    },

    /// The storage is closed.
    #[error("storage is closed")]
    Closed,
}

impl StorageError {
    /// Creates a corruption error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::Corrupted {
            offset,
            message: message.into(),
        }
    }

    /// Returns true if the error means stored bytes are damaged.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::Corrupted { .. } | Self::ChecksumMismatch { .. })
    }
}
