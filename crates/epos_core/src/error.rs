//! Error types for epos core.

use epos_codec::CodecError;
use epos_storage::StorageError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in epos core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The value has a shape that cannot be stored or converted.
    #[error("unsupported type: {source}")]
    UnsupportedType {
        /// The codec failure.
        #[source]
        source: CodecError,
    },

    /// A stored record could not be read back.
    #[error("corrupt record {id} in collection {collection:?}: {message}")]
    CorruptRecord {
        /// Collection holding the record.
        collection: String,
        /// Identifier of the record.
        id: u64,
        /// Description of the damage.
        message: String,
    },

    /// No record with this identifier exists in the collection.
    #[error("record {id} not found in collection {collection:?}")]
    NotFound {
        /// Collection that was searched.
        collection: String,
        /// The identifier that was not found.
        id: u64,
    },

    /// The durable medium could not be created or opened.
    #[error("storage unavailable at {}: {source}", path.display())]
    StorageUnavailable {
        /// Location of the durable artifact.
        path: PathBuf,
        /// Why opening failed.
        #[source]
        source: StorageError,
    },

    /// Database is closed.
    #[error("database is closed")]
    DatabaseClosed,

    /// The backend could not erase its medium.
    #[error("failed to remove database {name:?}: {source}")]
    RemoveFailed {
        /// Name of the database.
        name: String,
        /// Why erasing failed.
        #[source]
        source: StorageError,
    },

    /// Storage backend error on an open database.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A database or collection name cannot be used.
    #[error("invalid name {name:?}: {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Every identifier of the collection has been handed out.
    #[error("identifiers exhausted in collection {collection:?}")]
    IdsExhausted {
        /// The collection.
        collection: String,
    },
}

impl CoreError {
    /// Creates an unsupported type error.
    pub fn unsupported_type(source: CodecError) -> Self {
        Self::UnsupportedType { source }
    }

    /// Creates a corrupt record error.
    pub fn corrupt_record(collection: &str, id: u64, message: impl Into<String>) -> Self {
        Self::CorruptRecord {
            collection: collection.to_string(),
            id,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(collection: &str, id: u64) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id,
        }
    }

    /// Creates an invalid name error.
    pub fn invalid_name(name: &str, reason: &'static str) -> Self {
        Self::InvalidName {
            name: name.to_string(),
            reason,
        }
    }

    /// Classifies a backend error raised while touching one record.
    pub(crate) fn from_record_access(err: StorageError, collection: &str, id: u64) -> Self {
        match err {
            StorageError::NotFound { collection, id } => Self::NotFound { collection, id },
            StorageError::Closed => Self::DatabaseClosed,
            e if e.is_corruption() => Self::corrupt_record(collection, id, e.to_string()),
            e => Self::Storage(e),
        }
    }
}
