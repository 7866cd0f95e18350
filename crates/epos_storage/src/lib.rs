//! # epos Storage
//!
//! Storage backend trait and implementations for epos.
//!
//! Storage backends are **opaque byte stores** keyed by
//! `(collection, id)` - they never interpret the records they hold.
//!
//! ## Design Principles
//!
//! - One backend instance serves every collection of a database
//! - Backends track each collection's high-water mark so identifiers are
//!   never reissued, even after the highest record is deleted
//! - Must be `Send + Sync` for concurrent access
//! - Encoding records is the caller's business
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - Volatile, for tests and ephemeral databases
//! - [`FileBackend`] - Durable, an append-only checksummed log in a directory
//!
//! ## Example
//!
//! ```rust
//! use epos_storage::{InMemoryBackend, StorageBackend};
//!
//! let backend = InMemoryBackend::new();
//! backend.put("users", 1, b"hello world").unwrap();
//! assert_eq!(backend.get("users", 1).unwrap().as_deref(), Some(&b"hello world"[..]));
//! assert_eq!(backend.ids("users").unwrap().collect::<Vec<_>>(), vec![1]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod log;
mod memory;

pub use backend::{BackendKind, RecordIds, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use file::{FileBackend, FileOptions};
pub use memory::InMemoryBackend;
