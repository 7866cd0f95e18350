//! # epos Core
//!
//! Embedded, schema-less document store.
//!
//! A [`Database`] holds named [`Collection`]s. Each collection stores whole
//! [`Value`]s under identifiers it allocates itself: 1, 2, 3, ... in insert
//! order, never reused, not even after a delete or a reopen.
//!
//! This crate provides:
//! - Storage mode resolution ([`StorageMode`]) fixed once at open time
//! - The collection registry and per-collection identifier allocation
//! - Insert / update / delete / get / iterate over self-describing records
//! - Close and remove lifecycle, safe under concurrent use
//!
//! ## Example
//!
//! ```rust
//! use epos_core::{Database, StorageMode};
//! use epos_codec::Value;
//!
//! let db = Database::open("testdb1", StorageMode::Memory)?;
//! let coll = db.coll("test")?;
//!
//! let first = coll.insert(&Value::sequence(["hello", "world!"]))?;
//! let second = coll.insert(&Value::record([("X", "pan-galactic"), ("Y", "gargle-blaster")]))?;
//! assert_eq!((first, second), (1, 2));
//!
//! db.remove()?;
//! # Ok::<(), epos_core::CoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod allocator;
mod collection;
mod config;
mod database;
mod error;

pub use allocator::IdAllocator;
pub use collection::{Collection, Iter};
pub use config::{Config, StorageMode};
pub use database::{Database, DATABASE_DIR_SUFFIX};
pub use error::{CoreError, CoreResult};

// Re-exports so callers need only this crate for common use.
pub use epos_codec::{SharedValue, Value};
pub use epos_storage::BackendKind;
