//! # epos Testkit
//!
//! Test utilities for epos.
//!
//! This crate provides:
//! - Test fixtures and database helpers
//! - Property-based test generators using proptest
//! - Stress testing utilities
//! - Cross-crate integration tests (under `tests/`)
//!
//! ## Usage
//!
//! ```rust
//! use epos_testkit::prelude::*;
//!
//! with_temp_db(|db| {
//!     let coll = db.coll("test").unwrap();
//!     assert_eq!(coll.insert(&samples::person_value()).unwrap(), 1);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
