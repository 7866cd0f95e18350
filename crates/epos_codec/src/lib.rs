//! # epos Codec
//!
//! Self-describing value encoding for epos.
//!
//! Every stored record is a single [`Value`] written in a tagged,
//! length-prefixed form:
//!
//! ```text
//! | tag (1) | payload |
//!
//! NULL                                  (no payload)
//! BOOL      | 0 or 1 (1) |
//! INT       | i64 BE (8) |
//! UINT      | u64 BE (8) |
//! FLOAT     | f64 bits BE (8) |
//! STRING    | len u32 BE (4) | UTF-8 bytes |
//! BYTES     | len u32 BE (4) | bytes |
//! SEQUENCE  | count u32 BE (4) | value * count |
//! RECORD    | count u32 BE (4) | (len u32 BE | name | value) * count |
//! ```
//!
//! ## Guarantees
//!
//! - Identical values produce identical bytes (record fields keep insertion
//!   order, nothing is sorted or normalized)
//! - `decode(encode(v)) == v` for every value without reference cycles
//! - Decoding never panics; malformed input is an error
//!
//! ## Usage
//!
//! ```
//! use epos_codec::{decode, encode, Value};
//!
//! let value = Value::record([("X", "pan-galactic"), ("Y", "gargle-blaster")]);
//! let bytes = encode(&value).unwrap();
//! assert_eq!(decode(&bytes).unwrap(), value);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod convert;
mod decoder;
mod encoder;
mod error;
mod value;

pub use convert::{from_value, to_value};
pub use decoder::{decode, Decoder};
pub use encoder::{encode, Encoder};
pub use error::{CodecError, CodecResult};
pub use value::{SharedValue, Value};

/// Maximum nesting depth of sequences and records.
///
/// Bounds recursion on both sides so that hostile input cannot exhaust
/// the stack.
pub const MAX_DEPTH: usize = 256;

/// One-byte type tags that prefix every encoded value.
pub mod tag {
    /// Null.
    pub const NULL: u8 = 0x00;
    /// Boolean.
    pub const BOOL: u8 = 0x01;
    /// Signed 64-bit integer.
    pub const INT: u8 = 0x02;
    /// Unsigned 64-bit integer.
    pub const UINT: u8 = 0x03;
    /// 64-bit float.
    pub const FLOAT: u8 = 0x04;
    /// UTF-8 text.
    pub const STRING: u8 = 0x05;
    /// Byte string.
    pub const BYTES: u8 = 0x06;
    /// Sequence of values.
    pub const SEQUENCE: u8 = 0x07;
    /// Record of named fields.
    pub const RECORD: u8 = 0x08;
}
