//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding, decoding or conversion.
///
/// Encoding produces [`UnsupportedType`](Self::UnsupportedType),
/// [`CyclicValue`](Self::CyclicValue), [`LengthOverflow`](Self::LengthOverflow)
/// and [`DepthExceeded`](Self::DepthExceeded). Every other variant comes from
/// reading bytes that do not form a valid record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The value contains a kind that has no wire representation.
    #[error("unsupported type: {type_name}")]
    UnsupportedType {
        /// Name of the unsupported kind.
        type_name: String,
    },

    /// A shared node was reached again while it was still being encoded.
    #[error("value contains a reference cycle")]
    CyclicValue,

    /// A string, byte sequence or container is too long for a length prefix.
    #[error("length {len} does not fit in a 32-bit length prefix")]
    LengthOverflow {
        /// The offending length.
        len: usize,
    },

    /// Values are nested deeper than the codec accepts.
    #[error("nesting deeper than {max} levels")]
    DepthExceeded {
        /// The maximum nesting depth.
        max: usize,
    },

    /// A type tag byte is not recognized.
    #[error("unknown type tag 0x{tag:02x} at offset {offset}")]
    UnknownTag {
        /// The tag byte.
        tag: u8,
        /// Offset of the tag in the input.
        offset: usize,
    },

    /// A length prefix or fixed-width field runs past the end of the input.
    #[error("unexpected end of input at offset {offset}: needed {needed} more bytes")]
    UnexpectedEof {
        /// Offset where the read started.
        offset: usize,
        /// Number of bytes the read required.
        needed: usize,
    },

    /// A text string or field name is not valid UTF-8.
    #[error("invalid UTF-8 at offset {offset}")]
    InvalidUtf8 {
        /// Offset of the string payload.
        offset: usize,
    },

    /// A boolean payload byte is neither 0 nor 1.
    #[error("invalid boolean byte 0x{byte:02x} at offset {offset}")]
    InvalidBool {
        /// The payload byte.
        byte: u8,
        /// Offset of the payload byte.
        offset: usize,
    },

    /// Bytes remain after the top-level value.
    #[error("{remaining} trailing bytes after top-level value")]
    TrailingBytes {
        /// Number of unconsumed bytes.
        remaining: usize,
    },

    /// A decoded value could not be converted into the requested host type.
    #[error("conversion failed: {message}")]
    Conversion {
        /// Description of the mismatch.
        message: String,
    },
}

impl CodecError {
    /// Create an unsupported type error.
    pub fn unsupported_type(type_name: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
        }
    }

    /// Create a conversion error.
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion {
            message: message.into(),
        }
    }

    /// Returns true if this error describes malformed input bytes.
    #[must_use]
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            Self::UnknownTag { .. }
                | Self::UnexpectedEof { .. }
                | Self::InvalidUtf8 { .. }
                | Self::InvalidBool { .. }
                | Self::TrailingBytes { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_classification() {
        assert!(CodecError::TrailingBytes { remaining: 1 }.is_corrupt());
        assert!(CodecError::UnknownTag { tag: 0xff, offset: 0 }.is_corrupt());
        assert!(!CodecError::CyclicValue.is_corrupt());
        assert!(!CodecError::unsupported_type("map with integer keys").is_corrupt());
    }

    #[test]
    fn messages_include_context() {
        let err = CodecError::UnexpectedEof {
            offset: 7,
            needed: 8,
        };
        assert_eq!(
            err.to_string(),
            "unexpected end of input at offset 7: needed 8 more bytes"
        );
    }
}
