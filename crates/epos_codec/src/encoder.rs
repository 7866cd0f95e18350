//! Tagged value encoder.

use crate::error::{CodecError, CodecResult};
use crate::value::{SharedValue, Value};
use crate::{tag, MAX_DEPTH};

/// Encode a value to its record bytes.
///
/// The output is deterministic: encoding the same value twice yields
/// identical bytes. Shared nodes are inlined at every place they appear.
///
/// # Errors
///
/// Returns an error if the value cannot be represented:
/// - a shared node contains itself ([`CodecError::CyclicValue`])
/// - nesting exceeds the decoder's limit ([`CodecError::DepthExceeded`])
/// - a length does not fit in 32 bits ([`CodecError::LengthOverflow`])
pub fn encode(value: &Value) -> CodecResult<Vec<u8>> {
    let mut encoder = Encoder::new();
    encoder.encode(value)?;
    Ok(encoder.into_bytes())
}

/// A tagged value encoder.
///
/// Tracks the shared nodes on the current traversal path so that a node
/// reached from inside itself is reported instead of followed forever.
pub struct Encoder {
    buffer: Vec<u8>,
    path: Vec<usize>,
}

impl Encoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            path: Vec::new(),
        }
    }

    /// Create a new encoder with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            path: Vec::new(),
        }
    }

    /// Encode a value, appending to the buffer.
    pub fn encode(&mut self, value: &Value) -> CodecResult<()> {
        self.encode_at(value, 0)
    }

    /// Consume this encoder and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Get a reference to the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    fn encode_at(&mut self, value: &Value, depth: usize) -> CodecResult<()> {
        if depth > MAX_DEPTH {
            return Err(CodecError::DepthExceeded { max: MAX_DEPTH });
        }

        match value {
            Value::Null => self.buffer.push(tag::NULL),
            Value::Bool(b) => {
                self.buffer.push(tag::BOOL);
                self.buffer.push(u8::from(*b));
            }
            Value::Int(n) => {
                self.buffer.push(tag::INT);
                self.buffer.extend_from_slice(&n.to_be_bytes());
            }
            Value::Uint(n) => {
                self.buffer.push(tag::UINT);
                self.buffer.extend_from_slice(&n.to_be_bytes());
            }
            Value::Float(x) => {
                self.buffer.push(tag::FLOAT);
                self.buffer.extend_from_slice(&x.to_bits().to_be_bytes());
            }
            Value::Text(s) => {
                self.buffer.push(tag::STRING);
                self.encode_blob(s.as_bytes())?;
            }
            Value::Bytes(b) => {
                self.buffer.push(tag::BYTES);
                self.encode_blob(b)?;
            }
            Value::Sequence(items) => {
                self.buffer.push(tag::SEQUENCE);
                self.encode_len(items.len())?;
                for item in items {
                    self.encode_at(item, depth + 1)?;
                }
            }
            Value::Record(fields) => {
                self.buffer.push(tag::RECORD);
                self.encode_len(fields.len())?;
                for (name, field) in fields {
                    self.encode_blob(name.as_bytes())?;
                    self.encode_at(field, depth + 1)?;
                }
            }
            Value::Shared(shared) => self.encode_shared(shared, depth)?,
        }
        Ok(())
    }

    fn encode_shared(&mut self, shared: &SharedValue, depth: usize) -> CodecResult<()> {
        let id = shared.id();
        if self.path.contains(&id) {
            return Err(CodecError::CyclicValue);
        }

        self.path.push(id);
        let result = {
            let inner = shared.read();
            self.encode_at(&inner, depth)
        };
        self.path.pop();
        result
    }

    fn encode_len(&mut self, len: usize) -> CodecResult<()> {
        let len = u32::try_from(len).map_err(|_| CodecError::LengthOverflow { len })?;
        self.buffer.extend_from_slice(&len.to_be_bytes());
        Ok(())
    }

    fn encode_blob(&mut self, bytes: &[u8]) -> CodecResult<()> {
        self.encode_len(bytes.len())?;
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}
