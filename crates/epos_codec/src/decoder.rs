//! Tagged value decoder.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use crate::{tag, MAX_DEPTH};

/// Decode a value from record bytes.
///
/// The whole input must be consumed by exactly one top-level value.
///
/// # Errors
///
/// Returns an error if a tag is unknown, a length prefix overruns the
/// input, a string is not UTF-8, nesting exceeds the limit, or bytes remain
/// after the top-level value. Never panics on malformed input.
pub fn decode(bytes: &[u8]) -> CodecResult<Value> {
    let mut decoder = Decoder::new(bytes);
    let value = decoder.decode()?;
    if !decoder.is_empty() {
        return Err(CodecError::TrailingBytes {
            remaining: decoder.remaining().len(),
        });
    }
    Ok(value)
}

/// A tagged value decoder over a byte slice.
///
/// Every read is bounds-checked against the remaining input before any
/// indexing takes place.
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    /// Create a new decoder for the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Decode the next value.
    pub fn decode(&mut self) -> CodecResult<Value> {
        self.decode_at(0)
    }

    /// Check if all bytes have been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Get remaining bytes.
    pub fn remaining(&self) -> &'a [u8] {
        self.data.get(self.pos..).unwrap_or_default()
    }

    fn decode_at(&mut self, depth: usize) -> CodecResult<Value> {
        if depth > MAX_DEPTH {
            return Err(CodecError::DepthExceeded { max: MAX_DEPTH });
        }

        let offset = self.pos;
        match self.read_byte()? {
            tag::NULL => Ok(Value::Null),
            tag::BOOL => {
                let offset = self.pos;
                match self.read_byte()? {
                    0 => Ok(Value::Bool(false)),
                    1 => Ok(Value::Bool(true)),
                    byte => Err(CodecError::InvalidBool { byte, offset }),
                }
            }
            tag::INT => Ok(Value::Int(i64::from_be_bytes(self.read_array()?))),
            tag::UINT => Ok(Value::Uint(u64::from_be_bytes(self.read_array()?))),
            tag::FLOAT => Ok(Value::Float(f64::from_bits(u64::from_be_bytes(
                self.read_array()?,
            )))),
            tag::STRING => self.read_text().map(Value::Text),
            tag::BYTES => {
                let len = self.read_len()?;
                Ok(Value::Bytes(self.read_bytes(len)?.to_vec()))
            }
            tag::SEQUENCE => {
                let count = self.read_len()?;
                let mut items = Vec::with_capacity(self.capacity_hint(count));
                for _ in 0..count {
                    items.push(self.decode_at(depth + 1)?);
                }
                Ok(Value::Sequence(items))
            }
            tag::RECORD => {
                let count = self.read_len()?;
                let mut fields = Vec::with_capacity(self.capacity_hint(count));
                for _ in 0..count {
                    let name = self.read_text()?;
                    let value = self.decode_at(depth + 1)?;
                    fields.push((name, value));
                }
                Ok(Value::Record(fields))
            }
            other => Err(CodecError::UnknownTag { tag: other, offset }),
        }
    }

    // Every element takes at least one byte, so a count larger than the
    // remaining input cannot be honest; don't let it drive allocation.
    fn capacity_hint(&self, count: usize) -> usize {
        count.min(self.remaining().len())
    }

    #[inline]
    fn read_byte(&mut self) -> CodecResult<u8> {
        let [byte] = self.read_array::<1>()?;
        Ok(byte)
    }

    #[inline]
    fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(CodecError::UnexpectedEof {
                offset: self.pos,
                needed: len,
            })?;
        let data: &'a [u8] = self.data;
        let bytes = &data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    #[inline]
    fn read_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn read_len(&mut self) -> CodecResult<usize> {
        let len = u32::from_be_bytes(self.read_array()?);
        // u32 always fits in usize on supported targets
        Ok(len as usize)
    }

    fn read_text(&mut self) -> CodecResult<String> {
        let len = self.read_len()?;
        let offset = self.pos;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| CodecError::InvalidUtf8 { offset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode;

    #[test]
    fn decode_scalars() {
        assert_eq!(decode(&[tag::NULL]).unwrap(), Value::Null);
        assert_eq!(decode(&[tag::BOOL, 0]).unwrap(), Value::Bool(false));
        assert_eq!(decode(&[tag::BOOL, 1]).unwrap(), Value::Bool(true));
        assert_eq!(
            decode(&[tag::INT, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]).unwrap(),
            Value::Int(-1)
        );
        assert_eq!(
            decode(&[tag::UINT, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]).unwrap(),
            Value::Uint(u64::MAX)
        );
    }

    #[test]
    fn decode_text() {
        assert_eq!(
            decode(&[tag::STRING, 0, 0, 0, 5, b'h', b'e', b'l', b'l', b'o']).unwrap(),
            Value::from("hello")
        );
        assert_eq!(
            decode(&[tag::STRING, 0, 0, 0, 0]).unwrap(),
            Value::Text(String::new())
        );
    }

    #[test]
    fn decode_record_preserves_field_order() {
        let bytes = encode(&Value::record([("Y", 2i64), ("X", 1)])).unwrap();
        let decoded = decode(&bytes).unwrap();
        let names: Vec<&str> = decoded
            .as_record()
            .unwrap()
            .iter()
            .map(|(n, _)| n.as_str())
            .collect();
        assert_eq!(names, vec!["Y", "X"]);
    }

    #[test]
    fn reject_unknown_tag() {
        assert_eq!(
            decode(&[0x7f]),
            Err(CodecError::UnknownTag {
                tag: 0x7f,
                offset: 0
            })
        );
        // nested unknown tag reports its own offset
        assert_eq!(
            decode(&[tag::SEQUENCE, 0, 0, 0, 1, 0x42]),
            Err(CodecError::UnknownTag {
                tag: 0x42,
                offset: 5
            })
        );
    }

    #[test]
    fn reject_invalid_bool() {
        assert_eq!(
            decode(&[tag::BOOL, 2]),
            Err(CodecError::InvalidBool { byte: 2, offset: 1 })
        );
    }

    #[test]
    fn reject_length_overrun() {
        assert!(matches!(
            decode(&[tag::STRING, 0, 0, 0, 9, b'a']),
            Err(CodecError::UnexpectedEof { .. })
        ));
        assert!(matches!(
            decode(&[tag::BYTES, 0xff, 0xff, 0xff, 0xff]),
            Err(CodecError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn huge_count_does_not_preallocate() {
        // claims u32::MAX elements but has none
        assert!(matches!(
            decode(&[tag::SEQUENCE, 0xff, 0xff, 0xff, 0xff]),
            Err(CodecError::UnexpectedEof { .. })
        ));
        assert!(matches!(
            decode(&[tag::RECORD, 0xff, 0xff, 0xff, 0xff]),
            Err(CodecError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn truncated_fixed_width() {
        assert_eq!(decode(&[]), Err(CodecError::UnexpectedEof { offset: 0, needed: 1 }));
        assert_eq!(
            decode(&[tag::INT, 1, 2]),
            Err(CodecError::UnexpectedEof { offset: 1, needed: 8 })
        );
        assert!(matches!(
            decode(&[tag::SEQUENCE, 0, 0]),
            Err(CodecError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn reject_trailing_bytes() {
        assert_eq!(
            decode(&[tag::NULL, tag::NULL, tag::NULL]),
            Err(CodecError::TrailingBytes { remaining: 2 })
        );
    }

    #[test]
    fn reject_invalid_utf8() {
        assert_eq!(
            decode(&[tag::STRING, 0, 0, 0, 2, 0xff, 0xfe]),
            Err(CodecError::InvalidUtf8 { offset: 5 })
        );
        // field names are checked too
        assert!(matches!(
            decode(&[tag::RECORD, 0, 0, 0, 1, 0, 0, 0, 1, 0xff, tag::NULL]),
            Err(CodecError::InvalidUtf8 { .. })
        ));
    }

    #[test]
    fn reject_excessive_nesting() {
        let mut bytes = Vec::new();
        for _ in 0..=MAX_DEPTH {
            bytes.extend_from_slice(&[tag::SEQUENCE, 0, 0, 0, 1]);
        }
        bytes.push(tag::NULL);
        assert_eq!(
            decode(&bytes),
            Err(CodecError::DepthExceeded { max: MAX_DEPTH })
        );
    }

    #[test]
    fn decoder_reads_values_back_to_back() {
        let mut bytes = encode(&Value::Int(1)).unwrap();
        bytes.extend(encode(&Value::from("two")).unwrap());

        let mut decoder = Decoder::new(&bytes);
        assert_eq!(decoder.decode().unwrap(), Value::Int(1));
        assert!(!decoder.is_empty());
        assert_eq!(decoder.decode().unwrap(), Value::from("two"));
        assert!(decoder.is_empty());
    }
}
