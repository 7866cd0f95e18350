//! Dynamic document value type.

use parking_lot::{RwLock, RwLockReadGuard};
use std::fmt;
use std::sync::Arc;

/// A dynamic, schema-less value.
///
/// This is the shape of everything stored in a collection. Records keep
/// their fields in insertion order, so re-encoding the same value always
/// produces the same bytes.
///
/// Equality is structural. Floats compare by bit pattern, which makes
/// `decode(encode(v)) == v` hold for NaN payloads and signed zeros too.
#[derive(Clone)]
pub enum Value {
    /// Null / absent value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// Unsigned 64-bit integer.
    Uint(u64),
    /// 64-bit IEEE-754 float.
    Float(f64),
    /// Text string (UTF-8).
    Text(String),
    /// Byte string.
    Bytes(Vec<u8>),
    /// Ordered, possibly heterogeneous sequence of values.
    Sequence(Vec<Value>),
    /// Named fields in insertion order.
    Record(Vec<(String, Value)>),
    /// A node that can be referenced from several places in a value graph.
    ///
    /// Encoding inlines shared nodes and rejects graphs where a node
    /// contains itself. Decoding never produces this variant.
    Shared(SharedValue),
}

impl Value {
    /// Creates a record from `(name, value)` pairs, keeping their order.
    pub fn record<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Record(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Creates a sequence from anything convertible into values.
    pub fn sequence<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::Sequence(items.into_iter().map(Into::into).collect())
    }

    /// Returns a short name for the kind of this value.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Uint(_) => "uint",
            Value::Float(_) => "float",
            Value::Text(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Sequence(_) => "sequence",
            Value::Record(_) => "record",
            Value::Shared(_) => "shared",
        }
    }

    /// Check if this value is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get this value as a boolean, if it is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as a signed integer, if it is an integer that fits.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Uint(n) => i64::try_from(*n).ok(),
            _ => None,
        }
    }

    /// Get this value as an unsigned integer, if it is a non-negative integer.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Uint(n) => Some(*n),
            Value::Int(n) => u64::try_from(*n).ok(),
            _ => None,
        }
    }

    /// Get this value as a float, if it is one.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get this value as a string, if it is a text string.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as bytes, if it is a byte string.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get this value as a sequence, if it is one.
    #[must_use]
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Get the fields of this record, if it is one.
    #[must_use]
    pub fn as_record(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Record(fields) => Some(fields),
            _ => None,
        }
    }

    /// Look up a field of this record by name.
    ///
    /// Returns the first field with that name.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.as_record()?
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, v)| v)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Shared(a), Value::Shared(b)) if a.ptr_eq(b) => true,
            (Value::Shared(a), b) => *a.read() == *b,
            (a, Value::Shared(b)) => *a == *b.read(),
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Uint(a), Value::Uint(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Sequence(a), Value::Sequence(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(n) => f.debug_tuple("Int").field(n).finish(),
            Value::Uint(n) => f.debug_tuple("Uint").field(n).finish(),
            Value::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Value::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Value::Bytes(b) => f.debug_tuple("Bytes").field(b).finish(),
            Value::Sequence(items) => f.debug_tuple("Sequence").field(items).finish(),
            Value::Record(fields) => f.debug_tuple("Record").field(fields).finish(),
            Value::Shared(shared) => fmt::Debug::fmt(shared, f),
        }
    }
}

/// A reference-counted, mutable value node.
///
/// Cloning a `SharedValue` clones the reference, not the value, so the same
/// node can appear in several places of a value (or inside itself).
#[derive(Clone, Default)]
pub struct SharedValue(Arc<RwLock<Value>>);

impl SharedValue {
    /// Wraps a value in a new shared node.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    /// Replaces the value held by this node.
    pub fn set(&self, value: Value) {
        *self.0.write() = value;
    }

    /// Locks the node for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, Value> {
        self.0.read()
    }

    /// Returns true if both handles point at the same node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Returns the identity of this node, stable for its lifetime.
    #[must_use]
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl fmt::Debug for SharedValue {
    // Does not descend: the node may contain itself.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shared({:#x})", self.id())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Uint(u64::from(n))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Uint(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}

impl From<SharedValue> for Value {
    fn from(shared: SharedValue) -> Self {
        Value::Shared(shared)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Null
    }
}
