//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random values and operation
//! sequences.

use epos_codec::Value;
use proptest::prelude::*;

/// Strategy for generating valid collection names.
pub fn collection_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_]{0,31}").expect("Invalid regex")
}

/// Strategy for generating field names.
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z_][a-zA-Z0-9_]{0,11}").expect("Invalid regex")
}

/// Strategy for scalar values.
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        any::<u64>().prop_map(Value::Uint),
        any::<f64>().prop_map(Value::Float),
        ".{0,24}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..64).prop_map(Value::Bytes),
    ]
}

/// Strategy for arbitrary values nested up to a few levels deep.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_value_strategy().prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Sequence),
            prop::collection::vec((field_name_strategy(), inner), 0..8).prop_map(Value::Record),
        ]
    })
}

/// Strategy for top-level records, the usual shape of a stored document.
pub fn record_strategy() -> impl Strategy<Value = Value> {
    prop::collection::vec((field_name_strategy(), value_strategy()), 0..6)
        .prop_map(Value::Record)
}

/// A single collection operation.
///
/// Targets are indexes into the identifiers inserted so far, so sequences
/// stay meaningful whatever ids the collection hands out.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Insert a value.
    Insert(Value),
    /// Update the record inserted at this position.
    Update(prop::sample::Index, Value),
    /// Delete the record inserted at this position.
    Delete(prop::sample::Index),
    /// Read the record inserted at this position.
    Get(prop::sample::Index),
}

/// Strategy for a single operation.
pub fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        3 => value_strategy().prop_map(Operation::Insert),
        2 => (any::<prop::sample::Index>(), value_strategy())
            .prop_map(|(i, v)| Operation::Update(i, v)),
        1 => any::<prop::sample::Index>().prop_map(Operation::Delete),
        2 => any::<prop::sample::Index>().prop_map(Operation::Get),
    ]
}

/// Strategy for a sequence of operations.
pub fn operation_sequence_strategy(max_len: usize) -> impl Strategy<Value = Vec<Operation>> {
    prop::collection::vec(operation_strategy(), 1..=max_len)
}
