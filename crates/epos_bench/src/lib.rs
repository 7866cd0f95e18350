//! Benchmark workloads shared by the epos benches.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use epos_codec::Value;
use serde::{Deserialize, Serialize};

/// The record inserted, updated and deleted by the database benches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct Person {
    /// Full name.
    pub Name: String,
    /// Age in years.
    pub Age: u32,
    /// Social security number.
    pub SSN: String,
    /// Favourite numbers.
    pub LuckyNumbers: Vec<i32>,
}

/// The benchmark person.
#[must_use]
pub fn person() -> Person {
    Person {
        Name: "John J. McWhackadoodle".into(),
        Age: 29,
        SSN: "078-05-1120".into(),
        LuckyNumbers: vec![23, 43],
    }
}

/// Deterministic filler bytes of the given size.
#[must_use]
pub fn payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

/// A record tree `depth` levels deep with `width` fields per level.
#[must_use]
pub fn nested_value(depth: usize, width: usize) -> Value {
    if depth == 0 {
        Value::from("leaf")
    } else {
        Value::Record(
            (0..width)
                .map(|i| (format!("key_{i}"), nested_value(depth - 1, width)))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_value_shape() {
        let value = nested_value(2, 3);
        let fields = value.as_record().unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].1.as_record().unwrap().len(), 3);
        assert_eq!(nested_value(0, 5), Value::from("leaf"));
    }

    #[test]
    fn payload_is_deterministic() {
        assert_eq!(payload(300), payload(300));
        assert_eq!(payload(300).len(), 300);
    }
}
