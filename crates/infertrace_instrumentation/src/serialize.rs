//! Single-line JSON rendering for trace events.
//!
//! Escaping of free text (quotes, backslashes, control characters) is delegated
//! to `serde_json`, whose compact writer never emits a raw newline. The helpers
//! below pin floating-point output to six decimal places so identical inputs
//! always produce byte-identical lines.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer, ser::SerializeMap, ser::SerializeSeq};

const DECIMALS: f64 = 1e6;

/// Round to six decimal places; non-finite values become zero so the line stays valid JSON.
#[must_use]
pub fn round6(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * DECIMALS).round() / DECIMALS
}

pub fn fixed<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round6(*value))
}

pub fn fixed_seq<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(values.len()))?;
    for value in values {
        seq.serialize_element(&round6(*value))?;
    }
    seq.end()
}

pub fn fixed_map<S: Serializer>(values: &BTreeMap<String, f64>, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(values.len()))?;
    for (key, value) in values {
        map.serialize_entry(key, &round6(*value))?;
    }
    map.end()
}

/// Layer indices are written as `-1` when no layer is in scope.
pub fn layer_index<S: Serializer>(layer: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(layer.map_or(-1, i64::from))
}

/// Render `event` as one newline-free JSON line.
pub fn to_line<T: Serialize>(event: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}

#[path = "serialize.test.rs"]
mod tests;
