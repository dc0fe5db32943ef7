//! Removal of null and empty-string fields from desired documents.
//!
//! Objects built in code tend to carry zero-initialized fields that were never
//! meant as intent. Dropping them keeps them from showing up as desired changes
//! against a stored object that never had them set.

use crate::error::Error;
use crate::fieldpath::Path;
use crate::value::{Map, Value};

/// Returns a copy of `doc` without null fields and empty strings.
///
/// - `0`, `0.0` and `false` are kept.
/// - Lists are kept even when empty or full of nulls; map elements inside them
///   are stripped in place.
/// - Empty maps are kept; non-empty maps are stripped and dropped if nothing
///   survives.
pub fn strip_null_fields(doc: &Map) -> Map {
    let mut filtered = Map::new();
    for (key, value) in doc {
        match value {
            Value::Null => {}
            Value::String(s) if s.is_empty() => {}
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::String(_) => {
                filtered.set(key.clone(), value.clone());
            }
            Value::List(items) => {
                filtered.set(key.clone(), Value::List(strip_list(items)));
            }
            Value::Map(sub) if sub.is_empty() => {
                filtered.set(key.clone(), Value::Map(Map::new()));
            }
            Value::Map(sub) => {
                let sub = strip_null_fields(sub);
                if !sub.is_empty() {
                    filtered.set(key.clone(), Value::Map(sub));
                }
            }
        }
    }
    filtered
}

fn strip_list(items: &[Value]) -> Vec<Value> {
    items
        .iter()
        .map(|item| match item {
            Value::List(inner) => Value::List(strip_list(inner)),
            Value::Map(sub) => Value::Map(strip_null_fields(sub)),
            other => other.clone(),
        })
        .collect()
}

/// Decodes a JSON document and strips it.
///
/// Fails with [`Error::UnsupportedType`] on values the document model cannot
/// represent, and with [`Error::TypeMismatch`] when the root is not an object.
pub fn strip_null_fields_json(doc: &serde_json::Value) -> Result<Map, Error> {
    match Value::try_from(doc.clone())? {
        Value::Map(map) => Ok(strip_null_fields(&map)),
        other => Err(Error::type_mismatch(&Path::new(), "map", other.kind_name())),
    }
}
