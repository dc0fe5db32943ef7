//! JSON merge patch (RFC 7386).

use crate::value::{Map, Value};

/// Applies a JSON merge patch to `target`.
///
/// A map patch is merged key by key into `target`, and a null value removes its
/// key. Any other patch value replaces the target wholesale, lists included.
pub fn apply_merge_patch(target: &Value, patch: &Value) -> Value {
    let Value::Map(patch) = patch else {
        return patch.clone();
    };
    let mut result = match target {
        Value::Map(m) => m.clone(),
        _ => Map::new(),
    };
    for (key, value) in patch {
        if value.is_null() {
            result.delete(key);
            continue;
        }
        let current = result.get(key).cloned().unwrap_or_default();
        result.set(key.as_str(), apply_merge_patch(&current, value));
    }
    Value::Map(result)
}
