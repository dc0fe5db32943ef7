//! Last applied state, recorded as an annotation on the object itself.
//!
//! Storing the desired state of the previous apply lets the next apply see which
//! fields the caller stopped managing, so the merge can remove them.

use super::merge::merge;
use crate::error::Error;
use crate::value::{expect_map, from_json, to_json, Map, Value};
use tracing::trace;

/// Annotation key holding the last applied state.
pub const LAST_APPLIED_ANNOTATION: &str = "kit.simplekube.github.com/last-applied-state";

/// Records `last_applied` under the default annotation key.
pub fn set_last_applied(obj: &mut Map, last_applied: &Map) -> Result<(), Error> {
    set_last_applied_by_key(obj, last_applied, LAST_APPLIED_ANNOTATION)
}

/// Records `last_applied` as JSON under `ann_key`. An empty state is not recorded.
pub fn set_last_applied_by_key(obj: &mut Map, last_applied: &Map, ann_key: &str) -> Result<(), Error> {
    if last_applied.is_empty() {
        return Ok(());
    }
    let encoded = to_json(&Value::Map(last_applied.clone()))?;
    obj.set_nested_field(&["metadata", "annotations", ann_key], Value::String(encoded))
}

/// Reads the last applied state stored under the default annotation key.
pub fn get_last_applied(obj: &Map) -> Result<Option<Map>, Error> {
    get_last_applied_by_key(obj, LAST_APPLIED_ANNOTATION)
}

/// Reads the last applied state stored under `ann_key`, `None` when unset.
pub fn get_last_applied_by_key(obj: &Map, ann_key: &str) -> Result<Option<Map>, Error> {
    let encoded = obj
        .nested_field(&["metadata", "annotations", ann_key])
        .and_then(Value::as_str)
        .unwrap_or_default();
    if encoded.is_empty() {
        return Ok(None);
    }
    expect_map(from_json(encoded)?).map(Some)
}

/// Removes the annotation from a last applied state so that states do not nest
/// inside each other across applies.
pub fn sanitize_last_applied(last_applied: &mut Map, ann_key: &str) {
    if last_applied.is_empty() {
        return;
    }
    last_applied.remove_nested_field(&["metadata", "annotations", ann_key]);
}

/// Three-way merge using the state recorded on `observed` as last applied.
///
/// The returned object records `desired` as its new last applied state.
pub fn merge_with_last_applied(observed: &Map, desired: &Map) -> Result<Map, Error> {
    let last_applied = get_last_applied(observed)?.unwrap_or_default();
    trace!(
        has_last_applied = !last_applied.is_empty(),
        "merging with recorded last applied state"
    );

    let mut next_last_applied = desired.clone();
    sanitize_last_applied(&mut next_last_applied, LAST_APPLIED_ANNOTATION);

    let mut merged = merge(observed, &last_applied, desired)?;
    set_last_applied(&mut merged, &next_last_applied)?;
    Ok(merged)
}
