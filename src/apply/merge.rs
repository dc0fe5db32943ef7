//! Three-way merge of observed, last applied and desired documents.
//!
//! The observed document drives the traversal:
//! - maps are merged key by key; keys the caller dropped since the last apply are
//!   deleted, keys nobody manages are left alone
//! - lists of maps with a recognizable merge key are merged element by element
//! - every other list, and every scalar, takes the desired value

use super::merge_key::{detect_merge_key, merge_key_string};
use crate::error::Error;
use crate::fieldpath::{Path, PathElement};
use crate::value::{Map, Value};
use tracing::{debug, trace};

/// Merges `desired` into a copy of `observed`, using `last_applied` to find
/// fields the caller stopped managing.
///
/// An empty `last_applied` means nothing gets removed. None of the inputs is
/// modified. Any type mismatch aborts the merge.
pub fn merge(observed: &Map, last_applied: &Map, desired: &Map) -> Result<Map, Error> {
    debug!(
        observed_fields = observed.len(),
        last_applied_fields = last_applied.len(),
        desired_fields = desired.len(),
        "merging desired state into observed state"
    );
    let mut path = Path::new();
    let mut merged = observed.clone();
    merge_entries(
        &mut path,
        &mut merged,
        Some(last_applied),
        Some(desired),
        &PathElement::FieldName,
    )?;
    Ok(merged)
}

fn merge_value(
    path: &mut Path,
    observed: Value,
    last_applied: Option<&Value>,
    desired: Option<&Value>,
) -> Result<Value, Error> {
    match observed {
        Value::Map(mut observed) => {
            let last_applied = map_or_absent(path, last_applied, "last applied")?;
            let desired = map_or_absent(path, desired, "desired")?;
            merge_entries(path, &mut observed, last_applied, desired, &PathElement::FieldName)?;
            Ok(Value::Map(observed))
        }
        Value::List(observed) => {
            let last_applied = list_or_absent(path, last_applied, "last applied")?;
            let desired_list = list_or_absent(path, desired, "desired")?;
            merge_list(path, observed, last_applied, desired_list, desired)
        }
        // Leaf: desired always wins.
        _ => Ok(desired.cloned().unwrap_or(Value::Null)),
    }
}

fn map_or_absent<'a>(
    path: &Path,
    value: Option<&'a Value>,
    side: &str,
) -> Result<Option<&'a Map>, Error> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Map(m)) => Ok(Some(m)),
        Some(other) => Err(Error::type_mismatch(
            path,
            "map",
            format!("{} in {} state", other.kind_name(), side),
        )),
    }
}

fn list_or_absent<'a>(
    path: &Path,
    value: Option<&'a Value>,
    side: &str,
) -> Result<Option<&'a [Value]>, Error> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::List(l)) => Ok(Some(l.as_slice())),
        Some(other) => Err(Error::type_mismatch(
            path,
            "list",
            format!("{} in {} state", other.kind_name(), side),
        )),
    }
}

/// Deletion pass then upsert pass over the entries of `observed`.
///
/// `element` names the entry in paths: a field name for plain maps, the merge
/// key for indexed lists.
fn merge_entries(
    path: &mut Path,
    observed: &mut Map,
    last_applied: Option<&Map>,
    desired: Option<&Map>,
    element: &dyn Fn(String) -> PathElement,
) -> Result<(), Error> {
    if let Some(last_applied) = last_applied {
        for key in last_applied.keys() {
            let still_desired = desired.is_some_and(|d| d.has(key));
            if !still_desired && observed.delete(key).is_some() {
                trace!(path = %path.with(element(key.clone())), "removed field no longer desired");
            }
        }
    }

    let Some(desired) = desired else {
        return Ok(());
    };
    for (key, desired_value) in desired {
        path.push(element(key.clone()));
        let current = observed.delete(key).unwrap_or(Value::Null);
        let merged = merge_value(
            path,
            current,
            last_applied.and_then(|l| l.get(key)),
            Some(desired_value),
        );
        path.pop();
        observed.set(key.clone(), merged?);
    }
    Ok(())
}

fn merge_list(
    path: &mut Path,
    observed: Vec<Value>,
    last_applied: Option<&[Value]>,
    desired_list: Option<&[Value]>,
    desired: Option<&Value>,
) -> Result<Value, Error> {
    let last_applied = last_applied.unwrap_or_default();
    let desired_items = desired_list.unwrap_or_default();

    let Some(merge_key) = detect_merge_key(&[observed.as_slice(), last_applied, desired_items]) else {
        // Scalar list: replaced wholesale.
        return Ok(desired.cloned().unwrap_or(Value::Null));
    };
    trace!(path = %path, merge_key, "merging list of maps");

    let key_of = |item: &Value| {
        item.as_map()
            .and_then(|m| m.get(merge_key))
            .map(merge_key_string)
            .unwrap_or_default()
    };

    let observed_order: Vec<String> = observed.iter().map(key_of).collect();
    let desired_order: Vec<String> = desired_items.iter().map(key_of).collect();

    let mut merged = index_by_key(observed, &key_of);
    let last_applied = index_by_key(last_applied.to_vec(), &key_of);
    let desired_index = index_by_key(desired_items.to_vec(), &key_of);

    let element = |value: String| PathElement::key(merge_key, value);
    merge_entries(
        path,
        &mut merged,
        Some(&last_applied),
        desired_list.map(|_| &desired_index),
        &element,
    )?;

    // Keep the observed order for surviving elements, then append new ones in
    // desired order. Each key is emitted once.
    let mut result = Vec::with_capacity(merged.len());
    for key in observed_order.iter().chain(desired_order.iter()) {
        if let Some(item) = merged.delete(key) {
            result.push(item);
        }
    }
    Ok(Value::List(result))
}

/// Last write wins when two elements share a key.
fn index_by_key(items: Vec<Value>, key_of: &impl Fn(&Value) -> String) -> Map {
    items.into_iter().map(|item| (key_of(&item), item)).collect()
}
