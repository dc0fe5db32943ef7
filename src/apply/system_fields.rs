//! Read-only metadata populated by the cluster.

use crate::error::Error;
use crate::value::Map;

/// ObjectMeta fields that are read-only and system-populated.
pub const OBJECT_META_SYSTEM_FIELDS: &[&str] = &[
    "selfLink",
    "uid",
    "resourceVersion",
    "generation",
    "creationTimestamp",
    "deletionTimestamp",
    "managedFields",
];

/// Overwrites the system fields of `dest.metadata` with those of `src.metadata`.
///
/// A field present in `src` (an explicit null counts) is copied as is. A field
/// absent from `src` is removed from `dest`, and so is `metadata` if that removal
/// leaves it empty. Applying it twice is the same as applying it once.
pub fn override_system_fields(dest: &mut Map, src: &Map) -> Result<(), Error> {
    for field in OBJECT_META_SYSTEM_FIELDS {
        override_field(dest, src, &["metadata", *field])?;
    }
    Ok(())
}

fn override_field(dest: &mut Map, src: &Map, fields: &[&str]) -> Result<(), Error> {
    match src.nested_field(fields) {
        Some(value) => dest.set_nested_field(fields, value.clone()),
        None => {
            if dest.remove_nested_field(fields).is_some() {
                prune_empty_parents(dest, fields);
            }
            Ok(())
        }
    }
}

fn prune_empty_parents(dest: &mut Map, fields: &[&str]) {
    for depth in (1..fields.len()).rev() {
        let parent = &fields[..depth];
        let is_empty = dest
            .nested_field(parent)
            .and_then(|v| v.as_map())
            .is_some_and(Map::is_empty);
        if !is_empty {
            return;
        }
        dest.remove_nested_field(parent);
    }
}
