//! Create-or-merge reconciliation of a single object.

use super::options::ApplyOptions;
use crate::apply::{merge, override_system_fields, strip_null_fields};
use crate::error::Error;
use crate::object::ObjectKey;
use crate::store::{ObjectStore, StoreError};
use crate::value::{Map, Value};
use std::fmt;
use tracing::debug;

/// OperationResult tells what a reconciliation wrote to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationResult {
    /// The observed object already matched; nothing was written.
    Unchanged,
    Created,
    UpdatedResourceOnly,
    UpdatedResourceAndStatus,
    UpdatedStatusOnly,
}

impl OperationResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationResult::Unchanged => "unchanged",
            OperationResult::Created => "created",
            OperationResult::UpdatedResourceOnly => "updated-resource-only",
            OperationResult::UpdatedResourceAndStatus => "updated-resource-and-status",
            OperationResult::UpdatedStatusOnly => "updated-status-only",
        }
    }

    /// Returns true if anything was written.
    pub fn is_changed(&self) -> bool {
        *self != OperationResult::Unchanged
    }
}

impl fmt::Display for OperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Makes the stored object match `desired`.
///
/// A missing object is created. Otherwise `desired` is merged onto the stored
/// object, using itself as the last applied state, and the result is written
/// back only if it differs. A non-empty desired `status` is written through the
/// status sub-resource after the main write.
///
/// A stale write fails with a conflict (see [`Error::is_conflict`]); calling
/// again re-reads the object and merges afresh.
pub fn create_or_merge<S>(store: &S, desired: &Map, options: &ApplyOptions) -> Result<OperationResult, Error>
where
    S: ObjectStore + ?Sized,
{
    let key = ObjectKey::from_object(desired)?;
    let desired = if options.accept_null_field_values {
        desired.clone()
    } else {
        strip_null_fields(desired)
    };

    let Some(observed) = store.get(&key)? else {
        store.create(&desired)?;
        debug!(%key, "created missing object");
        return Ok(OperationResult::Created);
    };

    let mut merged = merge(&observed, &desired, &desired)?;
    if options.set_finalizers_to_null {
        merged.remove_nested_field(&["metadata", "finalizers"]);
    }
    override_system_fields(&mut merged, &observed)?;

    if merged == observed {
        debug!(%key, "object already up to date");
        return Ok(OperationResult::Unchanged);
    }

    let has_status = desired
        .get("status")
        .and_then(Value::as_map)
        .is_some_and(|status| !status.is_empty());

    if has_status && without_status(&merged) == without_status(&observed) {
        store.update_status(&merged)?;
        debug!(%key, "updated object status");
        return Ok(OperationResult::UpdatedStatusOnly);
    }

    let updated = store.update(&merged)?;
    if !has_status {
        debug!(%key, "updated object");
        return Ok(OperationResult::UpdatedResourceOnly);
    }

    if let Some(version) = updated.nested_field(&["metadata", "resourceVersion"]) {
        merged.set_nested_field(&["metadata", "resourceVersion"], version.clone())?;
    }
    store.update_status(&merged)?;
    debug!(%key, "updated object and status");
    Ok(OperationResult::UpdatedResourceAndStatus)
}

/// Like [`create_or_merge`], also returning the object as stored afterwards.
pub fn create_or_merge_verbose<S>(
    store: &S,
    desired: &Map,
    options: &ApplyOptions,
) -> Result<(OperationResult, Map), Error>
where
    S: ObjectStore + ?Sized,
{
    let result = create_or_merge(store, desired, options)?;
    let key = ObjectKey::from_object(desired)?;
    let stored = store.get(&key)?.ok_or_else(|| StoreError::not_found(&key))?;
    Ok((result, stored))
}

fn without_status(obj: &Map) -> Map {
    obj.iter()
        .filter(|(k, _)| k.as_str() != "status")
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
