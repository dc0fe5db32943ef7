//! Store module - the object store the reconciler reads from and writes to.
//!
//! [`ObjectStore`] is the seam to a cluster API client. [`InMemoryStore`] is a
//! self-contained implementation for tests and offline use.

mod error;
mod memory;
mod patch;

pub use error::*;
pub use memory::*;
pub use patch::*;

use crate::object::ObjectKey;
use crate::value::Map;

/// ObjectStore is a store of whole objects addressed by [`ObjectKey`].
///
/// Writes return the object as persisted, system fields included.
pub trait ObjectStore: Send + Sync {
    /// Returns the stored object, `None` if there is none.
    fn get(&self, key: &ObjectKey) -> Result<Option<Map>, StoreError>;

    /// Creates a new object. Fails with `AlreadyExists` if the key is taken.
    fn create(&self, obj: &Map) -> Result<Map, StoreError>;

    /// Replaces an object, leaving its `status` alone. Fails with `Conflict`
    /// if `metadata.resourceVersion` is set and stale.
    fn update(&self, obj: &Map) -> Result<Map, StoreError>;

    /// Replaces only the `status` of an object.
    fn update_status(&self, obj: &Map) -> Result<Map, StoreError>;

    fn delete(&self, key: &ObjectKey) -> Result<(), StoreError>;

    /// Applies a JSON merge patch to an object.
    fn patch(&self, key: &ObjectKey, patch: &Map) -> Result<Map, StoreError>;

    /// Returns the object as applying `obj` would persist it, without
    /// persisting anything.
    fn dry_run(&self, obj: &Map) -> Result<Map, StoreError>;
}
