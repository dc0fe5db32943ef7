//! In-memory object store.

use super::error::StoreError;
use super::patch::apply_merge_patch;
use super::ObjectStore;
use crate::apply::{merge, strip_null_fields};
use crate::object::ObjectKey;
use crate::value::{Map, Value};
use chrono::{SecondsFormat, Utc};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;
use uuid::Uuid;

/// Metadata fields owned by the store. Writes cannot change them.
const STORE_OWNED_FIELDS: &[&str] = &["uid", "creationTimestamp", "generation"];

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<ObjectKey, Map>,
    revision: u64,
}

impl State {
    fn next_revision(&mut self) -> String {
        self.revision += 1;
        self.revision.to_string()
    }
}

/// InMemoryStore keeps objects in a map guarded by a read-write lock.
///
/// It behaves like an API server for the parts the reconciler relies on: it
/// assigns uid, resourceVersion, generation and creationTimestamp, rejects
/// writes carrying a stale resourceVersion, and treats `status` as a
/// sub-resource that only [`ObjectStore::update_status`] can change.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore::default()
    }

    /// Returns the keys of all stored objects in key order.
    pub fn keys(&self) -> Vec<ObjectKey> {
        self.read().objects.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().objects.is_empty()
    }

    // Writes swap whole objects, so state behind a poisoned lock is consistent.
    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ObjectStore for InMemoryStore {
    fn get(&self, key: &ObjectKey) -> Result<Option<Map>, StoreError> {
        Ok(self.read().objects.get(key).cloned())
    }

    fn create(&self, obj: &Map) -> Result<Map, StoreError> {
        let key = ObjectKey::from_object(obj)?;
        let mut state = self.write();
        if state.objects.contains_key(&key) {
            return Err(StoreError::already_exists(&key));
        }

        let mut created = obj.clone();
        let revision = state.next_revision();
        initialize_metadata(&mut created, revision)?;
        debug!(%key, "created object");
        state.objects.insert(key, created.clone());
        Ok(created)
    }

    fn update(&self, obj: &Map) -> Result<Map, StoreError> {
        let key = ObjectKey::from_object(obj)?;
        let mut state = self.write();
        let stored = stored_for_write(&state, &key, obj)?;

        let mut candidate = obj.clone();
        copy_field(&mut candidate, &stored, "status");
        write(&mut state, key, candidate, &stored)
    }

    fn update_status(&self, obj: &Map) -> Result<Map, StoreError> {
        let key = ObjectKey::from_object(obj)?;
        let mut state = self.write();
        let stored = stored_for_write(&state, &key, obj)?;

        let mut candidate = stored.clone();
        copy_field(&mut candidate, obj, "status");
        write(&mut state, key, candidate, &stored)
    }

    fn delete(&self, key: &ObjectKey) -> Result<(), StoreError> {
        match self.write().objects.remove(key) {
            Some(_) => {
                debug!(%key, "deleted object");
                Ok(())
            }
            None => Err(StoreError::not_found(key)),
        }
    }

    fn patch(&self, key: &ObjectKey, patch: &Map) -> Result<Map, StoreError> {
        let mut state = self.write();
        let stored = state
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(key))?;

        let patched = apply_merge_patch(&Value::Map(stored.clone()), &Value::Map(patch.clone()));
        let mut candidate = patched
            .into_map()
            .ok_or_else(|| StoreError::invalid("patch result is not an object"))?;
        if ObjectKey::from_object(&candidate)? != *key {
            return Err(StoreError::invalid(format!("patch may not change the identity of {key}")));
        }
        copy_field(&mut candidate, &stored, "status");
        write(&mut state, key.clone(), candidate, &stored)
    }

    fn dry_run(&self, obj: &Map) -> Result<Map, StoreError> {
        let key = ObjectKey::from_object(obj)?;
        let state = self.read();
        let desired = strip_null_fields(obj);

        match state.objects.get(&key) {
            Some(stored) => {
                let mut merged = merge(stored, &desired, &desired)?;
                copy_field(&mut merged, stored, "status");
                for field in STORE_OWNED_FIELDS.iter().chain(&["resourceVersion"]) {
                    copy_meta_field(&mut merged, stored, field)?;
                }
                Ok(merged)
            }
            None => {
                let mut created = desired;
                initialize_metadata(&mut created, (state.revision + 1).to_string())?;
                Ok(created)
            }
        }
    }
}

/// Looks up the stored object a write replaces, rejecting stale writes. An
/// empty resourceVersion makes the write unconditional.
fn stored_for_write(state: &State, key: &ObjectKey, obj: &Map) -> Result<Map, StoreError> {
    let stored = state
        .objects
        .get(key)
        .ok_or_else(|| StoreError::not_found(key))?;
    let given = resource_version(obj);
    let current = resource_version(stored);
    if !given.is_empty() && given != current {
        return Err(StoreError::conflict(key, given, current));
    }
    Ok(stored.clone())
}

/// Persists `candidate` in place of `stored`. A write that changes nothing
/// keeps the stored resourceVersion.
fn write(state: &mut State, key: ObjectKey, mut candidate: Map, stored: &Map) -> Result<Map, StoreError> {
    for field in STORE_OWNED_FIELDS.iter().chain(&["resourceVersion"]) {
        copy_meta_field(&mut candidate, stored, field)?;
    }
    if candidate == *stored {
        debug!(%key, "write changed nothing");
        return Ok(candidate);
    }

    if without_metadata_and_status(&candidate) != without_metadata_and_status(stored) {
        let generation = meta_field(stored, "generation")
            .and_then(Value::as_int)
            .unwrap_or(0);
        metadata_mut(&mut candidate)?.set("generation", Value::Int(generation + 1));
    }
    let revision = state.next_revision();
    metadata_mut(&mut candidate)?.set("resourceVersion", Value::String(revision));

    debug!(%key, resource_version = resource_version(&candidate), "updated object");
    state.objects.insert(key, candidate.clone());
    Ok(candidate)
}

fn initialize_metadata(obj: &mut Map, revision: String) -> Result<(), StoreError> {
    let meta = metadata_mut(obj)?;
    meta.set("uid", Value::String(Uuid::new_v4().to_string()));
    meta.set("resourceVersion", Value::String(revision));
    meta.set("generation", Value::Int(1));
    meta.set(
        "creationTimestamp",
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
    );
    Ok(())
}

fn metadata_mut(obj: &mut Map) -> Result<&mut Map, StoreError> {
    obj.get_mut("metadata")
        .and_then(Value::as_map_mut)
        .ok_or_else(|| StoreError::invalid("object has no metadata"))
}

fn meta_field<'a>(obj: &'a Map, field: &str) -> Option<&'a Value> {
    obj.nested_field(&["metadata", field])
}

fn resource_version(obj: &Map) -> &str {
    meta_field(obj, "resourceVersion")
        .and_then(Value::as_str)
        .unwrap_or_default()
}

fn copy_meta_field(dest: &mut Map, src: &Map, field: &str) -> Result<(), StoreError> {
    let meta = metadata_mut(dest)?;
    match meta_field(src, field) {
        Some(value) => meta.set(field, value.clone()),
        None => {
            meta.delete(field);
        }
    }
    Ok(())
}

fn copy_field(dest: &mut Map, src: &Map, field: &str) {
    match src.get(field) {
        Some(value) => dest.set(field, value.clone()),
        None => {
            dest.delete(field);
        }
    }
}

fn without_metadata_and_status(obj: &Map) -> Map {
    obj.iter()
        .filter(|(k, _)| k.as_str() != "metadata" && k.as_str() != "status")
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{expect_map, from_json};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::thread;

    fn map(json: &str) -> Map {
        expect_map(from_json(json).unwrap()).unwrap()
    }

    fn config_map(data: &str) -> Map {
        map(&format!(
            r#"{{"apiVersion":"v1","kind":"ConfigMap","metadata":{{"name":"cm","namespace":"default"}},"data":{data}}}"#
        ))
    }

    fn key() -> ObjectKey {
        ObjectKey::new("v1", "ConfigMap", "default", "cm")
    }

    fn rv(obj: &Map) -> String {
        resource_version(obj).to_string()
    }

    #[test]
    fn test_create_assigns_system_fields() {
        let store = InMemoryStore::new();
        let created = store.create(&config_map(r#"{"a":"1"}"#)).unwrap();

        let meta = created.get("metadata").unwrap().as_map().unwrap();
        assert_eq!(meta.get_str("uid").len(), 36);
        assert_eq!(meta.get_str("resourceVersion"), "1");
        assert_eq!(meta.get("generation"), Some(&Value::Int(1)));
        assert!(meta.get_str("creationTimestamp").ends_with('Z'));
        assert_eq!(store.get(&key()).unwrap(), Some(created));
    }

    #[test]
    fn test_create_twice_fails() {
        let store = InMemoryStore::new();
        store.create(&config_map("{}")).unwrap();

        let err = store.create(&config_map("{}")).unwrap_err();
        assert_eq!(err, StoreError::already_exists(&key()));
    }

    #[test]
    fn test_create_requires_identity() {
        let store = InMemoryStore::new();
        let err = store.create(&map(r#"{"kind":"ConfigMap"}"#)).unwrap_err();
        assert!(matches!(err, StoreError::Invalid { .. }));
    }

    #[test]
    fn test_update_bumps_version_and_generation() {
        let store = InMemoryStore::new();
        let created = store.create(&config_map(r#"{"a":"1"}"#)).unwrap();

        let mut changed = created.clone();
        changed.set("data", Value::Map(map(r#"{"a":"2"}"#)));
        let updated = store.update(&changed).unwrap();

        assert_eq!(rv(&updated), "2");
        assert_eq!(meta_field(&updated, "generation"), Some(&Value::Int(2)));
        assert_eq!(meta_field(&updated, "uid"), meta_field(&created, "uid"));
    }

    #[test]
    fn test_metadata_only_update_keeps_generation() {
        let store = InMemoryStore::new();
        let created = store.create(&config_map("{}")).unwrap();

        let mut labeled = created.clone();
        labeled
            .set_nested_field(&["metadata", "labels", "team"], Value::from("a"))
            .unwrap();
        let updated = store.update(&labeled).unwrap();

        assert_eq!(rv(&updated), "2");
        assert_eq!(meta_field(&updated, "generation"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_noop_update_keeps_version() {
        let store = InMemoryStore::new();
        let created = store.create(&config_map(r#"{"a":"1"}"#)).unwrap();

        let updated = store.update(&created).unwrap();
        assert_eq!(updated, created);
    }

    #[test]
    fn test_stale_update_conflicts() {
        let store = InMemoryStore::new();
        let created = store.create(&config_map(r#"{"a":"1"}"#)).unwrap();
        store.update(&config_map(r#"{"a":"2"}"#)).unwrap();

        let mut stale = created;
        stale.set("data", Value::Map(map(r#"{"a":"3"}"#)));
        let err = store.update(&stale).unwrap_err();

        assert_eq!(err, StoreError::conflict(&key(), "1", "2"));
        assert!(crate::error::Error::from(err).is_conflict());
    }

    #[test]
    fn test_update_missing_object() {
        let store = InMemoryStore::new();
        let err = store.update(&config_map("{}")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_status_is_a_subresource() {
        let store = InMemoryStore::new();
        store.create(&config_map("{}")).unwrap();

        let mut with_status = config_map("{}");
        with_status.set("status", Value::Map(map(r#"{"phase":"Ready"}"#)));
        let updated = store.update(&with_status).unwrap();
        assert_eq!(updated.get("status"), None);

        let status_updated = store.update_status(&with_status).unwrap();
        assert_eq!(
            status_updated.nested_field(&["status", "phase"]),
            Some(&Value::from("Ready"))
        );
        assert_eq!(meta_field(&status_updated, "generation"), Some(&Value::Int(1)));

        let after = store.update(&config_map(r#"{"a":"1"}"#)).unwrap();
        assert_eq!(after.get("status"), status_updated.get("status"));
    }

    #[test]
    fn test_delete() {
        let store = InMemoryStore::new();
        store.create(&config_map("{}")).unwrap();

        store.delete(&key()).unwrap();
        assert!(store.is_empty());
        assert!(store.delete(&key()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_patch() {
        let store = InMemoryStore::new();
        store.create(&config_map(r#"{"a":"1","b":"2"}"#)).unwrap();

        let patched = store.patch(&key(), &map(r#"{"data":{"a":null,"c":"3"}}"#)).unwrap();
        assert_eq!(patched.get("data"), Some(&Value::Map(map(r#"{"b":"2","c":"3"}"#))));
        assert_eq!(rv(&patched), "2");

        let err = store
            .patch(&key(), &map(r#"{"metadata":{"name":"other"}}"#))
            .unwrap_err();
        assert!(matches!(err, StoreError::Invalid { .. }));
    }

    #[test]
    fn test_dry_run_does_not_persist() {
        let store = InMemoryStore::new();
        let created = store.create(&config_map(r#"{"a":"1"}"#)).unwrap();

        let mut desired = config_map(r#"{"b":"2"}"#);
        desired.set_nested_field(&["metadata", "labels"], Value::Null).unwrap();
        let dry = store.dry_run(&desired).unwrap();

        assert_eq!(dry.get("data"), Some(&Value::Map(map(r#"{"a":"1","b":"2"}"#))));
        assert_eq!(dry.nested_field(&["metadata", "labels"]), None);
        assert_eq!(rv(&dry), rv(&created));
        assert_eq!(store.get(&key()).unwrap(), Some(created));
    }

    #[test]
    fn test_dry_run_of_new_object() {
        let store = InMemoryStore::new();
        let dry = store.dry_run(&config_map(r#"{"a":"1"}"#)).unwrap();

        assert_eq!(meta_field(&dry, "generation"), Some(&Value::Int(1)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_creates() {
        let store = Arc::new(InMemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let obj = map(&format!(
                        r#"{{"apiVersion":"v1","kind":"ConfigMap","metadata":{{"name":"cm-{i}"}}}}"#
                    ));
                    store.create(&obj).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 8);
        let mut versions: Vec<u64> = store
            .keys()
            .iter()
            .map(|k| rv(&store.get(k).unwrap().unwrap()).parse().unwrap())
            .collect();
        versions.sort();
        assert_eq!(versions, (1..=8u64).collect::<Vec<_>>());
    }
}
