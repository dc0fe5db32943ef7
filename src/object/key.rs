//! Identity of a stored object.

use crate::error::Error;
use crate::value::Map;
use std::fmt;

/// ObjectKey addresses an object by group, version, kind, namespace and name.
///
/// The core group is the empty string; cluster-scoped objects have an empty
/// namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    /// Creates a key from an `apiVersion` string such as `apps/v1` or `v1`.
    pub fn new(
        api_version: &str,
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let (group, version) = split_api_version(api_version);
        ObjectKey {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Derives the key of an object from its `apiVersion`, `kind` and `metadata`.
    pub fn from_object(obj: &Map) -> Result<Self, Error> {
        ensure_kubernetes_object(obj)?;
        Ok(ObjectKey::new(
            obj.get_str("apiVersion"),
            obj.get_str("kind"),
            meta_str(obj, "namespace"),
            meta_str(obj, "name"),
        ))
    }

    /// Returns the `apiVersion` form of group and version.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ns={}: name={}: {}, Kind={}",
            self.namespace,
            self.name,
            self.api_version(),
            self.kind
        )
    }
}

fn split_api_version(api_version: &str) -> (&str, &str) {
    api_version.rsplit_once('/').unwrap_or(("", api_version))
}

fn meta_str<'a>(obj: &'a Map, field: &str) -> &'a str {
    obj.get("metadata")
        .and_then(|m| m.as_map())
        .map(|m| m.get_str(field))
        .unwrap_or_default()
}

/// Returns a one-line description of an object for log and error messages.
pub fn describe(obj: &Map) -> String {
    ObjectKey::new(
        obj.get_str("apiVersion"),
        obj.get_str("kind"),
        meta_str(obj, "namespace"),
        meta_str(obj, "name"),
    )
    .to_string()
}

/// Returns true if the object has a name, a kind and an apiVersion.
pub fn is_kubernetes_object(obj: &Map) -> bool {
    !meta_str(obj, "name").is_empty()
        && !obj.get_str("kind").is_empty()
        && !obj.get_str("apiVersion").is_empty()
}

/// Fails with [`Error::InvalidObject`] unless [`is_kubernetes_object`] holds.
pub fn ensure_kubernetes_object(obj: &Map) -> Result<(), Error> {
    if is_kubernetes_object(obj) {
        Ok(())
    } else {
        Err(Error::invalid_object(format!(
            "is not a kubernetes object: {}",
            describe(obj)
        )))
    }
}

/// Returns true for kustomize configuration documents, which are never applied.
pub fn is_kustomize_object(obj: &Map) -> bool {
    obj.get_str("kind") == "Kustomization"
        && split_api_version(obj.get_str("apiVersion")).0 == "kustomize.config.k8s.io"
}
