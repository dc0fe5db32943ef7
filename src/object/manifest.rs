//! Reading objects out of YAML or JSON manifests.

use super::key::{is_kubernetes_object, is_kustomize_object};
use crate::error::Error;
use crate::value::{from_yaml_documents, Map, Value};
use tracing::debug;

/// Decodes every object of a multi-document manifest.
///
/// Documents whose `items` field is a list are flattened into their items. Documents that
/// are not kubernetes objects, and kustomize configuration, are skipped.
pub fn read_objects(manifest: &str) -> Result<Vec<Map>, Error> {
    let mut objects = Vec::new();
    for document in from_yaml_documents(manifest)? {
        let doc = match document {
            Value::Map(doc) => doc,
            other => {
                debug!(kind = other.kind_name(), "skipping non-object document");
                continue;
            }
        };
        if let Some(Value::List(items)) = doc.get("items") {
            objects.extend(
                items
                    .iter()
                    .filter_map(Value::as_map)
                    .filter(|o| is_applicable(o))
                    .cloned(),
            );
            continue;
        }
        if is_applicable(&doc) {
            objects.push(doc);
        } else {
            debug!("skipping document without object identity");
        }
    }
    Ok(objects)
}

fn is_applicable(obj: &Map) -> bool {
    is_kubernetes_object(obj) && !is_kustomize_object(obj)
}
