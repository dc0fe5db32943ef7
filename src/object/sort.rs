//! Apply ordering of objects by kind.

use super::key::ObjectKey;
use crate::value::Map;
use once_cell::sync::Lazy;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Kinds applied before everything else, in this order. Things that are
/// referenced (namespaces, service accounts, services) come before the things
/// that refer to them.
pub const KINDS_FIRST: &[&str] = &[
    "CustomResourceDefinition",
    "Namespace",
    "ResourceQuota",
    "StorageClass",
    "ServiceAccount",
    "PodSecurityPolicy",
    "Role",
    "ClusterRole",
    "RoleBinding",
    "ClusterRoleBinding",
    "ConfigMap",
    "Secret",
    "Service",
    "LimitRange",
    "PriorityClass",
    "Deployment",
    "StatefulSet",
    "CronJob",
    "PodDisruptionBudget",
];

/// Kinds applied after everything else, in this order.
pub const KINDS_LAST: &[&str] = &["MutatingWebhookConfiguration", "ValidatingWebhookConfiguration"];

// Unlisted kinds rank 0, between the two tables.
static KIND_RANK: Lazy<HashMap<&'static str, i32>> = Lazy::new(|| {
    let first = KINDS_FIRST.len() as i32;
    let mut ranks = HashMap::with_capacity(KINDS_FIRST.len() + KINDS_LAST.len());
    for (i, kind) in KINDS_FIRST.iter().enumerate() {
        ranks.insert(*kind, i as i32 - first);
    }
    for (i, kind) in KINDS_LAST.iter().enumerate() {
        ranks.insert(*kind, i as i32 + 1);
    }
    ranks
});

fn kind_rank(kind: &str) -> i32 {
    KIND_RANK.get(kind).copied().unwrap_or(0)
}

/// Orders two keys for apply: kind rank, then group, kind, namespace and name.
pub fn compare_for_apply(a: &ObjectKey, b: &ObjectKey) -> Ordering {
    kind_rank(&a.kind)
        .cmp(&kind_rank(&b.kind))
        .then_with(|| a.group.cmp(&b.group))
        .then_with(|| a.kind.cmp(&b.kind))
        .then_with(|| a.namespace.cmp(&b.namespace))
        .then_with(|| a.name.cmp(&b.name))
}

/// Sorts objects into apply order. The sort is stable, and objects without a
/// usable identity sort as an empty key.
pub fn sort_by_kind(objects: &mut [Map]) {
    objects.sort_by_cached_key(|obj| {
        let key = ObjectKey::from_object(obj).unwrap_or_default();
        (kind_rank(&key.kind), key.group, key.kind, key.namespace, key.name)
    });
}
