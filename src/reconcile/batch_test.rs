//! Tests for reconciling and asserting whole manifests.

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::reconcile::{
        assert_all, assert_manifest, create_or_merge_all, create_or_merge_manifest, ApplyOptions,
        AssertKind, OperationResult,
    };
    use crate::store::{InMemoryStore, ObjectStore};
    use crate::value::{from_json, Map};
    use pretty_assertions::assert_eq;

    const MANIFEST: &str = r#"
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  namespace: prod
spec:
  replicas: 2
---
apiVersion: v1
kind: Namespace
metadata:
  name: prod
"#;

    const BROKEN_CONFIG: &str = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: settings
  namespace: prod
data:
  - not-a-map
"#;

    fn map(json: &str) -> Map {
        from_json(json).unwrap().into_map().unwrap()
    }

    fn kind_of(object: &str) -> &str {
        object.rsplit("Kind=").next().unwrap_or_default()
    }

    #[test]
    fn test_manifest_is_applied_in_kind_order() {
        let store = InMemoryStore::new();
        let options = ApplyOptions::default();

        let outcome = create_or_merge_manifest(&store, MANIFEST, &options).unwrap();
        let applied: Vec<(&str, OperationResult)> =
            outcome.succeeded().map(|(o, r)| (kind_of(o), *r)).collect();
        assert_eq!(
            applied,
            vec![
                ("Namespace", OperationResult::Created),
                ("Deployment", OperationResult::Created),
            ]
        );
        assert_eq!(store.len(), 2);

        let again = create_or_merge_manifest(&store, MANIFEST, &options)
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(again, vec![OperationResult::Unchanged, OperationResult::Unchanged]);
    }

    #[test]
    fn test_failed_object_does_not_stop_the_others() {
        let store = InMemoryStore::new();
        store
            .create(&map(
                r#"{"apiVersion":"v1","kind":"ConfigMap",
                    "metadata":{"name":"settings","namespace":"prod"},"data":{"a":"1"}}"#,
            ))
            .unwrap();

        let manifest = format!("{MANIFEST}---{BROKEN_CONFIG}");
        let outcome = create_or_merge_manifest(&store, &manifest, &ApplyOptions::default()).unwrap();

        let kinds: Vec<&str> = outcome.objects.iter().map(|o| kind_of(&o.object)).collect();
        assert_eq!(kinds, vec!["Namespace", "ConfigMap", "Deployment"]);
        assert!(!outcome.is_success());
        assert_eq!(outcome.succeeded().count(), 2);

        let failed: Vec<(&str, &Error)> = outcome.failed().collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].0.contains("name=settings"), "{}", failed[0].0);
        assert!(matches!(failed[0].1, Error::TypeMismatch { .. }), "{}", failed[0].1);
        assert_eq!(store.len(), 3);

        let err = outcome.into_result().unwrap_err();
        assert!(
            matches!(&err, Error::Batch { total: 3, failures } if failures.len() == 1),
            "{err}"
        );
        let message = err.to_string();
        assert!(message.starts_with("1 of 3 objects failed: "), "{message}");
        assert!(message.contains("ns=prod: name=settings: v1, Kind=ConfigMap"), "{message}");
    }

    #[test]
    fn test_every_failure_is_reported() {
        let store = InMemoryStore::new();
        let objects = vec![
            map(r#"{"apiVersion":"v1","kind":"ConfigMap","metadata":{"namespace":"prod"}}"#),
            map(r#"{"apiVersion":"v1","kind":"Namespace","metadata":{"name":"prod"}}"#),
            map(r#"{"apiVersion":"v1","kind":"Secret","metadata":{"namespace":"prod"}}"#),
        ];

        let outcome = create_or_merge_all(&store, &objects, &ApplyOptions::default());
        assert_eq!(outcome.len(), 3);
        assert_eq!(outcome.failed().count(), 2);
        assert_eq!(store.len(), 1);

        match outcome.into_result() {
            Err(Error::Batch { total, failures }) => {
                assert_eq!(total, 3);
                assert_eq!(failures.len(), 2);
                assert!(failures[0].contains("Kind=ConfigMap"), "{}", failures[0]);
                assert!(failures[1].contains("Kind=Secret"), "{}", failures[1]);
            }
            other => panic!("expected a batch error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_manifest_is_rejected() {
        let store = InMemoryStore::new();
        let err = create_or_merge_manifest(&store, "---\n", &ApplyOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidObject { .. }), "{err}");
        assert!(store.is_empty());
    }

    #[test]
    fn test_assert_manifest() {
        let store = InMemoryStore::new();
        assert!(assert_manifest(&store, MANIFEST, AssertKind::IsNotFound)
            .unwrap()
            .all_passed());
        assert!(!assert_manifest(&store, MANIFEST, AssertKind::Equals)
            .unwrap()
            .all_passed());

        create_or_merge_manifest(&store, MANIFEST, &ApplyOptions::default())
            .unwrap()
            .into_result()
            .unwrap();

        let outcome = assert_manifest(&store, MANIFEST, AssertKind::Equals).unwrap();
        assert!(outcome.is_success());
        assert!(outcome.all_passed());
    }

    #[test]
    fn test_assert_all_keeps_going_after_an_error() {
        let store = InMemoryStore::new();
        create_or_merge_manifest(&store, MANIFEST, &ApplyOptions::default()).unwrap();

        let objects = vec![
            map(r#"{"apiVersion":"v1","metadata":{"name":"no-kind"}}"#),
            map(r#"{"apiVersion":"apps/v1","kind":"Deployment","metadata":{"name":"web","namespace":"prod"},"spec":{"replicas":3}}"#),
            map(r#"{"apiVersion":"v1","kind":"Namespace","metadata":{"name":"prod"}}"#),
        ];
        let outcome = assert_all(&store, &objects, AssertKind::Equals);

        assert_eq!(outcome.failed().count(), 1);
        assert!(!outcome.all_passed());
        let verdicts: Vec<bool> = outcome.succeeded().map(|(_, a)| a.passed).collect();
        assert_eq!(verdicts, vec![false, true]);
        let (_, mismatch) = outcome.succeeded().next().unwrap();
        assert!(mismatch.diff.contains(".spec.replicas: -2 +3"), "{}", mismatch.diff);
    }
}
