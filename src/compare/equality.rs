//! Equality of an observed object and the object a desired state would produce.

use super::comparison::Comparison;
use crate::apply::{merge, override_system_fields, strip_null_fields};
use crate::error::Error;
use crate::value::{expect_map, to_value, Map, Value};
use serde::Serialize;
use tracing::trace;

/// Normalizes an observed/desired pair so that they can be compared as is.
///
/// The desired state is stripped and merged onto the observed one, using itself
/// as the last applied state. Type fields missing from `observed` are taken from
/// the merge result, and the merge result gets the system fields of `observed`.
/// Returns `(observed, merged)`.
pub fn to_comparable(observed: &Map, desired: &Map) -> Result<(Map, Map), Error> {
    let desired = strip_null_fields(desired);
    let mut merged = merge(observed, &desired, &desired)?;

    let mut observed = observed.clone();
    for field in ["kind", "apiVersion"] {
        if let Some(value) = merged.get(field) {
            observed.set(field, value.clone());
        }
    }

    override_system_fields(&mut merged, &observed)?;
    Ok((observed, merged))
}

/// Returns true if applying `desired` onto `observed` changes nothing.
pub fn is_equal(observed: &Map, desired: &Map) -> Result<bool, Error> {
    let (observed, merged) = to_comparable(observed, desired)?;
    Ok(observed == merged)
}

/// Like [`is_equal`], also returning the merged object.
pub fn is_equal_with_merge_output(observed: &Map, desired: &Map) -> Result<(bool, Map), Error> {
    let (observed, merged) = to_comparable(observed, desired)?;
    Ok((observed == merged, merged))
}

/// Like [`is_equal`], also returning the differences from observed to merged.
pub fn is_equal_with_diff(observed: &Map, desired: &Map) -> Result<(bool, Comparison), Error> {
    let (observed, merged) = to_comparable(observed, desired)?;
    let comparison = Comparison::between(&Value::Map(observed), &Value::Map(merged));
    trace!(
        added = comparison.added.len(),
        removed = comparison.removed.len(),
        modified = comparison.modified.len(),
        "compared observed and merged objects"
    );
    Ok((comparison.is_same(), comparison))
}

/// [`is_equal`] for typed objects, which are converted to documents first.
pub fn is_equal_objects<O, D>(observed: &O, desired: &D) -> Result<bool, Error>
where
    O: Serialize + ?Sized,
    D: Serialize + ?Sized,
{
    let observed = expect_map(to_value(observed)?)?;
    let desired = expect_map(to_value(desired)?)?;
    is_equal(&observed, &desired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fieldpath::Path;
    use crate::value::from_json;
    use pretty_assertions::assert_eq;
    use serde::Serialize;

    fn map(json: &str) -> Map {
        expect_map(from_json(json).unwrap()).unwrap()
    }

    #[test]
    fn test_system_fields_do_not_count_as_drift() {
        let observed = map(
            r#"{"apiVersion":"v1","kind":"ConfigMap",
                "metadata":{"name":"cm","namespace":"default","resourceVersion":"42","uid":"abc"},
                "data":{"a":"1"}}"#,
        );
        let desired = map(
            r#"{"apiVersion":"v1","kind":"ConfigMap",
                "metadata":{"name":"cm","namespace":"default","resourceVersion":"7"},
                "data":{"a":"1"}}"#,
        );

        assert!(is_equal(&observed, &desired).unwrap());
    }

    #[test]
    fn test_desired_change_is_detected() {
        let observed = map(r#"{"kind":"ConfigMap","data":{"a":"1"}}"#);
        let desired = map(r#"{"kind":"ConfigMap","data":{"a":"2"}}"#);

        let (equal, diff) = is_equal_with_diff(&observed, &desired).unwrap();
        assert!(!equal);
        assert_eq!(
            diff.modified.get(&Path::from_fields(&["data", "a"])),
            Some(&(Value::from("1"), Value::from("2")))
        );
        assert!(diff.to_string().contains(".data.a: -\"1\" +\"2\""));
    }

    #[test]
    fn test_no_spurious_field_drop() {
        let observed = map(
            r#"{"spec":{"replicas":3,"selector":{"app":"x"},"template":{"spec":{"dnsPolicy":"ClusterFirst"}}}}"#,
        );
        let desired = map(r#"{"spec":{"replicas":3}}"#);

        let (equal, merged) = is_equal_with_merge_output(&observed, &desired).unwrap();
        assert!(equal);
        assert_eq!(merged, observed);
    }

    #[test]
    fn test_null_and_empty_desired_fields_are_ignored() {
        let observed = map(r#"{"metadata":{"name":"a"},"spec":{"x":1}}"#);
        let desired = map(r#"{"metadata":{"name":"a","labels":null},"spec":{"y":""}}"#);

        assert!(is_equal(&observed, &desired).unwrap());
    }

    #[test]
    fn test_type_fields_come_from_merge_output() {
        let observed = map(r#"{"metadata":{"name":"a"}}"#);
        let desired = map(r#"{"apiVersion":"v1","kind":"Secret","metadata":{"name":"a"}}"#);

        let (observed, merged) = to_comparable(&observed, &desired).unwrap();
        assert_eq!(observed.get_str("kind"), "Secret");
        assert_eq!(observed, merged);
    }

    #[test]
    fn test_int_and_float_are_different() {
        let observed = map(r#"{"spec":{"weight":1}}"#);
        let desired = map(r#"{"spec":{"weight":1.0}}"#);

        assert!(!is_equal(&observed, &desired).unwrap());
    }

    #[test]
    fn test_is_equal_objects() {
        #[derive(Serialize)]
        struct Meta<'a> {
            name: &'a str,
            #[serde(rename = "resourceVersion", skip_serializing_if = "Option::is_none")]
            resource_version: Option<&'a str>,
        }

        #[derive(Serialize)]
        struct Object<'a> {
            kind: &'a str,
            metadata: Meta<'a>,
            replicas: i64,
        }

        let observed = Object {
            kind: "Thing",
            metadata: Meta {
                name: "a",
                resource_version: Some("10"),
            },
            replicas: 2,
        };
        let same = Object {
            kind: "Thing",
            metadata: Meta {
                name: "a",
                resource_version: None,
            },
            replicas: 2,
        };
        let scaled = Object {
            kind: "Thing",
            metadata: Meta {
                name: "a",
                resource_version: None,
            },
            replicas: 3,
        };

        assert!(is_equal_objects(&observed, &same).unwrap());
        assert!(!is_equal_objects(&observed, &scaled).unwrap());
    }

    #[test]
    fn test_is_equal_objects_requires_map() {
        assert!(is_equal_objects(&vec![1], &vec![1]).is_err());
    }
}
