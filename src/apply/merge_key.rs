//! Guessing whether a list is a list of maps, and by which field.

use crate::value::Value;
use std::collections::BTreeSet;

/// Field names tried as merge keys, highest precedence first.
///
/// Lists of maps whose elements share none of these are merged as scalar lists
/// (desired replaces observed), even when they hold maps.
pub const KNOWN_MERGE_KEYS: &[&str] = &[
    "uid",
    "id",
    "alias",
    "name",
    "key",
    "component",
    "containerPort",
    "container-port",
    "port",
    "ip",
];

/// Detects the merge key shared by every element of every given list.
///
/// Returns `None` when any element is not a map, when the lists are all empty,
/// or when the fields common to all elements include no known key. Empty lists
/// do not restrict the result.
pub fn detect_merge_key(lists: &[&[Value]]) -> Option<&'static str> {
    let mut common: Option<BTreeSet<&str>> = None;

    for list in lists {
        for item in list.iter() {
            let map = item.as_map()?;
            match common.as_mut() {
                None => common = Some(map.keys().map(String::as_str).collect()),
                Some(keys) => keys.retain(|k| map.has(k)),
            }
        }
    }

    let common = common?;
    KNOWN_MERGE_KEYS
        .iter()
        .copied()
        .find(|candidate| common.contains(candidate))
}

/// Renders a merge key value as the string used to match list elements.
pub fn merge_key_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::List(_) | Value::Map(_) => {
            serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::from_json;

    fn list(json: &str) -> Vec<Value> {
        from_json(json).unwrap().as_list().unwrap().clone()
    }

    #[test]
    fn test_detects_name() {
        let observed = list(r#"[{"name":"a","image":"v1"},{"name":"b","image":"v1"}]"#);
        let desired = list(r#"[{"name":"a","image":"v2"}]"#);
        assert_eq!(detect_merge_key(&[&observed, &[], &desired]), Some("name"));
    }

    #[test]
    fn test_precedence_follows_known_keys_order() {
        let items = list(r#"[{"name":"a","port":80,"uid":"1"},{"name":"b","port":81,"uid":"2"}]"#);
        assert_eq!(detect_merge_key(&[&items]), Some("uid"));

        let items = list(r#"[{"port":80,"containerPort":8080}]"#);
        assert_eq!(detect_merge_key(&[&items]), Some("containerPort"));
    }

    #[test]
    fn test_key_must_be_common_to_all_lists() {
        let observed = list(r#"[{"name":"a","port":80}]"#);
        let desired = list(r#"[{"port":80}]"#);
        assert_eq!(detect_merge_key(&[&observed, &desired]), Some("port"));

        let desired = list(r#"[{"protocol":"TCP"}]"#);
        assert_eq!(detect_merge_key(&[&observed, &desired]), None);
    }

    #[test]
    fn test_scalar_and_mixed_lists_have_no_key() {
        let scalars = list(r#"["x","y"]"#);
        assert_eq!(detect_merge_key(&[&scalars]), None);

        let mixed = list(r#"[{"name":"a"},"b"]"#);
        assert_eq!(detect_merge_key(&[&mixed]), None);
    }

    #[test]
    fn test_empty_lists_have_no_key() {
        assert_eq!(detect_merge_key(&[&[], &[], &[]]), None);
    }

    #[test]
    fn test_unknown_common_field_has_no_key() {
        let items = list(r#"[{"path":"/a"},{"path":"/b"}]"#);
        assert_eq!(detect_merge_key(&[&items]), None);
    }

    #[test]
    fn test_merge_key_string() {
        assert_eq!(merge_key_string(&Value::from("web")), "web");
        assert_eq!(merge_key_string(&Value::Int(80)), "80");
        assert_eq!(merge_key_string(&Value::Float(80.0)), "80");
        assert_eq!(merge_key_string(&Value::Null), "null");
    }
}
