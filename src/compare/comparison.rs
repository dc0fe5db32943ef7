//! Structural differences between two documents.

use crate::fieldpath::{Path, PathElement};
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Comparison holds the result of comparing two documents, left (observed) to
/// right (merged).
///
/// No path appears in more than one of the three collections. If all of them
/// are empty, the documents are equal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comparison {
    /// Fields present on the left but not on the right.
    pub removed: BTreeMap<Path, Value>,
    /// Fields present on both sides with different values, as `(left, right)`.
    pub modified: BTreeMap<Path, (Value, Value)>,
    /// Fields present on the right but not on the left.
    pub added: BTreeMap<Path, Value>,
}

impl Comparison {
    pub fn new() -> Self {
        Comparison::default()
    }

    /// Compares `lhs` with `rhs`, descending into maps and lists.
    ///
    /// Lists are compared position by position; a value changing variant is
    /// reported as modified at that path.
    pub fn between(lhs: &Value, rhs: &Value) -> Self {
        let mut comparison = Comparison::new();
        comparison.walk(&mut Path::new(), lhs, rhs);
        comparison
    }

    fn walk(&mut self, path: &mut Path, lhs: &Value, rhs: &Value) {
        match (lhs, rhs) {
            (Value::Map(l), Value::Map(r)) => {
                for (key, lv) in l {
                    path.push(PathElement::field_name(key.as_str()));
                    match r.get(key) {
                        Some(rv) => self.walk(path, lv, rv),
                        None => {
                            self.removed.insert(path.clone(), lv.clone());
                        }
                    }
                    path.pop();
                }
                for (key, rv) in r.iter().filter(|(k, _)| !l.has(k)) {
                    self.added
                        .insert(path.with(PathElement::field_name(key.as_str())), rv.clone());
                }
            }
            (Value::List(l), Value::List(r)) => {
                for i in 0..l.len().max(r.len()) {
                    path.push(PathElement::index(i));
                    match (l.get(i), r.get(i)) {
                        (Some(lv), Some(rv)) => self.walk(path, lv, rv),
                        (Some(lv), None) => {
                            self.removed.insert(path.clone(), lv.clone());
                        }
                        (None, Some(rv)) => {
                            self.added.insert(path.clone(), rv.clone());
                        }
                        (None, None) => {}
                    }
                    path.pop();
                }
            }
            _ if lhs != rhs => {
                self.modified.insert(path.clone(), (lhs.clone(), rhs.clone()));
            }
            _ => {}
        }
    }

    /// Returns true if there are no changes.
    pub fn is_same(&self) -> bool {
        self.removed.is_empty() && self.modified.is_empty() && self.added.is_empty()
    }

    pub fn has_removed(&self) -> bool {
        !self.removed.is_empty()
    }

    pub fn has_modified(&self) -> bool {
        !self.modified.is_empty()
    }

    pub fn has_added(&self) -> bool {
        !self.added.is_empty()
    }

    /// Drops every change at or below one of the given paths.
    pub fn exclude_paths(&mut self, paths: &[Path]) {
        let excluded = |p: &Path| {
            paths
                .iter()
                .any(|prefix| p.iter().zip(prefix.iter()).all(|(a, b)| a == b) && p.len() >= prefix.len())
        };
        self.removed.retain(|p, _| !excluded(p));
        self.modified.retain(|p, _| !excluded(p));
        self.added.retain(|p, _| !excluded(p));
    }
}

fn compact(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}"))
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_same() {
            return Ok(());
        }
        write!(f, "-observed +merged")?;

        if !self.modified.is_empty() {
            write!(f, "\n- Modified Fields:")?;
            for (path, (lhs, rhs)) in &self.modified {
                write!(f, "\n  {}: -{} +{}", path, compact(lhs), compact(rhs))?;
            }
        }

        if !self.added.is_empty() {
            write!(f, "\n- Added Fields:")?;
            for (path, value) in &self.added {
                write!(f, "\n  +{}: {}", path, compact(value))?;
            }
        }

        if !self.removed.is_empty() {
            write!(f, "\n- Removed Fields:")?;
            for (path, value) in &self.removed {
                write!(f, "\n  -{}: {}", path, compact(value))?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::from_json;

    fn value(json: &str) -> Value {
        from_json(json).unwrap()
    }

    #[test]
    fn test_comparison_is_same() {
        let comp = Comparison::between(&value(r#"{"a":[1,{"b":2}]}"#), &value(r#"{"a":[1,{"b":2}]}"#));
        assert!(comp.is_same());
        assert_eq!(comp.to_string(), "");
    }

    #[test]
    fn test_comparison_has_changes() {
        let comp = Comparison::between(
            &value(r#"{"spec":{"replicas":3,"paused":true},"list":[1,2]}"#),
            &value(r#"{"spec":{"replicas":5,"labels":{"b":"2"}},"list":[1]}"#),
        );

        assert!(comp.has_modified());
        assert_eq!(
            comp.modified.get(&Path::from_fields(&["spec", "replicas"])),
            Some(&(Value::Int(3), Value::Int(5)))
        );
        assert!(comp.added.contains_key(&Path::from_fields(&["spec", "labels"])));
        assert!(comp.removed.contains_key(&Path::from_fields(&["spec", "paused"])));
        assert!(comp
            .removed
            .contains_key(&Path::from_fields(&["list"]).with(PathElement::index(1))));
    }

    #[test]
    fn test_variant_change_is_modified() {
        let comp = Comparison::between(&value(r#"{"a":1}"#), &value(r#"{"a":1.0}"#));
        assert_eq!(comp.modified.len(), 1);
    }

    #[test]
    fn test_comparison_exclude_paths() {
        let mut comp = Comparison::between(
            &value(r#"{"metadata":{"uid":"1"},"spec":{"a":1}}"#),
            &value(r#"{"metadata":{"uid":"2"},"spec":{"a":2}}"#),
        );
        comp.exclude_paths(&[Path::from_fields(&["metadata"])]);

        assert_eq!(comp.modified.len(), 1);
        assert!(comp.modified.contains_key(&Path::from_fields(&["spec", "a"])));
    }

    #[test]
    fn test_comparison_display() {
        let comp = Comparison::between(
            &value(r#"{"spec":{"replicas":3,"old":true}}"#),
            &value(r#"{"spec":{"replicas":5,"new":"x"}}"#),
        );

        let display = comp.to_string();
        assert!(display.starts_with("-observed +merged"));
        assert!(display.contains(".spec.replicas: -3 +5"));
        assert!(display.contains("+.spec.new: \"x\""));
        assert!(display.contains("-.spec.old: true"));
    }
}
