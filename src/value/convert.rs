//! Conversion between [`Value`] and external representations.
//!
//! Decoding is the only place where foreign data enters the engine, so it is
//! also where unsupported representations are rejected.

use super::{Map, Value};
use crate::error::Error;
use crate::fieldpath::{Path, PathElement};
use serde::de::{self, DeserializeOwned, EnumAccess, IgnoredAny, MapAccess, SeqAccess, VariantAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

impl TryFrom<serde_json::Value> for Value {
    type Error = Error;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        from_json_value(value, &mut Path::new())
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(l) => serde_json::Value::Array(l.iter().map(Into::into).collect()),
            Value::Map(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.clone(), v.into())).collect(),
            ),
        }
    }
}

fn from_json_value(value: serde_json::Value, path: &mut Path) -> Result<Value, Error> {
    Ok(match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => from_json_number(&n, path)?,
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => {
            let mut list = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                path.push(PathElement::index(i));
                let converted = from_json_value(item, path);
                path.pop();
                list.push(converted?);
            }
            Value::List(list)
        }
        serde_json::Value::Object(fields) => {
            let mut map = Map::new();
            for (key, item) in fields {
                path.push(PathElement::field_name(key.as_str()));
                let converted = from_json_value(item, path);
                path.pop();
                map.set(key, converted?);
            }
            Value::Map(map)
        }
    })
}

// Numbers keep their literal text, so an integer too large for i64 is told
// apart from a float.
fn from_json_number(n: &serde_json::Number, path: &Path) -> Result<Value, Error> {
    if let Some(i) = n.as_i64() {
        return Ok(Value::Int(i));
    }
    let literal = n.to_string();
    if n.is_u64() {
        return Err(Error::unsupported_type(path, format!("uint64 ({literal})")));
    }
    if !literal.contains(['.', 'e', 'E']) {
        return Err(Error::unsupported_type(path, format!("integer out of range ({literal})")));
    }
    match n.as_f64() {
        Some(f) if f.is_finite() => Ok(Value::Float(f)),
        _ => Err(Error::unsupported_type(path, format!("number ({literal})"))),
    }
}

/// A decoded YAML node. Scalars with no [`Value`] counterpart are kept as
/// `Unsupported` so the error can name their path.
#[derive(Debug)]
enum YamlNode {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Sequence(Vec<YamlNode>),
    Mapping(Vec<(YamlNode, YamlNode)>),
    Unsupported(String),
}

impl YamlNode {
    fn describe(&self) -> String {
        match self {
            YamlNode::Null => "null".to_string(),
            YamlNode::Bool(b) => b.to_string(),
            YamlNode::Int(i) => i.to_string(),
            YamlNode::Float(f) => f.to_string(),
            YamlNode::String(s) => format!("{s:?}"),
            YamlNode::Sequence(_) => "sequence".to_string(),
            YamlNode::Mapping(_) => "mapping".to_string(),
            YamlNode::Unsupported(found) => found.clone(),
        }
    }
}

impl<'de> Deserialize<'de> for YamlNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(YamlNodeVisitor)
    }
}

struct YamlNodeVisitor;

impl<'de> Visitor<'de> for YamlNodeVisitor {
    type Value = YamlNode;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a YAML node")
    }

    fn visit_unit<E: de::Error>(self) -> Result<YamlNode, E> {
        Ok(YamlNode::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<YamlNode, E> {
        Ok(YamlNode::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<YamlNode, D::Error> {
        YamlNode::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, b: bool) -> Result<YamlNode, E> {
        Ok(YamlNode::Bool(b))
    }

    fn visit_i64<E: de::Error>(self, i: i64) -> Result<YamlNode, E> {
        Ok(YamlNode::Int(i))
    }

    fn visit_u64<E: de::Error>(self, u: u64) -> Result<YamlNode, E> {
        Ok(match i64::try_from(u) {
            Ok(i) => YamlNode::Int(i),
            Err(_) => YamlNode::Unsupported(format!("uint64 ({u})")),
        })
    }

    fn visit_i128<E: de::Error>(self, i: i128) -> Result<YamlNode, E> {
        Ok(match i64::try_from(i) {
            Ok(i) => YamlNode::Int(i),
            Err(_) => YamlNode::Unsupported(format!("integer out of range ({i})")),
        })
    }

    fn visit_u128<E: de::Error>(self, u: u128) -> Result<YamlNode, E> {
        Ok(match i64::try_from(u) {
            Ok(i) => YamlNode::Int(i),
            Err(_) => YamlNode::Unsupported(format!("integer out of range ({u})")),
        })
    }

    fn visit_f64<E: de::Error>(self, f: f64) -> Result<YamlNode, E> {
        Ok(if f.is_finite() {
            YamlNode::Float(f)
        } else {
            YamlNode::Unsupported(format!("non-finite float ({f})"))
        })
    }

    fn visit_str<E: de::Error>(self, s: &str) -> Result<YamlNode, E> {
        Ok(YamlNode::String(s.to_string()))
    }

    fn visit_string<E: de::Error>(self, s: String) -> Result<YamlNode, E> {
        Ok(YamlNode::String(s))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<YamlNode, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(YamlNode::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<YamlNode, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(entry) = map.next_entry()? {
            entries.push(entry);
        }
        Ok(YamlNode::Mapping(entries))
    }

    fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> Result<YamlNode, A::Error> {
        let (tag, content): (String, _) = data.variant()?;
        content.newtype_variant::<IgnoredAny>()?;
        Ok(YamlNode::Unsupported(format!("tagged value (!{tag})")))
    }
}

fn from_yaml_node(node: YamlNode, path: &mut Path) -> Result<Value, Error> {
    Ok(match node {
        YamlNode::Null => Value::Null,
        YamlNode::Bool(b) => Value::Bool(b),
        YamlNode::Int(i) => Value::Int(i),
        YamlNode::Float(f) => Value::Float(f),
        YamlNode::String(s) => Value::String(s),
        YamlNode::Sequence(items) => {
            let mut list = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                path.push(PathElement::index(i));
                let converted = from_yaml_node(item, path);
                path.pop();
                list.push(converted?);
            }
            Value::List(list)
        }
        YamlNode::Mapping(entries) => {
            let mut map = Map::new();
            for (key, item) in entries {
                let key = match key {
                    YamlNode::String(s) => s,
                    other => {
                        return Err(Error::unsupported_type(
                            path,
                            format!("non-string map key ({})", other.describe()),
                        ))
                    }
                };
                if map.has(&key) {
                    return Err(Error::unsupported_type(path, format!("duplicate map key ({key:?})")));
                }
                path.push(PathElement::field_name(key.as_str()));
                let converted = from_yaml_node(item, path);
                path.pop();
                map.set(key, converted?);
            }
            Value::Map(map)
        }
        YamlNode::Unsupported(found) => return Err(Error::unsupported_type(path, found)),
    })
}

/// Parse a value from JSON.
pub fn from_json(json: &str) -> Result<Value, Error> {
    let raw: serde_json::Value = serde_json::from_str(json)?;
    Value::try_from(raw)
}

/// Serialize a value to JSON.
pub fn to_json(value: &Value) -> Result<String, Error> {
    Ok(serde_json::to_string(value)?)
}

/// Parse a value from YAML. JSON input is accepted too.
pub fn from_yaml(yaml: &str) -> Result<Value, Error> {
    let node: YamlNode = serde_yaml::from_str(yaml)?;
    from_yaml_node(node, &mut Path::new())
}

/// Serialize a value to YAML.
pub fn to_yaml(value: &Value) -> Result<String, Error> {
    Ok(serde_yaml::to_string(value)?)
}

/// Parse every document of a multi-document YAML stream. Empty documents are skipped.
pub fn from_yaml_documents(yaml: &str) -> Result<Vec<Value>, Error> {
    let mut docs = Vec::new();
    for document in serde_yaml::Deserializer::from_str(yaml) {
        let node = YamlNode::deserialize(document)?;
        let value = from_yaml_node(node, &mut Path::new())?;
        if !value.is_null() {
            docs.push(value);
        }
    }
    Ok(docs)
}

/// Converts any serializable object into a [`Value`].
pub fn to_value<T: Serialize + ?Sized>(object: &T) -> Result<Value, Error> {
    Value::try_from(serde_json::to_value(object)?)
}

/// Converts a [`Value`] back into a typed object.
pub fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T, Error> {
    Ok(serde_json::from_value(serde_json::Value::from(value))?)
}

/// Converts a value into its top-level map, rejecting any other variant.
pub fn expect_map(value: Value) -> Result<Map, Error> {
    match value {
        Value::Map(m) => Ok(m),
        other => Err(Error::type_mismatch(&Path::new(), "map", other.kind_name())),
    }
}
