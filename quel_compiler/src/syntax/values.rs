//! Values produced by the annotation grammar
//!
//! Annotation arguments are dynamically typed. A [`ValueMap`] keeps entries
//! in source order and may mix positional and named keys, so
//! `{1, "a", key=2}` keeps its shape instead of collapsing into a map.

use crate::utils::Span;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;

/// Key under which the first positional annotation parameter is stored
pub const DEFAULT_KEY: &str = "value";

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(ValueMap),
    Annotation(Box<Annotation>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Annotation(_) => "annotation",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ValueMap> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_annotation(&self) -> Option<&Annotation> {
        match self {
            Self::Annotation(annotation) => Some(annotation),
            _ => None,
        }
    }

    /// Converts placeholder configuration data into a value
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Self::String(s.clone()),
            serde_json::Value::Array(items) => {
                let mut list = ValueMap::new();
                for item in items {
                    list.push(Self::from_json(item));
                }
                Self::List(list)
            }
            serde_json::Value::Object(map) => {
                let mut list = ValueMap::new();
                for (key, item) in map {
                    list.insert(ValueKey::Name(key.clone()), Self::from_json(item));
                }
                Self::List(list)
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Float(x) => serializer.serialize_f64(*x),
            Self::String(s) => serializer.serialize_str(s),
            Self::List(list) => list.serialize(serializer),
            Self::Annotation(annotation) => annotation.serialize(serializer),
        }
    }
}

// === KEYS ===

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Index(usize),
    Name(String),
}

impl ValueKey {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    fn matches(&self, name: &str) -> bool {
        matches!(self, Self::Name(n) if n == name)
    }
}

impl fmt::Display for ValueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{}", i),
            Self::Name(n) => f.write_str(n),
        }
    }
}

impl From<&str> for ValueKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<usize> for ValueKey {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

// === ORDERED MAP ===

/// Ordered key/value entries; a repeated key replaces the earlier value in place
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueMap {
    entries: Vec<(ValueKey, Value)>,
    next_index: usize,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends a positional value under the next free index
    pub fn push(&mut self, value: Value) {
        let key = ValueKey::Index(self.next_index);
        self.insert(key, value);
    }

    pub fn insert(&mut self, key: ValueKey, value: Value) {
        if let ValueKey::Index(i) = key {
            self.next_index = self.next_index.max(i + 1);
        }
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key.matches(name))
            .map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(key, _)| key.matches(name))
            .map(|(_, value)| value)
    }

    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| *key == ValueKey::Index(index))
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ValueKey, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &ValueKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    fn is_sequence(&self) -> bool {
        self.entries
            .iter()
            .enumerate()
            .all(|(i, (key, _))| *key == ValueKey::Index(i))
    }
}

/// Pure positional lists serialize as arrays, anything else as an object
impl Serialize for ValueMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_sequence() {
            let mut seq = serializer.serialize_seq(Some(self.len()))?;
            for value in self.values() {
                seq.serialize_element(value)?;
            }
            seq.end()
        } else {
            let mut map = serializer.serialize_map(Some(self.len()))?;
            for (key, value) in self.iter() {
                map.serialize_entry(&key.to_string(), value)?;
            }
            map.end()
        }
    }
}

// === ANNOTATIONS ===

/// A parsed `@Class(...)` tag
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    /// Fully qualified class name
    pub class: String,
    pub parameters: ValueMap,
    #[serde(skip)]
    pub span: Span,
}

impl Annotation {
    pub fn new(class: impl Into<String>, parameters: ValueMap) -> Self {
        Self {
            class: class.into(),
            parameters,
            span: Span::dummy(),
        }
    }

    /// The positional parameter, if one was given
    pub fn value(&self) -> Option<&Value> {
        self.parameters.get(DEFAULT_KEY)
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    /// Last segment of the class name
    pub fn short_name(&self) -> &str {
        self.class.rsplit('\\').next().unwrap_or(&self.class)
    }
}

/// One top-level annotation as built by the type resolver
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationEntry {
    /// Fully qualified class name
    pub class: String,
    pub value: Value,
    #[serde(skip)]
    pub span: Span,
}

/// Annotations of one docblock in source order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AnnotationCollection {
    entries: Vec<AnnotationEntry>,
}

impl AnnotationCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, class: impl Into<String>, value: Value, span: Span) {
        self.entries.push(AnnotationEntry {
            class: class.into(),
            value,
            span,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AnnotationEntry> {
        self.entries.iter()
    }

    /// Every value constructed for `class`, in source order
    pub fn get(&self, class: &str) -> Vec<&Value> {
        self.entries
            .iter()
            .filter(|entry| entry.class == class)
            .map(|entry| &entry.value)
            .collect()
    }

    pub fn first(&self, class: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|entry| entry.class == class)
            .map(|entry| &entry.value)
    }

    pub fn contains(&self, class: &str) -> bool {
        self.first(class).is_some()
    }

    /// Distinct class names in order of first appearance
    pub fn classes(&self) -> Vec<&str> {
        let mut classes: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !classes.contains(&entry.class.as_str()) {
                classes.push(&entry.class);
            }
        }
        classes
    }
}

impl IntoIterator for AnnotationCollection {
    type Item = AnnotationEntry;
    type IntoIter = std::vec::IntoIter<AnnotationEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a AnnotationCollection {
    type Item = &'a AnnotationEntry;
    type IntoIter = std::slice::Iter<'a, AnnotationEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_value_map_keeps_order_and_mixed_keys() {
        let mut map = ValueMap::new();
        map.push(Value::from(1));
        map.insert(ValueKey::name("key"), Value::from("a"));
        map.push(Value::from(true));

        let keys: Vec<String> = map.keys().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["0", "key", "1"]);
        assert_eq!(map.get("key"), Some(&Value::from("a")));
        assert_eq!(map.get_index(1), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_repeated_key_replaces_in_place() {
        let mut map = ValueMap::new();
        map.insert("a".into(), Value::from(1));
        map.insert("b".into(), Value::from(2));
        map.insert("a".into(), Value::from(3));

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a"), Some(&Value::Integer(3)));
        assert_eq!(map.keys().next(), Some(&ValueKey::name("a")));
    }

    #[test]
    fn test_serialization_shape() {
        let mut seq = ValueMap::new();
        seq.push(Value::from(1));
        seq.push(Value::from("x"));
        assert_eq!(serde_json::to_string(&seq).unwrap(), r#"[1,"x"]"#);

        let mut mixed = ValueMap::new();
        mixed.push(Value::from(1));
        mixed.insert("name".into(), Value::Null);
        assert_eq!(serde_json::to_string(&mixed).unwrap(), r#"{"0":1,"name":null}"#);
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::json!({"host": "localhost", "ports": [1, 2], "ratio": 0.5});
        let value = Value::from_json(&json);
        let list = value.as_list().unwrap();

        assert_eq!(list.get("host").and_then(Value::as_str), Some("localhost"));
        assert_matches!(list.get("ports"), Some(Value::List(ports)) if ports.len() == 2);
        assert_eq!(list.get("ratio").and_then(Value::as_f64), Some(0.5));
    }

    #[test]
    fn test_collection_lookup_by_class() {
        let column = |name: &str| {
            let mut parameters = ValueMap::new();
            parameters.insert(DEFAULT_KEY.into(), Value::from(name));
            Value::Annotation(Box::new(Annotation::new("App\\Orm\\Column", parameters)))
        };

        let mut collection = AnnotationCollection::new();
        collection.push("App\\Orm\\Column", column("id"), Span::dummy());
        collection.push("App\\Orm\\Index", Value::Null, Span::dummy());
        collection.push("App\\Orm\\Column", column("name"), Span::dummy());

        let columns = collection.get("App\\Orm\\Column");
        assert_eq!(columns.len(), 2);
        assert_eq!(
            columns[1].as_annotation().and_then(Annotation::value),
            Some(&Value::from("name"))
        );
        assert_eq!(collection.classes(), vec!["App\\Orm\\Column", "App\\Orm\\Index"]);
        assert_eq!(
            collection.first("App\\Orm\\Column").and_then(Value::as_annotation).map(Annotation::short_name),
            Some("Column")
        );
        assert!(!collection.contains("Missing"));
    }
}
