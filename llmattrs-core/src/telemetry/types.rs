use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use serde::{Deserialize, Serialize};

/// A single span attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Int(i64),
    String(String),
    /// Embedding vectors.
    FloatArray(Vec<f64>),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            Self::FloatArray(v) => Some(v),
            _ => None,
        }
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for AttributeValue {
    fn from(v: u64) -> Self {
        // Token counts never get near i64::MAX; saturate rather than wrap.
        Self::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<Vec<f64>> for AttributeValue {
    fn from(v: Vec<f64>) -> Self {
        Self::FloatArray(v)
    }
}

/// Flat, dotted-key attribute mapping produced for one call.
///
/// Ordered so that extracting the same payload twice serialises byte-identically.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeMap(BTreeMap<String, AttributeValue>);

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, overwriting any earlier value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Fluent form of `insert`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(AttributeValue::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(AttributeValue::as_i64)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<AttributeValue> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Overwrite-merge `other` into `self`.
    pub fn extend(&mut self, other: AttributeMap) {
        self.0.extend(other.0);
    }

    /// Re-key every entry as `<prefix>.<key>`.
    pub fn prefixed(self, prefix: &str) -> AttributeMap {
        self.0
            .into_iter()
            .map(|(k, v)| (format!("{prefix}.{k}"), v))
            .collect()
    }

    /// Merge with string-append semantics.
    ///
    /// - absent key: set to the incoming value
    /// - both strings: concatenate in arrival order
    /// - existing non-string: the incoming value is dropped
    pub fn append_merge(&mut self, other: AttributeMap) {
        for (key, incoming) in other.0 {
            match self.0.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(incoming);
                }
                Entry::Occupied(mut slot) => {
                    if let (AttributeValue::String(existing), AttributeValue::String(tail)) =
                        (slot.get_mut(), &incoming)
                    {
                        existing.push_str(tail);
                    }
                }
            }
        }
    }
}

impl FromIterator<(String, AttributeValue)> for AttributeMap {
    fn from_iter<I: IntoIterator<Item = (String, AttributeValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for AttributeMap {
    type Item = (String, AttributeValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// OpenInference span kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpanKind {
    Llm,
    Embedding,
}

impl SpanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Llm => "LLM",
            Self::Embedding => "EMBEDDING",
        }
    }
}
