//! Article-list request parameters.
//!
//! `QueryParams` is the raw request: names mapped to optional scalars, where
//! `None` stands for a parameter the caller left undefined. Routing only ever
//! looks at `NormalizedParams`, which has undefined and blank values removed.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A scalar request parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Returns the text payload, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(value) => Some(value),
            _ => None,
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, ParamValue::Text(value) if value.trim().is_empty())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(value) => write!(f, "{value}"),
            ParamValue::Int(value) => write!(f, "{value}"),
            ParamValue::Float(value) => write!(f, "{value}"),
            ParamValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(ParamValue::Int)
            .unwrap_or_else(|_| ParamValue::Text(value.to_string()))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

/// Raw article-list request parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    entries: BTreeMap<String, Option<ParamValue>>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a defined parameter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.entries.insert(name.into(), Some(value.into()));
        self
    }

    /// Set a parameter that may be undefined.
    pub fn with_opt<V: Into<ParamValue>>(mut self, name: impl Into<String>, value: Option<V>) -> Self {
        self.entries.insert(name.into(), value.map(Into::into));
        self
    }

    /// Parse an `application/x-www-form-urlencoded` query string.
    ///
    /// A leading `?` is ignored. Repeated names keep the last value.
    pub fn from_query_str(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        url::form_urlencoded::parse(query.as_bytes())
            .map(|(name, value)| (name.into_owned(), Some(value.into_owned())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop undefined and blank values.
    pub fn normalize(&self) -> NormalizedParams {
        let entries = self
            .entries
            .iter()
            .filter_map(|(name, value)| match value {
                Some(value) if !value.is_blank() => Some((name.clone(), value.clone())),
                _ => None,
            })
            .collect();
        NormalizedParams { entries }
    }
}

impl<K, V> FromIterator<(K, Option<V>)> for QueryParams
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        let entries = iter
            .into_iter()
            .map(|(name, value)| (name.into(), value.map(Into::into)))
            .collect();
        Self { entries }
    }
}

/// Parameters with every filtering-irrelevant entry removed.
///
/// Two requests that differ only in field order or in undefined/blank fields
/// normalize to equal values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedParams {
    entries: BTreeMap<String, ParamValue>,
}

impl NormalizedParams {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.get(name)
    }

    /// The value as it appears in cache keys.
    pub fn rendered(&self, name: &str) -> Option<String> {
        self.entries.get(name).map(ToString::to_string)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
