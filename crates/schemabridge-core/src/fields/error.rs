//! Nested error mappings reported by derived validation

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Errors of a derived field or schema.
///
/// Scalars report a list of messages, schemas and mappings report a mapping
/// from key to nested detail, and lists report a mapping from item index.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Messages(Vec<String>),
    Fields(BTreeMap<String, ErrorDetail>),
    Items(BTreeMap<usize, ErrorDetail>),
}

impl ErrorDetail {
    pub fn message(message: impl Into<String>) -> Self {
        ErrorDetail::Messages(vec![message.into()])
    }

    /// A mapping holding one message under `key`
    pub fn keyed(key: impl Into<String>, message: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(key.into(), ErrorDetail::message(message));
        ErrorDetail::Fields(fields)
    }

    /// Messages of a leaf; empty for mappings
    pub fn messages(&self) -> &[String] {
        match self {
            ErrorDetail::Messages(messages) => messages,
            _ => &[],
        }
    }

    pub fn get(&self, key: &str) -> Option<&ErrorDetail> {
        match self {
            ErrorDetail::Fields(fields) => fields.get(key),
            _ => None,
        }
    }

    pub fn item(&self, index: usize) -> Option<&ErrorDetail> {
        match self {
            ErrorDetail::Items(items) => items.get(&index),
            _ => None,
        }
    }

    pub fn keys(&self) -> Vec<&str> {
        match self {
            ErrorDetail::Fields(fields) => fields.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ErrorDetail::Messages(messages) => messages.is_empty(),
            ErrorDetail::Fields(fields) => fields.is_empty(),
            ErrorDetail::Items(items) => items.is_empty(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::Value::String(format!("{self:?}")))
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(rendered) => write!(f, "{rendered}"),
            Err(_) => write!(f, "{self:?}"),
        }
    }
}
