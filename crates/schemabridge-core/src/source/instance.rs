//! Source instances and the errors source validation produces

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

use super::model::{ModelId, SourceModel};

/// An attribute value held by a source instance
#[derive(Debug, Clone, PartialEq)]
pub enum SourceValue {
    Value(Value),
    Instance(SourceInstance),
    List(Vec<SourceValue>),
    /// Mapping with preserved key order
    Map(Vec<(String, SourceValue)>),
}

impl SourceValue {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            SourceValue::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&SourceInstance> {
        match self {
            SourceValue::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_value().and_then(Value::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_value().and_then(Value::as_f64)
    }

    /// Plain data view: nested instances become objects keyed by attribute name
    pub fn to_primitive(&self) -> Value {
        match self {
            SourceValue::Value(value) => value.clone(),
            SourceValue::Instance(instance) => instance.to_primitive(),
            SourceValue::List(items) => Value::Array(items.iter().map(SourceValue::to_primitive).collect()),
            SourceValue::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_primitive()))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for SourceValue {
    fn from(value: Value) -> Self {
        SourceValue::Value(value)
    }
}

impl From<SourceInstance> for SourceValue {
    fn from(instance: SourceInstance) -> Self {
        SourceValue::Instance(instance)
    }
}

/// A constructed, validated source-model instance
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInstance {
    model: ModelId,
    model_name: String,
    attributes: Vec<(String, SourceValue)>,
}

impl SourceInstance {
    pub fn new(model: &SourceModel, attributes: Vec<(String, SourceValue)>) -> Self {
        Self {
            model: model.id(),
            model_name: model.name().to_string(),
            attributes,
        }
    }

    pub fn model_id(&self) -> ModelId {
        self.model
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn attributes(&self) -> &[(String, SourceValue)] {
        &self.attributes
    }

    pub fn get(&self, name: &str) -> Option<&SourceValue> {
        self.attributes
            .iter()
            .find(|(attribute, _)| attribute == name)
            .map(|(_, value)| value)
    }

    /// Primitive attribute value
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(SourceValue::as_value)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<SourceValue>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(attribute, _)| *attribute == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<SourceValue> {
        let index = self.attributes.iter().position(|(attribute, _)| attribute == name)?;
        Some(self.attributes.remove(index).1)
    }

    pub fn to_primitive(&self) -> Value {
        Value::Object(
            self.attributes
                .iter()
                .map(|(key, value)| (key.clone(), value.to_primitive()))
                .collect::<Map<String, Value>>(),
        )
    }
}

/// One segment of an error location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocSegment {
    Field(String),
    Index(usize),
}

impl LocSegment {
    pub fn as_field(&self) -> Option<&str> {
        match self {
            LocSegment::Field(name) => Some(name),
            LocSegment::Index(_) => None,
        }
    }
}

impl From<&str> for LocSegment {
    fn from(name: &str) -> Self {
        LocSegment::Field(name.to_string())
    }
}

impl From<String> for LocSegment {
    fn from(name: String) -> Self {
        LocSegment::Field(name)
    }
}

impl From<usize> for LocSegment {
    fn from(index: usize) -> Self {
        LocSegment::Index(index)
    }
}

impl fmt::Display for LocSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocSegment::Field(name) => write!(f, "{name}"),
            LocSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// One located error reported by source validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceErrorItem {
    pub loc: Vec<LocSegment>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl SourceErrorItem {
    pub fn new(loc: Vec<LocSegment>, msg: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            loc,
            msg: msg.into(),
            kind: kind.into(),
        }
    }

    pub fn missing(loc: Vec<LocSegment>) -> Self {
        Self::new(loc, "Field required", "missing")
    }

    pub fn value_error(loc: Vec<LocSegment>, message: &str) -> Self {
        Self::new(loc, format!("Value error, {message}"), "value_error")
    }

    /// Prepend `prefix` to this error's location
    pub fn rooted_at(mut self, prefix: &[LocSegment]) -> Self {
        let mut loc = prefix.to_vec();
        loc.append(&mut self.loc);
        self.loc = loc;
        self
    }

    /// JSON record `{"loc", "msg", "type"}`; falls back to the plain message
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.msg.clone())
    }

    fn location(&self) -> String {
        self.loc
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Failure raised by a source model's own validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct SourceValidationError {
    pub model: String,
    pub errors: Vec<SourceErrorItem>,
}

impl SourceValidationError {
    pub fn new(model: impl Into<String>, errors: Vec<SourceErrorItem>) -> Self {
        Self {
            model: model.into(),
            errors,
        }
    }

    pub fn errors(&self) -> &[SourceErrorItem] {
        &self.errors
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

impl fmt::Display for SourceValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.errors.len();
        let noun = if count == 1 { "error" } else { "errors" };
        write!(f, "{count} validation {noun} for {}", self.model)?;
        for error in &self.errors {
            let location = error.location();
            if !location.is_empty() {
                write!(f, "\n{location}")?;
            }
            write!(f, "\n  {} [type={}]", error.msg, error.kind)?;
        }
        Ok(())
    }
}
