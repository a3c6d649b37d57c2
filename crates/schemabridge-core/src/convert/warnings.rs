//! Tracking of lossy approximations made during conversion

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// What kind of approximation a warning describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCode {
    /// An exclusive numeric bound was applied as inclusive
    ExclusiveBound,
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningCode::ExclusiveBound => write!(f, "exclusive_bound"),
        }
    }
}

/// One approximation recorded while converting a field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionWarning {
    pub code: WarningCode,
    pub model: String,
    pub field: String,
    pub message: String,
    /// The bound as declared
    pub declared: Option<Value>,
}

/// Collects warnings for one model build and mirrors them to the log
#[derive(Debug)]
pub(crate) struct WarningTracker {
    model: String,
    items: Vec<ConversionWarning>,
}

impl WarningTracker {
    pub(crate) fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            items: Vec::new(),
        }
    }

    pub(crate) fn add_exclusive_bound(&mut self, field: &str, message: &str, declared: f64) {
        warn!(model = %self.model, field, "{message}");
        self.items.push(ConversionWarning {
            code: WarningCode::ExclusiveBound,
            model: self.model.clone(),
            field: field.to_string(),
            message: message.to_string(),
            declared: Some(Value::from(declared)),
        });
    }

    pub(crate) fn items(&self) -> &[ConversionWarning] {
        &self.items
    }

    pub(crate) fn into_items(self) -> Vec<ConversionWarning> {
        self.items
    }
}
