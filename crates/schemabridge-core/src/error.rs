//! Error types for the Schemabridge core library
//!
//! Three families of failure exist and are kept apart:
//!
//! - **Conversion** errors are raised while compiling a source model into a
//!   derived schema. They are fatal for that model and carry every per-field
//!   failure collected during the build ([`ModelConversionError`]).
//! - **Validation** failures are raised while validating input data against a
//!   bound schema ([`ValidationFailure`]). They either carry a derived
//!   error mapping or the untranslated source-model error.
//! - **Ambient** errors wrap I/O and document parsing failures.
//!
//! Copyright (c) 2025 Schemabridge Team
//! Licensed under the Apache-2.0 license

use std::fmt;
use thiserror::Error;

use crate::fields::ErrorDetail;
use crate::loader::LoaderError;
use crate::source::SourceValidationError;

/// Main error type for Schemabridge operations
#[derive(Error, Debug)]
pub enum Error {
    /// A source model could not be compiled into a derived schema
    #[error(transparent)]
    ModelConversion(#[from] ModelConversionError),

    /// The model never opted into schema derivation
    #[error("Model '{model}' is a plain source model and cannot be compiled into a derived schema")]
    NotDerivable { model: String },

    /// Input data failed validation
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationFailure),

    /// A model document could not be loaded
    #[error(transparent)]
    Loader(#[from] LoaderError),

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// YAML parsing errors
    #[error("YAML error: {message}")]
    Yaml {
        message: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// A single field that could not be converted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct FieldConversionError {
    /// Attribute name of the failing field
    pub field: String,
    /// Human-readable reason
    pub message: String,
}

impl FieldConversionError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Aggregated failure for one model build.
///
/// The rendered message starts with `Error when converting model: <Model>`
/// followed by each failing field name and, indented beneath it, the reason.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ModelConversionError {
    pub model: String,
    pub failures: Vec<FieldConversionError>,
}

impl ModelConversionError {
    pub fn new(model: impl Into<String>, failures: Vec<FieldConversionError>) -> Self {
        Self {
            model: model.into(),
            failures,
        }
    }

    /// Look up the failure recorded for a field
    pub fn failure(&self, field: &str) -> Option<&FieldConversionError> {
        self.failures.iter().find(|failure| failure.field == field)
    }

    /// Names of all failing fields, in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|failure| failure.field.as_str())
    }
}

impl fmt::Display for ModelConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error when converting model: {}", self.model)?;
        for failure in &self.failures {
            write!(f, "\n  {}", failure.field)?;
            for line in failure.message.lines() {
                write!(f, "\n    {line}")?;
            }
        }
        Ok(())
    }
}

/// Outcome of a failed validation run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationFailure {
    /// Derived-schema errors, or source errors translated into derived shape
    #[error("{0}")]
    Invalid(ErrorDetail),

    /// The source model's own error, passed through untranslated
    #[error(transparent)]
    Source(SourceValidationError),
}

impl ValidationFailure {
    /// The error mapping, when the failure is in derived shape
    pub fn detail(&self) -> Option<&ErrorDetail> {
        match self {
            ValidationFailure::Invalid(detail) => Some(detail),
            ValidationFailure::Source(_) => None,
        }
    }

    /// The untranslated source error, when the source model has error authority
    pub fn source_error(&self) -> Option<&SourceValidationError> {
        match self {
            ValidationFailure::Invalid(_) => None,
            ValidationFailure::Source(err) => Some(err),
        }
    }

    pub fn is_source(&self) -> bool {
        matches!(self, ValidationFailure::Source(_))
    }
}

impl From<ErrorDetail> for ValidationFailure {
    fn from(detail: ErrorDetail) -> Self {
        ValidationFailure::Invalid(detail)
    }
}

impl From<SourceValidationError> for ValidationFailure {
    fn from(err: SourceValidationError) -> Self {
        ValidationFailure::Source(err)
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Yaml {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_conversion_display() {
        let err = ModelConversionError::new(
            "Person",
            vec![
                FieldConversionError::new("tags", "Field has multiple regex patterns: [\"a\", \"b\"]"),
                FieldConversionError::new("mixed", "Union is not supported"),
            ],
        );
        let rendered = err.to_string();
        assert!(rendered.starts_with("Error when converting model: Person"));
        assert!(rendered.contains("\n  tags\n    Field has multiple regex patterns"));
        assert!(rendered.contains("\n  mixed\n    Union is not supported"));
    }

    #[test]
    fn test_nested_conversion_message_is_indented() {
        let inner = ModelConversionError::new(
            "Child",
            vec![FieldConversionError::new("value", "bad")],
        );
        let outer = ModelConversionError::new(
            "Parent",
            vec![FieldConversionError::new("child", inner.to_string())],
        );
        let rendered = outer.to_string();
        assert!(rendered.contains("\n    Error when converting model: Child"));
        assert!(rendered.contains("\n        value"));
    }

    #[test]
    fn test_failure_lookup() {
        let err = ModelConversionError::new(
            "Person",
            vec![FieldConversionError::new("age", "nope")],
        );
        assert_eq!(err.failure("age").map(|f| f.message.as_str()), Some("nope"));
        assert!(err.failure("name").is_none());
        assert_eq!(err.fields().collect::<Vec<_>>(), vec!["age"]);
    }

    #[test]
    fn test_validation_failure_accessors() {
        let failure = ValidationFailure::from(ErrorDetail::message("This field is required."));
        assert!(!failure.is_source());
        assert!(failure.detail().is_some());
        assert!(failure.source_error().is_none());
    }
}
