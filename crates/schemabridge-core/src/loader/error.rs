//! Error types for model document loading

use std::path::PathBuf;
use thiserror::Error;

/// Result type for loader operations
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Errors raised while reading a model document and building its models
#[derive(Error, Debug)]
pub enum LoaderError {
    /// File I/O errors
    #[error("Failed to read file '{path}': {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// YAML parsing errors
    #[error("Failed to parse YAML document '{origin}': {source}")]
    YamlParseError {
        origin: String,
        source: serde_yaml::Error,
    },

    /// JSON parsing errors
    #[error("Failed to parse JSON document '{origin}': {source}")]
    JsonParseError {
        origin: String,
        source: serde_json::Error,
    },

    /// Unsupported file format
    #[error("Unsupported file format for '{path}'. Expected .yaml, .yml, or .json")]
    UnsupportedFormat { path: PathBuf },

    /// Two enums or models share a name
    #[error("Duplicate definition of '{name}'")]
    DuplicateName { name: String },

    /// A model extends a name that is not a model in the document
    #[error("Model '{model}' extends unknown model '{parent}'")]
    UnknownParent { model: String, parent: String },

    /// Circular `extends` chain
    #[error("Circular inheritance detected: {chain}")]
    CircularInheritance { chain: String },

    /// A field type expression could not be parsed
    #[error("Invalid type '{expr}' for field '{model}.{field}' at position {position}: {message}")]
    TypeExpression {
        model: String,
        field: String,
        expr: String,
        position: usize,
        message: String,
    },

    /// A field declaration is inconsistent
    #[error("Invalid field '{model}.{field}': {reason}")]
    InvalidField {
        model: String,
        field: String,
        reason: String,
    },
}

impl LoaderError {
    /// Create an I/O error with path context
    pub fn io_error(path: PathBuf, error: std::io::Error) -> Self {
        Self::IoError {
            path,
            source: error,
        }
    }

    /// Create a YAML parsing error with origin context
    pub fn yaml_parse_error(origin: impl Into<String>, error: serde_yaml::Error) -> Self {
        Self::YamlParseError {
            origin: origin.into(),
            source: error,
        }
    }

    /// Create a JSON parsing error with origin context
    pub fn json_parse_error(origin: impl Into<String>, error: serde_json::Error) -> Self {
        Self::JsonParseError {
            origin: origin.into(),
            source: error,
        }
    }

    pub fn unsupported_format(path: PathBuf) -> Self {
        Self::UnsupportedFormat { path }
    }

    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Self::DuplicateName { name: name.into() }
    }

    /// Create a circular inheritance error from the chain of model names
    pub fn circular_inheritance(chain: &[String]) -> Self {
        Self::CircularInheritance {
            chain: chain.join(" -> "),
        }
    }

    pub fn invalid_field(
        model: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            model: model.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error came from reading or parsing the document itself
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::IoError { .. }
                | Self::YamlParseError { .. }
                | Self::JsonParseError { .. }
                | Self::UnsupportedFormat { .. }
        )
    }
}
