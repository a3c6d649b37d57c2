//! Error types and handling for the CLI
//!
//! Every failure maps to a distinct process exit code.

use std::io;
use std::path::PathBuf;

use schemabridge_core::loader::LoaderError;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for CLI operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error from schemabridge-core
    #[error("{0}")]
    Core(#[from] schemabridge_core::Error),

    /// File not found
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Invalid file format
    #[error("Invalid file format for {}: expected {} format", path.display(), expected)]
    InvalidFormat { path: PathBuf, expected: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The requested model is not part of the document
    #[error("Model '{name}' not found; available models: {}", available.join(", "))]
    ModelNotFound { name: String, available: Vec<String> },

    /// The data did not validate
    #[error("Validation of '{model}' failed")]
    ValidationFailed { model: String },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML deserialization error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic error with context
    #[error("{message}")]
    Other { message: String },
}

impl From<LoaderError> for Error {
    fn from(err: LoaderError) -> Self {
        Self::Core(err.into())
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a generic error with message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ValidationFailed { .. } => 1,
            Self::Core(_) => 2,
            Self::FileNotFound { .. } => 3,
            Self::InvalidFormat { .. } => 4,
            Self::Config(_) => 5,
            Self::ModelNotFound { .. } => 6,
            Self::Io(_) => 10,
            Self::Json(_) => 12,
            Self::Yaml(_) => 13,
            Self::Toml(_) => 14,
            Self::Other { .. } => 99,
        }
    }

    /// Check if this error should display usage help
    pub fn should_show_help(&self) -> bool {
        matches!(self, Self::ModelNotFound { .. })
    }
}

/// Format an error for display to the user
pub fn format_error(error: &Error, use_color: bool) -> String {
    let headline = match error {
        Error::Core(schemabridge_core::Error::ModelConversion(_)) => "Conversion failed:",
        Error::Core(schemabridge_core::Error::Loader(_)) => "Invalid model document:",
        _ => "Error:",
    };

    if use_color {
        use colored::Colorize;
        format!("{} {}", headline.red().bold(), error)
    } else {
        format!("{} {}", headline, error)
    }
}
