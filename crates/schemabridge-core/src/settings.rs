//! Process-wide settings consulted while compiling and validating schemas

use serde::{Deserialize, Serialize};

use crate::config::ConfigBundle;

/// Key of the global error bucket when none is configured
pub const DEFAULT_NON_FIELD_ERRORS_KEY: &str = "non_field_errors";

/// Digit budget applied to decimal fields whose precision is not constrained
pub const DEFAULT_DECIMAL_PRECISION: u32 = 28;

/// Settings shared by every schema built through one registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Error key under which errors not attributable to a field are reported
    pub non_field_errors_key: String,
    /// Default `max_digits` / `decimal_places` for decimal fields
    pub decimal_precision: u32,
    /// Behavior bundle used when neither the model nor its context sets one
    pub default_config: ConfigBundle,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            non_field_errors_key: DEFAULT_NON_FIELD_ERRORS_KEY.to_string(),
            decimal_precision: DEFAULT_DECIMAL_PRECISION,
            default_config: ConfigBundle::default(),
        }
    }
}

impl Settings {
    pub fn with_non_field_errors_key(mut self, key: impl Into<String>) -> Self {
        self.non_field_errors_key = key.into();
        self
    }

    pub fn with_decimal_precision(mut self, precision: u32) -> Self {
        self.decimal_precision = precision;
        self
    }

    pub fn with_default_config(mut self, config: ConfigBundle) -> Self {
        self.default_config = config;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.non_field_errors_key, "non_field_errors");
        assert_eq!(settings.decimal_precision, 28);
        assert!(!settings.default_config.validate_against_source);
    }

    #[test]
    fn test_partial_deserialization_keeps_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"non_field_errors_key": "__all__"}"#).unwrap();
        assert_eq!(settings.non_field_errors_key, "__all__");
        assert_eq!(settings.decimal_precision, DEFAULT_DECIMAL_PRECISION);
    }
}
