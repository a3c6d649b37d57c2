//! Per-model behavior bundles and their resolution
//!
//! A model may declare a partial bundle. The effective bundle for a model is
//! resolved per key in this order:
//!
//! 1. the model's own explicit value
//! 2. the nearest ancestor (via `extends`) that sets the key
//! 3. the bundle of the enclosing schema, when the model is validated as a
//!    nested value
//! 4. the process-wide default from [`Settings`](crate::Settings)
//!
//! A derived schema stores its bundle resolved against the default. Nested
//! validation re-resolves on top of the enclosing bundle, so the outcome does
//! not depend on which model was compiled first.

use serde::{Deserialize, Serialize};

use crate::source::SourceModel;

/// Which side's errors are surfaced when source validation fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorAuthority {
    /// Source errors are translated into the derived error shape
    #[default]
    Derived,
    /// Source errors propagate to the caller untranslated
    Source,
}

impl std::fmt::Display for ErrorAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorAuthority::Derived => write!(f, "derived"),
            ErrorAuthority::Source => write!(f, "source"),
        }
    }
}

/// Fully-resolved behavior of a derived schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigBundle {
    /// Construct a source instance from validated data after derived validation passes
    pub validate_against_source: bool,
    /// Whose errors win when source validation fails
    pub error_authority: ErrorAuthority,
    /// Overwrite validated data with the source instance's attribute values
    pub backpopulate: bool,
}

impl Default for ConfigBundle {
    fn default() -> Self {
        Self {
            validate_against_source: false,
            error_authority: ErrorAuthority::Derived,
            backpopulate: true,
        }
    }
}

impl ConfigBundle {
    /// Apply every key the partial bundle sets
    pub fn overlay(self, partial: &PartialConfig) -> Self {
        Self {
            validate_against_source: partial
                .validate_against_source
                .unwrap_or(self.validate_against_source),
            error_authority: partial.error_authority.unwrap_or(self.error_authority),
            backpopulate: partial.backpopulate.unwrap_or(self.backpopulate),
        }
    }
}

/// A bundle as declared on a model, where unset keys are inherited
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate_against_source: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_authority: Option<ErrorAuthority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backpopulate: Option<bool>,
}

impl PartialConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate_against_source(mut self, enabled: bool) -> Self {
        self.validate_against_source = Some(enabled);
        self
    }

    pub fn error_authority(mut self, authority: ErrorAuthority) -> Self {
        self.error_authority = Some(authority);
        self
    }

    pub fn backpopulate(mut self, enabled: bool) -> Self {
        self.backpopulate = Some(enabled);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.validate_against_source.is_none()
            && self.error_authority.is_none()
            && self.backpopulate.is_none()
    }
}

/// Resolve the effective bundle for `model` on top of `base`.
///
/// `base` is either the enclosing bundle (nested validation) or the
/// settings default (top-level validation).
pub fn resolve_config(model: &SourceModel, base: ConfigBundle) -> ConfigBundle {
    let mut chain = Vec::new();
    let mut current = Some(model);
    while let Some(model) = current {
        if let Some(partial) = model.explicit_config() {
            chain.push(*partial);
        }
        current = model.parent().map(|parent| parent.as_ref());
    }

    // farthest ancestor first so the nearest declaration wins
    chain
        .iter()
        .rev()
        .fold(base, |bundle, partial| bundle.overlay(partial))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_only_touches_set_keys() {
        let base = ConfigBundle::default();
        let partial = PartialConfig::new().backpopulate(false);
        let resolved = base.overlay(&partial);
        assert!(!resolved.backpopulate);
        assert_eq!(resolved.error_authority, ErrorAuthority::Derived);
        assert!(!resolved.validate_against_source);
    }

    #[test]
    fn test_transitive_inheritance() {
        let grandparent = SourceModel::derived("Grandparent")
            .config(PartialConfig::new().validate_against_source(true))
            .build();
        let parent = SourceModel::derived("Parent")
            .extends(&grandparent)
            .config(PartialConfig::new().error_authority(ErrorAuthority::Source))
            .build();
        let child = SourceModel::derived("Child")
            .extends(&parent)
            .config(PartialConfig::new().error_authority(ErrorAuthority::Derived))
            .build();

        let resolved = resolve_config(&child, ConfigBundle::default());
        assert!(resolved.validate_against_source);
        assert_eq!(resolved.error_authority, ErrorAuthority::Derived);
        assert!(resolved.backpopulate);
    }

    #[test]
    fn test_enclosing_bundle_fills_unset_keys() {
        let nested = SourceModel::derived("Nested").build();
        let enclosing = ConfigBundle {
            validate_against_source: true,
            error_authority: ErrorAuthority::Source,
            backpopulate: false,
        };
        assert_eq!(resolve_config(&nested, enclosing), enclosing);
    }

    #[test]
    fn test_authority_serde() {
        let partial: PartialConfig =
            serde_json::from_str(r#"{"error_authority": "source"}"#).unwrap();
        assert_eq!(partial.error_authority, Some(ErrorAuthority::Source));
        assert!(serde_json::from_str::<PartialConfig>(r#"{"bogus": true}"#).is_err());
    }
}
