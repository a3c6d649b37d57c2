//! Serde structures of a model document

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::config::PartialConfig;
use crate::source::Constraint;

/// Top-level document: enumerations and models
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDocument {
    #[serde(default)]
    pub enums: Vec<EnumDocument>,
    #[serde(default)]
    pub models: Vec<ModelDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumDocument {
    pub name: String,
    pub members: EnumMembers,
}

/// Members as `NAME: value` pairs, or as bare names whose value is the name
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumMembers {
    Names(Vec<String>),
    Values(Map<String, Value>),
}

impl EnumMembers {
    pub fn pairs(&self) -> Vec<(String, Value)> {
        match self {
            EnumMembers::Names(names) => names
                .iter()
                .map(|name| (name.clone(), Value::String(name.clone())))
                .collect(),
            EnumMembers::Values(values) => values
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDoc {
    pub name: String,
    /// Opt out of schema derivation
    #[serde(default)]
    pub plain: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<PartialConfig>,
    #[serde(default)]
    pub fields: Vec<FieldDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDocument {
    pub name: String,
    /// Type expression; a field without one fails conversion
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_expr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    /// `Some(Value::Null)` for an explicit `default: null`
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serialization_alias: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<ConstraintDocument>,
}

fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// One metadata item; the keys present select the constraint kinds it yields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstraintDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ge: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub le: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_digits: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal_places: Option<u32>,
}

impl ConstraintDocument {
    /// Expand into constraint metadata, in a fixed order
    pub fn to_constraints(&self) -> Vec<Constraint> {
        let mut constraints = Vec::new();
        if self.min_length.is_some() || self.max_length.is_some() || self.pattern.is_some() {
            constraints.push(Constraint::StringConstraints {
                min_length: self.min_length,
                max_length: self.max_length,
                pattern: self.pattern.clone(),
            });
        }
        constraints.extend(self.ge.map(Constraint::Ge));
        constraints.extend(self.gt.map(Constraint::Gt));
        constraints.extend(self.le.map(Constraint::Le));
        constraints.extend(self.lt.map(Constraint::Lt));
        if self.max_digits.is_some() || self.decimal_places.is_some() {
            constraints.push(Constraint::precision(self.max_digits, self.decimal_places));
        }
        constraints
    }

    pub fn is_empty(&self) -> bool {
        self.to_constraints().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_explicit_null_default_is_present() {
        let field: FieldDocument =
            serde_json::from_value(json!({"name": "x", "type": "str | None", "default": null}))
                .unwrap();
        assert_eq!(field.default, Some(Value::Null));

        let field: FieldDocument = serde_json::from_value(json!({"name": "x"})).unwrap();
        assert_eq!(field.default, None);
        assert!(field.type_expr.is_none());
    }

    #[test]
    fn test_unknown_field_key_rejected() {
        let result: Result<FieldDocument, _> =
            serde_json::from_value(json!({"name": "x", "kind": "str"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_constraint_document_expansion() {
        let doc = ConstraintDocument {
            pattern: Some("^a".into()),
            ge: Some(1.0),
            max_digits: Some(5),
            ..Default::default()
        };
        let constraints = doc.to_constraints();
        assert_eq!(constraints.len(), 3);
        assert!(matches!(constraints[1], Constraint::Ge(v) if v == 1.0));
        assert!(ConstraintDocument::default().is_empty());
    }

    #[test]
    fn test_enum_members_forms() {
        let names: EnumMembers = serde_json::from_value(json!(["A", "B"])).unwrap();
        assert_eq!(names.pairs()[1], ("B".to_string(), json!("B")));

        let values: EnumMembers = serde_json::from_value(json!({"LOW": 1, "HIGH": 2})).unwrap();
        assert_eq!(values.pairs()[0], ("LOW".to_string(), json!(1)));
    }
}
