//! Serializable descriptions of derived schemas

use serde::Serialize;
use serde_json::Value;

use crate::config::ConfigBundle;
use crate::convert::ConversionWarning;
use crate::fields::{DerivedField, FieldKind};
use crate::schema::DerivedSchema;

/// A derived schema as plain data
#[derive(Debug, Clone, Serialize)]
pub struct SchemaDescription {
    pub name: String,
    pub model: String,
    pub config: ConfigBundle,
    pub manual: bool,
    pub fields: Vec<FieldDescription>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ConversionWarning>,
}

/// A derived field as plain data
#[derive(Debug, Clone, Serialize)]
pub struct FieldDescription {
    pub name: String,
    pub kind: String,
    pub validation_key: String,
    pub serialization_key: String,
    pub required: bool,
    pub allow_null: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_blank: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_digits: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimal_places: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child: Option<Box<FieldDescription>>,
    /// Name of the nested schema; nested schemas are not expanded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

impl FieldDescription {
    pub fn of(field: &DerivedField) -> Self {
        let schema = match field.kind() {
            FieldKind::Nested(link) => Some(link.schema_name().to_string()),
            _ => None,
        };
        Self {
            name: field.name().to_string(),
            kind: field.kind_name().to_string(),
            validation_key: field.validation_key().to_string(),
            serialization_key: field.serialization_key().to_string(),
            required: field.is_required(),
            allow_null: field.allows_null(),
            default: field.default_value().cloned(),
            help_text: field.help_text_str().map(str::to_string),
            label: field.label_str().map(str::to_string),
            min_length: field.min_length(),
            max_length: field.max_length(),
            allow_blank: field.allows_blank(),
            min_value: field.min_value(),
            max_value: field.max_value(),
            max_digits: field.max_digits(),
            decimal_places: field.decimal_places(),
            pattern: field.pattern().map(str::to_string),
            choices: field.choices(),
            child: field.child().map(|child| Box::new(FieldDescription::of(child))),
            schema,
        }
    }
}

impl DerivedSchema {
    pub fn describe(&self) -> SchemaDescription {
        SchemaDescription {
            name: self.name().to_string(),
            model: self.model().name().to_string(),
            config: *self.config(),
            manual: self.is_manual(),
            fields: self.fields().iter().map(FieldDescription::of).collect(),
            warnings: self.warnings().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Constraint, FieldDescriptor, SourceModel, TypeAnnotation};
    use crate::SchemaRegistry;

    #[test]
    fn test_describe_fields() {
        let model = SourceModel::derived("Product")
            .field(
                FieldDescriptor::new("code", TypeAnnotation::Str)
                    .constraint(Constraint::pattern(r"^[A-Z]{3}$"))
                    .description("Product code"),
            )
            .field(FieldDescriptor::new("tags", TypeAnnotation::list(TypeAnnotation::Str)).default(Value::Array(vec![])))
            .build();
        let registry = SchemaRegistry::new();
        let description = registry.get_or_build(&model).unwrap().describe();

        assert_eq!(description.name, "ProductSchema");
        assert_eq!(description.fields[0].kind, "RegexField");
        assert_eq!(description.fields[0].pattern.as_deref(), Some(r"^[A-Z]{3}$"));
        assert_eq!(description.fields[0].help_text.as_deref(), Some("Product code"));
        assert_eq!(description.fields[0].allow_blank, Some(false));
        assert_eq!(description.fields[1].kind, "ListField");
        assert_eq!(description.fields[1].child.as_ref().map(|c| c.kind.as_str()), Some("CharField"));
        assert!(!description.fields[1].required);

        let rendered = serde_json::to_value(&description).unwrap();
        assert!(rendered["fields"][1].get("pattern").is_none());
    }
}
