//! Derived fields: the validation and representation units of a derived schema
//!
//! Every supported source type resolves to exactly one [`FieldKind`]. A
//! [`DerivedField`] pairs that kind with its [`FieldOptions`] (required,
//! default, nullability, documentation) and the keys it reads and writes.
//!
//! Validation follows a fixed order: missing input falls back to the default
//! or fails when required, null input is accepted only when nullable, and
//! everything else goes through the kind's coercion and checks.
//!
//! Copyright (c) 2025 Schemabridge Team
//! Licensed under the Apache-2.0 license

mod error;
mod numeric;
mod temporal;
mod text;

pub use error::ErrorDetail;
pub use numeric::NumericBounds;
pub use text::TextRules;

use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};

use crate::config::{resolve_config, ConfigBundle};
use crate::coordinator;
use crate::error::ValidationFailure;
use crate::schema::DerivedSchema;
use crate::source::{EnumInput, EnumType, ModelId, SourceValue};

/// Presence, default and documentation options shared by all field kinds
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOptions {
    pub required: bool,
    pub default: Option<Value>,
    pub allow_null: bool,
    pub help_text: Option<String>,
    pub label: Option<String>,
}

impl Default for FieldOptions {
    fn default() -> Self {
        Self {
            required: true,
            default: None,
            allow_null: false,
            help_text: None,
            label: None,
        }
    }
}

/// Allowed values of a choice field
#[derive(Debug, Clone, PartialEq)]
pub enum ChoiceSet {
    /// Literal values
    Values(Vec<Value>),
    /// Members of an enumeration, matched by value or name
    Enum(Arc<EnumType>),
}

impl ChoiceSet {
    pub fn values(&self) -> Vec<Value> {
        match self {
            ChoiceSet::Values(values) => values.clone(),
            ChoiceSet::Enum(enum_type) => enum_type.values(),
        }
    }
}

/// A compiled regular expression that remembers its source
#[derive(Debug, Clone)]
pub struct FieldPattern {
    source: String,
    regex: Regex,
}

impl FieldPattern {
    pub fn new(source: impl Into<String>) -> Result<Self, regex::Error> {
        let source = source.into();
        let regex = Regex::new(&source)?;
        Ok(Self { source, regex })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

impl PartialEq for FieldPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Link from a nested field to the schema it validates with.
///
/// Back-edges of self-referential schemas are held weakly.
#[derive(Clone)]
pub struct SchemaLink {
    model: ModelId,
    name: String,
    target: LinkTarget,
}

#[derive(Clone)]
enum LinkTarget {
    Strong(Arc<DerivedSchema>),
    BackEdge(Weak<DerivedSchema>),
}

impl SchemaLink {
    pub fn strong(schema: &Arc<DerivedSchema>) -> Self {
        Self {
            model: schema.model_id(),
            name: schema.name().to_string(),
            target: LinkTarget::Strong(Arc::clone(schema)),
        }
    }

    pub(crate) fn back_edge(schema: &Arc<DerivedSchema>) -> Self {
        Self {
            model: schema.model_id(),
            name: schema.name().to_string(),
            target: LinkTarget::BackEdge(Arc::downgrade(schema)),
        }
    }

    pub fn get(&self) -> Option<Arc<DerivedSchema>> {
        match &self.target {
            LinkTarget::Strong(schema) => Some(Arc::clone(schema)),
            LinkTarget::BackEdge(schema) => schema.upgrade(),
        }
    }

    pub fn schema_name(&self) -> &str {
        &self.name
    }

    /// Identity of the model whose schema this link points at
    pub fn model_id(&self) -> ModelId {
        self.model
    }

    pub fn is_back_edge(&self) -> bool {
        matches!(self.target, LinkTarget::BackEdge(_))
    }
}

impl fmt::Debug for SchemaLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            LinkTarget::Strong(_) => write!(f, "Strong({})", self.name),
            LinkTarget::BackEdge(_) => write!(f, "BackEdge({})", self.name),
        }
    }
}

/// The validation behavior of a derived field
#[derive(Debug, Clone)]
pub enum FieldKind {
    Boolean,
    Char(TextRules),
    Regex { rules: TextRules, pattern: FieldPattern },
    Email(TextRules),
    Url(TextRules),
    Uuid,
    Integer(NumericBounds),
    Float(NumericBounds),
    Decimal {
        bounds: NumericBounds,
        max_digits: Option<u32>,
        decimal_places: Option<u32>,
    },
    Date,
    Time,
    DateTime,
    Duration,
    Choice(ChoiceSet),
    /// Arbitrary JSON data
    Json,
    List {
        child: Box<DerivedField>,
        allow_empty: bool,
        min_length: Option<usize>,
        max_length: Option<usize>,
    },
    Dict {
        child: Box<DerivedField>,
        allow_empty: bool,
    },
    Nested(SchemaLink),
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Boolean => "BooleanField",
            FieldKind::Char(_) => "CharField",
            FieldKind::Regex { .. } => "RegexField",
            FieldKind::Email(_) => "EmailField",
            FieldKind::Url(_) => "URLField",
            FieldKind::Uuid => "UUIDField",
            FieldKind::Integer(_) => "IntegerField",
            FieldKind::Float(_) => "FloatField",
            FieldKind::Decimal { .. } => "DecimalField",
            FieldKind::Date => "DateField",
            FieldKind::Time => "TimeField",
            FieldKind::DateTime => "DateTimeField",
            FieldKind::Duration => "DurationField",
            FieldKind::Choice(_) => "ChoiceField",
            FieldKind::Json => "JSONField",
            FieldKind::List { .. } => "ListField",
            FieldKind::Dict { .. } => "DictField",
            FieldKind::Nested(_) => "NestedSchema",
        }
    }

    fn list_of(child: DerivedField) -> Self {
        FieldKind::List {
            child: Box::new(child),
            allow_empty: true,
            min_length: None,
            max_length: None,
        }
    }

    fn dict_of(child: DerivedField) -> Self {
        FieldKind::Dict {
            child: Box::new(child),
            allow_empty: true,
        }
    }
}

/// One field of a derived schema
#[derive(Debug, Clone)]
pub struct DerivedField {
    name: String,
    validation_key: String,
    serialization_key: String,
    options: FieldOptions,
    kind: FieldKind,
}

impl DerivedField {
    /// An unbound field of the given kind; it receives its keys when installed on a schema
    pub fn new(kind: FieldKind) -> Self {
        Self::from_parts(kind, FieldOptions::default())
    }

    pub fn from_parts(kind: FieldKind, options: FieldOptions) -> Self {
        Self {
            name: String::new(),
            validation_key: String::new(),
            serialization_key: String::new(),
            options,
            kind,
        }
    }

    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    pub fn char() -> Self {
        Self::new(FieldKind::Char(TextRules::default()))
    }

    pub fn integer() -> Self {
        Self::new(FieldKind::Integer(NumericBounds::default()))
    }

    pub fn float() -> Self {
        Self::new(FieldKind::Float(NumericBounds::default()))
    }

    pub fn json() -> Self {
        Self::new(FieldKind::Json)
    }

    pub fn choice(values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self::new(FieldKind::Choice(ChoiceSet::Values(
            values.into_iter().map(Into::into).collect(),
        )))
    }

    pub fn list(child: DerivedField) -> Self {
        Self::new(FieldKind::list_of(child))
    }

    pub fn dict(child: DerivedField) -> Self {
        Self::new(FieldKind::dict_of(child))
    }

    pub fn required(mut self, required: bool) -> Self {
        self.options.required = required;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.options.default = Some(value.into());
        self.options.required = false;
        self
    }

    pub fn allow_null(mut self, allow_null: bool) -> Self {
        self.options.allow_null = allow_null;
        self
    }

    pub fn help_text(mut self, help_text: impl Into<String>) -> Self {
        self.options.help_text = Some(help_text.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.options.label = Some(label.into());
        self
    }

    pub(crate) fn bind(
        mut self,
        name: impl Into<String>,
        validation_key: impl Into<String>,
        serialization_key: impl Into<String>,
    ) -> Self {
        self.name = name.into();
        self.validation_key = validation_key.into();
        self.serialization_key = serialization_key.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn validation_key(&self) -> &str {
        &self.validation_key
    }

    pub fn serialization_key(&self) -> &str {
        &self.serialization_key
    }

    pub fn options(&self) -> &FieldOptions {
        &self.options
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn is_required(&self) -> bool {
        self.options.required
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.options.default.as_ref()
    }

    pub fn allows_null(&self) -> bool {
        self.options.allow_null
    }

    pub fn help_text_str(&self) -> Option<&str> {
        self.options.help_text.as_deref()
    }

    pub fn label_str(&self) -> Option<&str> {
        self.options.label.as_deref()
    }

    /// Element field of a list or mapping
    pub fn child(&self) -> Option<&DerivedField> {
        match &self.kind {
            FieldKind::List { child, .. } | FieldKind::Dict { child, .. } => Some(child),
            _ => None,
        }
    }

    pub fn nested_schema(&self) -> Option<Arc<DerivedSchema>> {
        match &self.kind {
            FieldKind::Nested(link) => link.get(),
            _ => None,
        }
    }

    pub fn choices(&self) -> Option<Vec<Value>> {
        match &self.kind {
            FieldKind::Choice(choices) => Some(choices.values()),
            _ => None,
        }
    }

    fn text_rules(&self) -> Option<&TextRules> {
        match &self.kind {
            FieldKind::Char(rules)
            | FieldKind::Regex { rules, .. }
            | FieldKind::Email(rules)
            | FieldKind::Url(rules) => Some(rules),
            _ => None,
        }
    }

    fn bounds(&self) -> Option<&NumericBounds> {
        match &self.kind {
            FieldKind::Integer(bounds) | FieldKind::Float(bounds) | FieldKind::Decimal { bounds, .. } => Some(bounds),
            _ => None,
        }
    }

    pub fn min_length(&self) -> Option<usize> {
        match &self.kind {
            FieldKind::List { min_length, .. } => *min_length,
            _ => self.text_rules().and_then(|rules| rules.min_length),
        }
    }

    pub fn max_length(&self) -> Option<usize> {
        match &self.kind {
            FieldKind::List { max_length, .. } => *max_length,
            _ => self.text_rules().and_then(|rules| rules.max_length),
        }
    }

    pub fn allows_blank(&self) -> Option<bool> {
        self.text_rules().map(|rules| rules.allow_blank)
    }

    pub fn min_value(&self) -> Option<f64> {
        self.bounds().and_then(|bounds| bounds.min_value)
    }

    pub fn max_value(&self) -> Option<f64> {
        self.bounds().and_then(|bounds| bounds.max_value)
    }

    pub fn max_digits(&self) -> Option<u32> {
        match &self.kind {
            FieldKind::Decimal { max_digits, .. } => *max_digits,
            _ => None,
        }
    }

    pub fn decimal_places(&self) -> Option<u32> {
        match &self.kind {
            FieldKind::Decimal { decimal_places, .. } => *decimal_places,
            _ => None,
        }
    }

    pub fn pattern(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Regex { pattern, .. } => Some(pattern.as_str()),
            _ => None,
        }
    }

    /// Validate one input value.
    ///
    /// `None` means the key was absent from the input. `Ok(None)` means the
    /// field contributes nothing to the validated data.
    pub fn run_validation(&self, raw: Option<&Value>) -> Result<Option<Value>, ValidationFailure> {
        self.run_validation_within(raw, None)
    }

    /// Validate one input value under the bundle of the enclosing schema.
    ///
    /// Nested schemas resolve their bundle on top of `enclosing`; without
    /// one they use their own resolved bundle.
    pub(crate) fn run_validation_within(
        &self,
        raw: Option<&Value>,
        enclosing: Option<ConfigBundle>,
    ) -> Result<Option<Value>, ValidationFailure> {
        let Some(raw) = raw else {
            if let Some(default) = &self.options.default {
                return Ok(Some(default.clone()));
            }
            if self.options.required {
                return Err(ErrorDetail::message("This field is required.").into());
            }
            return Ok(None);
        };

        if raw.is_null() {
            if self.options.allow_null {
                return Ok(Some(Value::Null));
            }
            return Err(ErrorDetail::message("This field may not be null.").into());
        }

        self.to_internal_value_within(raw, enclosing).map(Some)
    }

    /// Coerce and check a present, non-null input value
    pub fn to_internal_value(&self, raw: &Value) -> Result<Value, ValidationFailure> {
        self.to_internal_value_within(raw, None)
    }

    fn to_internal_value_within(
        &self,
        raw: &Value,
        enclosing: Option<ConfigBundle>,
    ) -> Result<Value, ValidationFailure> {
        let scalar = match &self.kind {
            FieldKind::Boolean => text::to_boolean(raw),
            FieldKind::Char(rules) => text::to_text(rules, raw),
            FieldKind::Regex { rules, pattern } => text::to_matching_text(rules, pattern.regex(), raw),
            FieldKind::Email(rules) => text::to_email(rules, raw),
            FieldKind::Url(rules) => text::to_url(rules, raw),
            FieldKind::Uuid => text::to_uuid(raw),
            FieldKind::Integer(bounds) => numeric::to_integer(bounds, raw),
            FieldKind::Float(bounds) => numeric::to_float(bounds, raw),
            FieldKind::Decimal {
                bounds,
                max_digits,
                decimal_places,
            } => numeric::to_decimal(bounds, *max_digits, *decimal_places, raw),
            FieldKind::Date => temporal::to_date(raw),
            FieldKind::Time => temporal::to_time(raw),
            FieldKind::DateTime => temporal::to_datetime(raw),
            FieldKind::Duration => temporal::to_duration(raw),
            FieldKind::Choice(choices) => to_choice(choices, raw),
            FieldKind::Json => Ok(raw.clone()),
            FieldKind::List {
                child,
                allow_empty,
                min_length,
                max_length,
            } => {
                let lengths = (*min_length, *max_length);
                return validate_list(child, *allow_empty, lengths, raw, enclosing);
            }
            FieldKind::Dict { child, allow_empty } => {
                return validate_dict(child, *allow_empty, raw, enclosing)
            }
            FieldKind::Nested(link) => return validate_nested(link, raw, enclosing),
        };
        scalar.map_err(|message| ErrorDetail::message(message).into())
    }

    /// Collect the models this field links to, through list and mapping elements
    pub(crate) fn collect_links(&self, models: &mut HashSet<ModelId>) {
        match &self.kind {
            FieldKind::Nested(link) => {
                models.insert(link.model_id());
            }
            FieldKind::List { child, .. } | FieldKind::Dict { child, .. } => child.collect_links(models),
            _ => {}
        }
    }

    /// Render a validated value for output
    pub fn to_representation(&self, value: &Value) -> Value {
        if value.is_null() {
            return Value::Null;
        }
        match (&self.kind, value) {
            (FieldKind::Choice(ChoiceSet::Enum(enum_type)), raw) => enum_type
                .resolve(EnumInput::Raw(raw))
                .map(|member| member.value.clone())
                .unwrap_or_else(|| raw.clone()),
            (FieldKind::List { child, .. }, Value::Array(items)) => {
                Value::Array(items.iter().map(|item| child.to_representation(item)).collect())
            }
            (FieldKind::Dict { child, .. }, Value::Object(entries)) => Value::Object(
                entries
                    .iter()
                    .map(|(key, item)| (key.clone(), child.to_representation(item)))
                    .collect(),
            ),
            (FieldKind::Nested(link), Value::Object(entries)) => match link.get() {
                Some(schema) => Value::Object(schema.represent(entries)),
                None => value.clone(),
            },
            _ => value.clone(),
        }
    }

    /// Plain data for a source attribute, keyed the way this field's input is
    pub(crate) fn flatten(&self, value: &SourceValue) -> Value {
        match (&self.kind, value) {
            (FieldKind::Nested(link), SourceValue::Instance(instance)) => match link.get() {
                Some(schema) => Value::Object(schema.flatten_instance(instance)),
                None => instance.to_primitive(),
            },
            (FieldKind::List { child, .. }, SourceValue::List(items)) => {
                Value::Array(items.iter().map(|item| child.flatten(item)).collect())
            }
            (FieldKind::Dict { child, .. }, SourceValue::Map(entries)) => Value::Object(
                entries
                    .iter()
                    .map(|(key, item)| (key.clone(), child.flatten(item)))
                    .collect(),
            ),
            (_, other) => other.to_primitive(),
        }
    }
}

/// Type name of a JSON value, as reported in type errors
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(number) if number.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

fn choice_key(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn to_choice(choices: &ChoiceSet, raw: &Value) -> Result<Value, String> {
    match choices {
        ChoiceSet::Values(values) => {
            if let Some(found) = values.iter().find(|value| *value == raw) {
                return Ok(found.clone());
            }
            let key = choice_key(raw);
            values
                .iter()
                .find(|value| choice_key(value) == key)
                .cloned()
                .ok_or_else(|| format!("\"{key}\" is not a valid choice."))
        }
        ChoiceSet::Enum(enum_type) => enum_type
            .resolve(EnumInput::Raw(raw))
            .map(|member| member.value.clone())
            .ok_or_else(|| "No matching enum type.".to_string()),
    }
}

fn validate_list(
    child: &DerivedField,
    allow_empty: bool,
    (min_length, max_length): (Option<usize>, Option<usize>),
    raw: &Value,
    enclosing: Option<ConfigBundle>,
) -> Result<Value, ValidationFailure> {
    let items = match raw {
        Value::Array(items) => items,
        other => {
            return Err(ErrorDetail::message(format!(
                "Expected a list of items but got type \"{}\".",
                json_type_name(other)
            ))
            .into())
        }
    };

    if items.is_empty() && !allow_empty {
        return Err(ErrorDetail::message("This list may not be empty.").into());
    }
    if let Some(max_length) = max_length {
        if items.len() > max_length {
            return Err(ErrorDetail::message(format!(
                "Ensure this field has no more than {max_length} elements."
            ))
            .into());
        }
    }
    if let Some(min_length) = min_length {
        if items.len() < min_length {
            return Err(ErrorDetail::message(format!(
                "Ensure this field has at least {min_length} elements."
            ))
            .into());
        }
    }

    let mut validated = Vec::with_capacity(items.len());
    let mut errors = BTreeMap::new();
    for (index, item) in items.iter().enumerate() {
        match child.run_validation_within(Some(item), enclosing) {
            Ok(value) => validated.push(value.unwrap_or(Value::Null)),
            Err(ValidationFailure::Invalid(detail)) => {
                errors.insert(index, detail);
            }
            Err(source) => return Err(source),
        }
    }

    if errors.is_empty() {
        Ok(Value::Array(validated))
    } else {
        Err(ErrorDetail::Items(errors).into())
    }
}

fn validate_dict(
    child: &DerivedField,
    allow_empty: bool,
    raw: &Value,
    enclosing: Option<ConfigBundle>,
) -> Result<Value, ValidationFailure> {
    let entries = match raw {
        Value::Object(entries) => entries,
        other => {
            return Err(ErrorDetail::message(format!(
                "Expected a dictionary of items but got type \"{}\".",
                json_type_name(other)
            ))
            .into())
        }
    };

    if entries.is_empty() && !allow_empty {
        return Err(ErrorDetail::message("This dictionary may not be empty.").into());
    }

    let mut validated = Map::new();
    let mut errors = BTreeMap::new();
    for (key, item) in entries {
        match child.run_validation_within(Some(item), enclosing) {
            Ok(value) => {
                validated.insert(key.clone(), value.unwrap_or(Value::Null));
            }
            Err(ValidationFailure::Invalid(detail)) => {
                errors.insert(key.clone(), detail);
            }
            Err(source) => return Err(source),
        }
    }

    if errors.is_empty() {
        Ok(Value::Object(validated))
    } else {
        Err(ErrorDetail::Fields(errors).into())
    }
}

fn validate_nested(
    link: &SchemaLink,
    raw: &Value,
    enclosing: Option<ConfigBundle>,
) -> Result<Value, ValidationFailure> {
    let schema = link.get().ok_or_else(|| {
        ValidationFailure::Invalid(ErrorDetail::message(format!(
            "Schema {} is no longer available.",
            link.schema_name()
        )))
    })?;
    let config = match enclosing {
        Some(enclosing) => resolve_config(schema.model(), enclosing),
        None => *schema.config(),
    };
    coordinator::reconcile(&schema, config, raw)
        .map(|reconciled| Value::Object(reconciled.data))
        .map_err(|rejected| rejected.failure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_and_default() {
        let field = DerivedField::integer();
        assert_eq!(
            field.run_validation(None),
            Err(ErrorDetail::message("This field is required.").into())
        );

        let field = DerivedField::integer().default(5);
        assert_eq!(field.run_validation(None), Ok(Some(json!(5))));

        let field = DerivedField::integer().required(false);
        assert_eq!(field.run_validation(None), Ok(None));
    }

    #[test]
    fn test_null_handling() {
        let field = DerivedField::char();
        assert_eq!(
            field.run_validation(Some(&Value::Null)),
            Err(ErrorDetail::message("This field may not be null.").into())
        );
        let field = DerivedField::char().allow_null(true);
        assert_eq!(field.run_validation(Some(&Value::Null)), Ok(Some(Value::Null)));
    }

    #[test]
    fn test_literal_choices() {
        let field = DerivedField::choice(["a", "b"]);
        assert_eq!(field.run_validation(Some(&json!("a"))), Ok(Some(json!("a"))));
        assert_eq!(
            field.run_validation(Some(&json!("c"))),
            Err(ErrorDetail::message("\"c\" is not a valid choice.").into())
        );

        let numeric = DerivedField::choice([1, 2]);
        assert_eq!(numeric.run_validation(Some(&json!("2"))), Ok(Some(json!(2))));
    }

    #[test]
    fn test_enum_choices() {
        let color = Arc::new(EnumType::new("Color", [("RED", "red"), ("GREEN", "green")]));
        let field = DerivedField::new(FieldKind::Choice(ChoiceSet::Enum(color)));
        assert_eq!(field.run_validation(Some(&json!("GREEN"))), Ok(Some(json!("green"))));
        assert_eq!(
            field.run_validation(Some(&json!("blue"))),
            Err(ErrorDetail::message("No matching enum type.").into())
        );
        assert_eq!(field.to_representation(&json!("RED")), json!("red"));
    }

    #[test]
    fn test_list_errors_by_index() {
        let field = DerivedField::list(DerivedField::integer());
        assert_eq!(field.run_validation(Some(&json!([1, "2"]))), Ok(Some(json!([1, 2]))));

        let err = field.run_validation(Some(&json!([1, "x", 3, "y"]))).unwrap_err();
        let detail = err.detail().unwrap();
        assert!(detail.item(1).is_some());
        assert!(detail.item(3).is_some());
        assert!(detail.item(0).is_none());

        let err = field.run_validation(Some(&json!("nope"))).unwrap_err();
        assert_eq!(
            err.detail().map(ErrorDetail::messages),
            Some(&["Expected a list of items but got type \"str\".".to_string()][..])
        );
    }

    #[test]
    fn test_dict_errors_by_key() {
        let field = DerivedField::dict(DerivedField::float());
        assert_eq!(
            field.run_validation(Some(&json!({"a": 1.5, "b": "2"}))),
            Ok(Some(json!({"a": 1.5, "b": 2.0})))
        );
        let err = field.run_validation(Some(&json!({"a": "x"}))).unwrap_err();
        assert!(err.detail().and_then(|d| d.get("a")).is_some());
    }

    #[test]
    fn test_json_accepts_anything() {
        let field = DerivedField::json();
        let payload = json!({"nested": [1, {"deep": true}]});
        assert_eq!(field.run_validation(Some(&payload)), Ok(Some(payload.clone())));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(DerivedField::boolean().kind_name(), "BooleanField");
        assert_eq!(DerivedField::list(DerivedField::char()).kind_name(), "ListField");
        assert_eq!(DerivedField::json().kind_name(), "JSONField");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(json_type_name(&json!("x")), "str");
        assert_eq!(json_type_name(&json!([1])), "list");
        assert_eq!(json_type_name(&json!(1)), "int");
        assert_eq!(json_type_name(&json!(1.5)), "float");
    }
}
