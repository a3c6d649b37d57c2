//! Derived schemas
//!
//! A [`DerivedSchema`] is the compiled counterpart of one source model. It is
//! reserved by the registry before its fields are converted so that
//! self-referential models can point back at it, and populated exactly once
//! when conversion succeeds.
//!
//! Copyright (c) 2025 Schemabridge Team
//! Licensed under the Apache-2.0 license

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::config::ConfigBundle;
use crate::convert::ConversionWarning;
use crate::coordinator::BoundSchema;
use crate::error::ValidationFailure;
use crate::fields::{json_type_name, DerivedField, ErrorDetail};
use crate::settings::Settings;
use crate::source::{ModelId, SourceInstance, SourceModel};

struct SchemaBody {
    fields: Vec<DerivedField>,
    warnings: Vec<ConversionWarning>,
}

/// The compiled schema of a source model
pub struct DerivedSchema {
    name: String,
    model: Arc<SourceModel>,
    config: ConfigBundle,
    settings: Arc<Settings>,
    manual: bool,
    body: OnceLock<SchemaBody>,
}

impl DerivedSchema {
    pub(crate) fn reserve(
        model: Arc<SourceModel>,
        config: ConfigBundle,
        settings: Arc<Settings>,
        manual: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: format!("{}Schema", model.name()),
            model,
            config,
            settings,
            manual,
            body: OnceLock::new(),
        })
    }

    /// Install the converted fields; returns `false` if already populated
    pub(crate) fn populate(&self, fields: Vec<DerivedField>, warnings: Vec<ConversionWarning>) -> bool {
        self.body.set(SchemaBody { fields, warnings }).is_ok()
    }

    /// `<Model>Schema`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &Arc<SourceModel> {
        &self.model
    }

    pub fn model_id(&self) -> ModelId {
        self.model.id()
    }

    pub fn config(&self) -> &ConfigBundle {
        &self.config
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Installed by hand rather than derived
    pub fn is_manual(&self) -> bool {
        self.manual
    }

    pub fn is_populated(&self) -> bool {
        self.body.get().is_some()
    }

    /// Fields in source declaration order
    pub fn fields(&self) -> &[DerivedField] {
        self.body.get().map_or(&[], |body| &body.fields)
    }

    /// Look up a field by attribute name
    pub fn field(&self, name: &str) -> Option<&DerivedField> {
        self.fields().iter().find(|field| field.name() == name)
    }

    /// Look up a field by validation key, falling back to attribute name
    pub fn field_by_key(&self, key: &str) -> Option<&DerivedField> {
        self.fields()
            .iter()
            .find(|field| field.validation_key() == key)
            .or_else(|| self.field(key))
    }

    pub fn len(&self) -> usize {
        self.fields().len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Lossy approximations made while converting this schema
    pub fn warnings(&self) -> &[ConversionWarning] {
        self.body.get().map_or(&[], |body| &body.warnings)
    }

    /// Models whose schemas this schema's fields link to
    pub fn linked_models(&self) -> HashSet<ModelId> {
        let mut models = HashSet::new();
        for field in self.fields() {
            field.collect_links(&mut models);
        }
        models
    }

    /// Bind input data for validation
    pub fn bind(self: &Arc<Self>, data: Value) -> BoundSchema {
        BoundSchema::new(Arc::clone(self), data)
    }

    /// Run every field's own validation over `data`.
    ///
    /// The result is keyed by validation key. Errors of all failing fields are
    /// collected before returning.
    pub fn validate_fields(&self, data: &Value) -> Result<Map<String, Value>, ValidationFailure> {
        self.validate_fields_within(data, self.config)
    }

    /// Field validation where nested schemas inherit from `config`
    pub(crate) fn validate_fields_within(
        &self,
        data: &Value,
        config: ConfigBundle,
    ) -> Result<Map<String, Value>, ValidationFailure> {
        let Value::Object(input) = data else {
            return Err(ErrorDetail::keyed(
                self.settings.non_field_errors_key.clone(),
                format!("Invalid data. Expected a dictionary, but got {}.", json_type_name(data)),
            )
            .into());
        };

        let mut validated = Map::new();
        let mut errors = BTreeMap::new();
        for field in self.fields() {
            match field.run_validation_within(input.get(field.validation_key()), Some(config)) {
                Ok(Some(value)) => {
                    validated.insert(field.validation_key().to_string(), value);
                }
                Ok(None) => {}
                Err(ValidationFailure::Invalid(detail)) => {
                    errors.insert(field.validation_key().to_string(), detail);
                }
                Err(source) => return Err(source),
            }
        }

        if errors.is_empty() {
            Ok(validated)
        } else {
            Err(ErrorDetail::Fields(errors).into())
        }
    }

    /// Render validated data for output under serialization keys
    pub fn represent(&self, validated: &Map<String, Value>) -> Map<String, Value> {
        self.fields()
            .iter()
            .filter_map(|field| {
                validated
                    .get(field.validation_key())
                    .map(|value| (field.serialization_key().to_string(), field.to_representation(value)))
            })
            .collect()
    }

    /// Plain data for a source instance, keyed by validation key
    pub fn flatten_instance(&self, instance: &SourceInstance) -> Map<String, Value> {
        self.fields()
            .iter()
            .filter_map(|field| {
                instance
                    .get(field.name())
                    .map(|value| (field.validation_key().to_string(), field.flatten(value)))
            })
            .collect()
    }

    /// Render a source instance for output
    pub fn represent_instance(&self, instance: &SourceInstance) -> Map<String, Value> {
        self.represent(&self.flatten_instance(instance))
    }
}

impl fmt::Debug for DerivedSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedSchema")
            .field("name", &self.name)
            .field("model", &self.model.id())
            .field("config", &self.config)
            .field("manual", &self.manual)
            .field("fields", &self.fields())
            .finish()
    }
}
