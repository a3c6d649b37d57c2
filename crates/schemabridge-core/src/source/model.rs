//! Source model definitions, field descriptors and model references

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use super::annotation::TypeAnnotation;
use super::constraint::Constraint;
use super::construct::{ReferenceConstructor, SourceConstructor};
use super::instance::{SourceInstance, SourceValidationError, SourceValue};
use crate::config::PartialConfig;

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a source model.
///
/// Two models with identical fields are still distinct models. Redefining a
/// model in place keeps its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModelId(u64);

impl ModelId {
    fn next() -> Self {
        ModelId(NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model#{}", self.0)
    }
}

/// Field-level validator run by the reference constructor
pub type FieldValidatorFn = Arc<dyn Fn(SourceValue) -> Result<SourceValue, String> + Send + Sync>;

/// Model-level validator run after every field validated
pub type ModelValidatorFn = Arc<dyn Fn(&mut SourceInstance) -> Result<(), String> + Send + Sync>;

/// Default of a field: absent, a fixed value, or produced on demand
#[derive(Clone, Default)]
pub enum DefaultValue {
    #[default]
    None,
    Value(Value),
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    /// The concrete default, invoking the factory if there is one
    pub fn resolve(&self) -> Option<Value> {
        match self {
            DefaultValue::None => None,
            DefaultValue::Value(value) => Some(value.clone()),
            DefaultValue::Factory(factory) => Some(factory()),
        }
    }

    pub fn is_some(&self) -> bool {
        !matches!(self, DefaultValue::None)
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::None => write!(f, "None"),
            DefaultValue::Value(value) => write!(f, "Value({value})"),
            DefaultValue::Factory(_) => write!(f, "Factory(..)"),
        }
    }
}

/// Declaration of one field on a source model
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    name: String,
    annotation: Option<TypeAnnotation>,
    required: bool,
    default: DefaultValue,
    description: Option<String>,
    title: Option<String>,
    metadata: Vec<Constraint>,
    validation_alias: Option<String>,
    serialization_alias: Option<String>,
}

impl FieldDescriptor {
    /// A required field with the given type
    pub fn new(name: impl Into<String>, annotation: TypeAnnotation) -> Self {
        Self {
            annotation: Some(annotation),
            ..Self::untyped(name)
        }
    }

    /// A field without a type annotation; such fields cannot be converted
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotation: None,
            required: true,
            default: DefaultValue::None,
            description: None,
            title: None,
            metadata: Vec::new(),
            validation_alias: None,
            serialization_alias: None,
        }
    }

    /// Set a fixed default; the field becomes optional
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = DefaultValue::Value(value.into());
        self.required = false;
        self
    }

    /// Set a default factory; the field becomes optional
    pub fn default_factory(mut self, factory: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default = DefaultValue::Factory(Arc::new(factory));
        self.required = false;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.metadata.push(constraint);
        self
    }

    pub fn constraints(mut self, constraints: impl IntoIterator<Item = Constraint>) -> Self {
        self.metadata.extend(constraints);
        self
    }

    /// Set both the validation and the serialization alias
    pub fn alias(self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        self.validation_alias(alias.clone()).serialization_alias(alias)
    }

    pub fn validation_alias(mut self, alias: impl Into<String>) -> Self {
        self.validation_alias = Some(alias.into());
        self
    }

    pub fn serialization_alias(mut self, alias: impl Into<String>) -> Self {
        self.serialization_alias = Some(alias.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn annotation(&self) -> Option<&TypeAnnotation> {
        self.annotation.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> &DefaultValue {
        &self.default
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn title_text(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn metadata(&self) -> &[Constraint] {
        &self.metadata
    }

    pub fn validation_alias_name(&self) -> Option<&str> {
        self.validation_alias.as_deref()
    }

    pub fn serialization_alias_name(&self) -> Option<&str> {
        self.serialization_alias.as_deref()
    }

    /// Key under which input data carries this field
    pub fn validation_key(&self) -> &str {
        self.validation_alias.as_deref().unwrap_or(&self.name)
    }

    /// Key under which output data carries this field
    pub fn serialization_key(&self) -> &str {
        self.serialization_alias.as_deref().unwrap_or(&self.name)
    }
}

/// Reference from a field annotation to a source model.
///
/// Forward references are created before their target exists and resolved
/// once with [`ForwardDecl::resolve`]. They hold the target weakly, which
/// lets models refer to each other in cycles.
#[derive(Clone)]
pub struct ModelRef {
    name: String,
    target: RefTarget,
}

#[derive(Clone)]
enum RefTarget {
    Strong(Arc<SourceModel>),
    Forward(Arc<OnceLock<Weak<SourceModel>>>),
}

impl ModelRef {
    pub fn new(model: &Arc<SourceModel>) -> Self {
        Self {
            name: model.name().to_string(),
            target: RefTarget::Strong(Arc::clone(model)),
        }
    }

    /// A reference to a model that is declared later
    pub fn forward(name: impl Into<String>) -> (Self, ForwardDecl) {
        let name = name.into();
        let slot = Arc::new(OnceLock::new());
        (
            Self {
                name: name.clone(),
                target: RefTarget::Forward(Arc::clone(&slot)),
            },
            ForwardDecl { name, slot },
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The referenced model, if it exists
    pub fn get(&self) -> Option<Arc<SourceModel>> {
        match &self.target {
            RefTarget::Strong(model) => Some(Arc::clone(model)),
            RefTarget::Forward(slot) => slot.get().and_then(Weak::upgrade),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.get().is_some()
    }
}

impl From<&Arc<SourceModel>> for ModelRef {
    fn from(model: &Arc<SourceModel>) -> Self {
        ModelRef::new(model)
    }
}

impl From<Arc<SourceModel>> for ModelRef {
    fn from(model: Arc<SourceModel>) -> Self {
        ModelRef::new(&model)
    }
}

impl PartialEq for ModelRef {
    fn eq(&self, other: &Self) -> bool {
        match (self.get(), other.get()) {
            (Some(a), Some(b)) => a.id() == b.id(),
            (None, None) => match (&self.target, &other.target) {
                (RefTarget::Forward(a), RefTarget::Forward(b)) => Arc::ptr_eq(a, b),
                _ => false,
            },
            _ => false,
        }
    }
}

impl fmt::Debug for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_resolved() { "resolved" } else { "unresolved" };
        write!(f, "ModelRef({}, {state})", self.name)
    }
}

/// Pending resolution of a forward [`ModelRef`]
#[derive(Debug)]
pub struct ForwardDecl {
    name: String,
    slot: Arc<OnceLock<Weak<SourceModel>>>,
}

impl ForwardDecl {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Point every clone of the forward reference at `model`.
    ///
    /// Returns `false` if the reference was already resolved.
    pub fn resolve(self, model: &Arc<SourceModel>) -> bool {
        self.slot.set(Arc::downgrade(model)).is_ok()
    }
}

/// A declarative data model
pub struct SourceModel {
    id: ModelId,
    name: String,
    fields: Vec<FieldDescriptor>,
    derive_schema: bool,
    config: Option<PartialConfig>,
    parent: Option<Arc<SourceModel>>,
    field_validators: Vec<(String, FieldValidatorFn)>,
    model_validators: Vec<ModelValidatorFn>,
    constructor: Option<Arc<dyn SourceConstructor>>,
}

impl SourceModel {
    /// Start a model that opts into schema derivation
    pub fn derived(name: impl Into<String>) -> SourceModelBuilder {
        SourceModelBuilder::new(name.into(), true)
    }

    /// Start a model that is only used as source data
    pub fn plain(name: impl Into<String>) -> SourceModelBuilder {
        SourceModelBuilder::new(name.into(), false)
    }

    /// Start a redefinition of this model that keeps its identity.
    ///
    /// The builder starts without fields or validators; name, derivation
    /// opt-in, parent and config carry over.
    pub fn redefine(&self) -> SourceModelBuilder {
        let mut builder = SourceModelBuilder::new(self.name.clone(), self.derive_schema);
        builder.id = Some(self.id);
        builder.parent = self.parent.clone();
        builder.config = self.config;
        builder
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order, inherited fields first
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name() == name)
    }

    pub fn derives_schema(&self) -> bool {
        self.derive_schema
    }

    /// The bundle declared on this model itself
    pub fn explicit_config(&self) -> Option<&PartialConfig> {
        self.config.as_ref()
    }

    pub fn parent(&self) -> Option<&Arc<SourceModel>> {
        self.parent.as_ref()
    }

    /// Validate `data` and build an instance of this model
    pub fn construct(&self, data: &Map<String, Value>) -> Result<SourceInstance, SourceValidationError> {
        match &self.constructor {
            Some(constructor) => constructor.construct(self, data),
            None => ReferenceConstructor.construct(self, data),
        }
    }

    pub(crate) fn field_validators_for<'a>(
        &'a self,
        field: &'a str,
    ) -> impl Iterator<Item = &'a FieldValidatorFn> + 'a {
        self.field_validators
            .iter()
            .filter(move |(name, _)| name == field)
            .map(|(_, validator)| validator)
    }

    pub(crate) fn model_validators(&self) -> &[ModelValidatorFn] {
        &self.model_validators
    }
}

impl fmt::Debug for SourceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceModel")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("derive_schema", &self.derive_schema)
            .field("fields", &self.fields)
            .field("config", &self.config)
            .field("parent", &self.parent.as_ref().map(|parent| parent.name()))
            .finish_non_exhaustive()
    }
}

/// Builder for [`SourceModel`]
pub struct SourceModelBuilder {
    id: Option<ModelId>,
    name: String,
    derive_schema: bool,
    fields: Vec<FieldDescriptor>,
    config: Option<PartialConfig>,
    parent: Option<Arc<SourceModel>>,
    field_validators: Vec<(String, FieldValidatorFn)>,
    model_validators: Vec<ModelValidatorFn>,
    constructor: Option<Arc<dyn SourceConstructor>>,
}

impl SourceModelBuilder {
    fn new(name: String, derive_schema: bool) -> Self {
        Self {
            id: None,
            name,
            derive_schema,
            fields: Vec::new(),
            config: None,
            parent: None,
            field_validators: Vec::new(),
            model_validators: Vec::new(),
            constructor: None,
        }
    }

    /// Inherit fields, validators and config from `parent`
    pub fn extends(mut self, parent: &Arc<SourceModel>) -> Self {
        self.parent = Some(Arc::clone(parent));
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldDescriptor>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn config(mut self, config: PartialConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn field_validator(
        mut self,
        field: impl Into<String>,
        validator: impl Fn(SourceValue) -> Result<SourceValue, String> + Send + Sync + 'static,
    ) -> Self {
        self.field_validators.push((field.into(), Arc::new(validator)));
        self
    }

    pub fn model_validator(
        mut self,
        validator: impl Fn(&mut SourceInstance) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.model_validators.push(Arc::new(validator));
        self
    }

    /// Replace the reference constructor
    pub fn constructor(mut self, constructor: Arc<dyn SourceConstructor>) -> Self {
        self.constructor = Some(constructor);
        self
    }

    pub fn build(self) -> Arc<SourceModel> {
        let (fields, field_validators, model_validators, constructor) = match &self.parent {
            Some(parent) => {
                let mut fields = parent.fields.clone();
                for field in self.fields {
                    match fields.iter_mut().find(|existing| existing.name() == field.name()) {
                        Some(existing) => *existing = field,
                        None => fields.push(field),
                    }
                }
                let mut field_validators = parent.field_validators.clone();
                field_validators.extend(self.field_validators);
                let mut model_validators = parent.model_validators.clone();
                model_validators.extend(self.model_validators);
                let constructor = self.constructor.or_else(|| parent.constructor.clone());
                (fields, field_validators, model_validators, constructor)
            }
            None => (
                self.fields,
                self.field_validators,
                self.model_validators,
                self.constructor,
            ),
        };

        Arc::new(SourceModel {
            id: self.id.unwrap_or_else(ModelId::next),
            name: self.name,
            fields,
            derive_schema: self.derive_schema,
            config: self.config,
            parent: self.parent,
            field_validators,
            model_validators,
            constructor,
        })
    }
}
