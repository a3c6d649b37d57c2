//! Dual validation
//!
//! Input is validated by the derived schema first. When the resolved bundle
//! enables source validation, the validated data is then used to construct a
//! source instance. A failure there is either translated into the derived
//! error shape or surfaced untranslated, depending on error authority. On
//! success the validated data may be overwritten with the instance's
//! attribute values.
//!
//! ```text
//! Unvalidated -> DerivedValidated -> Accepted | BackPopulated
//!             -> DerivedRejected
//!             -> SourceRejected
//! ```

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::config::{ConfigBundle, ErrorAuthority};
use crate::error::ValidationFailure;
use crate::fields::ErrorDetail;
use crate::schema::DerivedSchema;
use crate::source::{LocSegment, SourceInstance, SourceValidationError};

/// Where a bound schema is in its validation lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationState {
    Unvalidated,
    /// Derived validation passed and source validation is pending
    DerivedValidated,
    /// Validated; the data was not overwritten from a source instance
    Accepted,
    /// Validated and overwritten with source instance attributes
    BackPopulated,
    DerivedRejected,
    SourceRejected,
}

impl ValidationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ValidationState::Unvalidated | ValidationState::DerivedValidated)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ValidationState::Accepted | ValidationState::BackPopulated)
    }
}

impl std::fmt::Display for ValidationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ValidationState::Unvalidated => "unvalidated",
            ValidationState::DerivedValidated => "derived-validated",
            ValidationState::Accepted => "accepted",
            ValidationState::BackPopulated => "back-populated",
            ValidationState::DerivedRejected => "derived-rejected",
            ValidationState::SourceRejected => "source-rejected",
        };
        write!(f, "{label}")
    }
}

/// Successful outcome of one validation run
#[derive(Debug, Clone)]
pub(crate) struct Reconciled {
    pub data: Map<String, Value>,
    pub instance: Option<SourceInstance>,
    pub state: ValidationState,
}

/// Failed outcome of one validation run
#[derive(Debug, Clone)]
pub(crate) struct Rejected {
    pub failure: ValidationFailure,
    pub state: ValidationState,
}

/// Run the full validate-then-reconcile protocol for `data` under `config`
pub(crate) fn reconcile(
    schema: &DerivedSchema,
    config: ConfigBundle,
    data: &Value,
) -> Result<Reconciled, Rejected> {
    let mut validated = schema.validate_fields_within(data, config).map_err(|failure| {
        let state = if failure.is_source() {
            ValidationState::SourceRejected
        } else {
            ValidationState::DerivedRejected
        };
        Rejected { failure, state }
    })?;

    if !config.validate_against_source {
        return Ok(Reconciled {
            data: validated,
            instance: None,
            state: ValidationState::Accepted,
        });
    }

    trace!(schema = schema.name(), "derived validation passed, constructing source instance");
    match schema.model().construct(&validated) {
        Ok(instance) => {
            let state = if config.backpopulate {
                backpopulate(schema, &mut validated, &instance);
                ValidationState::BackPopulated
            } else {
                ValidationState::Accepted
            };
            Ok(Reconciled {
                data: validated,
                instance: Some(instance),
                state,
            })
        }
        Err(err) => {
            debug!(
                schema = schema.name(),
                errors = err.error_count(),
                authority = %config.error_authority,
                "source validation rejected derived data"
            );
            let failure = match config.error_authority {
                ErrorAuthority::Source => ValidationFailure::Source(err),
                ErrorAuthority::Derived => ValidationFailure::Invalid(translate_source_error(schema, &err)),
            };
            Err(Rejected {
                failure,
                state: ValidationState::SourceRejected,
            })
        }
    }
}

/// Overwrite validated values with the instance's attribute values.
///
/// Only keys already present in `validated` are touched; attributes the
/// instance lacks leave the derived value in place.
fn backpopulate(schema: &DerivedSchema, validated: &mut Map<String, Value>, instance: &SourceInstance) {
    for field in schema.fields() {
        let key = field.validation_key();
        if !validated.contains_key(key) {
            continue;
        }
        match instance.get(field.name()) {
            Some(value) => {
                validated.insert(key.to_string(), field.flatten(value));
            }
            None => debug!(
                schema = schema.name(),
                field = field.name(),
                "source instance has no attribute for field, keeping derived value"
            ),
        }
    }
}

/// Translate source errors into the derived error shape.
///
/// Each error is encoded as a `{"loc", "msg", "type"}` record. Errors whose
/// location starts with a known field go to that field's bucket; all others
/// go to the non-field bucket, which is always present.
pub fn translate_source_error(schema: &DerivedSchema, error: &SourceValidationError) -> ErrorDetail {
    let mut global = Vec::new();
    let mut by_field: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for item in error.errors() {
        let record = item.encode();
        let field = item
            .loc
            .first()
            .and_then(LocSegment::as_field)
            .and_then(|key| schema.field_by_key(key));
        match field {
            Some(field) => by_field
                .entry(field.validation_key().to_string())
                .or_default()
                .push(record),
            None => global.push(record),
        }
    }

    let mut buckets: BTreeMap<String, ErrorDetail> = by_field
        .into_iter()
        .map(|(key, records)| (key, ErrorDetail::Messages(records)))
        .collect();
    let non_field = buckets
        .entry(schema.settings().non_field_errors_key.clone())
        .or_insert_with(|| ErrorDetail::Messages(Vec::new()));
    if let ErrorDetail::Messages(messages) = non_field {
        messages.extend(global);
    }
    ErrorDetail::Fields(buckets)
}

/// A schema bound to one input, validated at most once
#[derive(Debug)]
pub struct BoundSchema {
    schema: Arc<DerivedSchema>,
    initial: Value,
    state: ValidationState,
    validated: Option<Map<String, Value>>,
    errors: Option<ErrorDetail>,
    source_error: Option<SourceValidationError>,
    instance: Option<SourceInstance>,
}

impl BoundSchema {
    pub fn new(schema: Arc<DerivedSchema>, data: Value) -> Self {
        Self {
            schema,
            initial: data,
            state: ValidationState::Unvalidated,
            validated: None,
            errors: None,
            source_error: None,
            instance: None,
        }
    }

    pub fn schema(&self) -> &Arc<DerivedSchema> {
        &self.schema
    }

    pub fn initial_data(&self) -> &Value {
        &self.initial
    }

    pub fn state(&self) -> ValidationState {
        self.state
    }

    /// Validate the bound input.
    ///
    /// Returns `Ok(true)` on success. On a derived-shape failure returns
    /// `Ok(false)`, or the error mapping when `raise_on_error` is set. When
    /// the source model holds error authority its error is always returned,
    /// regardless of `raise_on_error`. Repeated calls reuse the first result.
    pub fn is_valid(&mut self, raise_on_error: bool) -> Result<bool, ValidationFailure> {
        if self.state == ValidationState::Unvalidated {
            self.run();
        }

        if let Some(err) = &self.source_error {
            return Err(ValidationFailure::Source(err.clone()));
        }
        match &self.errors {
            Some(detail) if raise_on_error => Err(ValidationFailure::Invalid(detail.clone())),
            Some(_) => Ok(false),
            None => Ok(true),
        }
    }

    fn run(&mut self) {
        match reconcile(&self.schema, *self.schema.config(), &self.initial) {
            Ok(reconciled) => {
                self.validated = Some(reconciled.data);
                self.instance = reconciled.instance;
                self.state = reconciled.state;
            }
            Err(rejected) => {
                match rejected.failure {
                    ValidationFailure::Invalid(detail) => self.errors = Some(detail),
                    ValidationFailure::Source(err) => self.source_error = Some(err),
                }
                self.state = rejected.state;
            }
        }
        debug!(schema = self.schema.name(), state = %self.state, "validation finished");
    }

    /// Validated data keyed by validation key; `None` until validation succeeded
    pub fn validated_data(&self) -> Option<&Map<String, Value>> {
        self.validated.as_ref()
    }

    /// Derived-shape errors of a failed run
    pub fn errors(&self) -> Option<&ErrorDetail> {
        self.errors.as_ref()
    }

    /// Untranslated source error, when the source model held error authority
    pub fn source_error(&self) -> Option<&SourceValidationError> {
        self.source_error.as_ref()
    }

    /// Validated data rendered under serialization keys
    pub fn output(&self) -> Option<Map<String, Value>> {
        self.validated.as_ref().map(|validated| self.schema.represent(validated))
    }

    /// The source instance constructed during validation, if any
    pub fn try_source_instance(&self) -> Option<&SourceInstance> {
        self.instance.as_ref()
    }

    /// The source instance constructed during validation.
    ///
    /// # Panics
    ///
    /// Panics if validation has not run, did not succeed, or the schema does
    /// not validate against its source model.
    pub fn source_instance(&self) -> &SourceInstance {
        if let Some(instance) = &self.instance {
            return instance;
        }
        if self.state == ValidationState::Unvalidated {
            panic!(
                "source instance of {} accessed before validation; call is_valid() first",
                self.schema.name()
            );
        }
        if !self.schema.config().validate_against_source {
            panic!(
                "{} does not validate against its source model, so no source instance exists",
                self.schema.name()
            );
        }
        panic!(
            "validation of {} did not succeed, so no source instance exists",
            self.schema.name()
        );
    }
}
