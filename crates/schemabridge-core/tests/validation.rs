//! End-to-end validation tests
//!
//! These tests drive the full pipeline: source model definition, schema
//! derivation, derived validation and reconciliation with source validation.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use schemabridge_core::{
    ErrorAuthority, FieldDescriptor, PartialConfig, SchemaRegistry, SourceConstructor,
    SourceInstance, SourceModel, SourceValidationError, SourceValue, TypeAnnotation,
    ValidationFailure, ValidationState,
};

fn person() -> std::sync::Arc<SourceModel> {
    SourceModel::derived("Person")
        .field(FieldDescriptor::new("name", TypeAnnotation::Str))
        .field(FieldDescriptor::new("age", TypeAnnotation::Int))
        .build()
}

#[test]
fn test_valid_input_is_accepted() {
    let registry = SchemaRegistry::new();
    let schema = registry.get_or_build(&person()).unwrap();

    let mut bound = schema.bind(json!({"name": "Van", "age": 69}));
    assert!(bound.is_valid(false).unwrap());
    assert_eq!(bound.state(), ValidationState::Accepted);
    assert_eq!(
        Value::Object(bound.validated_data().unwrap().clone()),
        json!({"name": "Van", "age": 69})
    );
    assert!(bound.try_source_instance().is_none());
}

#[test]
fn test_invalid_input_is_rejected() {
    let registry = SchemaRegistry::new();
    let schema = registry.get_or_build(&person()).unwrap();

    let mut bound = schema.bind(json!({"name": 69, "age": "Van"}));
    assert!(!bound.is_valid(false).unwrap());
    assert_eq!(bound.state(), ValidationState::DerivedRejected);
    assert!(bound.validated_data().is_none());

    let errors = bound.errors().unwrap();
    assert_eq!(
        errors.get("age").unwrap().messages(),
        ["A valid integer is required.".to_string()]
    );

    let mut raising = schema.bind(json!({"name": 69, "age": "Van"}));
    match raising.is_valid(true) {
        Err(ValidationFailure::Invalid(detail)) => {
            assert_eq!(detail.to_json()["age"], json!(["A valid integer is required."]));
        }
        other => panic!("expected derived failure, got {other:?}"),
    }
}

#[test]
fn test_missing_and_null_fields() {
    let registry = SchemaRegistry::new();
    let schema = registry.get_or_build(&person()).unwrap();

    let mut bound = schema.bind(json!({"name": null}));
    assert!(!bound.is_valid(false).unwrap());
    let errors = bound.errors().unwrap().to_json();
    assert_eq!(errors["name"], json!(["This field may not be null."]));
    assert_eq!(errors["age"], json!(["This field is required."]));
}

#[test]
fn test_non_mapping_input() {
    let registry = SchemaRegistry::new();
    let schema = registry.get_or_build(&person()).unwrap();

    let mut bound = schema.bind(json!([1, 2]));
    assert!(!bound.is_valid(false).unwrap());
    assert_eq!(
        bound.errors().unwrap().to_json(),
        json!({"non_field_errors": ["Invalid data. Expected a dictionary, but got list."]})
    );
}

#[test]
fn test_conflicting_min_value_constraints_fail_conversion() {
    use schemabridge_core::{Constraint, Error};

    let model = SourceModel::derived("Limits")
        .field(
            FieldDescriptor::new("value", TypeAnnotation::Int)
                .constraints([Constraint::Ge(69.0), Constraint::Gt(69.0)]),
        )
        .build();

    let registry = SchemaRegistry::new();
    match registry.get_or_build(&model) {
        Err(Error::ModelConversion(err)) => {
            assert_eq!(err.model, "Limits");
            let failure = err.failure("value").unwrap();
            assert!(failure
                .message
                .contains("multiple conflicting min_value constraints"));
            assert!(err.to_string().starts_with("Error when converting model: Limits\n  value\n    "));
        }
        other => panic!("expected conversion error, got {other:?}"),
    }
    assert!(registry.is_empty());
}

#[test]
fn test_backpopulation_uses_source_values() {
    let model = SourceModel::derived("User")
        .field(FieldDescriptor::new("email", TypeAnnotation::Str))
        .config(PartialConfig::new().validate_against_source(true))
        .field_validator("email", |value| match value.as_str() {
            Some(email) => Ok(SourceValue::Value(json!(email.to_lowercase()))),
            None => Err("email must be a string".to_string()),
        })
        .build();

    let registry = SchemaRegistry::new();
    let schema = registry.get_or_build(&model).unwrap();

    let mut bound = schema.bind(json!({"email": "VAN@Example.COM"}));
    assert!(bound.is_valid(true).unwrap());
    assert_eq!(bound.state(), ValidationState::BackPopulated);
    assert_eq!(bound.validated_data().unwrap()["email"], json!("van@example.com"));
    assert_eq!(bound.output().unwrap()["email"], json!("van@example.com"));
    assert_eq!(
        bound.source_instance().value("email"),
        Some(&json!("van@example.com"))
    );
}

#[test]
fn test_backpopulation_disabled_keeps_derived_values() {
    let model = SourceModel::derived("User")
        .field(FieldDescriptor::new("email", TypeAnnotation::Str))
        .config(
            PartialConfig::new()
                .validate_against_source(true)
                .backpopulate(false),
        )
        .field_validator("email", |value| match value.as_str() {
            Some(email) => Ok(SourceValue::Value(json!(email.to_lowercase()))),
            None => Err("email must be a string".to_string()),
        })
        .build();

    let registry = SchemaRegistry::new();
    let mut bound = registry
        .get_or_build(&model)
        .unwrap()
        .bind(json!({"email": "VAN@Example.COM"}));
    assert!(bound.is_valid(false).unwrap());
    assert_eq!(bound.state(), ValidationState::Accepted);
    assert_eq!(bound.validated_data().unwrap()["email"], json!("VAN@Example.COM"));
    assert!(bound.try_source_instance().is_some());
}

fn job_and_person(authority: ErrorAuthority) -> std::sync::Arc<SourceModel> {
    let job = SourceModel::derived("Job")
        .field(FieldDescriptor::new("title", TypeAnnotation::Str))
        .field(FieldDescriptor::new("salary", TypeAnnotation::Float))
        .field_validator("salary", |value| match value.as_f64() {
            Some(salary) if salary > 0.0 => Ok(value),
            _ => Err("salary must be positive".to_string()),
        })
        .build();
    SourceModel::derived("Person")
        .field(FieldDescriptor::new("name", TypeAnnotation::Str))
        .field(FieldDescriptor::new(
            "jobs",
            TypeAnnotation::list(TypeAnnotation::model(&job)),
        ))
        .config(
            PartialConfig::new()
                .validate_against_source(true)
                .error_authority(authority),
        )
        .build()
}

#[test]
fn test_nested_source_errors_translated_under_derived_authority() {
    let registry = SchemaRegistry::new();
    let schema = registry
        .get_or_build(&job_and_person(ErrorAuthority::Derived))
        .unwrap();

    let mut bound = schema.bind(json!({
        "name": "Van",
        "jobs": [{"title": "Artist", "salary": -1}]
    }));
    assert!(!bound.is_valid(false).unwrap());
    assert!(bound.source_error().is_none());

    let errors = bound.errors().unwrap();
    let jobs = errors.get("jobs").expect("jobs bucket populated");
    let salary = jobs.item(0).and_then(|item| item.get("salary")).unwrap();
    assert!(salary.messages()[0].contains("Value error, salary must be positive"));

    let mut raising = schema.bind(json!({
        "name": "Van",
        "jobs": [{"title": "Artist", "salary": -1}]
    }));
    assert!(matches!(
        raising.is_valid(true),
        Err(ValidationFailure::Invalid(_))
    ));
}

#[test]
fn test_nested_source_errors_propagate_under_source_authority() {
    let registry = SchemaRegistry::new();
    let schema = registry
        .get_or_build(&job_and_person(ErrorAuthority::Source))
        .unwrap();

    let mut bound = schema.bind(json!({
        "name": "Van",
        "jobs": [{"title": "Artist", "salary": -1}]
    }));
    match bound.is_valid(false) {
        Err(ValidationFailure::Source(err)) => {
            assert_eq!(err.model, "Job");
            assert_eq!(err.errors[0].kind, "value_error");
        }
        other => panic!("expected source failure, got {other:?}"),
    }
    assert_eq!(bound.state(), ValidationState::SourceRejected);
    assert!(bound.errors().is_none());
}

#[test]
fn test_model_validator_errors_go_to_non_field_bucket() {
    let model = SourceModel::derived("Range")
        .field(FieldDescriptor::new("low", TypeAnnotation::Int))
        .field(FieldDescriptor::new("high", TypeAnnotation::Int))
        .config(PartialConfig::new().validate_against_source(true))
        .model_validator(|instance| {
            match (instance.value("low").and_then(Value::as_i64), instance.value("high").and_then(Value::as_i64)) {
                (Some(low), Some(high)) if low > high => Err("low must not exceed high".to_string()),
                _ => Ok(()),
            }
        })
        .build();

    let registry = SchemaRegistry::new();
    let mut bound = registry
        .get_or_build(&model)
        .unwrap()
        .bind(json!({"low": 5, "high": 1}));
    assert!(!bound.is_valid(false).unwrap());

    let errors = bound.errors().unwrap();
    assert_eq!(errors.keys(), vec!["non_field_errors"]);
    let record: Value = serde_json::from_str(&errors.get("non_field_errors").unwrap().messages()[0]).unwrap();
    assert_eq!(record["loc"], json!([]));
    assert_eq!(record["msg"], json!("Value error, low must not exceed high"));
    assert_eq!(record["type"], json!("value_error"));
}

#[test]
fn test_aliases_key_input_and_output() {
    let model = SourceModel::derived("Account")
        .field(
            FieldDescriptor::new("user_name", TypeAnnotation::Str)
                .validation_alias("userName")
                .serialization_alias("username"),
        )
        .build();

    let registry = SchemaRegistry::new();
    let mut bound = registry
        .get_or_build(&model)
        .unwrap()
        .bind(json!({"userName": "van"}));
    assert!(bound.is_valid(false).unwrap());
    assert_eq!(bound.validated_data().unwrap()["userName"], json!("van"));
    assert_eq!(bound.output().unwrap()["username"], json!("van"));
}

#[test]
fn test_repeated_validation_reuses_result() {
    let registry = SchemaRegistry::new();
    let schema = registry.get_or_build(&person()).unwrap();

    let mut bound = schema.bind(json!({"name": "Van"}));
    assert!(!bound.is_valid(false).unwrap());
    assert!(!bound.is_valid(false).unwrap());
    assert!(bound.is_valid(true).is_err());
    assert_eq!(bound.state(), ValidationState::DerivedRejected);
}

#[test]
#[should_panic(expected = "accessed before validation")]
fn test_source_instance_before_validation_panics() {
    let registry = SchemaRegistry::new();
    let schema = registry.get_or_build(&person()).unwrap();
    let bound = schema.bind(json!({"name": "Van", "age": 1}));
    let _ = bound.source_instance();
}

#[test]
#[should_panic(expected = "does not validate against its source model")]
fn test_source_instance_without_source_validation_panics() {
    let registry = SchemaRegistry::new();
    let schema = registry.get_or_build(&person()).unwrap();
    let mut bound = schema.bind(json!({"name": "Van", "age": 69}));
    assert!(bound.is_valid(false).unwrap());
    bound.source_instance();
}

/// Builds instances that carry an upper-cased name and no other attribute
struct NameOnly;

impl SourceConstructor for NameOnly {
    fn construct(
        &self,
        model: &SourceModel,
        data: &Map<String, Value>,
    ) -> Result<SourceInstance, SourceValidationError> {
        let name = data.get("name").and_then(Value::as_str).unwrap_or_default();
        Ok(SourceInstance::new(
            model,
            vec![("name".to_string(), SourceValue::from(json!(name.to_uppercase())))],
        ))
    }
}

#[test]
fn test_backpopulation_skips_attributes_the_instance_lacks() {
    let model = SourceModel::derived("Person")
        .field(FieldDescriptor::new("name", TypeAnnotation::Str))
        .field(FieldDescriptor::new("age", TypeAnnotation::Int))
        .config(PartialConfig::new().validate_against_source(true))
        .constructor(Arc::new(NameOnly))
        .build();

    let registry = SchemaRegistry::new();
    let mut bound = registry
        .get_or_build(&model)
        .unwrap()
        .bind(json!({"name": "Van", "age": "69"}));
    assert!(bound.is_valid(false).unwrap());
    assert_eq!(bound.state(), ValidationState::BackPopulated);
    assert_eq!(
        Value::Object(bound.validated_data().unwrap().clone()),
        json!({"name": "VAN", "age": 69})
    );
    assert!(bound.source_instance().get("age").is_none());
}

#[test]
fn test_source_instance_renders_like_validated_output() {
    let job = SourceModel::derived("Job")
        .field(FieldDescriptor::new("title", TypeAnnotation::Str).alias("jobTitle"))
        .field(FieldDescriptor::new("salary", TypeAnnotation::Float))
        .build();
    let model = SourceModel::derived("Person")
        .field(FieldDescriptor::new("name", TypeAnnotation::Str))
        .field(FieldDescriptor::new("jobs", TypeAnnotation::list(TypeAnnotation::model(&job))))
        .config(PartialConfig::new().validate_against_source(true))
        .build();

    let registry = SchemaRegistry::new();
    let schema = registry.get_or_build(&model).unwrap();
    let input = json!({
        "name": "Van",
        "jobs": [{"jobTitle": "Artist", "salary": 1000.5}, {"jobTitle": "Poet", "salary": 10}]
    });
    let mut bound = schema.bind(input);
    assert!(bound.is_valid(true).unwrap());

    let output = bound.output().unwrap();
    assert_eq!(schema.represent_instance(bound.source_instance()), output);
    assert_eq!(output["jobs"][1]["jobTitle"], json!("Poet"));

    let mut again = schema.bind(Value::Object(output.clone()));
    assert!(again.is_valid(true).unwrap());
    assert_eq!(again.output().unwrap(), output);
}
