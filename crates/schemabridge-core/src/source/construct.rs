//! Construction of source instances from plain mappings

use serde_json::{Map, Value};
use tracing::trace;

use super::annotation::{TupleItem, TypeAnnotation};
use super::instance::{LocSegment, SourceErrorItem, SourceInstance, SourceValidationError, SourceValue};
use super::model::SourceModel;

/// Builds source instances from already-validated data.
///
/// Implement this to plug a different validation engine into a source model;
/// models without a custom constructor use [`ReferenceConstructor`].
pub trait SourceConstructor: Send + Sync {
    fn construct(
        &self,
        model: &SourceModel,
        data: &Map<String, Value>,
    ) -> Result<SourceInstance, SourceValidationError>;
}

/// Default constructor.
///
/// Reads each field under its validation key (falling back to its name),
/// fills defaults, recurses into nested models, then runs field validators
/// and, once every field passed, model validators.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceConstructor;

impl SourceConstructor for ReferenceConstructor {
    fn construct(
        &self,
        model: &SourceModel,
        data: &Map<String, Value>,
    ) -> Result<SourceInstance, SourceValidationError> {
        let mut errors = Vec::new();
        let mut attributes = Vec::new();

        for field in model.fields() {
            let key = field.validation_key();
            let loc = vec![LocSegment::from(key)];

            let raw = match data.get(key).or_else(|| data.get(field.name())) {
                Some(raw) => raw.clone(),
                None => {
                    match field.default_value().resolve() {
                        Some(default) => attributes.push((field.name().to_string(), SourceValue::Value(default))),
                        None if field.is_required() => errors.push(SourceErrorItem::missing(loc)),
                        None => {}
                    }
                    continue;
                }
            };

            let lifted = match field.annotation() {
                Some(annotation) => lift(annotation, raw, &loc, &mut errors),
                None => Some(SourceValue::Value(raw)),
            };
            let Some(value) = lifted else {
                continue;
            };

            match model
                .field_validators_for(field.name())
                .try_fold(value, |value, validator| validator(value))
            {
                Ok(value) => attributes.push((field.name().to_string(), value)),
                Err(message) => errors.push(SourceErrorItem::value_error(loc, &message)),
            }
        }

        if !errors.is_empty() {
            trace!(model = model.name(), errors = errors.len(), "source field validation failed");
            return Err(SourceValidationError::new(model.name(), errors));
        }

        let mut instance = SourceInstance::new(model, attributes);
        for validator in model.model_validators() {
            if let Err(message) = validator(&mut instance) {
                return Err(SourceValidationError::new(
                    model.name(),
                    vec![SourceErrorItem::value_error(Vec::new(), &message)],
                ));
            }
        }
        Ok(instance)
    }
}

/// Turn raw data into an attribute value, constructing nested instances.
///
/// Returns `None` when a nested construction failed; its errors are pushed
/// onto `errors` rooted at `loc`.
fn lift(
    annotation: &TypeAnnotation,
    raw: Value,
    loc: &[LocSegment],
    errors: &mut Vec<SourceErrorItem>,
) -> Option<SourceValue> {
    if !annotation.contains_model() || raw.is_null() {
        return Some(SourceValue::Value(raw));
    }

    match annotation {
        TypeAnnotation::Model(reference) => match (reference.get(), raw) {
            (Some(nested), Value::Object(object)) => match nested.construct(&object) {
                Ok(instance) => Some(SourceValue::Instance(instance)),
                Err(err) => {
                    errors.extend(err.errors.into_iter().map(|item| item.rooted_at(loc)));
                    None
                }
            },
            (_, raw) => Some(SourceValue::Value(raw)),
        },
        TypeAnnotation::Union(members) => match members.iter().find(|member| member.contains_model()) {
            Some(member) => lift(member, raw, loc, errors),
            None => Some(SourceValue::Value(raw)),
        },
        TypeAnnotation::List(item) => lift_sequence(item, raw, loc, errors),
        TypeAnnotation::Tuple(items) => match items.first() {
            Some(TupleItem::Type(item)) => lift_sequence(item, raw, loc, errors),
            _ => Some(SourceValue::Value(raw)),
        },
        TypeAnnotation::Dict { value, .. } => match raw {
            Value::Object(object) => {
                let mut entries = Vec::with_capacity(object.len());
                let mut failed = false;
                for (key, item) in object {
                    let mut item_loc = loc.to_vec();
                    item_loc.push(LocSegment::Field(key.clone()));
                    match lift(value, item, &item_loc, errors) {
                        Some(lifted) => entries.push((key, lifted)),
                        None => failed = true,
                    }
                }
                (!failed).then_some(SourceValue::Map(entries))
            }
            raw => Some(SourceValue::Value(raw)),
        },
        _ => Some(SourceValue::Value(raw)),
    }
}

fn lift_sequence(
    item: &TypeAnnotation,
    raw: Value,
    loc: &[LocSegment],
    errors: &mut Vec<SourceErrorItem>,
) -> Option<SourceValue> {
    match raw {
        Value::Array(values) => {
            let mut items = Vec::with_capacity(values.len());
            let mut failed = false;
            for (index, value) in values.into_iter().enumerate() {
                let mut item_loc = loc.to_vec();
                item_loc.push(LocSegment::Index(index));
                match lift(item, value, &item_loc, errors) {
                    Some(lifted) => items.push(lifted),
                    None => failed = true,
                }
            }
            (!failed).then_some(SourceValue::List(items))
        }
        raw => Some(SourceValue::Value(raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FieldDescriptor;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_missing_and_defaults() {
        let model = SourceModel::derived("Person")
            .field(FieldDescriptor::new("name", TypeAnnotation::Str))
            .field(FieldDescriptor::new("age", TypeAnnotation::Int).default(1))
            .build();

        let err = model.construct(&object(json!({}))).unwrap_err();
        assert_eq!(err.errors, vec![SourceErrorItem::missing(vec!["name".into()])]);

        let instance = model.construct(&object(json!({"name": "Van"}))).unwrap();
        assert_eq!(instance.value("age"), Some(&json!(1)));
    }

    #[test]
    fn test_field_validator_rewrites_value() {
        let model = SourceModel::derived("Person")
            .field(FieldDescriptor::new("name", TypeAnnotation::Str))
            .field_validator("name", |value| match value.as_str() {
                Some(name) => Ok(SourceValue::Value(json!(name.to_uppercase()))),
                None => Err("name must be text".to_string()),
            })
            .build();

        let instance = model.construct(&object(json!({"name": "van"}))).unwrap();
        assert_eq!(instance.value("name"), Some(&json!("VAN")));
    }

    #[test]
    fn test_model_validator_runs_after_fields() {
        let model = SourceModel::derived("Range")
            .field(FieldDescriptor::new("low", TypeAnnotation::Int))
            .field(FieldDescriptor::new("high", TypeAnnotation::Int))
            .model_validator(|instance| {
                let low = instance.value("low").and_then(Value::as_i64).unwrap_or_default();
                let high = instance.value("high").and_then(Value::as_i64).unwrap_or_default();
                if low > high {
                    Err("low exceeds high".to_string())
                } else {
                    Ok(())
                }
            })
            .build();

        let err = model.construct(&object(json!({"low": 5, "high": 1}))).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert!(err.errors[0].loc.is_empty());
        assert_eq!(err.errors[0].msg, "Value error, low exceeds high");

        // field errors short-circuit model validators
        let err = model.construct(&object(json!({"low": 5}))).unwrap_err();
        assert_eq!(err.errors[0].kind, "missing");
    }

    #[test]
    fn test_nested_errors_are_rooted() {
        let child = SourceModel::derived("Child")
            .field(FieldDescriptor::new("name", TypeAnnotation::Str))
            .build();
        let parent = SourceModel::derived("Parent")
            .field(FieldDescriptor::new("children", TypeAnnotation::list(TypeAnnotation::model(&child))))
            .build();

        let err = parent
            .construct(&object(json!({"children": [{"name": "a"}, {}]})))
            .unwrap_err();
        assert_eq!(
            err.errors[0].loc,
            vec![LocSegment::from("children"), LocSegment::Index(1), LocSegment::from("name")]
        );

        let instance = parent
            .construct(&object(json!({"children": [{"name": "a"}]})))
            .unwrap();
        match instance.get("children") {
            Some(SourceValue::List(items)) => assert!(items[0].as_instance().is_some()),
            other => panic!("unexpected {other:?}"),
        }
    }
}
