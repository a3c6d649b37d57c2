//! Model document loading tests

use serde_json::json;
use std::io::Write;
use schemabridge_core::loader::LoaderError;
use schemabridge_core::{
    load_models_from_path, load_models_from_str, DocumentFormat, ErrorAuthority, SchemaRegistry,
    ValidationState,
};
use tempfile::{Builder, NamedTempFile};

const PEOPLE_YAML: &str = r#"
enums:
  - name: Level
    members: [junior, senior]
models:
  - name: Job
    fields:
      - {name: title, type: str, constraints: [{min_length: 2}]}
      - {name: level, type: Level, default: junior}
      - name: salary
        type: decimal
        constraints: [{max_digits: 8, decimal_places: 2}, {gt: 0}]
  - name: Person
    config:
      validate_against_source: true
      error_authority: derived
    fields:
      - {name: name, type: str, alias: fullName}
      - {name: age, type: "int | None", default: null}
      - {name: tags, type: "tuple[str, ...]", default: []}
      - {name: jobs, type: "list[Job]", required: false}
      - {name: extra, type: "dict[str, JsonValue]", default: {}}
"#;

fn temp_file(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp file");
    file.write_all(content.as_bytes()).expect("write temp file");
    file
}

#[test]
fn test_load_yaml_file_and_validate() {
    let file = temp_file(".yaml", PEOPLE_YAML);
    let models = load_models_from_path(file.path()).unwrap();
    assert_eq!(models.names(), vec!["Job", "Person"]);
    assert_eq!(models.enum_type("Level").unwrap().values(), vec![json!("junior"), json!("senior")]);

    let registry = SchemaRegistry::new();
    let person = models.get("Person").unwrap();
    let schema = registry.get_or_build(person).unwrap();
    assert_eq!(schema.config().error_authority, ErrorAuthority::Derived);
    assert_eq!(schema.warnings().len(), 0);

    let job = registry.get(models.get("Job").unwrap()).unwrap();
    assert_eq!(job.warnings().len(), 1);
    assert_eq!(job.field("salary").unwrap().min_value(), Some(0.0));

    let mut bound = schema.bind(json!({
        "fullName": "Van",
        "tags": ["a", "b"],
        "jobs": [{"title": "Artist", "salary": "1200.50", "level": "senior"}]
    }));
    assert!(bound.is_valid(true).unwrap());
    assert_eq!(bound.state(), ValidationState::BackPopulated);

    let output = bound.output().unwrap();
    assert_eq!(output["fullName"], json!("Van"));
    assert_eq!(output["age"], serde_json::Value::Null);
    assert_eq!(output["jobs"][0]["level"], json!("senior"));
    assert_eq!(output["jobs"][0]["salary"], json!("1200.50"));
    assert_eq!(output["extra"], json!({}));
}

#[test]
fn test_load_json_string() {
    let document = json!({
        "models": [{
            "name": "Point",
            "fields": [
                {"name": "x", "type": "float"},
                {"name": "y", "type": "float"},
                {"name": "label", "type": "Literal[\"a\", \"b\"] | None", "default": null}
            ]
        }]
    });
    let models = load_models_from_str(&document.to_string(), DocumentFormat::Json).unwrap();
    let schema = SchemaRegistry::new()
        .get_or_build(models.get("Point").unwrap())
        .unwrap();
    assert_eq!(schema.field("label").unwrap().kind_name(), "ChoiceField");
    assert!(schema.field("label").unwrap().allows_null());

    let mut bound = schema.bind(json!({"x": 1, "y": "2.5", "label": "c"}));
    assert!(!bound.is_valid(false).unwrap());
    assert_eq!(
        bound.errors().unwrap().to_json(),
        json!({"label": ["\"c\" is not a valid choice."]})
    );
}

#[test]
fn test_self_referencing_document() {
    let document = r#"
models:
  - name: Tree
    fields:
      - {name: value, type: int}
      - {name: children, type: "list[Tree]", default: []}
"#;
    let models = load_models_from_str(document, DocumentFormat::Yaml).unwrap();
    let schema = SchemaRegistry::new()
        .get_or_build(models.get("Tree").unwrap())
        .unwrap();
    let mut bound = schema.bind(json!({"value": 1, "children": [{"value": 2, "children": [{"value": "x"}]}]}));
    assert!(!bound.is_valid(false).unwrap());
    assert_eq!(
        bound.errors().unwrap().to_json(),
        json!({"children": {"0": {"children": {"0": {"value": ["A valid integer is required."]}}}}})
    );
}

#[test]
fn test_unknown_type_fails_at_conversion_not_load() {
    let document = r#"{"models": [{"name": "Odd", "fields": [{"name": "when", "type": "Any"}]}]}"#;
    let models = load_models_from_str(document, DocumentFormat::Json).unwrap();
    let err = SchemaRegistry::new()
        .get_or_build(models.get("Odd").unwrap())
        .unwrap_err();
    assert!(err.to_string().contains("Any is not a supported scalar type."));
}

#[test]
fn test_plain_models_are_not_derived() {
    let document = r#"
models:
  - {name: Raw, plain: true, fields: [{name: x, type: int}]}
  - {name: Wrapper, fields: [{name: raw, type: Raw}]}
"#;
    let models = load_models_from_str(document, DocumentFormat::Yaml).unwrap();
    assert_eq!(models.derived().count(), 1);
    let err = SchemaRegistry::new()
        .get_or_build(models.get("Wrapper").unwrap())
        .unwrap_err();
    assert!(err.to_string().contains("Nested model Raw is not a derived model."));
}

#[test]
fn test_loader_errors() {
    let file = temp_file(".txt", "models: []");
    assert!(matches!(
        load_models_from_path(file.path()),
        Err(LoaderError::UnsupportedFormat { .. })
    ));

    assert!(matches!(
        load_models_from_path("/nonexistent/models.yaml"),
        Err(LoaderError::IoError { .. })
    ));

    let file = temp_file(".json", "{not json");
    assert!(matches!(
        load_models_from_path(file.path()),
        Err(LoaderError::JsonParseError { .. })
    ));

    let bad_key = "models:\n  - {name: A, fields: [{name: x, kind: int}]}\n";
    assert!(matches!(
        load_models_from_str(bad_key, DocumentFormat::Yaml),
        Err(LoaderError::YamlParseError { .. })
    ));

    let conflicting = r#"{"models": [{"name": "A", "fields": [{"name": "x", "type": "int", "required": true, "default": 1}]}]}"#;
    assert!(matches!(
        load_models_from_str(conflicting, DocumentFormat::Json),
        Err(LoaderError::InvalidField { .. })
    ));
}

#[test]
fn test_loader_error_converts_into_crate_error() {
    let err: schemabridge_core::Error = load_models_from_str("[", DocumentFormat::Json).unwrap_err().into();
    assert!(matches!(err, schemabridge_core::Error::Loader(_)));
}
