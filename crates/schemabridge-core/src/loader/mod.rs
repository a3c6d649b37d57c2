//! Declarative model documents
//!
//! A model document is a JSON or YAML file listing enumerations and source
//! models. Field types are written as type expressions (`list[int]`,
//! `str | None`, `Literal["a", "b"]`) and may name any enum or model of the
//! same document, in any order, including the model being declared.
//!
//! ```yaml
//! enums:
//!   - name: Color
//!     members: {RED: red, GREEN: green}
//! models:
//!   - name: Person
//!     config: {validate_against_source: true}
//!     fields:
//!       - {name: name, type: str}
//!       - {name: favorite, type: Color | None, default: null}
//!       - {name: friends, type: "list[Person]", default: []}
//! ```
//!
//! Copyright (c) 2025 Schemabridge Team
//! Licensed under the Apache-2.0 license

pub mod document;
pub mod error;
pub mod type_expr;

pub use document::{ConstraintDocument, EnumDocument, FieldDocument, ModelDoc, ModelDocument};
pub use error::{LoaderError, LoaderResult};
pub use type_expr::{parse_type_expr, TypeExprError, TypeScope};

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::source::{EnumType, FieldDescriptor, ForwardDecl, ModelRef, SourceModel};

/// Serialization format of a model document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(DocumentFormat::Json),
            "yaml" | "yml" => Some(DocumentFormat::Yaml),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Json => write!(f, "json"),
            DocumentFormat::Yaml => write!(f, "yaml"),
        }
    }
}

/// Models and enums built from one document, in declaration order.
///
/// The set owns its models. Forward references between them are weak, so
/// nested references stop resolving once the set is dropped.
#[derive(Debug, Default)]
pub struct ModelSet {
    models: Vec<Arc<SourceModel>>,
    enums: Vec<Arc<EnumType>>,
}

impl ModelSet {
    pub fn get(&self, name: &str) -> Option<&Arc<SourceModel>> {
        self.models.iter().find(|model| model.name() == name)
    }

    pub fn enum_type(&self, name: &str) -> Option<&Arc<EnumType>> {
        self.enums.iter().find(|enum_type| enum_type.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<SourceModel>> {
        self.models.iter()
    }

    /// Models that opt into schema derivation
    pub fn derived(&self) -> impl Iterator<Item = &Arc<SourceModel>> {
        self.models.iter().filter(|model| model.derives_schema())
    }

    pub fn names(&self) -> Vec<&str> {
        self.models.iter().map(|model| model.name()).collect()
    }

    pub fn enums(&self) -> &[Arc<EnumType>] {
        &self.enums
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Load a model document from a `.json`, `.yaml` or `.yml` file
pub fn load_models_from_path(path: impl AsRef<Path>) -> LoaderResult<ModelSet> {
    let path = path.as_ref();
    let format = DocumentFormat::from_path(path)
        .ok_or_else(|| LoaderError::unsupported_format(path.to_path_buf()))?;
    let content = std::fs::read_to_string(path)
        .map_err(|err| LoaderError::io_error(path.to_path_buf(), err))?;
    debug!(path = %path.display(), %format, "loading model document");
    parse_document(&content, format, &path.display().to_string()).and_then(build_models)
}

/// Load a model document from a string
pub fn load_models_from_str(content: &str, format: DocumentFormat) -> LoaderResult<ModelSet> {
    parse_document(content, format, "<inline>").and_then(build_models)
}

fn parse_document(content: &str, format: DocumentFormat, origin: &str) -> LoaderResult<ModelDocument> {
    match format {
        DocumentFormat::Json => {
            serde_json::from_str(content).map_err(|err| LoaderError::json_parse_error(origin, err))
        }
        DocumentFormat::Yaml => {
            serde_yaml::from_str(content).map_err(|err| LoaderError::yaml_parse_error(origin, err))
        }
    }
}

/// Build every enum and model of a parsed document
pub fn build_models(document: ModelDocument) -> LoaderResult<ModelSet> {
    let mut seen = HashSet::new();
    for name in document
        .enums
        .iter()
        .map(|e| &e.name)
        .chain(document.models.iter().map(|m| &m.name))
    {
        if !seen.insert(name.as_str()) {
            return Err(LoaderError::duplicate_name(name.clone()));
        }
    }

    let mut scope = TypeScope::new();
    let enums: Vec<Arc<EnumType>> = document
        .enums
        .iter()
        .map(|doc| Arc::new(EnumType::new(doc.name.clone(), doc.members.pairs())))
        .collect();
    for enum_type in &enums {
        scope.add_enum(Arc::clone(enum_type));
    }

    let mut declarations: HashMap<&str, ForwardDecl> = HashMap::new();
    for doc in &document.models {
        let (reference, declaration) = ModelRef::forward(doc.name.clone());
        scope.add_model(reference);
        declarations.insert(doc.name.as_str(), declaration);
    }

    let mut built: HashMap<&str, Arc<SourceModel>> = HashMap::new();
    for doc in inheritance_order(&document.models)? {
        let mut builder = if doc.plain {
            SourceModel::plain(doc.name.clone())
        } else {
            SourceModel::derived(doc.name.clone())
        };
        if let Some(parent) = &doc.extends {
            // inheritance_order guarantees parents are built first
            if let Some(parent) = built.get(parent.as_str()) {
                builder = builder.extends(parent);
            }
        }
        if let Some(config) = doc.config {
            builder = builder.config(config);
        }
        for field in &doc.fields {
            builder = builder.field(field_descriptor(doc, field, &scope)?);
        }
        built.insert(doc.name.as_str(), builder.build());
    }

    for (name, declaration) in declarations {
        if let Some(model) = built.get(name) {
            declaration.resolve(model);
        }
    }

    let models: Vec<Arc<SourceModel>> = document
        .models
        .iter()
        .filter_map(|doc| built.get(doc.name.as_str()).cloned())
        .collect();
    debug!(models = models.len(), enums = enums.len(), "built model document");
    Ok(ModelSet { models, enums })
}

/// Order models so that every parent precedes its children
fn inheritance_order(models: &[ModelDoc]) -> LoaderResult<Vec<&ModelDoc>> {
    let by_name: HashMap<&str, &ModelDoc> =
        models.iter().map(|doc| (doc.name.as_str(), doc)).collect();
    let mut ordered = Vec::with_capacity(models.len());
    let mut placed: HashSet<&str> = HashSet::new();

    for doc in models {
        let mut chain: Vec<&ModelDoc> = Vec::new();
        let mut current = Some(doc);
        while let Some(model) = current {
            if placed.contains(model.name.as_str()) {
                break;
            }
            if chain.iter().any(|seen| seen.name == model.name) {
                let mut names: Vec<String> =
                    chain.iter().map(|seen| seen.name.clone()).collect();
                names.push(model.name.clone());
                return Err(LoaderError::circular_inheritance(&names));
            }
            chain.push(model);
            current = match &model.extends {
                Some(parent) => Some(*by_name.get(parent.as_str()).ok_or_else(|| {
                    LoaderError::UnknownParent {
                        model: model.name.clone(),
                        parent: parent.clone(),
                    }
                })?),
                None => None,
            };
        }
        for model in chain.into_iter().rev() {
            placed.insert(model.name.as_str());
            ordered.push(model);
        }
    }
    Ok(ordered)
}

fn field_descriptor(
    model: &ModelDoc,
    doc: &FieldDocument,
    scope: &TypeScope,
) -> LoaderResult<FieldDescriptor> {
    if model.fields.iter().filter(|f| f.name == doc.name).count() > 1 {
        return Err(LoaderError::invalid_field(
            &model.name,
            &doc.name,
            "field is declared more than once",
        ));
    }

    let mut field = match &doc.type_expr {
        Some(expr) => {
            let annotation =
                parse_type_expr(expr, scope).map_err(|err| LoaderError::TypeExpression {
                    model: model.name.clone(),
                    field: doc.name.clone(),
                    expr: expr.clone(),
                    position: err.position,
                    message: err.message,
                })?;
            FieldDescriptor::new(doc.name.clone(), annotation)
        }
        None => FieldDescriptor::untyped(doc.name.clone()),
    };

    if let Some(default) = &doc.default {
        if doc.required == Some(true) {
            return Err(LoaderError::invalid_field(
                &model.name,
                &doc.name,
                "a required field cannot declare a default",
            ));
        }
        field = field.default(default.clone());
    }
    if let Some(required) = doc.required {
        field = field.required(required);
    }
    if let Some(description) = &doc.description {
        field = field.description(description.clone());
    }
    if let Some(title) = &doc.title {
        field = field.title(title.clone());
    }
    if let Some(alias) = &doc.alias {
        field = field.alias(alias.clone());
    }
    if let Some(alias) = &doc.validation_alias {
        field = field.validation_alias(alias.clone());
    }
    if let Some(alias) = &doc.serialization_alias {
        field = field.serialization_alias(alias.clone());
    }
    Ok(field.constraints(doc.constraints.iter().flat_map(ConstraintDocument::to_constraints)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::TypeAnnotation;

    const DOCUMENT: &str = r#"
enums:
  - name: Color
    members: {RED: red, GREEN: green}
models:
  - name: Employee
    extends: Person
    fields:
      - {name: salary, type: float}
  - name: Person
    config: {validate_against_source: true}
    fields:
      - {name: name, type: str, constraints: [{min_length: 1}]}
      - {name: favorite, type: Color | None, default: null}
      - {name: friends, type: "list[Person]", default: []}
"#;

    #[test]
    fn test_build_document() {
        let set = load_models_from_str(DOCUMENT, DocumentFormat::Yaml).unwrap();
        assert_eq!(set.names(), vec!["Employee", "Person"]);

        let employee = set.get("Employee").unwrap();
        let field_names: Vec<&str> = employee.fields().iter().map(|f| f.name()).collect();
        assert_eq!(field_names, vec!["name", "favorite", "friends", "salary"]);
        assert_eq!(employee.parent().map(|p| p.name()), Some("Person"));

        let person = set.get("Person").unwrap();
        assert!(person.explicit_config().is_some());
        let favorite = person.field("favorite").unwrap();
        assert!(!favorite.is_required());
        assert_eq!(favorite.default_value().resolve(), Some(serde_json::Value::Null));

        match person.field("friends").and_then(|f| f.annotation()) {
            Some(TypeAnnotation::List(inner)) => match inner.as_ref() {
                TypeAnnotation::Model(reference) => {
                    assert_eq!(reference.get().map(|m| m.id()), Some(person.id()))
                }
                other => panic!("unexpected element {other:?}"),
            },
            other => panic!("unexpected annotation {other:?}"),
        }
    }

    #[test]
    fn test_unknown_parent() {
        let doc = r#"{"models": [{"name": "A", "extends": "B"}]}"#;
        let err = load_models_from_str(doc, DocumentFormat::Json).unwrap_err();
        assert!(matches!(err, LoaderError::UnknownParent { .. }));
    }

    #[test]
    fn test_circular_inheritance() {
        let doc = r#"{"models": [{"name": "A", "extends": "B"}, {"name": "B", "extends": "A"}]}"#;
        let err = load_models_from_str(doc, DocumentFormat::Json).unwrap_err();
        assert_eq!(err.to_string(), "Circular inheritance detected: A -> B -> A");
    }

    #[test]
    fn test_duplicate_names() {
        let doc = r#"{"enums": [{"name": "A", "members": ["X"]}], "models": [{"name": "A"}]}"#;
        let err = load_models_from_str(doc, DocumentFormat::Json).unwrap_err();
        assert!(matches!(err, LoaderError::DuplicateName { name } if name == "A"));
    }

    #[test]
    fn test_bad_type_expression() {
        let doc = r#"{"models": [{"name": "A", "fields": [{"name": "x", "type": "list[int"}]}]}"#;
        let err = load_models_from_str(doc, DocumentFormat::Json).unwrap_err();
        assert!(err.to_string().starts_with("Invalid type 'list[int' for field 'A.x'"));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(DocumentFormat::from_path(Path::new("m.YML")), Some(DocumentFormat::Yaml));
        assert_eq!(DocumentFormat::from_path(Path::new("m.json")), Some(DocumentFormat::Json));
        assert_eq!(DocumentFormat::from_path(Path::new("m.toml")), None);
    }
}
