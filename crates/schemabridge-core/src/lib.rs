//! Schemabridge Core - type-directed schema compiler
//!
//! This crate compiles declarative data models (field name -> type + constraints)
//! into structurally equivalent validation/serialization schemas, caches the
//! mapping so that every source model has exactly one derived schema, and
//! reconciles the derived schema's own validation with the source model's
//! validation into a single error-reporting protocol.
//!
//! # Main Components
//!
//! - **Source models**: the declarative input ([`SourceModel`], [`FieldDescriptor`],
//!   [`TypeAnnotation`], [`Constraint`])
//! - **Conversion**: type classification, constraint extraction and the field
//!   factory ([`convert`])
//! - **Derived fields and schemas**: validators and representations for every
//!   supported field kind ([`DerivedField`], [`DerivedSchema`])
//! - **Registry**: identity-keyed memoization of derived schemas ([`SchemaRegistry`])
//! - **Dual validation**: the validate-then-reconcile protocol ([`BoundSchema`])
//! - **Loader**: JSON/YAML model documents ([`loader`])
//!
//! # Example
//!
//! ```
//! use schemabridge_core::{FieldDescriptor, SchemaRegistry, SourceModel, TypeAnnotation};
//! use serde_json::json;
//!
//! let person = SourceModel::derived("Person")
//!     .field(FieldDescriptor::new("name", TypeAnnotation::Str))
//!     .field(FieldDescriptor::new("age", TypeAnnotation::Int))
//!     .build();
//!
//! let registry = SchemaRegistry::new();
//! let schema = registry.get_or_build(&person).unwrap();
//!
//! let mut bound = schema.bind(json!({"name": "Van", "age": 69}));
//! assert!(bound.is_valid(false).unwrap());
//! assert_eq!(bound.validated_data().unwrap()["age"], json!(69));
//! ```
//!
//! Copyright (c) 2025 Schemabridge Team
//! Licensed under the Apache-2.0 license

pub mod config;
pub mod convert;
pub mod coordinator;
pub mod describe;
pub mod error;
pub mod fields;
pub mod loader;
pub mod registry;
pub mod schema;
pub mod settings;
pub mod source;
pub mod testing;

// Re-export main types for convenience
pub use config::{ConfigBundle, ErrorAuthority, PartialConfig};
pub use convert::{ConversionWarning, WarningCode};
pub use coordinator::{BoundSchema, ValidationState};
pub use describe::{FieldDescription, SchemaDescription};
pub use error::{Error, FieldConversionError, ModelConversionError, Result, ValidationFailure};
pub use fields::{
    ChoiceSet, DerivedField, ErrorDetail, FieldKind, FieldOptions, NumericBounds, SchemaLink,
    TextRules,
};
pub use loader::{load_models_from_path, load_models_from_str, DocumentFormat, ModelSet};
pub use registry::SchemaRegistry;
pub use schema::DerivedSchema;
pub use settings::Settings;
pub use source::{
    Constraint, DefaultValue, EnumInput, EnumMember, EnumType, FieldDescriptor, ForwardDecl,
    LocSegment, ModelId, ModelRef, SourceConstructor, SourceErrorItem, SourceInstance,
    SourceModel, SourceModelBuilder, SourceValidationError, SourceValue, TupleItem, TypeAlias,
    TypeAnnotation,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
