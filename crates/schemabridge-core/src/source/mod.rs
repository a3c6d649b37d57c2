//! Source models: the declarative input to schema derivation
//!
//! A [`SourceModel`] is an ordered list of [`FieldDescriptor`]s, each with a
//! [`TypeAnnotation`], default, documentation, aliases and constraint
//! metadata. Models opt into derivation with [`SourceModel::derived`]; models
//! built with [`SourceModel::plain`] can only be used as source data and are
//! rejected when nested inside a derived model.
//!
//! Source models also validate themselves: [`SourceModel::construct`] builds a
//! [`SourceInstance`] from a mapping or fails with a [`SourceValidationError`]
//! listing located errors.
//!
//! Copyright (c) 2025 Schemabridge Team
//! Licensed under the Apache-2.0 license

mod annotation;
mod constraint;
mod construct;
mod instance;
mod model;

pub use annotation::{EnumInput, EnumMember, EnumType, TupleItem, TypeAlias, TypeAnnotation};
pub use constraint::Constraint;
pub use construct::{ReferenceConstructor, SourceConstructor};
pub use instance::{
    LocSegment, SourceErrorItem, SourceInstance, SourceValidationError, SourceValue,
};
pub use model::{
    DefaultValue, FieldDescriptor, FieldValidatorFn, ForwardDecl, ModelId, ModelRef,
    ModelValidatorFn, SourceModel, SourceModelBuilder,
};
