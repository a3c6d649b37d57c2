//! Conversion of source fields into derived fields
//!
//! Conversion runs per field in three steps: a manual override in the
//! field's metadata is used verbatim; otherwise the constraint metadata is
//! folded into a [`ConstraintSet`] and the annotation is classified and
//! dispatched to a concrete [`FieldKind`](crate::fields::FieldKind).
//! Nested models are compiled through the active registry build session.
//!
//! Unknown types, conflicting constraints and unsupported shapes are
//! field-attributed hard errors. Approximations (exclusive bounds) are
//! recorded as [`ConversionWarning`]s.
//!
//! Copyright (c) 2025 Schemabridge Team
//! Licensed under the Apache-2.0 license

pub mod classify;
pub mod constraints;
mod factory;
mod warnings;

pub use classify::{classify, resolve, ClassifyError, Kind, Resolved};
pub use constraints::{Axis, ConstraintSet};
pub use warnings::{ConversionWarning, WarningCode};

pub(crate) use factory::convert_field;
pub(crate) use warnings::WarningTracker;

use crate::error::FieldConversionError;
use crate::registry::BuildSession;

/// State threaded through the conversion of one field
pub(crate) struct ConversionContext<'s, 'r> {
    pub(crate) session: &'s mut BuildSession<'r>,
    pub(crate) warnings: &'s mut WarningTracker,
    pub(crate) field: String,
}

impl ConversionContext<'_, '_> {
    pub(crate) fn error(&self, message: impl Into<String>) -> FieldConversionError {
        FieldConversionError::new(self.field.clone(), message)
    }
}
