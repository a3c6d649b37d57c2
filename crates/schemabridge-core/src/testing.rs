//! Structural comparison helpers for derived schemas and fields
//!
//! Two schemas compare equal when they have the same name and the same
//! fields in the same order, where fields compare by kind, presence
//! options and (for composites) their element fields.

use crate::fields::DerivedField;
use crate::schema::DerivedSchema;

/// Whether two schemas are structurally equivalent
pub fn compare_schemas(first: &DerivedSchema, second: &DerivedSchema) -> bool {
    first.name() == second.name()
        && first.len() == second.len()
        && first
            .fields()
            .iter()
            .zip(second.fields())
            .all(|(a, b)| a.name() == b.name() && compare_fields(a, b))
}

/// Whether two fields are structurally equivalent
pub fn compare_fields(first: &DerivedField, second: &DerivedField) -> bool {
    if first.kind_name() != second.kind_name()
        || first.is_required() != second.is_required()
        || first.default_value() != second.default_value()
        || first.allows_null() != second.allows_null()
        || first.choices() != second.choices()
    {
        return false;
    }

    match (first.child(), second.child()) {
        (Some(a), Some(b)) => compare_fields(a, b),
        (None, None) => match (first.nested_schema(), second.nested_schema()) {
            (Some(a), Some(b)) => a.name() == b.name(),
            (None, None) => true,
            _ => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_fields() {
        assert!(compare_fields(&DerivedField::char(), &DerivedField::char()));
        assert!(!compare_fields(&DerivedField::char(), &DerivedField::integer()));
        assert!(!compare_fields(
            &DerivedField::char(),
            &DerivedField::char().required(false)
        ));
        assert!(!compare_fields(
            &DerivedField::list(DerivedField::char()),
            &DerivedField::list(DerivedField::integer())
        ));
        assert!(!compare_fields(
            &DerivedField::choice(["a"]),
            &DerivedField::choice(["b"])
        ));
    }
}
