//! Constraint metadata attached to source fields

use crate::fields::DerivedField;

/// One piece of constraint metadata on a field.
///
/// A field may carry any number of these. They are folded into a single
/// constraint set during conversion; overlapping entries are either narrowed
/// or rejected depending on the axis.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Bundled string constraints
    StringConstraints {
        min_length: Option<usize>,
        max_length: Option<usize>,
        pattern: Option<String>,
    },
    MinLen(usize),
    MaxLen(usize),
    /// Inclusive lower bound
    Ge(f64),
    /// Exclusive lower bound; approximated as inclusive
    Gt(f64),
    /// Inclusive upper bound
    Le(f64),
    /// Exclusive upper bound; approximated as inclusive
    Lt(f64),
    /// Decimal precision
    Precision {
        max_digits: Option<u32>,
        decimal_places: Option<u32>,
    },
    /// A pre-built derived field that replaces automatic conversion
    Field(Box<DerivedField>),
}

impl Constraint {
    pub fn pattern(pattern: impl Into<String>) -> Self {
        Constraint::StringConstraints {
            min_length: None,
            max_length: None,
            pattern: Some(pattern.into()),
        }
    }

    pub fn length(min_length: Option<usize>, max_length: Option<usize>) -> Self {
        Constraint::StringConstraints {
            min_length,
            max_length,
            pattern: None,
        }
    }

    pub fn precision(max_digits: Option<u32>, decimal_places: Option<u32>) -> Self {
        Constraint::Precision {
            max_digits,
            decimal_places,
        }
    }

    /// Use `field` verbatim instead of converting the annotation
    pub fn manual(field: DerivedField) -> Self {
        Constraint::Field(Box::new(field))
    }
}
