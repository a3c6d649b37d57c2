//! Folding of field constraint metadata into a single constraint set

use std::fmt;

use super::warnings::WarningTracker;
use crate::error::FieldConversionError;
use crate::fields::DerivedField;
use crate::source::Constraint;

/// A constraint axis, named the way conversion errors report it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    MinLength,
    MaxLength,
    MinValue,
    MaxValue,
    MaxDigits,
    DecimalPlaces,
    Pattern,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::MinLength => "min_length",
            Axis::MaxLength => "max_length",
            Axis::MinValue => "min_value",
            Axis::MaxValue => "max_value",
            Axis::MaxDigits => "max_digits",
            Axis::DecimalPlaces => "decimal_places",
            Axis::Pattern => "pattern",
        };
        write!(f, "{name}")
    }
}

/// The combined constraints of one field.
///
/// Length bounds narrow when repeated. Numeric bounds, each precision axis
/// and patterns may only be declared once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintSet {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub max_digits: Option<u32>,
    pub decimal_places: Option<u32>,
    pub pattern: Option<String>,
}

impl ConstraintSet {
    /// Fold `metadata` for `field`, skipping manual field overrides.
    ///
    /// Exclusive numeric bounds are applied as inclusive and recorded on
    /// `warnings`.
    pub(crate) fn extract(
        field: &str,
        metadata: &[Constraint],
        warnings: &mut WarningTracker,
    ) -> Result<Self, FieldConversionError> {
        let mut set = ConstraintSet::default();
        let mut patterns = Vec::new();

        for constraint in metadata {
            match constraint {
                Constraint::StringConstraints {
                    min_length,
                    max_length,
                    pattern,
                } => {
                    if let Some(min_length) = min_length {
                        set.narrow_min_length(*min_length);
                    }
                    if let Some(max_length) = max_length {
                        set.narrow_max_length(*max_length);
                    }
                    if let Some(pattern) = pattern {
                        patterns.push(pattern.clone());
                    }
                }
                Constraint::MinLen(min_length) => set.narrow_min_length(*min_length),
                Constraint::MaxLen(max_length) => set.narrow_max_length(*max_length),
                Constraint::Ge(bound) => set.set_min_value(field, *bound)?,
                Constraint::Gt(bound) => {
                    warnings.add_exclusive_bound(
                        field,
                        "gt (>) is not supported by the derived schema, using ge (>=) instead",
                        *bound,
                    );
                    set.set_min_value(field, *bound)?;
                }
                Constraint::Le(bound) => set.set_max_value(field, *bound)?,
                Constraint::Lt(bound) => {
                    warnings.add_exclusive_bound(
                        field,
                        "lt (<) is not supported by the derived schema, using le (<=) instead",
                        *bound,
                    );
                    set.set_max_value(field, *bound)?;
                }
                Constraint::Precision {
                    max_digits,
                    decimal_places,
                } => {
                    let repeated = (max_digits.is_some() && set.max_digits.is_some())
                        || (decimal_places.is_some() && set.decimal_places.is_some());
                    if repeated {
                        return Err(FieldConversionError::new(
                            field,
                            "Field has multiple max_digits or decimal_places conflicting constraints.",
                        ));
                    }
                    set.max_digits = set.max_digits.or(*max_digits);
                    set.decimal_places = set.decimal_places.or(*decimal_places);
                }
                Constraint::Field(_) => {}
            }
        }

        if patterns.len() > 1 {
            return Err(FieldConversionError::new(
                field,
                format!("Field has multiple regex patterns: {patterns:?}"),
            ));
        }
        set.pattern = patterns.pop();
        Ok(set)
    }

    fn narrow_min_length(&mut self, min_length: usize) {
        self.min_length = Some(self.min_length.map_or(min_length, |current| current.max(min_length)));
    }

    fn narrow_max_length(&mut self, max_length: usize) {
        self.max_length = Some(self.max_length.map_or(max_length, |current| current.min(max_length)));
    }

    fn set_min_value(&mut self, field: &str, bound: f64) -> Result<(), FieldConversionError> {
        if self.min_value.is_some() {
            return Err(FieldConversionError::new(
                field,
                "Field has multiple conflicting min_value constraints.",
            ));
        }
        self.min_value = Some(bound);
        Ok(())
    }

    fn set_max_value(&mut self, field: &str, bound: f64) -> Result<(), FieldConversionError> {
        if self.max_value.is_some() {
            return Err(FieldConversionError::new(
                field,
                "Field has multiple conflicting max_value constraints.",
            ));
        }
        self.max_value = Some(bound);
        Ok(())
    }

    /// Axes this set constrains
    pub fn axes(&self) -> Vec<Axis> {
        let mut axes = Vec::new();
        if self.min_length.is_some() {
            axes.push(Axis::MinLength);
        }
        if self.max_length.is_some() {
            axes.push(Axis::MaxLength);
        }
        if self.min_value.is_some() {
            axes.push(Axis::MinValue);
        }
        if self.max_value.is_some() {
            axes.push(Axis::MaxValue);
        }
        if self.max_digits.is_some() {
            axes.push(Axis::MaxDigits);
        }
        if self.decimal_places.is_some() {
            axes.push(Axis::DecimalPlaces);
        }
        if self.pattern.is_some() {
            axes.push(Axis::Pattern);
        }
        axes
    }

    pub fn is_empty(&self) -> bool {
        self.axes().is_empty()
    }
}

/// The single manual field override in `metadata`, if any
pub(crate) fn manual_override(
    field: &str,
    metadata: &[Constraint],
) -> Result<Option<DerivedField>, FieldConversionError> {
    let mut overrides = metadata.iter().filter_map(|constraint| match constraint {
        Constraint::Field(manual) => Some(manual.as_ref()),
        _ => None,
    });
    let first = overrides.next();
    if overrides.next().is_some() {
        return Err(FieldConversionError::new(
            field,
            "Field has multiple conflicting fields in its metadata.",
        ));
    }
    Ok(first.cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(metadata: &[Constraint]) -> (Result<ConstraintSet, FieldConversionError>, usize) {
        let mut warnings = WarningTracker::new("Model");
        let result = ConstraintSet::extract("field", metadata, &mut warnings);
        (result, warnings.items().len())
    }

    #[test]
    fn test_lengths_narrow() {
        let (set, _) = extract(&[
            Constraint::MinLen(2),
            Constraint::length(Some(5), Some(20)),
            Constraint::MaxLen(10),
        ]);
        let set = set.unwrap();
        assert_eq!(set.min_length, Some(5));
        assert_eq!(set.max_length, Some(10));
    }

    #[test]
    fn test_exclusive_bounds_warn() {
        let (set, warnings) = extract(&[Constraint::Gt(0.0), Constraint::Lt(10.0)]);
        let set = set.unwrap();
        assert_eq!(set.min_value, Some(0.0));
        assert_eq!(set.max_value, Some(10.0));
        assert_eq!(warnings, 2);
    }

    #[test]
    fn test_conflicting_bounds() {
        let (set, _) = extract(&[Constraint::Ge(0.0), Constraint::Gt(1.0)]);
        assert_eq!(
            set.unwrap_err().message,
            "Field has multiple conflicting min_value constraints."
        );
        let (set, _) = extract(&[Constraint::Le(0.0), Constraint::Le(1.0)]);
        assert_eq!(
            set.unwrap_err().message,
            "Field has multiple conflicting max_value constraints."
        );
    }

    #[test]
    fn test_precision_axes_combine() {
        let (set, _) = extract(&[
            Constraint::precision(Some(5), None),
            Constraint::precision(None, Some(2)),
        ]);
        let set = set.unwrap();
        assert_eq!(set.max_digits, Some(5));
        assert_eq!(set.decimal_places, Some(2));
    }

    #[test]
    fn test_conflicting_precision() {
        let (set, _) = extract(&[
            Constraint::precision(Some(5), Some(2)),
            Constraint::precision(Some(6), None),
        ]);
        assert_eq!(
            set.unwrap_err().message,
            "Field has multiple max_digits or decimal_places conflicting constraints."
        );
        let (set, _) = extract(&[
            Constraint::precision(None, Some(2)),
            Constraint::precision(Some(5), Some(3)),
        ]);
        assert_eq!(
            set.unwrap_err().message,
            "Field has multiple max_digits or decimal_places conflicting constraints."
        );
    }

    #[test]
    fn test_multiple_patterns() {
        let (set, _) = extract(&[Constraint::pattern("123"), Constraint::pattern("456")]);
        assert_eq!(
            set.unwrap_err().message,
            "Field has multiple regex patterns: [\"123\", \"456\"]"
        );
    }

    #[test]
    fn test_manual_override() {
        let metadata = [Constraint::manual(DerivedField::char()), Constraint::MinLen(1)];
        let manual = manual_override("field", &metadata).unwrap();
        assert_eq!(manual.map(|f| f.kind_name()), Some("CharField"));

        let metadata = [
            Constraint::manual(DerivedField::char()),
            Constraint::manual(DerivedField::integer()),
        ];
        assert!(manual_override("field", &metadata).is_err());
    }

    #[test]
    fn test_axes() {
        let (set, _) = extract(&[Constraint::pattern("^a"), Constraint::Ge(1.0)]);
        assert_eq!(set.unwrap().axes(), vec![Axis::MinValue, Axis::Pattern]);
    }
}
