//! Field factory: annotation plus constraints to derived field

use tracing::trace;

use super::classify::{self, Kind};
use super::constraints::{manual_override, Axis, ConstraintSet};
use super::ConversionContext;
use crate::error::FieldConversionError;
use crate::fields::{
    ChoiceSet, DerivedField, FieldKind, FieldOptions, FieldPattern, NumericBounds, TextRules,
};
use crate::source::{FieldDescriptor, TypeAnnotation};

/// Convert one source field
pub(crate) fn convert_field(
    descriptor: &FieldDescriptor,
    ctx: &mut ConversionContext<'_, '_>,
) -> Result<DerivedField, FieldConversionError> {
    let name = descriptor.name();
    let annotation = descriptor
        .annotation()
        .ok_or_else(|| ctx.error("Field has no type annotation."))?;

    let bind = |field: DerivedField| {
        field.bind(name, descriptor.validation_key(), descriptor.serialization_key())
    };

    if let Some(manual) = manual_override(name, descriptor.metadata())? {
        trace!(field = name, kind = manual.kind_name(), "using manual field override");
        return Ok(bind(manual));
    }

    let constraints = ConstraintSet::extract(name, descriptor.metadata(), ctx.warnings)?;
    let options = FieldOptions {
        required: descriptor.is_required(),
        default: descriptor.default_value().resolve(),
        allow_null: false,
        help_text: descriptor.description_text().map(str::to_string),
        label: descriptor.title_text().map(str::to_string),
    };

    let field = convert_type(annotation, ctx, options, &constraints)?;
    trace!(field = name, kind = field.kind_name(), "converted field");
    Ok(bind(field))
}

/// Convert an element type of a list or mapping; elements carry no constraints
fn convert_child(
    annotation: &TypeAnnotation,
    ctx: &mut ConversionContext<'_, '_>,
) -> Result<DerivedField, FieldConversionError> {
    convert_type(annotation, ctx, FieldOptions::default(), &ConstraintSet::default())
}

fn convert_type(
    annotation: &TypeAnnotation,
    ctx: &mut ConversionContext<'_, '_>,
    mut options: FieldOptions,
    constraints: &ConstraintSet,
) -> Result<DerivedField, FieldConversionError> {
    let resolved = classify::resolve(annotation).map_err(|err| ctx.error(err.to_string()))?;
    options.allow_null = resolved.allow_null;

    let kind = match resolved.kind {
        Kind::Scalar(scalar) => scalar_kind(scalar, ctx, constraints)?,
        Kind::List(item) => list_kind(convert_child(item, ctx)?),
        Kind::Tuple(items) => {
            let item = classify::tuple_element(items).map_err(|err| ctx.error(err.to_string()))?;
            list_kind(convert_child(item, ctx)?)
        }
        Kind::Dict { key, value } => {
            let value = classify::dict_value(key, value).map_err(|err| ctx.error(err.to_string()))?;
            FieldKind::Dict {
                child: Box::new(convert_child(value, ctx)?),
                allow_empty: true,
            }
        }
        Kind::Literal(values) => FieldKind::Choice(ChoiceSet::Values(values.to_vec())),
        Kind::TypeAlias(alias) if alias.is_json_value() => FieldKind::Json,
        Kind::TypeAlias(alias) => {
            return Err(ctx.error(format!("{} is not a supported type alias.", alias.name())))
        }
        Kind::Union(_) => {
            return Err(ctx.error(format!("{annotation} is not a supported composite type.")))
        }
    };

    let kind = apply_constraints(kind, constraints, ctx)?;
    Ok(DerivedField::from_parts(kind, options))
}

fn list_kind(child: DerivedField) -> FieldKind {
    FieldKind::List {
        child: Box::new(child),
        allow_empty: true,
        min_length: None,
        max_length: None,
    }
}

fn scalar_kind(
    scalar: &TypeAnnotation,
    ctx: &mut ConversionContext<'_, '_>,
    constraints: &ConstraintSet,
) -> Result<FieldKind, FieldConversionError> {
    // a pattern turns any text type into a regex field
    if let (TypeAnnotation::Str | TypeAnnotation::Email | TypeAnnotation::Url, Some(source)) =
        (scalar, constraints.pattern.as_deref())
    {
        let pattern = FieldPattern::new(source)
            .map_err(|err| ctx.error(format!("Invalid regex pattern {source:?}: {err}")))?;
        // blank input is only accepted when the pattern itself accepts it
        let rules = TextRules::default().allow_blank(pattern.regex().is_match(""));
        return Ok(FieldKind::Regex { rules, pattern });
    }

    let kind = match scalar {
        TypeAnnotation::Bool => FieldKind::Boolean,
        TypeAnnotation::Str => FieldKind::Char(TextRules::default()),
        TypeAnnotation::Email => FieldKind::Email(TextRules::default()),
        TypeAnnotation::Url => FieldKind::Url(TextRules::default()),
        TypeAnnotation::Uuid => FieldKind::Uuid,
        TypeAnnotation::Int => FieldKind::Integer(NumericBounds::default()),
        TypeAnnotation::Float => FieldKind::Float(NumericBounds::default()),
        TypeAnnotation::Decimal => {
            let precision = ctx.session.settings().decimal_precision;
            FieldKind::Decimal {
                bounds: NumericBounds::default(),
                max_digits: Some(constraints.max_digits.unwrap_or(precision)),
                decimal_places: Some(constraints.decimal_places.unwrap_or(precision)),
            }
        }
        TypeAnnotation::Date => FieldKind::Date,
        TypeAnnotation::Time => FieldKind::Time,
        TypeAnnotation::DateTime => FieldKind::DateTime,
        TypeAnnotation::Duration => FieldKind::Duration,
        TypeAnnotation::Enum(enum_type) => FieldKind::Choice(ChoiceSet::Enum(enum_type.clone())),
        TypeAnnotation::Model(reference) => {
            let model = reference.get().ok_or_else(|| {
                ctx.error(format!(
                    "Model reference '{}' was never resolved to a model.",
                    reference.name()
                ))
            })?;
            if !model.derives_schema() {
                return Err(ctx.error(format!(
                    "Nested model {} is not a derived model. Nested models must opt into schema derivation.",
                    model.name()
                )));
            }
            let link = ctx
                .session
                .link(&model)
                .map_err(|err| ctx.error(err.to_string()))?;
            FieldKind::Nested(link)
        }
        other => return Err(ctx.error(format!("{other} is not a supported scalar type."))),
    };
    Ok(kind)
}

/// Apply the constraint set to a resolved kind.
///
/// Every constrained axis must be meaningful for the kind; a constraint that
/// would be silently ignored is an error instead.
fn apply_constraints(
    kind: FieldKind,
    constraints: &ConstraintSet,
    ctx: &ConversionContext<'_, '_>,
) -> Result<FieldKind, FieldConversionError> {
    let supported: &[Axis] = match &kind {
        FieldKind::Char(_) | FieldKind::Email(_) | FieldKind::Url(_) | FieldKind::List { .. } => {
            &[Axis::MinLength, Axis::MaxLength]
        }
        FieldKind::Regex { .. } => &[Axis::MinLength, Axis::MaxLength, Axis::Pattern],
        FieldKind::Integer(_) | FieldKind::Float(_) => &[Axis::MinValue, Axis::MaxValue],
        FieldKind::Decimal { .. } => &[
            Axis::MinValue,
            Axis::MaxValue,
            Axis::MaxDigits,
            Axis::DecimalPlaces,
        ],
        _ => &[],
    };
    if let Some(axis) = constraints.axes().into_iter().find(|axis| !supported.contains(axis)) {
        return Err(ctx.error(format!(
            "Field has a {axis} constraint, which does not apply to {}.",
            kind.name()
        )));
    }

    let bounds = NumericBounds::new(constraints.min_value, constraints.max_value);
    let (min_length, max_length) = (constraints.min_length, constraints.max_length);
    Ok(match kind {
        FieldKind::Char(rules) => FieldKind::Char(rules.with_lengths(min_length, max_length)),
        FieldKind::Email(rules) => FieldKind::Email(rules.with_lengths(min_length, max_length)),
        FieldKind::Url(rules) => FieldKind::Url(rules.with_lengths(min_length, max_length)),
        FieldKind::Regex { rules, pattern } => FieldKind::Regex {
            rules: rules.with_lengths(min_length, max_length),
            pattern,
        },
        FieldKind::List {
            child, allow_empty, ..
        } => FieldKind::List {
            child,
            allow_empty,
            min_length,
            max_length,
        },
        FieldKind::Integer(_) => FieldKind::Integer(bounds),
        FieldKind::Float(_) => FieldKind::Float(bounds),
        FieldKind::Decimal {
            max_digits,
            decimal_places,
            ..
        } => FieldKind::Decimal {
            bounds,
            max_digits,
            decimal_places,
        },
        other => other,
    })
}
