//! Structural classification of type annotations

use serde_json::Value;
use thiserror::Error;

use crate::source::{TupleItem, TypeAlias, TypeAnnotation};

/// Structural kind of an annotation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kind<'a> {
    Scalar(&'a TypeAnnotation),
    List(&'a TypeAnnotation),
    Tuple(&'a [TupleItem]),
    Dict {
        key: &'a TypeAnnotation,
        value: &'a TypeAnnotation,
    },
    Literal(&'a [Value]),
    Union(&'a [TypeAnnotation]),
    TypeAlias(&'a TypeAlias),
}

/// An annotation whose shape cannot be converted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("Field has Union type which cannot be converted to a derived schema field: {annotation}. Only optional unions (T | None) are supported.")]
    UnsupportedUnion { annotation: String },

    #[error("{annotation} is not a supported tuple type. Use tuple[T, ...] or a tuple of one repeated scalar type.")]
    UnsupportedTuple { annotation: String },

    #[error("{annotation} is not a supported dict type. Only mappings with str keys are supported.")]
    UnsupportedDict { annotation: String },

    #[error("{origin} is not a supported composite type.")]
    UnsupportedComposite { origin: String },
}

/// Determine the structural kind of `annotation`
pub fn classify(annotation: &TypeAnnotation) -> Result<Kind<'_>, ClassifyError> {
    match annotation {
        TypeAnnotation::List(item) => Ok(Kind::List(item)),
        TypeAnnotation::Tuple(items) => Ok(Kind::Tuple(items)),
        TypeAnnotation::Dict { key, value } => Ok(Kind::Dict { key, value }),
        TypeAnnotation::Literal(values) => Ok(Kind::Literal(values)),
        TypeAnnotation::Union(members) => Ok(Kind::Union(members)),
        TypeAnnotation::Alias(alias) => Ok(Kind::TypeAlias(alias)),
        TypeAnnotation::Generic { origin, .. } => Err(ClassifyError::UnsupportedComposite {
            origin: origin.clone(),
        }),
        scalar => Ok(Kind::Scalar(scalar)),
    }
}

/// A classified annotation with an optional wrapper removed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved<'a> {
    pub kind: Kind<'a>,
    pub allow_null: bool,
}

/// Classify `annotation`, unwrapping `T | None` into a nullable `T`.
///
/// Unions other than exactly one type plus the null type are rejected, so
/// the returned kind is never [`Kind::Union`].
pub fn resolve(annotation: &TypeAnnotation) -> Result<Resolved<'_>, ClassifyError> {
    match classify(annotation)? {
        Kind::Union(members) => {
            let non_null: Vec<&TypeAnnotation> = members.iter().filter(|member| !member.is_none()).collect();
            match (members.len(), non_null.as_slice()) {
                (2, [inner]) => {
                    let resolved = resolve(*inner)?;
                    Ok(Resolved {
                        kind: resolved.kind,
                        allow_null: true,
                    })
                }
                _ => Err(ClassifyError::UnsupportedUnion {
                    annotation: annotation.to_string(),
                }),
            }
        }
        kind => Ok(Resolved { kind, allow_null: false }),
    }
}

/// The element type of a convertible tuple.
///
/// Accepted shapes are `tuple[T, ...]`, `tuple[..., T]` and two or more
/// positions of one repeated scalar type.
pub fn tuple_element(items: &[TupleItem]) -> Result<&TypeAnnotation, ClassifyError> {
    let unsupported = || ClassifyError::UnsupportedTuple {
        annotation: TypeAnnotation::Tuple(items.to_vec()).to_string(),
    };

    match items {
        [TupleItem::Type(item), TupleItem::Repeat] | [TupleItem::Repeat, TupleItem::Type(item)]
            if item.is_scalar() =>
        {
            Ok(item)
        }
        [TupleItem::Type(first), rest @ ..] if !rest.is_empty() && first.is_scalar() => {
            let homogeneous = rest
                .iter()
                .all(|item| matches!(item, TupleItem::Type(other) if other == first));
            if homogeneous {
                Ok(first)
            } else {
                Err(unsupported())
            }
        }
        _ => Err(unsupported()),
    }
}

/// The value type of a convertible mapping; keys must be strings
pub fn dict_value<'a>(
    key: &'a TypeAnnotation,
    value: &'a TypeAnnotation,
) -> Result<&'a TypeAnnotation, ClassifyError> {
    if matches!(key, TypeAnnotation::Str) {
        Ok(value)
    } else {
        Err(ClassifyError::UnsupportedDict {
            annotation: TypeAnnotation::dict(key.clone(), value.clone()).to_string(),
        })
    }
}
