//! Type annotations carried by source-model fields

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::model::ModelRef;

/// The declared type of a field.
///
/// Scalars map directly onto one derived field kind. Composite forms carry
/// their parameters and are classified during conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeAnnotation {
    Bool,
    Str,
    Email,
    Url,
    Uuid,
    Int,
    Float,
    Decimal,
    Date,
    Time,
    DateTime,
    Duration,
    /// The null type; only meaningful as a union member
    None,
    Enum(Arc<EnumType>),
    Model(ModelRef),
    List(Box<TypeAnnotation>),
    Tuple(Vec<TupleItem>),
    Dict {
        key: Box<TypeAnnotation>,
        value: Box<TypeAnnotation>,
    },
    Literal(Vec<Value>),
    Union(Vec<TypeAnnotation>),
    Alias(TypeAlias),
    /// A scalar type outside the supported set, kept by name for diagnostics
    Named(String),
    /// A parameterized container outside the supported set
    Generic {
        origin: String,
        args: Vec<TypeAnnotation>,
    },
}

/// One position of a tuple annotation
#[derive(Debug, Clone, PartialEq)]
pub enum TupleItem {
    Type(TypeAnnotation),
    /// Open-ended repetition of the preceding position
    Repeat,
}

impl TypeAnnotation {
    pub fn optional(inner: TypeAnnotation) -> Self {
        TypeAnnotation::Union(vec![inner, TypeAnnotation::None])
    }

    pub fn list(inner: TypeAnnotation) -> Self {
        TypeAnnotation::List(Box::new(inner))
    }

    pub fn dict(key: TypeAnnotation, value: TypeAnnotation) -> Self {
        TypeAnnotation::Dict {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Mapping with string keys
    pub fn str_dict(value: TypeAnnotation) -> Self {
        Self::dict(TypeAnnotation::Str, value)
    }

    /// Fixed-position tuple
    pub fn tuple(items: impl IntoIterator<Item = TypeAnnotation>) -> Self {
        TypeAnnotation::Tuple(items.into_iter().map(TupleItem::Type).collect())
    }

    /// `tuple[T, ...]`
    pub fn variadic_tuple(item: TypeAnnotation) -> Self {
        TypeAnnotation::Tuple(vec![TupleItem::Type(item), TupleItem::Repeat])
    }

    pub fn literal(values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        TypeAnnotation::Literal(values.into_iter().map(Into::into).collect())
    }

    pub fn union(members: impl IntoIterator<Item = TypeAnnotation>) -> Self {
        TypeAnnotation::Union(members.into_iter().collect())
    }

    pub fn model(reference: impl Into<ModelRef>) -> Self {
        TypeAnnotation::Model(reference.into())
    }

    pub fn enumeration(enum_type: Arc<EnumType>) -> Self {
        TypeAnnotation::Enum(enum_type)
    }

    pub fn json_value() -> Self {
        TypeAnnotation::Alias(TypeAlias::json_value())
    }

    /// True for annotations that are not parameterized containers, unions or literals
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            TypeAnnotation::List(_)
                | TypeAnnotation::Tuple(_)
                | TypeAnnotation::Dict { .. }
                | TypeAnnotation::Literal(_)
                | TypeAnnotation::Union(_)
                | TypeAnnotation::Alias(_)
                | TypeAnnotation::Generic { .. }
        )
    }

    pub fn is_none(&self) -> bool {
        matches!(self, TypeAnnotation::None)
    }

    /// Whether a nested model appears anywhere inside this annotation
    pub fn contains_model(&self) -> bool {
        match self {
            TypeAnnotation::Model(_) => true,
            TypeAnnotation::List(inner) => inner.contains_model(),
            TypeAnnotation::Tuple(items) => items.iter().any(|item| match item {
                TupleItem::Type(annotation) => annotation.contains_model(),
                TupleItem::Repeat => false,
            }),
            TypeAnnotation::Dict { value, .. } => value.contains_model(),
            TypeAnnotation::Union(members) => members.iter().any(TypeAnnotation::contains_model),
            TypeAnnotation::Generic { args, .. } => args.iter().any(TypeAnnotation::contains_model),
            _ => false,
        }
    }
}

impl fmt::Display for TypeAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeAnnotation::Bool => write!(f, "bool"),
            TypeAnnotation::Str => write!(f, "str"),
            TypeAnnotation::Email => write!(f, "email"),
            TypeAnnotation::Url => write!(f, "url"),
            TypeAnnotation::Uuid => write!(f, "uuid"),
            TypeAnnotation::Int => write!(f, "int"),
            TypeAnnotation::Float => write!(f, "float"),
            TypeAnnotation::Decimal => write!(f, "decimal"),
            TypeAnnotation::Date => write!(f, "date"),
            TypeAnnotation::Time => write!(f, "time"),
            TypeAnnotation::DateTime => write!(f, "datetime"),
            TypeAnnotation::Duration => write!(f, "timedelta"),
            TypeAnnotation::None => write!(f, "None"),
            TypeAnnotation::Enum(enum_type) => write!(f, "{}", enum_type.name()),
            TypeAnnotation::Model(reference) => write!(f, "{}", reference.name()),
            TypeAnnotation::List(inner) => write!(f, "list[{inner}]"),
            TypeAnnotation::Tuple(items) => {
                write!(f, "tuple[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match item {
                        TupleItem::Type(annotation) => write!(f, "{annotation}")?,
                        TupleItem::Repeat => write!(f, "...")?,
                    }
                }
                write!(f, "]")
            }
            TypeAnnotation::Dict { key, value } => write!(f, "dict[{key}, {value}]"),
            TypeAnnotation::Literal(values) => {
                write!(f, "Literal[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
            TypeAnnotation::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
            TypeAnnotation::Alias(alias) => write!(f, "{}", alias.name()),
            TypeAnnotation::Named(name) => write!(f, "{name}"),
            TypeAnnotation::Generic { origin, args } => {
                write!(f, "{origin}")?;
                if !args.is_empty() {
                    write!(f, "[")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    write!(f, "]")?;
                }
                Ok(())
            }
        }
    }
}

/// A named alias for another type.
///
/// Only the recursive JSON value alias is convertible; every other alias is
/// reported by name.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAlias {
    name: String,
    target: Option<Box<TypeAnnotation>>,
}

impl TypeAlias {
    pub const JSON_VALUE: &'static str = "JsonValue";

    pub fn new(name: impl Into<String>, target: Option<TypeAnnotation>) -> Self {
        Self {
            name: name.into(),
            target: target.map(Box::new),
        }
    }

    pub fn json_value() -> Self {
        Self::new(Self::JSON_VALUE, None)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> Option<&TypeAnnotation> {
        self.target.as_deref()
    }

    pub fn is_json_value(&self) -> bool {
        self.name == Self::JSON_VALUE
    }
}

/// One member of an enumeration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumMember {
    pub name: String,
    pub value: Value,
}

/// Input accepted when resolving an enumeration member
#[derive(Debug, Clone, Copy)]
pub enum EnumInput<'a> {
    Member(&'a EnumMember),
    Raw(&'a Value),
}

/// An enumeration type with ordered members
#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    name: String,
    members: Vec<EnumMember>,
}

impl EnumType {
    pub fn new<N, V>(name: impl Into<String>, members: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<String>,
        V: Into<Value>,
    {
        Self {
            name: name.into(),
            members: members
                .into_iter()
                .map(|(name, value)| EnumMember {
                    name: name.into(),
                    value: value.into(),
                })
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[EnumMember] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&EnumMember> {
        self.members.iter().find(|member| member.name == name)
    }

    /// Member values in declaration order
    pub fn values(&self) -> Vec<Value> {
        self.members.iter().map(|member| member.value.clone()).collect()
    }

    /// Resolve input to a member.
    ///
    /// Members are tried in declaration order. A member matches when it is
    /// the input member itself, when its name equals the input, or when its
    /// value equals the input.
    pub fn resolve(&self, input: EnumInput<'_>) -> Option<&EnumMember> {
        self.members.iter().find(|member| match input {
            EnumInput::Member(candidate) => std::ptr::eq(*member, candidate) || *member == candidate,
            EnumInput::Raw(raw) => raw.as_str() == Some(member.name.as_str()) || member.value == *raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn color() -> EnumType {
        EnumType::new("Color", [("RED", "red"), ("GREEN", "green")])
    }

    #[test]
    fn test_enum_resolution_by_value_and_name() {
        let color = color();
        assert_eq!(color.resolve(EnumInput::Raw(&json!("red"))).map(|m| m.name.as_str()), Some("RED"));
        assert_eq!(color.resolve(EnumInput::Raw(&json!("GREEN"))).map(|m| m.name.as_str()), Some("GREEN"));
        assert!(color.resolve(EnumInput::Raw(&json!("blue"))).is_none());
    }

    #[test]
    fn test_enum_resolution_by_member() {
        let color = color();
        let member = color.member("GREEN").unwrap();
        assert_eq!(color.resolve(EnumInput::Member(member)), Some(member));
    }

    #[test]
    fn test_display() {
        let annotation = TypeAnnotation::union([
            TypeAnnotation::Int,
            TypeAnnotation::Str,
            TypeAnnotation::None,
        ]);
        assert_eq!(annotation.to_string(), "int | str | None");
        assert_eq!(TypeAnnotation::variadic_tuple(TypeAnnotation::Int).to_string(), "tuple[int, ...]");
        assert_eq!(TypeAnnotation::str_dict(TypeAnnotation::Float).to_string(), "dict[str, float]");
        assert_eq!(TypeAnnotation::literal(["a", "b"]).to_string(), "Literal[\"a\", \"b\"]");
    }

    #[test]
    fn test_is_scalar() {
        assert!(TypeAnnotation::Int.is_scalar());
        assert!(TypeAnnotation::Named("complex".into()).is_scalar());
        assert!(!TypeAnnotation::list(TypeAnnotation::Int).is_scalar());
        assert!(!TypeAnnotation::json_value().is_scalar());
    }
}
