//! Type expression parser
//!
//! Recursive descent over the annotation syntax used in model documents:
//!
//! ```text
//! expr    := term ('|' term)*
//! term    := NAME ['[' args ']']
//! args    := arg (',' arg)*
//! arg     := expr | '...' | literal
//! ```
//!
//! Names resolve to scalar types, enums and models declared in the
//! document, in that order. Anything else is kept by name so that the
//! conversion step can report it against the field.

use serde_json::{Number, Value};
use std::collections::HashMap;
use std::iter::Peekable;
use std::str::CharIndices;
use std::sync::Arc;

use crate::source::{EnumType, ModelRef, TupleItem, TypeAnnotation};

/// A parse failure with the byte offset it was detected at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeExprError {
    pub position: usize,
    pub message: String,
}

impl TypeExprError {
    fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for TypeExprError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (at position {})", self.message, self.position)
    }
}

impl std::error::Error for TypeExprError {}

type ParseResult<T> = Result<T, TypeExprError>;

/// Names visible to type expressions
#[derive(Debug, Default)]
pub struct TypeScope {
    enums: HashMap<String, Arc<EnumType>>,
    models: HashMap<String, ModelRef>,
}

impl TypeScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_enum(&mut self, enum_type: Arc<EnumType>) {
        self.enums.insert(enum_type.name().to_string(), enum_type);
    }

    pub fn add_model(&mut self, reference: ModelRef) {
        self.models.insert(reference.name().to_string(), reference);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.enums.contains_key(name) || self.models.contains_key(name)
    }

    fn lookup(&self, name: &str) -> Option<TypeAnnotation> {
        if let Some(enum_type) = self.enums.get(name) {
            return Some(TypeAnnotation::Enum(Arc::clone(enum_type)));
        }
        self.models.get(name).cloned().map(TypeAnnotation::Model)
    }
}

/// Parse a type expression against a scope
pub fn parse_type_expr(input: &str, scope: &TypeScope) -> ParseResult<TypeAnnotation> {
    Parser::new(input, scope).parse()
}

struct Parser<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    scope: &'a TypeScope,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, scope: &'a TypeScope) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            scope,
        }
    }

    fn parse(mut self) -> ParseResult<TypeAnnotation> {
        self.skip_whitespace();
        if self.is_at_end() {
            return Err(TypeExprError::new(0, "Empty type expression"));
        }

        let annotation = self.parse_union()?;
        self.skip_whitespace();
        match self.current_char() {
            None => Ok(annotation),
            Some(ch) => Err(TypeExprError::new(
                self.position(),
                format!("Unexpected character '{ch}'"),
            )),
        }
    }

    /// `term ('|' term)*`
    fn parse_union(&mut self) -> ParseResult<TypeAnnotation> {
        let mut members = vec![self.parse_term()?];
        loop {
            self.skip_whitespace();
            if self.current_char() != Some('|') {
                break;
            }
            self.advance();
            members.push(self.parse_term()?);
        }

        if members.len() == 1 {
            Ok(members.remove(0))
        } else {
            Ok(TypeAnnotation::Union(members))
        }
    }

    fn parse_term(&mut self) -> ParseResult<TypeAnnotation> {
        self.skip_whitespace();
        let start = self.position();
        let name = self.parse_identifier()?;

        self.skip_whitespace();
        if self.current_char() != Some('[') {
            return Ok(self.resolve_name(&name));
        }
        self.advance(); // consume '['

        let annotation = match name.as_str() {
            "Literal" => TypeAnnotation::Literal(self.parse_literal_args()?),
            "tuple" | "Tuple" => TypeAnnotation::Tuple(self.parse_tuple_args()?),
            _ => {
                let args = self.parse_type_args()?;
                build_generic(name, args, start)?
            }
        };

        self.skip_whitespace();
        self.expect(']')?;
        Ok(annotation)
    }

    fn parse_type_args(&mut self) -> ParseResult<Vec<TypeAnnotation>> {
        let mut args = vec![self.parse_union()?];
        while self.consume_comma() {
            args.push(self.parse_union()?);
        }
        Ok(args)
    }

    fn parse_tuple_args(&mut self) -> ParseResult<Vec<TupleItem>> {
        self.skip_whitespace();
        let start = self.position();
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            let position = self.position();
            if self.input[position..].starts_with("...") {
                for _ in 0..3 {
                    self.advance();
                }
                items.push(TupleItem::Repeat);
            } else {
                items.push(TupleItem::Type(self.parse_union()?));
            }
            if !self.consume_comma() {
                break;
            }
        }
        if items.iter().all(|item| matches!(item, TupleItem::Repeat)) {
            return Err(TypeExprError::new(start, "tuple needs an element type next to '...'"));
        }
        Ok(items)
    }

    fn parse_literal_args(&mut self) -> ParseResult<Vec<Value>> {
        let mut values = vec![self.parse_literal()?];
        while self.consume_comma() {
            values.push(self.parse_literal()?);
        }
        Ok(values)
    }

    fn parse_literal(&mut self) -> ParseResult<Value> {
        self.skip_whitespace();
        let start = self.position();
        match self.current_char() {
            Some(quote @ ('"' | '\'')) => self.parse_string(quote).map(Value::String),
            Some(ch) if ch == '-' || ch.is_ascii_digit() => self.parse_number(),
            Some(ch) if ch.is_alphabetic() => {
                let word = self.parse_identifier()?;
                match word.as_str() {
                    "true" | "True" => Ok(Value::Bool(true)),
                    "false" | "False" => Ok(Value::Bool(false)),
                    "None" | "null" => Ok(Value::Null),
                    other => Err(TypeExprError::new(
                        start,
                        format!("Unsupported Literal value '{other}'"),
                    )),
                }
            }
            Some(ch) => Err(TypeExprError::new(
                start,
                format!("Unexpected character '{ch}' in Literal"),
            )),
            None => Err(TypeExprError::new(start, "Unexpected end of input")),
        }
    }

    fn parse_string(&mut self, quote: char) -> ParseResult<String> {
        let start = self.position();
        self.advance(); // consume opening quote
        let mut value = String::new();
        loop {
            match self.advance() {
                Some('\\') => match self.advance() {
                    Some(escaped) => value.push(escaped),
                    None => break,
                },
                Some(ch) if ch == quote => return Ok(value),
                Some(ch) => value.push(ch),
                None => break,
            }
        }
        Err(TypeExprError::new(start, "Unterminated string literal"))
    }

    fn parse_number(&mut self) -> ParseResult<Value> {
        let start = self.position();
        let mut text = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() || matches!(ch, '-' | '+' | '.' | 'e' | 'E') {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if let Ok(int) = text.parse::<i64>() {
            return Ok(Value::from(int));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| TypeExprError::new(start, format!("Invalid number '{text}'")))
    }

    fn parse_identifier(&mut self) -> ParseResult<String> {
        let start = self.position();
        let mut name = String::new();
        match self.current_char() {
            Some(ch) if ch.is_alphabetic() || ch == '_' => {}
            Some(ch) => {
                return Err(TypeExprError::new(
                    start,
                    format!("Expected a type name, found '{ch}'"),
                ))
            }
            None => return Err(TypeExprError::new(start, "Expected a type name")),
        }
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' || ch == '.' {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        Ok(name)
    }

    fn resolve_name(&self, name: &str) -> TypeAnnotation {
        match name {
            "bool" => TypeAnnotation::Bool,
            "str" => TypeAnnotation::Str,
            "email" | "EmailStr" => TypeAnnotation::Email,
            "url" | "AnyUrl" | "HttpUrl" => TypeAnnotation::Url,
            "uuid" | "UUID" => TypeAnnotation::Uuid,
            "int" => TypeAnnotation::Int,
            "float" => TypeAnnotation::Float,
            "decimal" | "Decimal" => TypeAnnotation::Decimal,
            "date" => TypeAnnotation::Date,
            "time" => TypeAnnotation::Time,
            "datetime" => TypeAnnotation::DateTime,
            "timedelta" => TypeAnnotation::Duration,
            "None" => TypeAnnotation::None,
            "JsonValue" => TypeAnnotation::json_value(),
            other => self
                .scope
                .lookup(other)
                .unwrap_or_else(|| TypeAnnotation::Named(other.to_string())),
        }
    }

    fn consume_comma(&mut self) -> bool {
        self.skip_whitespace();
        if self.current_char() == Some(',') {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> ParseResult<()> {
        match self.current_char() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(TypeExprError::new(
                self.position(),
                format!("Expected '{expected}', found '{ch}'"),
            )),
            None => Err(TypeExprError::new(
                self.position(),
                format!("Expected '{expected}', found end of input"),
            )),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.current_char(), Some(ch) if ch.is_whitespace()) {
            self.advance();
        }
    }

    fn current_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn advance(&mut self) -> Option<char> {
        self.chars.next().map(|(_, ch)| ch)
    }

    fn position(&mut self) -> usize {
        self.chars.peek().map_or(self.input.len(), |(index, _)| *index)
    }

    fn is_at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }
}

fn build_generic(
    name: String,
    mut args: Vec<TypeAnnotation>,
    position: usize,
) -> ParseResult<TypeAnnotation> {
    let arity = |expected: usize, args: &[TypeAnnotation]| {
        if args.len() == expected {
            Ok(())
        } else {
            Err(TypeExprError::new(
                position,
                format!(
                    "{name} expects {expected} type argument(s), got {}",
                    args.len()
                ),
            ))
        }
    };

    match name.as_str() {
        "list" | "List" => {
            arity(1, &args)?;
            Ok(TypeAnnotation::list(args.remove(0)))
        }
        "dict" | "Dict" => {
            arity(2, &args)?;
            let value = args.remove(1);
            Ok(TypeAnnotation::dict(args.remove(0), value))
        }
        "Optional" => {
            arity(1, &args)?;
            Ok(TypeAnnotation::optional(args.remove(0)))
        }
        "Union" if args.len() == 1 => Ok(args.remove(0)),
        "Union" => Ok(TypeAnnotation::Union(args)),
        _ => Ok(TypeAnnotation::Generic { origin: name, args }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(input: &str) -> TypeAnnotation {
        parse_type_expr(input, &TypeScope::new()).unwrap()
    }

    #[test]
    fn test_scalars_and_unknown_names() {
        assert_eq!(parse("int"), TypeAnnotation::Int);
        assert_eq!(parse(" timedelta "), TypeAnnotation::Duration);
        assert_eq!(parse("JsonValue"), TypeAnnotation::json_value());
        assert_eq!(parse("complex"), TypeAnnotation::Named("complex".into()));
    }

    #[test]
    fn test_unions_and_optional() {
        assert_eq!(
            parse("str | None"),
            TypeAnnotation::optional(TypeAnnotation::Str)
        );
        assert_eq!(
            parse("Optional[int]"),
            TypeAnnotation::optional(TypeAnnotation::Int)
        );
        assert_eq!(
            parse("Union[int, str, None]"),
            TypeAnnotation::union([TypeAnnotation::Int, TypeAnnotation::Str, TypeAnnotation::None])
        );
        assert_eq!(parse("Union[int]"), TypeAnnotation::Int);
    }

    #[test]
    fn test_containers() {
        assert_eq!(
            parse("list[dict[str, float]]"),
            TypeAnnotation::list(TypeAnnotation::str_dict(TypeAnnotation::Float))
        );
        assert_eq!(
            parse("tuple[int, ...]"),
            TypeAnnotation::variadic_tuple(TypeAnnotation::Int)
        );
        assert_eq!(
            parse("tuple[..., int]"),
            TypeAnnotation::Tuple(vec![TupleItem::Repeat, TupleItem::Type(TypeAnnotation::Int)])
        );
        assert_eq!(
            parse("tuple[str, int]"),
            TypeAnnotation::tuple([TypeAnnotation::Str, TypeAnnotation::Int])
        );
        assert_eq!(
            parse("frozenset[int]"),
            TypeAnnotation::Generic {
                origin: "frozenset".into(),
                args: vec![TypeAnnotation::Int]
            }
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            parse(r#"Literal["a", 'b', 1, -2.5, true, None]"#),
            TypeAnnotation::Literal(vec![
                json!("a"),
                json!("b"),
                json!(1),
                json!(-2.5),
                json!(true),
                Value::Null
            ])
        );
    }

    #[test]
    fn test_scope_lookup() {
        let mut scope = TypeScope::new();
        let color = Arc::new(EnumType::new("Color", [("RED", "red")]));
        scope.add_enum(Arc::clone(&color));
        let (reference, _decl) = ModelRef::forward("Node");
        scope.add_model(reference);

        assert_eq!(
            parse_type_expr("Color", &scope).unwrap(),
            TypeAnnotation::Enum(color)
        );
        match parse_type_expr("list[Node] | None", &scope).unwrap() {
            TypeAnnotation::Union(members) => match &members[0] {
                TypeAnnotation::List(inner) => {
                    assert!(matches!(inner.as_ref(), TypeAnnotation::Model(r) if r.name() == "Node"))
                }
                other => panic!("unexpected member {other:?}"),
            },
            other => panic!("unexpected annotation {other:?}"),
        }
    }

    #[test]
    fn test_errors_carry_position() {
        let scope = TypeScope::new();
        let err = parse_type_expr("list[int", &scope).unwrap_err();
        assert_eq!(err.position, 8);
        assert!(err.message.contains("Expected ']'"));

        let err = parse_type_expr("list[int, str]", &scope).unwrap_err();
        assert!(err.message.contains("expects 1 type argument"));

        let err = parse_type_expr("int ]", &scope).unwrap_err();
        assert_eq!(err.position, 4);

        assert!(parse_type_expr("   ", &scope).is_err());
        assert!(parse_type_expr("tuple[...]", &scope).is_err());
        assert!(parse_type_expr("Literal[foo]", &scope).is_err());
    }
}
