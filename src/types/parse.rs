//! Textual type expressions
//!
//! Grammar:
//!
//! ```text
//! type    := '&' type | '*' type | base ('[' ']')*
//! base    := prim | 'void' | 'native_address'
//!          | ('vec2' | 'vec3' | 'vec4') '<' prim '>'
//!          | ('View' | 'StridedView') '<' type '>'
//!          | NAME
//! ```

use super::core::{PrimitiveType, TypeContext, TypeId};
use logos::Logos;
use miette::{Diagnostic, SourceSpan};
use std::ops::Range;
use thiserror::Error;

/// Names the grammar reserves besides the primitive type names
pub const BUILTIN_TYPE_NAMES: &[&str] = &[
    "void",
    "native_address",
    "vec2",
    "vec3",
    "vec4",
    "View",
    "StridedView",
];

/// Check whether `name` always parses as a built-in type
pub fn is_builtin_name(name: &str) -> bool {
    PrimitiveType::from_name(name).is_some() || BUILTIN_TYPE_NAMES.contains(&name)
}

/// Tokens of a type expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Logos)]
#[logos(skip r"[ \t\r\n]+")]
pub enum TypeToken {
    #[regex(r"[A-Za-z_][A-Za-z0-9_.:]*")]
    Ident,
    #[token("<")]
    LAngle,
    #[token(">")]
    RAngle,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("*")]
    Star,
    #[token("&")]
    Amp,
}

impl TypeToken {
    fn describe(self) -> &'static str {
        match self {
            TypeToken::Ident => "type name",
            TypeToken::LAngle => "`<`",
            TypeToken::RAngle => "`>`",
            TypeToken::LBracket => "`[`",
            TypeToken::RBracket => "`]`",
            TypeToken::Star => "`*`",
            TypeToken::Amp => "`&`",
        }
    }
}

/// Type expression error
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum TypeParseError {
    #[error("Unexpected character in type expression")]
    #[diagnostic(code(types::unexpected_char))]
    UnexpectedChar {
        #[source_code]
        input: String,
        #[label("not part of a type expression")]
        span: SourceSpan,
    },

    #[error("Unexpected {found}, expected {expected}")]
    #[diagnostic(code(types::unexpected_token))]
    UnexpectedToken {
        found: String,
        expected: String,
        #[source_code]
        input: String,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("Unexpected end of type expression, expected {expected}")]
    #[diagnostic(code(types::unexpected_end))]
    UnexpectedEnd { expected: String, input: String },

    #[error("Unknown type `{name}`")]
    #[diagnostic(
        code(types::unknown),
        help("declare the type before the first place it is used")
    )]
    UnknownType {
        name: String,
        #[source_code]
        input: String,
        #[label("not declared")]
        span: SourceSpan,
    },

    #[error("`{name}` is not a primitive type")]
    #[diagnostic(code(types::expected_primitive))]
    ExpectedPrimitive {
        name: String,
        #[source_code]
        input: String,
        #[label("vector lanes must be primitive")]
        span: SourceSpan,
    },
}

/// Split a type expression into tokens with their byte ranges
pub fn lex(input: &str) -> Result<Vec<(TypeToken, Range<usize>)>, TypeParseError> {
    let mut lexer = TypeToken::lexer(input);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next() {
        match token {
            Ok(kind) => tokens.push((kind, lexer.span())),
            Err(()) => {
                let span = lexer.span();
                return Err(TypeParseError::UnexpectedChar {
                    input: input.to_string(),
                    span: (span.start, span.len()).into(),
                });
            }
        }
    }
    Ok(tokens)
}

/// Parse a type expression, resolving declared names through `resolve`
pub fn parse_type<F>(
    types: &mut TypeContext,
    input: &str,
    resolve: F,
) -> Result<TypeId, TypeParseError>
where
    F: Fn(&str) -> Option<TypeId>,
{
    let tokens = lex(input)?;
    let mut parser = TypeParser {
        input,
        tokens,
        pos: 0,
        resolve,
    };
    let ty = parser.parse(types)?;
    if let Some((token, span)) = parser.tokens.get(parser.pos) {
        return Err(parser.unexpected(*token, span.clone(), "end of expression"));
    }
    Ok(ty)
}

struct TypeParser<'a, F> {
    input: &'a str,
    tokens: Vec<(TypeToken, Range<usize>)>,
    pos: usize,
    resolve: F,
}

impl<'a, F> TypeParser<'a, F>
where
    F: Fn(&str) -> Option<TypeId>,
{
    fn peek(&self) -> Option<TypeToken> {
        self.tokens.get(self.pos).map(|(t, _)| *t)
    }

    fn bump(&mut self) -> Option<(TypeToken, Range<usize>)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: TypeToken) -> Result<Range<usize>, TypeParseError> {
        match self.bump() {
            Some((token, span)) if token == expected => Ok(span),
            Some((token, span)) => Err(self.unexpected(token, span, expected.describe())),
            None => Err(self.end(expected.describe())),
        }
    }

    fn unexpected(&self, token: TypeToken, span: Range<usize>, expected: &str) -> TypeParseError {
        let found = match token {
            TypeToken::Ident => format!("`{}`", &self.input[span.clone()]),
            other => other.describe().to_string(),
        };
        TypeParseError::UnexpectedToken {
            found,
            expected: expected.to_string(),
            input: self.input.to_string(),
            span: (span.start, span.len()).into(),
        }
    }

    fn end(&self, expected: &str) -> TypeParseError {
        TypeParseError::UnexpectedEnd {
            expected: expected.to_string(),
            input: self.input.to_string(),
        }
    }

    fn parse(&mut self, types: &mut TypeContext) -> Result<TypeId, TypeParseError> {
        match self.peek() {
            Some(TypeToken::Amp) => {
                self.bump();
                let inner = self.parse(types)?;
                Ok(types.by_ref(inner))
            }
            Some(TypeToken::Star) => {
                self.bump();
                let inner = self.parse(types)?;
                Ok(types.pointer(inner))
            }
            _ => {
                let mut ty = self.parse_base(types)?;
                while self.peek() == Some(TypeToken::LBracket) {
                    self.bump();
                    self.expect(TypeToken::RBracket)?;
                    ty = types.array(ty);
                }
                Ok(ty)
            }
        }
    }

    fn parse_base(&mut self, types: &mut TypeContext) -> Result<TypeId, TypeParseError> {
        let span = match self.bump() {
            Some((TypeToken::Ident, span)) => span,
            Some((token, span)) => return Err(self.unexpected(token, span, "type name")),
            None => return Err(self.end("type name")),
        };
        let input = self.input;
        let name = &input[span.clone()];

        if let Some(prim) = PrimitiveType::from_name(name) {
            return Ok(types.primitive(prim));
        }

        match name {
            "void" => Ok(types.void()),
            "native_address" => Ok(types.native_address()),
            "vec2" | "vec3" | "vec4" => {
                let lanes = name.as_bytes()[3] - b'0';
                self.expect(TypeToken::LAngle)?;
                let elem_span = self.expect(TypeToken::Ident)?;
                let elem_name = &input[elem_span.clone()];
                let element = PrimitiveType::from_name(elem_name).ok_or_else(|| {
                    TypeParseError::ExpectedPrimitive {
                        name: elem_name.to_string(),
                        input: self.input.to_string(),
                        span: (elem_span.start, elem_span.len()).into(),
                    }
                })?;
                self.expect(TypeToken::RAngle)?;
                Ok(types.vector(element, lanes))
            }
            "View" | "StridedView" => {
                self.expect(TypeToken::LAngle)?;
                let element = self.parse(types)?;
                self.expect(TypeToken::RAngle)?;
                if name == "View" {
                    Ok(types.view(element))
                } else {
                    Ok(types.strided_view(element))
                }
            }
            _ => (self.resolve)(name).ok_or_else(|| TypeParseError::UnknownType {
                name: name.to_string(),
                input: self.input.to_string(),
                span: (span.start, span.len()).into(),
            }),
        }
    }
}
