//! Lowering errors.

use core::fmt::{self, Display};
use lumo_parse::Span;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LowerError {
    UndeclaredSymbol(String, Span),
    PatternOutsideRule(Span),
    InvalidDeclaration(&'static str, Span),
    ReservedConstruct(String, Span),
}

impl LowerError {
    pub fn span(&self) -> &Span {
        match self {
            Self::UndeclaredSymbol(_, span)
            | Self::PatternOutsideRule(span)
            | Self::InvalidDeclaration(_, span)
            | Self::ReservedConstruct(_, span) => span,
        }
    }
}

impl Display for LowerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UndeclaredSymbol(name, _) => write!(f, "undeclared identifier `{}`", name),
            Self::PatternOutsideRule(_) => write!(f, "pattern used outside a rule"),
            Self::InvalidDeclaration(reason, _) => write!(f, "invalid declaration: {}", reason),
            Self::ReservedConstruct(what, _) => write!(f, "`{}` is not supported here", what),
        }
    }
}
