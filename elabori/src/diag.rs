//! Elaboration diagnostics, collected after the solver reaches fixed point.

use core::fmt::{self, Display};
use lumo_parse::Span;

#[derive(Clone, Debug)]
pub enum Diagnostic {
    /// A constraint remained active or errored at fixed point.
    UnresolvedConstraint { detail: String },
    /// A metavariable reachable from the final artifact has no value.
    Uninferred { unknown: u32, detail: String },
    /// A HIR register never resolved.
    UnresolvedRegister { span: Option<Span> },
    /// A declaration violated a symbol's permission flags or shape.
    InvalidDeclaration { span: Option<Span>, reason: String },
}

impl Diagnostic {
    pub fn span(&self) -> Option<&Span> {
        match self {
            Self::UnresolvedRegister { span } | Self::InvalidDeclaration { span, .. } => {
                span.as_ref()
            }
            _ => None,
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnresolvedConstraint { detail } => {
                write!(f, "unresolved constraint: {}", detail)
            }
            Self::Uninferred { unknown, detail } => {
                write!(f, "could not infer ?{}: {}", unknown, detail)
            }
            Self::UnresolvedRegister { span: Some(span) } => {
                write!(f, "unresolved expression at {}..{}", span.start, span.end)
            }
            Self::UnresolvedRegister { span: None } => write!(f, "unresolved expression"),
            Self::InvalidDeclaration { reason, .. } => {
                write!(f, "invalid declaration: {}", reason)
            }
        }
    }
}
