//! Abstract syntax with source ranges.

use core::fmt::{self, Display};

/// Byte range inside the source file.
pub type Span = core::ops::Range<usize>;

/// Application color: `0` is a normal argument, `1` an erased one.
pub type Color = u8;

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub span: Span,
    pub kind: NodeKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Ident(String),
    Number(i64),
    Str(String),
    /// `?x` or anonymous `?`; only meaningful inside rule left-hand sides.
    Pattern(Option<String>),
    Member(Box<Node>, String),
    Call {
        fun: Box<Node>,
        arg: Box<Node>,
        color: Color,
    },
    Lambda {
        arg: String,
        arg_ty: Option<Box<Node>>,
        body: Box<Node>,
        color: Color,
    },
    FnType {
        binder: Option<String>,
        input: Box<Node>,
        output: Box<Node>,
        color: Color,
    },
    /// `a === b`; asserts convertibility and denotes the left-hand side.
    Equiv(Box<Node>, Box<Node>),
}

/// A declaration, or a bare expression statement
/// (a [`Decl::Define`] with neither type nor value).
#[derive(Clone, Debug, PartialEq)]
pub enum Decl {
    Define {
        lhs: Node,
        ty: Option<Node>,
        value: Option<Node>,
        span: Span,
    },
    Module {
        name: String,
        decls: Vec<Decl>,
        span: Span,
    },
    Variable {
        name: String,
        ty: Option<Node>,
        span: Span,
    },
}

impl Node {
    pub fn new(span: Span, kind: NodeKind) -> Self {
        Self { span, kind }
    }
}

// Precedence levels for display: 0 arrow, 1 equivalence, 2 postfix, 3 atom.
fn prec(kind: &NodeKind) -> u8 {
    match kind {
        NodeKind::FnType { .. } | NodeKind::Lambda { .. } => 0,
        NodeKind::Equiv(..) => 1,
        NodeKind::Call { .. } | NodeKind::Member(..) => 2,
        _ => 3,
    }
}

fn fmt_prec(node: &Node, min: u8, f: &mut fmt::Formatter) -> fmt::Result {
    if prec(&node.kind) < min {
        write!(f, "(")?;
        fmt_prec(node, 0, f)?;
        return write!(f, ")");
    }
    match &node.kind {
        NodeKind::Ident(s) => s.fmt(f),
        NodeKind::Number(n) => n.fmt(f),
        NodeKind::Str(s) => write!(f, "{:?}", s),
        NodeKind::Pattern(None) => "?".fmt(f),
        NodeKind::Pattern(Some(s)) => write!(f, "?{}", s),
        NodeKind::Member(lhs, name) => {
            fmt_prec(lhs, 2, f)?;
            write!(f, ".{}", name)
        }
        NodeKind::Call { fun, arg, color } => {
            fmt_prec(fun, 2, f)?;
            let (l, r) = if *color == 0 { ("(", ")") } else { ("[", "]") };
            write!(f, "{}", l)?;
            fmt_prec(arg, 0, f)?;
            write!(f, "{}", r)
        }
        NodeKind::Lambda {
            arg,
            arg_ty,
            body,
            color,
        } => {
            let intro = if *color == 0 { r"\" } else { r"\\" };
            match arg_ty {
                Some(ty) => {
                    write!(f, "{}({}: ", intro, arg)?;
                    fmt_prec(ty, 0, f)?;
                    write!(f, ") ")?
                }
                None => write!(f, "{}{} ", intro, arg)?,
            }
            fmt_prec(body, 0, f)
        }
        NodeKind::FnType {
            binder,
            input,
            output,
            color,
        } => {
            match (binder, color) {
                (Some(x), 0) => {
                    write!(f, "({}: ", x)?;
                    fmt_prec(input, 0, f)?;
                    write!(f, ")")?
                }
                (Some(x), _) => {
                    write!(f, "[{}: ", x)?;
                    fmt_prec(input, 0, f)?;
                    write!(f, "]")?
                }
                (None, 0) => fmt_prec(input, 1, f)?,
                (None, _) => {
                    write!(f, "[")?;
                    fmt_prec(input, 0, f)?;
                    write!(f, "]")?
                }
            }
            write!(f, " -> ")?;
            fmt_prec(output, 0, f)
        }
        NodeKind::Equiv(lhs, rhs) => {
            fmt_prec(lhs, 2, f)?;
            write!(f, " === ")?;
            fmt_prec(rhs, 2, f)
        }
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt_prec(self, 0, f)
    }
}
