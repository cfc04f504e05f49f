//! Expressions of the core calculus.
//!
//! `Symbol`, `Variable`, and `Unknown` nodes live in the arenas of a
//! [`Graph`](crate::Graph) and are referenced here by index, so that node
//! identity is index equality and mutation (resolving an unknown, installing
//! a definition) is observable by every holder of a reference. Composite
//! nodes are reference-counted and identified by pointer.

use std::rc::Rc;

/// Application color: `0` is a normal argument, `1` an erased one.
pub type Color = u8;

/// Index of a symbol in its arena.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct SymId(pub u32);

/// Index of a scope variable in its arena.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct VarId(pub u32);

/// Index of a metavariable in its arena.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct MetaId(pub u32);

/// Integer literal, either a universe level or a runtime number.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Number {
    pub value: i64,
    pub is_level: bool,
}

#[derive(Clone, Debug)]
pub enum Expr {
    Sym(SymId),
    Var(VarId),
    Meta(MetaId),
    Num(Number),
    Str(Rc<str>),
    Comb(Rc<Comb>),
}

/// Composite expression nodes.
#[derive(Clone, Debug)]
pub enum Comb {
    /// Application of a function to a single argument.
    Appl { fun: Expr, arg: Expr, color: Color },
    /// Dependent function type.
    Prod {
        input: Expr,
        var: Option<VarId>,
        output: Expr,
        color: Color,
    },
    /// Abstraction. A lambda without a binder ignores its argument.
    Abst {
        var: Option<VarId>,
        ty: Expr,
        body: Expr,
        color: Color,
    },
}

impl Expr {
    pub fn appl(fun: Self, arg: Self, color: Color) -> Self {
        Self::Comb(Rc::new(Comb::Appl { fun, arg, color }))
    }

    pub fn prod(input: Self, var: Option<VarId>, output: Self, color: Color) -> Self {
        Self::Comb(Rc::new(Comb::Prod {
            input,
            var,
            output,
            color,
        }))
    }

    pub fn abst(var: Option<VarId>, ty: Self, body: Self, color: Color) -> Self {
        Self::Comb(Rc::new(Comb::Abst {
            var,
            ty,
            body,
            color,
        }))
    }

    pub fn level(value: i64) -> Self {
        Self::Num(Number {
            value,
            is_level: true,
        })
    }

    pub fn number(value: i64) -> Self {
        Self::Num(Number {
            value,
            is_level: false,
        })
    }

    pub fn as_comb(&self) -> Option<&Comb> {
        match self {
            Self::Comb(c) => Some(c),
            _ => None,
        }
    }

    /// Shallow identity: index equality on arena nodes,
    /// pointer equality on composite nodes.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Sym(a), Self::Sym(b)) => a == b,
            (Self::Var(a), Self::Var(b)) => a == b,
            (Self::Meta(a), Self::Meta(b)) => a == b,
            (Self::Num(a), Self::Num(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => Rc::ptr_eq(a, b),
            (Self::Comb(a), Self::Comb(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}
