//! The HIR register array: an append-only list of elaboration tasks.
//!
//! Registers may refer to lower or higher indices; the solver tolerates
//! arbitrary dependency order. Re-lowering the same source produces the
//! same register sequence.

use crate::expr::{Color, Expr};
use crate::symbol::Flags;
use lumo_parse::Span;

pub type RegId = usize;

#[derive(Clone, Debug)]
pub struct Reg {
    pub span: Option<Span>,
    pub kind: RegKind,
}

#[derive(Clone, Debug)]
pub enum RegKind {
    /// The root symbol.
    Root,
    /// An already-formed expression (literals, built-in symbols).
    Expr(Expr),
    /// A numeric literal; resolves once context types it
    /// as a level or a number.
    Number(i64),
    Lambda {
        arg: Option<RegId>,
        arg_ty: Option<RegId>,
        body: RegId,
        color: Color,
    },
    Call {
        fun: RegId,
        arg: RegId,
        color: Color,
        /// Set on calls lowered from rule left-hand sides; resolving such a
        /// call marks the unknowns in its argument as pattern unknowns.
        is_pattern: bool,
    },
    FnType {
        input: RegId,
        arg: Option<RegId>,
        output: RegId,
        color: Color,
    },
    Member {
        lhs: RegId,
        name: String,
    },
    Symbol {
        name: Option<String>,
        parent: Option<RegId>,
        flags: Flags,
    },
    SymbolType {
        symbol: RegId,
        ty: RegId,
    },
    SymbolAssign {
        symbol: RegId,
        value: RegId,
    },
    SymbolRule {
        symbol: RegId,
        lhs: RegId,
        rhs: RegId,
        is_up: bool,
    },
    Unknown {
        ty: Option<RegId>,
    },
    Variable {
        name: Option<String>,
        ty: Option<RegId>,
    },
    /// Equivalence assertion: posts an equality and resolves to the
    /// left-hand side.
    Equiv {
        lhs: RegId,
        rhs: RegId,
    },
}

/// The register array, plus the registers of top-level expression
/// statements whose values the driver reports.
#[derive(Debug, Default)]
pub struct Hir {
    pub regs: Vec<Reg>,
    pub outputs: Vec<RegId>,
}

impl Hir {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn push(&mut self, span: Option<Span>, kind: RegKind) -> RegId {
        let id = self.regs.len();
        self.regs.push(Reg { span, kind });
        id
    }
}
