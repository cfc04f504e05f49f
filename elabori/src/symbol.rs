//! Arena entries: symbols, scope variables, and metavariables.

use crate::expr::{Expr, SymId, VarId};
use fnv::{FnvHashMap, FnvHashSet};

/// Permission bits of a symbol, fixed at creation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Flags(u8);

impl Flags {
    /// The symbol may be given a declared type.
    pub const DEF_TYPE: Self = Self(1);
    /// The symbol may be given a value, at most once.
    pub const ASSIGNMENT: Self = Self(1 << 1);
    /// Rewrite rules may be keyed by this symbol as the call head.
    pub const DOWN_VALUE: Self = Self(1 << 2);
    /// Rewrite rules may be keyed by this symbol as an argument head.
    pub const UP_VALUE: Self = Self(1 << 3);
    /// The symbol may be pruned once unreferenced.
    pub const AUTO_REMOVE: Self = Self(1 << 4);
    /// The symbol is never unfolded during evaluation.
    pub const HOLD: Self = Self(1 << 5);

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl core::ops::BitOr for Flags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0
    }
}

/// A rewrite rule. Scope variables free in `lhs` bind during matching.
#[derive(Clone, Debug)]
pub struct Rule {
    pub lhs: Expr,
    pub rhs: Expr,
}

/// Built-in evaluators attached to primitive symbols.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Prim {
    LevelSucc,
    LevelMax,
}

/// A named symbol. The mutable fields are written during elaboration;
/// `flags` and `prim` are fixed at creation.
#[derive(Debug)]
pub struct Symbol {
    pub name: String,
    pub parent: Option<SymId>,
    pub flags: Flags,
    pub prim: Option<Prim>,
    pub ty: Option<Expr>,
    pub value: Option<Expr>,
    pub subs: FnvHashMap<String, SymId>,
    pub down_values: Vec<Rule>,
    pub up_values: Vec<Rule>,
}

/// A λ- or Π-bound scope variable. Identity is the arena index;
/// `ty` is its default type, consulted when no cache entry applies.
#[derive(Debug)]
pub struct Variable {
    pub name: Option<String>,
    pub ty: Option<Expr>,
}

/// A metavariable. `value` is set at most once and never cleared;
/// `excluded` lists scope variables its value must never mention and
/// only ever grows.
#[derive(Debug, Default)]
pub struct Unknown {
    pub value: Option<Expr>,
    pub ty: Option<Expr>,
    pub is_pattern: bool,
    pub excluded: FnvHashSet<VarId>,
}

#[test]
fn flag_bits() {
    let flags = Flags::DEF_TYPE | Flags::ASSIGNMENT;
    assert!(flags.contains(Flags::DEF_TYPE));
    assert!(flags.contains(Flags::ASSIGNMENT));
    assert!(!flags.contains(Flags::DOWN_VALUE));
    assert!(flags.intersects(Flags::ASSIGNMENT | Flags::HOLD));
    assert!(!Flags::empty().intersects(flags));
}
