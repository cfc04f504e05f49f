#![forbid(unsafe_code)]

//! Elaboration for the lumo bootstrap compiler.
//!
//! The elaborator turns a lowered register array (HIR) into a tree of
//! resolved symbols. Four subsystems share one mutable expression graph:
//!
//! * the [`graph`] arenas holding symbols, scope variables, and
//!   metavariables, referenced by index from [`expr`] nodes,
//! * the type solver in [`typing`], memoized by node identity,
//! * the evaluator in [`reduce`], applying δ-expansion, β-reduction,
//!   built-in evaluators, user rewrite rules, and η-reduction,
//! * the constraint solver in [`unify`], which resolves metavariables,
//! * the HIR solver in [`elab`], polling one action per register and
//!   alternating with constraint passes until neither makes progress.
//!
//! The following example elaborates a definition end to end:
//!
//! ~~~
//! use elabori::{lower, Elab, Show};
//!
//! let decls = lumo_parse::program(r"id: (T: Type(0)) -> T -> T = \T \x x")?;
//! let elab = Elab::new();
//! let hir = lower(&decls, &elab.graph).unwrap();
//! let out = elab.run(&hir);
//! assert!(out.diagnostics.is_empty());
//!
//! let root = out.elab.graph.builtins.root;
//! let id = out.elab.graph.sym(root).subs["id"];
//! let value = out.elab.graph.sym(id).value.clone().unwrap();
//! assert_eq!(
//!     Show(&out.elab.graph, &value).to_string(),
//!     r"\(T: Type(0)) \(x: T) x"
//! );
//! # Ok::<_, lumo_parse::Error>(())
//! ~~~

#[macro_use]
extern crate log;

pub mod diag;
pub mod elab;
pub mod equal;
pub mod error;
pub mod expr;
pub mod fmt;
pub mod graph;
pub mod hir;
pub mod lower;
pub mod matching;
pub mod reduce;
pub mod subst;
pub mod symbol;
pub mod typing;
pub mod unify;

pub use diag::Diagnostic;
pub use elab::{elaborate, Elab, Elaborated, Slot};
pub use error::LowerError;
pub use expr::{Color, Comb, Expr, MetaId, Number, SymId, VarId};
pub use fmt::Show;
pub use graph::{Builtins, Graph};
pub use hir::{Hir, Reg, RegId, RegKind};
pub use lower::lower;
pub use reduce::EvalFlags;
pub use subst::Reps;
pub use symbol::{Flags, Prim, Rule};
pub use unify::{Constraint, Constraints};
