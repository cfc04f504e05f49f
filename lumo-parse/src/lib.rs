//! Lexing and parsing for the lumo surface language.
//!
//! The pipeline is `lex` → [`Token`]s → [`decl::program`] → [`Decl`]s.
//! Every AST node carries the byte range it was read from, so that
//! later stages can attach diagnostics to source positions.

pub mod ast;
pub mod decl;
pub mod lex;
pub mod term;

pub use ast::{Decl, Node, NodeKind, Span};
pub use decl::program;
pub use lex::{lex, Token};
pub use term::Error;
