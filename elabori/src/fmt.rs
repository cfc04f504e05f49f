//! Deterministic display of expressions, for diagnostics and tracing.
//!
//! Resolved metavariables print as their values; the output of a fully
//! resolved expression re-parses to the same AST shape.

use crate::expr::{Comb, Expr};
use crate::graph::Graph;
use crate::symbol::Rule;
use core::fmt::{self, Display};

/// Pairs a graph with a value so the value can be displayed.
pub struct Show<'g, T: ?Sized>(pub &'g Graph, pub &'g T);

// Precedence levels: 0 function types and lambdas, 2 applications, 3 atoms.
fn fmt_prec(graph: &Graph, e: &Expr, min: u8, f: &mut fmt::Formatter) -> fmt::Result {
    let e = graph.deref(e);
    let prec = match &e {
        Expr::Comb(c) => match &**c {
            Comb::Appl { .. } => 2,
            _ => 0,
        },
        _ => 3,
    };
    if prec < min {
        write!(f, "(")?;
        fmt_prec(graph, &e, 0, f)?;
        return write!(f, ")");
    }
    match &e {
        Expr::Sym(s) => graph.sym(*s).name.fmt(f),
        Expr::Var(v) => match &graph.var(*v).name {
            Some(name) => name.fmt(f),
            None => write!(f, "v{}", v.0),
        },
        Expr::Meta(m) => write!(f, "?{}", m.0),
        Expr::Num(n) => n.value.fmt(f),
        Expr::Str(s) => write!(f, "{:?}", s),
        Expr::Comb(c) => match &**c {
            Comb::Appl { .. } => {
                let (head, args) = graph.spine(&e);
                fmt_prec(graph, &head, 3, f)?;
                let mut args = args.into_iter().peekable();
                while let Some((arg, color)) = args.next() {
                    let (open, close) = if color == 0 { ("(", ")") } else { ("[", "]") };
                    write!(f, "{}", open)?;
                    fmt_prec(graph, &arg, 0, f)?;
                    while let Some((arg, _)) = args.next_if(|(_, c)| *c == color) {
                        write!(f, ", ")?;
                        fmt_prec(graph, &arg, 0, f)?;
                    }
                    write!(f, "{}", close)?;
                }
                Ok(())
            }
            Comb::Prod {
                input,
                var,
                output,
                color,
            } => {
                match var {
                    Some(v) => {
                        let (open, close) = if *color == 0 { ("(", ")") } else { ("[", "]") };
                        write!(f, "{}", open)?;
                        fmt_prec(graph, &Expr::Var(*v), 3, f)?;
                        write!(f, ": ")?;
                        fmt_prec(graph, input, 0, f)?;
                        write!(f, "{}", close)?
                    }
                    None if *color == 0 => fmt_prec(graph, input, 2, f)?,
                    None => {
                        write!(f, "[")?;
                        fmt_prec(graph, input, 0, f)?;
                        write!(f, "]")?
                    }
                }
                write!(f, " -> ")?;
                fmt_prec(graph, output, 0, f)
            }
            Comb::Abst {
                var,
                ty,
                body,
                color,
            } => {
                write!(f, "{}(", if *color == 0 { r"\" } else { r"\\" })?;
                match var {
                    Some(v) => fmt_prec(graph, &Expr::Var(*v), 3, f)?,
                    None => write!(f, "_")?,
                }
                write!(f, ": ")?;
                fmt_prec(graph, ty, 0, f)?;
                write!(f, ") ")?;
                fmt_prec(graph, body, 0, f)
            }
        },
    }
}

impl<'g> Display for Show<'g, Expr> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt_prec(self.0, self.1, 0, f)
    }
}

impl<'g> Display for Show<'g, Rule> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} = {}", Show(self.0, &self.1.lhs), Show(self.0, &self.1.rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;

    #[test]
    fn display() {
        let mut graph = Graph::new();
        let bs = graph.builtins;
        let type0 = graph.type_expr(Expr::level(0));
        assert_eq!(Show(&graph, &type0).to_string(), "Type(0)");

        let t = graph.fresh_var(Some("T"), Some(type0.clone()));
        let x = graph.fresh_var(Some("x"), Some(Expr::Var(t)));
        let id = Expr::abst(
            Some(t),
            type0.clone(),
            Expr::abst(Some(x), Expr::Var(t), Expr::Var(x), 0),
            0,
        );
        assert_eq!(Show(&graph, &id).to_string(), r"\(T: Type(0)) \(x: T) x");

        let ty = Expr::prod(
            type0.clone(),
            Some(t),
            Expr::prod(Expr::Var(t), None, Expr::Var(t), 0),
            0,
        );
        assert_eq!(Show(&graph, &ty).to_string(), "(T: Type(0)) -> T -> T");

        let max = Expr::appl(
            Expr::appl(Expr::Sym(bs.max), Expr::level(0), 0),
            Expr::level(2),
            0,
        );
        assert_eq!(Show(&graph, &max).to_string(), "max(0, 2)");

        let erased = Expr::appl(Expr::Sym(bs.typ), Expr::level(0), 1);
        assert_eq!(Show(&graph, &erased).to_string(), "Type[0]");
    }

    #[test]
    fn resolved_metas_are_transparent() {
        let mut graph = Graph::new();
        let m = graph.fresh_meta();
        assert_eq!(Show(&graph, &Expr::Meta(m)).to_string(), "?0");
        graph.resolve_meta(m, Expr::level(3));
        assert_eq!(Show(&graph, &Expr::Meta(m)).to_string(), "3");
    }
}
