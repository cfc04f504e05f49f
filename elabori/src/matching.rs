//! Pattern matching of rule left-hand sides against expressions.

use crate::expr::{Comb, Expr, VarId};
use crate::graph::Graph;
use fnv::FnvHashMap;

impl Graph {
    /// Match a pattern against an expression, yielding variable bindings.
    ///
    /// Scope variables in the pattern bind; a variable bound twice must bind
    /// equal (`same_q`) expressions. Calls match by shape and argument count.
    /// Symbols, numbers, strings, lambdas, and function types match by
    /// structural equality. An unresolved metavariable in the pattern aborts
    /// the match.
    pub fn match_pattern(&self, pattern: &Expr, expr: &Expr) -> Option<FnvHashMap<VarId, Expr>> {
        let mut subst = FnvHashMap::default();
        let mut todo = vec![(pattern.clone(), expr.clone())];
        while let Some((p, e)) = todo.pop() {
            let p = self.deref(&p);
            let e = self.deref(&e);
            match &p {
                Expr::Var(v) => match subst.get(v) {
                    Some(prev) => {
                        if !self.same_q(prev, &e) {
                            return None;
                        }
                    }
                    None => {
                        subst.insert(*v, e);
                    }
                },
                Expr::Meta(_) => return None,
                Expr::Comb(c) => match (&**c, &e) {
                    (Comb::Appl { fun: pf, arg: pa, color: pc }, Expr::Comb(ec)) => match &**ec {
                        Comb::Appl { fun: ef, arg: ea, color } if color == pc => {
                            todo.push((pf.clone(), ef.clone()));
                            todo.push((pa.clone(), ea.clone()));
                        }
                        _ => return None,
                    },
                    _ => {
                        if !self.same_q(&p, &e) {
                            return None;
                        }
                    }
                },
                _ => {
                    if !self.same_q(&p, &e) {
                        return None;
                    }
                }
            }
        }
        Some(subst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_call_arguments() {
        let mut graph = Graph::new();
        let bs = graph.builtins;
        let x = graph.fresh_var(Some("x"), None);
        let pattern = Expr::appl(Expr::Sym(bs.succ), Expr::Var(x), 0);
        let expr = Expr::appl(Expr::Sym(bs.succ), Expr::level(3), 0);
        let subst = graph.match_pattern(&pattern, &expr).unwrap();
        assert_eq!(subst.len(), 1);
        assert!(graph.same_q(&subst[&x], &Expr::level(3)));
    }

    #[test]
    fn nonlinear_bindings_must_agree() {
        let mut graph = Graph::new();
        let bs = graph.builtins;
        let x = graph.fresh_var(Some("x"), None);
        let pattern = Expr::appl(
            Expr::appl(Expr::Sym(bs.max), Expr::Var(x), 0),
            Expr::Var(x),
            0,
        );
        let same = Expr::appl(
            Expr::appl(Expr::Sym(bs.max), Expr::level(1), 0),
            Expr::level(1),
            0,
        );
        let diff = Expr::appl(
            Expr::appl(Expr::Sym(bs.max), Expr::level(1), 0),
            Expr::level(2),
            0,
        );
        assert!(graph.match_pattern(&pattern, &same).is_some());
        assert!(graph.match_pattern(&pattern, &diff).is_none());
    }

    #[test]
    fn shape_mismatches() {
        let mut graph = Graph::new();
        let bs = graph.builtins;
        let x = graph.fresh_var(Some("x"), None);
        let pattern = Expr::appl(Expr::Sym(bs.succ), Expr::Var(x), 0);
        // wrong head
        assert!(graph
            .match_pattern(&pattern, &Expr::appl(Expr::Sym(bs.max), Expr::level(0), 0))
            .is_none());
        // wrong argument count
        assert!(graph.match_pattern(&pattern, &Expr::Sym(bs.succ)).is_none());
        // wrong color
        assert!(graph
            .match_pattern(&pattern, &Expr::appl(Expr::Sym(bs.succ), Expr::level(0), 1))
            .is_none());
    }

    #[test]
    fn unknown_in_pattern_aborts() {
        let mut graph = Graph::new();
        let bs = graph.builtins;
        let m = graph.fresh_meta();
        let pattern = Expr::appl(Expr::Sym(bs.succ), Expr::Meta(m), 0);
        let expr = Expr::appl(Expr::Sym(bs.succ), Expr::level(0), 0);
        assert!(graph.match_pattern(&pattern, &expr).is_none());
    }

    #[test]
    fn match_after_substitution_returns_the_substitution() {
        let mut graph = Graph::new();
        let bs = graph.builtins;
        let x = graph.fresh_var(Some("x"), None);
        let y = graph.fresh_var(Some("y"), None);
        let lhs = Expr::appl(
            Expr::appl(Expr::Sym(bs.max), Expr::Var(x), 0),
            Expr::Var(y),
            0,
        );
        let instance = Expr::appl(
            Expr::appl(Expr::Sym(bs.max), Expr::level(1), 0),
            Expr::level(2),
            0,
        );
        let subst = graph.match_pattern(&lhs, &instance).unwrap();
        assert!(graph.same_q(&subst[&x], &Expr::level(1)));
        assert!(graph.same_q(&subst[&y], &Expr::level(2)));
    }
}
