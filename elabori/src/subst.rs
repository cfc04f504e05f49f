//! Substitution of scope variables, with capture avoidance through
//! metavariable exclusion sets.

use crate::elab::Elab;
use crate::expr::{Comb, Expr, VarId};
use crate::unify::Constraint;

/// An ordered replacement map from scope variables to expressions.
pub type Reps = Vec<(VarId, Expr)>;

impl Elab {
    /// Replace every free occurrence of the given scope variables.
    ///
    /// Descending under a binder drops a replacement it shadows and marks the
    /// binder into the exclusion set of every metavariable inside the
    /// remaining replacements, so the binder can never be captured later.
    ///
    /// An unresolved metavariable that may still come to mention a replaced
    /// variable cannot be rewritten in place: the substitution returns a
    /// fresh metavariable and posts an `EqualReplace` constraint carrying the
    /// still-needed replacements. Replacements wholly covered by the
    /// exclusion set pass through unchanged.
    pub fn replace_vars(&mut self, e: &Expr, reps: &Reps) -> Expr {
        if reps.is_empty() {
            return e.clone();
        }
        match e {
            Expr::Var(v) => match reps.iter().find(|(k, _)| k == v) {
                Some((_, r)) => r.clone(),
                None => e.clone(),
            },
            Expr::Sym(_) | Expr::Num(_) | Expr::Str(_) => e.clone(),
            Expr::Meta(m) => {
                let m = *m;
                if let Some(value) = self.graph.meta(m).value.clone() {
                    return self.replace_vars(&value, reps);
                }
                let needed: Reps = reps
                    .iter()
                    .filter(|(k, _)| !self.graph.meta(m).excluded.contains(k))
                    .cloned()
                    .collect();
                if needed.is_empty() {
                    return e.clone();
                }
                let ty = match self.graph.meta(m).ty.clone() {
                    Some(ty) => Some(self.replace_vars(&ty, reps)),
                    None => None,
                };
                let fresh = self.graph.fresh_meta();
                self.graph.meta_mut(fresh).ty = ty;
                let excluded: Vec<VarId> = self
                    .graph
                    .meta(m)
                    .excluded
                    .iter()
                    .copied()
                    .chain(reps.iter().map(|(k, _)| *k))
                    .collect();
                for v in excluded {
                    self.graph.exclude(fresh, v)
                }
                self.add_constraint(Constraint::EqualReplace {
                    target: fresh,
                    source: m,
                    reps: needed,
                });
                Expr::Meta(fresh)
            }
            Expr::Comb(c) => match &**c {
                Comb::Appl { fun, arg, color } => {
                    let fun = self.replace_vars(fun, reps);
                    let arg = self.replace_vars(arg, reps);
                    Expr::appl(fun, arg, *color)
                }
                Comb::Prod {
                    input,
                    var,
                    output,
                    color,
                } => {
                    let input = self.replace_vars(input, reps);
                    let inner = self.under_binder(*var, reps);
                    let output = self.replace_vars(output, &inner);
                    Expr::prod(input, *var, output, *color)
                }
                Comb::Abst {
                    var,
                    ty,
                    body,
                    color,
                } => {
                    let ty = self.replace_vars(ty, reps);
                    let inner = self.under_binder(*var, reps);
                    let body = self.replace_vars(body, &inner);
                    Expr::abst(*var, ty, body, *color)
                }
            },
        }
    }

    /// Drop replacements shadowed by the binder; forbid the binder inside
    /// the metavariables of the replacements that remain in force.
    fn under_binder(&mut self, var: Option<VarId>, reps: &Reps) -> Reps {
        let v = match var {
            Some(v) => v,
            None => return reps.clone(),
        };
        let inner: Reps = reps.iter().filter(|(k, _)| *k != v).cloned().collect();
        for (_, r) in &inner {
            self.mark_excluded(r, v)
        }
        inner
    }

    fn mark_excluded(&mut self, e: &Expr, v: VarId) {
        let mut todo = vec![e.clone()];
        while let Some(e) = todo.pop() {
            match e {
                Expr::Meta(m) => {
                    self.graph.exclude(m, v);
                    if let Some(value) = self.graph.meta(m).value.clone() {
                        todo.push(value)
                    }
                }
                Expr::Comb(c) => match &*c {
                    Comb::Appl { fun, arg, .. } => {
                        todo.push(fun.clone());
                        todo.push(arg.clone());
                    }
                    Comb::Prod { input, output, .. } => {
                        todo.push(input.clone());
                        todo.push(output.clone());
                    }
                    Comb::Abst { ty, body, .. } => {
                        todo.push(ty.clone());
                        todo.push(body.clone());
                    }
                },
                _ => (),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_substitution_is_identity() {
        let mut elab = Elab::new();
        let type0 = elab.graph.type_expr(Expr::level(0));
        let t = elab.graph.fresh_var(Some("T"), Some(type0.clone()));
        let e = Expr::abst(Some(t), type0, Expr::Var(t), 0);
        let r = elab.replace_vars(&e, &Vec::new());
        assert!(elab.graph.same_q(&e, &r));
    }

    #[test]
    fn replaces_free_occurrences() {
        let mut elab = Elab::new();
        let v = elab.graph.fresh_var(Some("v"), None);
        let e = Expr::appl(Expr::Var(v), Expr::Var(v), 0);
        let r = elab.replace_vars(&e, &vec![(v, Expr::level(1))]);
        let expected = Expr::appl(Expr::level(1), Expr::level(1), 0);
        assert!(elab.graph.same_q(&r, &expected));
    }

    #[test]
    fn shadowing_binder_drops_replacement() {
        let mut elab = Elab::new();
        let type0 = elab.graph.type_expr(Expr::level(0));
        let v = elab.graph.fresh_var(Some("v"), Some(type0.clone()));
        let lam = Expr::abst(Some(v), type0, Expr::Var(v), 0);
        let r = elab.replace_vars(&lam, &vec![(v, Expr::level(1))]);
        assert!(elab.graph.same_q(&r, &lam));
    }

    #[test]
    fn excluded_metas_pass_through() {
        let mut elab = Elab::new();
        let v = elab.graph.fresh_var(Some("v"), None);
        let m = elab.graph.fresh_meta();
        elab.graph.exclude(m, v);
        let r = elab.replace_vars(&Expr::Meta(m), &vec![(v, Expr::level(1))]);
        assert!(matches!(r, Expr::Meta(x) if x == m));
        assert!(elab.cs.active.is_empty());
    }

    #[test]
    fn open_metas_defer_through_a_constraint() {
        let mut elab = Elab::new();
        let v = elab.graph.fresh_var(Some("v"), None);
        let m = elab.graph.fresh_meta();
        let r = elab.replace_vars(&Expr::Meta(m), &vec![(v, Expr::level(1))]);
        let fresh = match r {
            Expr::Meta(x) => x,
            r => panic!("expected a fresh metavariable, got {:?}", r),
        };
        assert_ne!(fresh, m);
        assert!(elab.graph.meta(fresh).excluded.contains(&v));
        assert_eq!(elab.cs.active.len(), 1);
        // once the source resolves, the constraint applies the replacement
        elab.graph.resolve_meta(m, Expr::Var(v));
        assert!(elab.solve_constraints());
        let value = elab.graph.deref(&Expr::Meta(fresh));
        assert!(elab.graph.same_q(&value, &Expr::level(1)));
    }

    #[test]
    fn binder_entry_marks_exclusions_in_replacements() {
        let mut elab = Elab::new();
        let type0 = elab.graph.type_expr(Expr::level(0));
        let v = elab.graph.fresh_var(Some("v"), None);
        let b = elab.graph.fresh_var(Some("b"), Some(type0.clone()));
        let m = elab.graph.fresh_meta();
        // substituting v -> ?m under the binder b forbids b inside ?m
        let lam = Expr::abst(Some(b), type0, Expr::Var(v), 0);
        let _ = elab.replace_vars(&lam, &vec![(v, Expr::Meta(m))]);
        assert!(elab.graph.meta(m).excluded.contains(&b));
    }
}
