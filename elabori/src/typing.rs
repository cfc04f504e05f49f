//! Type computation, memoized by expression identity.

use crate::elab::Elab;
use crate::expr::{Comb, Expr};
use crate::unify::Constraint;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Cache key: a composite node, hashed and compared by pointer.
#[derive(Clone)]
pub(crate) struct CombKey(pub Rc<Comb>);

impl PartialEq for CombKey {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for CombKey {}

impl Hash for CombKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as usize).hash(state)
    }
}

impl Elab {
    /// Compute the type of an expression.
    ///
    /// Composite results are cached by node identity, so recomputing the type
    /// of a shared node is cheap and yields `same_q` results. Querying the
    /// type of an unresolved metavariable allocates a type metavariable for
    /// it and posts a `Typeof` constraint.
    pub fn type_of(&mut self, e: &Expr) -> Expr {
        let bs = self.graph.builtins;
        match e {
            Expr::Num(n) => {
                if n.is_level {
                    Expr::Sym(bs.level)
                } else {
                    Expr::Sym(bs.number)
                }
            }
            Expr::Str(_) => Expr::Sym(bs.string),
            Expr::Sym(s) => match self.graph.sym(*s).ty.clone() {
                Some(ty) => ty,
                None => Expr::Sym(bs.untyped),
            },
            Expr::Var(v) => match self.graph.var(*v).ty.clone() {
                Some(ty) => ty,
                None => Expr::Sym(bs.untyped),
            },
            Expr::Meta(m) => {
                if let Some(value) = self.graph.meta(*m).value.clone() {
                    return self.type_of(&value);
                }
                if let Some(ty) = self.graph.meta(*m).ty.clone() {
                    return ty;
                }
                let target = self.graph.fresh_meta();
                self.graph.meta_mut(*m).ty = Some(Expr::Meta(target));
                self.add_constraint(Constraint::Typeof {
                    target,
                    source: *m,
                });
                Expr::Meta(target)
            }
            Expr::Comb(c) => {
                if let Some(ty) = self.type_cache.get(&CombKey(c.clone())) {
                    return ty.clone();
                }
                let (ty, cache) = self.comb_type(c);
                if cache {
                    self.type_cache.insert(CombKey(c.clone()), ty.clone());
                }
                ty
            }
        }
    }

    fn comb_type(&mut self, c: &Rc<Comb>) -> (Expr, bool) {
        match &**c {
            Comb::Abst {
                var,
                ty,
                body,
                color,
            } => {
                let output = self.type_of(body);
                (Expr::prod(ty.clone(), *var, output, *color), true)
            }
            Comb::Prod { input, output, .. } => {
                let input = self.type_of(input);
                let output = self.type_of(output);
                let target = self.graph.fresh_meta();
                self.add_constraint(Constraint::FnTypeType {
                    target,
                    input,
                    output,
                });
                (Expr::Meta(target), true)
            }
            Comb::Appl { fun, arg, .. } => {
                let fun_ty = self.type_of(fun);
                let fun_ty = self.evaluate(&fun_ty);
                match &fun_ty {
                    Expr::Comb(fc) => match &**fc {
                        Comb::Prod { var, output, .. } => {
                            let output = match var {
                                Some(v) => self.replace_vars(output, &vec![(*v, arg.clone())]),
                                None => output.clone(),
                            };
                            (output, true)
                        }
                        _ => (Expr::Sym(self.graph.builtins.error_ty), true),
                    },
                    // the function's type is not known yet; report the
                    // sentinel but do not poison the cache with it
                    Expr::Meta(_) => (Expr::Sym(self.graph.builtins.error_ty), false),
                    _ => (Expr::Sym(self.graph.builtins.error_ty), true),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals() {
        let mut elab = Elab::new();
        let bs = elab.graph.builtins;
        assert!(matches!(elab.type_of(&Expr::level(0)), Expr::Sym(s) if s == bs.level));
        assert!(matches!(elab.type_of(&Expr::number(4)), Expr::Sym(s) if s == bs.number));
        let s = Expr::Str("hi".into());
        assert!(matches!(elab.type_of(&s), Expr::Sym(s) if s == bs.string));
    }

    #[test]
    fn universes() {
        // the type of Type(i) is Type(succ(i))
        let mut elab = Elab::new();
        let type1 = elab.graph.type_expr(Expr::level(1));
        let ty = elab.type_of(&type1);
        let ty = elab.evaluate(&ty);
        let type2 = elab.graph.type_expr(Expr::level(2));
        assert!(elab.graph.same_q(&ty, &type2));
    }

    #[test]
    fn lambdas_have_function_types() {
        let mut elab = Elab::new();
        let bs = elab.graph.builtins;
        let lv = Expr::Sym(bs.level);
        let x = elab.graph.fresh_var(Some("x"), Some(lv.clone()));
        let lam = Expr::abst(Some(x), lv.clone(), Expr::Var(x), 0);
        let ty = elab.type_of(&lam);
        let expected = Expr::prod(lv.clone(), Some(x), lv, 0);
        assert!(elab.graph.same_q(&ty, &expected));
    }

    #[test]
    fn call_types_substitute_the_binder() {
        let mut elab = Elab::new();
        // Type(1) : Type(succ(1)); the binder of Type's type is replaced
        let call = elab.graph.type_expr(Expr::level(1));
        let ty = elab.type_of(&call);
        let ty = elab.evaluate(&ty);
        assert!(elab.graph.level_of_type(&ty).is_some());
    }

    #[test]
    fn types_are_stable() {
        let mut elab = Elab::new();
        let bs = elab.graph.builtins;
        let lv = Expr::Sym(bs.level);
        let x = elab.graph.fresh_var(Some("x"), Some(lv.clone()));
        let lam = Expr::abst(Some(x), lv.clone(), Expr::Var(x), 0);
        let t1 = elab.type_of(&lam);
        let t2 = elab.type_of(&lam);
        assert!(elab.graph.same_q(&t1, &t2));
    }

    #[test]
    fn unknowns_get_typeof_constraints() {
        let mut elab = Elab::new();
        let m = elab.graph.fresh_meta();
        let ty = elab.type_of(&Expr::Meta(m));
        assert!(matches!(ty, Expr::Meta(_)));
        assert_eq!(elab.cs.active.len(), 1);
        // the type is remembered on the metavariable
        let again = elab.type_of(&Expr::Meta(m));
        assert!(elab.graph.same_q(&ty, &again));
        assert_eq!(elab.cs.active.len(), 1);
    }

    #[test]
    fn bad_applications_get_the_sentinel() {
        let mut elab = Elab::new();
        let bs = elab.graph.builtins;
        let call = Expr::appl(Expr::level(0), Expr::level(1), 0);
        assert!(matches!(elab.type_of(&call), Expr::Sym(s) if s == bs.error_ty));
    }
}
