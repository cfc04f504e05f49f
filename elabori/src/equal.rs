//! Structural equality modulo α-renaming and resolved metavariables,
//! plus the free-variable and occurs checks.
//!
//! All walks here use explicit work lists, so deeply nested expressions
//! cannot exhaust the host stack.

use crate::expr::{Comb, Expr, MetaId, VarId};
use crate::graph::Graph;
use fnv::FnvHashSet;

impl Graph {
    /// Equality modulo α-renaming of binders; resolved metavariables are
    /// unwrapped transparently. Two unresolved metavariables are equal only
    /// if they are the same node, as are two variables or two symbols.
    pub fn same_q(&self, a: &Expr, b: &Expr) -> bool {
        let mut todo: Vec<(Expr, Expr, Vec<(VarId, VarId)>)> =
            vec![(a.clone(), b.clone(), Vec::new())];
        while let Some((a, b, renames)) = todo.pop() {
            let a = self.deref(&a);
            let b = self.deref(&b);
            let ok = match (&a, &b) {
                (Expr::Sym(s1), Expr::Sym(s2)) => s1 == s2,
                (Expr::Meta(m1), Expr::Meta(m2)) => m1 == m2,
                (Expr::Var(v1), Expr::Var(v2)) => {
                    let mut bound = None;
                    for (x, y) in renames.iter().rev() {
                        if x == v1 || y == v2 {
                            bound = Some(x == v1 && y == v2);
                            break;
                        }
                    }
                    bound.unwrap_or(v1 == v2)
                }
                (Expr::Num(n1), Expr::Num(n2)) => n1 == n2,
                (Expr::Str(s1), Expr::Str(s2)) => s1 == s2,
                (Expr::Comb(c1), Expr::Comb(c2)) => match (&**c1, &**c2) {
                    (
                        Comb::Appl { fun: f1, arg: a1, color: k1 },
                        Comb::Appl { fun: f2, arg: a2, color: k2 },
                    ) if k1 == k2 => {
                        todo.push((f1.clone(), f2.clone(), renames.clone()));
                        todo.push((a1.clone(), a2.clone(), renames));
                        true
                    }
                    (
                        Comb::Prod { input: i1, var: v1, output: o1, color: k1 },
                        Comb::Prod { input: i2, var: v2, output: o2, color: k2 },
                    ) if k1 == k2 => {
                        todo.push((i1.clone(), i2.clone(), renames.clone()));
                        let mut inner = renames;
                        if let (Some(v1), Some(v2)) = (v1, v2) {
                            inner.push((*v1, *v2))
                        }
                        todo.push((o1.clone(), o2.clone(), inner));
                        true
                    }
                    (
                        Comb::Abst { var: v1, ty: t1, body: b1, color: k1 },
                        Comb::Abst { var: v2, ty: t2, body: b2, color: k2 },
                    ) if k1 == k2 => {
                        todo.push((t1.clone(), t2.clone(), renames.clone()));
                        let mut inner = renames;
                        if let (Some(v1), Some(v2)) = (v1, v2) {
                            inner.push((*v1, *v2))
                        }
                        todo.push((b1.clone(), b2.clone(), inner));
                        true
                    }
                    _ => false,
                },
                _ => false,
            };
            if !ok {
                return false;
            }
        }
        true
    }

    /// Whether a scope variable may occur free in an expression.
    /// An unresolved metavariable counts as an occurrence unless
    /// the variable is in its exclusion set.
    pub fn free_in(&self, v: VarId, e: &Expr) -> bool {
        let mut todo = vec![e.clone()];
        while let Some(e) = todo.pop() {
            match self.deref(&e) {
                Expr::Var(x) => {
                    if x == v {
                        return true;
                    }
                }
                Expr::Meta(m) => {
                    if !self.meta(m).excluded.contains(&v) {
                        return true;
                    }
                }
                Expr::Comb(c) => match &*c {
                    Comb::Appl { fun, arg, .. } => {
                        todo.push(fun.clone());
                        todo.push(arg.clone());
                    }
                    Comb::Prod { input, var, output, .. } => {
                        todo.push(input.clone());
                        if *var != Some(v) {
                            todo.push(output.clone())
                        }
                    }
                    Comb::Abst { var, ty, body, .. } => {
                        todo.push(ty.clone());
                        if *var != Some(v) {
                            todo.push(body.clone())
                        }
                    }
                },
                _ => (),
            }
        }
        false
    }

    /// Occurs check: whether any transitive value path from `e`
    /// reaches the metavariable `m`.
    pub fn occurs(&self, m: MetaId, e: &Expr) -> bool {
        let mut todo = vec![e.clone()];
        while let Some(e) = todo.pop() {
            match e {
                Expr::Meta(x) => {
                    if x == m {
                        return true;
                    }
                    if let Some(value) = &self.meta(x).value {
                        todo.push(value.clone())
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
        false
    }

    /// Collect the unresolved metavariables mentioned by an expression.
    pub fn unset_metas(&self, e: &Expr, out: &mut FnvHashSet<MetaId>) {
        let mut todo = vec![e.clone()];
        while let Some(e) = todo.pop() {
            match e {
                Expr::Meta(m) => match &self.meta(m).value {
                    Some(value) => todo.push(value.clone()),
                    None => {
                        out.insert(m);
                    }
                },
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

    /// Collect the free scope variables of an expression
    /// (through resolved metavariables).
    pub fn free_vars(&self, e: &Expr) -> FnvHashSet<VarId> {
        let mut out = FnvHashSet::default();
        let mut todo: Vec<(Expr, Vec<VarId>)> = vec![(e.clone(), Vec::new())];
        while let Some((e, shadowed)) = todo.pop() {
            match self.deref(&e) {
                Expr::Var(v) => {
                    if !shadowed.contains(&v) {
                        out.insert(v);
                    }
                }
                Expr::Comb(c) => match &*c {
                    Comb::Appl { fun, arg, .. } => {
                        todo.push((fun.clone(), shadowed.clone()));
                        todo.push((arg.clone(), shadowed));
                    }
                    Comb::Prod { input, var, output, .. } => {
                        todo.push((input.clone(), shadowed.clone()));
                        let mut inner = shadowed;
                        inner.extend(*var);
                        todo.push((output.clone(), inner));
                    }
                    Comb::Abst { var, ty, body, .. } => {
                        todo.push((ty.clone(), shadowed.clone()));
                        let mut inner = shadowed;
                        inner.extend(*var);
                        todo.push((body.clone(), inner));
                    }
                },
                _ => (),
            }
        }
        out
    }

    /// η-reduction applies to a call whose argument is a variable
    /// not free in its function.
    pub fn can_eta(&self, fun: &Expr, arg: &Expr) -> bool {
        match self.deref(arg) {
            Expr::Var(v) => !self.free_in(v, fun),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflexive() {
        let mut graph = Graph::new();
        let type0 = graph.type_expr(Expr::level(0));
        let t = graph.fresh_var(Some("T"), Some(type0.clone()));
        let e = Expr::abst(Some(t), type0, Expr::Var(t), 0);
        assert!(graph.same_q(&e, &e));
    }

    #[test]
    fn alpha_renaming() {
        let mut graph = Graph::new();
        let type0 = graph.type_expr(Expr::level(0));
        let x = graph.fresh_var(Some("x"), Some(type0.clone()));
        let y = graph.fresh_var(Some("y"), Some(type0.clone()));
        let lx = Expr::abst(Some(x), type0.clone(), Expr::Var(x), 0);
        let ly = Expr::abst(Some(y), type0.clone(), Expr::Var(y), 0);
        assert!(graph.same_q(&lx, &ly));
        // constant lambdas over distinct free variables differ
        let kx = Expr::abst(None, type0.clone(), Expr::Var(x), 0);
        let ky = Expr::abst(None, type0, Expr::Var(y), 0);
        assert!(!graph.same_q(&kx, &ky));
    }

    #[test]
    fn metas_unwrap() {
        let mut graph = Graph::new();
        let m = graph.fresh_meta();
        let n = graph.fresh_meta();
        assert!(graph.same_q(&Expr::Meta(m), &Expr::Meta(m)));
        assert!(!graph.same_q(&Expr::Meta(m), &Expr::Meta(n)));
        graph.resolve_meta(m, Expr::level(1));
        assert!(graph.same_q(&Expr::Meta(m), &Expr::level(1)));
    }

    #[test]
    fn exclusion_blocks_freeness() {
        let mut graph = Graph::new();
        let v = graph.fresh_var(Some("v"), None);
        let m = graph.fresh_meta();
        assert!(graph.free_in(v, &Expr::Meta(m)));
        graph.exclude(m, v);
        assert!(!graph.free_in(v, &Expr::Meta(m)));
    }

    #[test]
    fn occurs_through_values() {
        let mut graph = Graph::new();
        let m = graph.fresh_meta();
        let n = graph.fresh_meta();
        graph.resolve_meta(n, Expr::appl(Expr::Meta(m), Expr::level(0), 0));
        assert!(graph.occurs(m, &Expr::Meta(n)));
        assert!(!graph.occurs(n, &Expr::Meta(m)));
    }
}
