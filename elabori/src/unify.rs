//! The constraint solver: a queue of constraints over expressions with
//! unknowns, run to fixed point. Progress is monotone: every step either
//! resolves a metavariable or decomposes a constraint into structurally
//! smaller ones, so the solver terminates.

use crate::elab::Elab;
use crate::expr::{Comb, Expr, MetaId};
use crate::fmt::Show;
use crate::graph::Graph;
use crate::subst::Reps;
use core::fmt::{self, Display};
use fnv::FnvHashSet;
use std::collections::VecDeque;

#[derive(Clone, Debug)]
pub enum Constraint {
    /// The two expressions must become equal.
    Equal(Expr, Expr),
    /// Once `source` resolves, `target` becomes its value under the
    /// replacements.
    EqualReplace {
        target: MetaId,
        source: MetaId,
        reps: Reps,
    },
    /// Once `input` and `output` (the types of a function type's input and
    /// output) are universes, `target` becomes `Type(max(i, j))`.
    FnTypeType {
        target: MetaId,
        input: Expr,
        output: Expr,
    },
    /// Once `source` resolves, `target` becomes the type of its value.
    Typeof { target: MetaId, source: MetaId },
}

impl<'g> Display for Show<'g, Constraint> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.1 {
            Constraint::Equal(e1, e2) => {
                write!(f, "{} === {}", Show(self.0, e1), Show(self.0, e2))
            }
            Constraint::EqualReplace { target, source, reps } => {
                write!(f, "?{} := ?{}[", target.0, source.0)?;
                for (i, (v, e)) in reps.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?
                    }
                    write!(f, "{} -> {}", Show(self.0, &Expr::Var(*v)), Show(self.0, e))?
                }
                write!(f, "]")
            }
            Constraint::FnTypeType { target, input, output } => write!(
                f,
                "?{} := Type(max({}, {}))",
                target.0,
                Show(self.0, input),
                Show(self.0, output)
            ),
            Constraint::Typeof { target, source } => {
                write!(f, "?{} := typeof(?{})", target.0, source.0)
            }
        }
    }
}

/// Active and errored constraints, plus the set of metavariables
/// the queued constraints mention.
#[derive(Default)]
pub struct Constraints {
    pub active: VecDeque<Constraint>,
    pub errored: Vec<Constraint>,
    watched: FnvHashSet<MetaId>,
}

impl Constraints {
    pub fn new() -> Self {
        Default::default()
    }

    /// Whether the metavariable is mentioned by a queued constraint.
    pub fn watches(&self, m: MetaId) -> bool {
        self.watched.contains(&m)
    }

    pub fn is_settled(&self) -> bool {
        self.active.is_empty() && self.errored.is_empty()
    }
}

enum Step {
    /// The constraint is discharged.
    Solved,
    /// The constraint was decomposed or rewritten; successors are queued.
    Progress,
    /// No progress; retry next sweep.
    Stuck(Constraint),
    /// The constraint can never hold.
    Fail(Constraint),
}

impl Elab {
    pub fn add_constraint(&mut self, c: Constraint) {
        trace!("constrain {}", Show(&self.graph, &c));
        self.cs.active.push_back(c)
    }

    /// Post an equality unless it already holds.
    pub fn add_equal(&mut self, e1: Expr, e2: Expr) {
        if !self.graph.same_q(&e1, &e2) {
            self.add_constraint(Constraint::Equal(e1, e2))
        }
    }

    /// The single write point for metavariable resolution: performs the
    /// occurs check, then posts the type-compatibility constraint if the
    /// target carried a type. Returns false if the write is impossible.
    pub(crate) fn set_unknown(&mut self, m: MetaId, value: Expr) -> bool {
        if let Some(prev) = self.graph.meta(m).value.clone() {
            self.add_equal(prev, value);
            return true;
        }
        if self.graph.occurs(m, &value) {
            return false;
        }
        trace!("resolve ?{} := {}", m.0, Show(&self.graph, &value));
        let ty = self.graph.meta(m).ty.clone();
        self.graph.resolve_meta(m, value.clone());
        if let Some(ty) = ty {
            let vt = self.type_of(&value);
            self.add_equal(ty, vt)
        }
        true
    }

    /// Sweep the active queue until a full pass makes no progress.
    /// Returns whether anything was solved, decomposed, or errored.
    pub fn solve_constraints(&mut self) -> bool {
        let mut any = false;
        loop {
            let mut progress = false;
            for _ in 0..self.cs.active.len() {
                let c = match self.cs.active.pop_front() {
                    Some(c) => c,
                    None => break,
                };
                match self.step(c) {
                    Step::Solved | Step::Progress => progress = true,
                    Step::Stuck(c) => self.cs.active.push_back(c),
                    Step::Fail(c) => {
                        trace!("errored {}", Show(&self.graph, &c));
                        self.cs.errored.push(c);
                        progress = true;
                    }
                }
            }
            if !progress {
                break;
            }
            any = true
        }
        self.rebuild_watched();
        any
    }

    fn step(&mut self, c: Constraint) -> Step {
        match c {
            Constraint::Equal(e1, e2) => self.step_equal(e1, e2),
            Constraint::Typeof { target, source } => {
                if self.graph.meta(target).value.is_some() {
                    // the compatibility check is re-posted when the source
                    // resolves, so this constraint carries no information
                    return Step::Solved;
                }
                match self.graph.meta(source).value.clone() {
                    Some(value) => {
                        let ty = self.type_of(&value);
                        if self.set_unknown(target, ty) {
                            Step::Solved
                        } else {
                            Step::Fail(Constraint::Typeof { target, source })
                        }
                    }
                    None => Step::Stuck(Constraint::Typeof { target, source }),
                }
            }
            Constraint::FnTypeType { target, input, output } => {
                let t1 = self.evaluate(&input);
                let t2 = self.evaluate(&output);
                match (self.graph.level_of_type(&t1), self.graph.level_of_type(&t2)) {
                    (Some(l1), Some(l2)) => {
                        let bs = self.graph.builtins;
                        let max = Expr::appl(Expr::appl(Expr::Sym(bs.max), l1, 0), l2, 0);
                        let level = self.evaluate(&max);
                        let ty = self.graph.type_expr(level);
                        if self.set_unknown(target, ty) {
                            Step::Solved
                        } else {
                            Step::Fail(Constraint::FnTypeType { target, input: t1, output: t2 })
                        }
                    }
                    _ => Step::Stuck(Constraint::FnTypeType { target, input: t1, output: t2 }),
                }
            }
            Constraint::EqualReplace { target, source, reps } => {
                match self.graph.meta(source).value.clone() {
                    Some(value) => {
                        let replaced = self.replace_vars(&value, &reps);
                        if self.set_unknown(target, replaced) {
                            Step::Solved
                        } else {
                            Step::Fail(Constraint::EqualReplace { target, source, reps })
                        }
                    }
                    None => Step::Stuck(Constraint::EqualReplace { target, source, reps }),
                }
            }
        }
    }

    fn step_equal(&mut self, e1: Expr, e2: Expr) -> Step {
        let v1 = self.evaluate(&e1);
        let v2 = self.evaluate(&e2);
        if self.graph.same_q(&v1, &v2) {
            return Step::Solved;
        }
        let changed = !self.graph.same_q(&v1, &e1) || !self.graph.same_q(&v2, &e2);

        // 1-3: orient towards an unresolved metavariable and write it
        let m1 = unset_meta(&v1);
        let m2 = unset_meta(&v2);
        match (m1, m2) {
            (Some(a), Some(b)) => {
                // pattern unknowns are written last
                let (target, other) =
                    if self.graph.meta(a).is_pattern && !self.graph.meta(b).is_pattern {
                        (b, Expr::Meta(a))
                    } else {
                        (a, Expr::Meta(b))
                    };
                return if self.set_unknown(target, other) {
                    Step::Solved
                } else {
                    Step::Fail(Constraint::Equal(v1, v2))
                };
            }
            (Some(a), None) => {
                return if self.set_unknown(a, v2.clone()) {
                    Step::Solved
                } else {
                    Step::Fail(Constraint::Equal(v1, v2))
                }
            }
            (None, Some(b)) => {
                return if self.set_unknown(b, v1.clone()) {
                    Step::Solved
                } else {
                    Step::Fail(Constraint::Equal(v1, v2))
                }
            }
            (None, None) => (),
        }

        // 4: primitive equality
        match (&v1, &v2) {
            (Expr::Num(_), Expr::Num(_)) | (Expr::Str(_), Expr::Str(_)) => {
                // same_q above would have discharged equal literals
                return Step::Fail(Constraint::Equal(v1, v2));
            }
            _ => (),
        }

        // 5-6: decompose calls with equal rigid heads
        if let (Some(Comb::Appl { .. }), Some(Comb::Appl { .. })) = (v1.as_comb(), v2.as_comb()) {
            let (h1, args1) = self.graph.spine(&v1);
            let (h2, args2) = self.graph.spine(&v2);
            let colors_match = args1.len() == args2.len()
                && args1.iter().zip(args2.iter()).all(|((_, c1), (_, c2))| c1 == c2);
            match (&h1, &h2) {
                (Expr::Sym(s1), Expr::Sym(s2)) if s1 == s2 && self.graph.is_rigid(*s1) => {
                    if !colors_match {
                        return Step::Fail(Constraint::Equal(v1, v2));
                    }
                    for ((a1, _), (a2, _)) in args1.into_iter().zip(args2) {
                        self.add_equal(a1, a2)
                    }
                    if *s1 != self.graph.builtins.typ {
                        let t1 = self.type_of(&v1);
                        let t2 = self.type_of(&v2);
                        self.add_equal(t1, t2)
                    }
                    return Step::Progress;
                }
                (Expr::Sym(s1), Expr::Sym(s2))
                    if s1 != s2 && self.graph.is_rigid(*s1) && self.graph.is_rigid(*s2) =>
                {
                    return Step::Fail(Constraint::Equal(v1, v2))
                }
                (Expr::Var(x1), Expr::Var(x2)) => {
                    if x1 == x2 && colors_match {
                        for ((a1, _), (a2, _)) in args1.into_iter().zip(args2) {
                            self.add_equal(a1, a2)
                        }
                        return Step::Progress;
                    }
                    return Step::Fail(Constraint::Equal(v1, v2));
                }
                _ => (),
            }
        }

        // 7: η-rewrite a call whose argument is a variable free for it
        for (call, other) in [(&v1, &v2), (&v2, &v1)].iter() {
            if let Some(Comb::Appl { fun, arg, color }) = call.as_comb() {
                if self.graph.can_eta(fun, arg) {
                    let v = match self.graph.deref(arg) {
                        Expr::Var(v) => v,
                        _ => unreachable!(),
                    };
                    let lam = self.make_lambda((*other).clone(), v, *color);
                    self.add_equal(fun.clone(), lam);
                    return Step::Progress;
                }
            }
        }

        // 8-9: decompose function types and lambdas under a shared binder
        match (v1.as_comb(), v2.as_comb()) {
            (
                Some(Comb::Prod { input: i1, var: x1, output: o1, color: k1 }),
                Some(Comb::Prod { input: i2, var: x2, output: o2, color: k2 }),
            ) => {
                if k1 != k2 {
                    return Step::Fail(Constraint::Equal(v1.clone(), v2.clone()));
                }
                let (i1, i2) = (i1.clone(), i2.clone());
                let (x1, x2) = (*x1, *x2);
                let (o1, o2) = (o1.clone(), o2.clone());
                let shared = self.graph.fresh_var(None, Some(i1.clone()));
                self.add_equal(i1, i2);
                let o1 = self.alpha_rename(o1, x1, shared);
                let o2 = self.alpha_rename(o2, x2, shared);
                self.add_equal(o1, o2);
                Step::Progress
            }
            (
                Some(Comb::Abst { var: x1, ty: t1, body: b1, color: k1 }),
                Some(Comb::Abst { var: x2, ty: t2, body: b2, color: k2 }),
            ) => {
                if k1 != k2 {
                    return Step::Fail(Constraint::Equal(v1.clone(), v2.clone()));
                }
                let (t1, t2) = (t1.clone(), t2.clone());
                let (x1, x2) = (*x1, *x2);
                let (b1, b2) = (b1.clone(), b2.clone());
                let shared = self.graph.fresh_var(None, Some(t1.clone()));
                self.add_equal(t1, t2);
                let b1 = self.alpha_rename(b1, x1, shared);
                let b2 = self.alpha_rename(b2, x2, shared);
                self.add_equal(b1, b2);
                Step::Progress
            }
            // 10: no specialization applies
            _ => {
                if changed {
                    self.cs.active.push_back(Constraint::Equal(v1, v2));
                    Step::Progress
                } else {
                    Step::Stuck(Constraint::Equal(v1, v2))
                }
            }
        }
    }

    fn alpha_rename(
        &mut self,
        e: Expr,
        from: Option<crate::expr::VarId>,
        to: crate::expr::VarId,
    ) -> Expr {
        match from {
            Some(v) => self.replace_vars(&e, &vec![(v, Expr::Var(to))]),
            None => e,
        }
    }

    /// `makeLambda`: wrap `body` in a lambda binding `v`, short-cutting
    /// to the function when the body is `f v` with `v` not free in `f`.
    pub(crate) fn make_lambda(&mut self, body: Expr, v: crate::expr::VarId, color: u8) -> Expr {
        if let Some(Comb::Appl { fun, arg, color: ac }) = body.as_comb() {
            if *ac == color
                && matches!(self.graph.deref(arg), Expr::Var(x) if x == v)
                && !self.graph.free_in(v, fun)
            {
                return fun.clone();
            }
        }
        let ty = match self.graph.var(v).ty.clone() {
            Some(ty) => ty,
            None => Expr::Sym(self.graph.builtins.untyped),
        };
        Expr::abst(Some(v), ty, body, color)
    }

    fn rebuild_watched(&mut self) {
        let mut watched = FnvHashSet::default();
        for c in self.cs.active.iter().chain(self.cs.errored.iter()) {
            watch(&self.graph, c, &mut watched)
        }
        self.cs.watched = watched
    }
}

fn unset_meta(e: &Expr) -> Option<MetaId> {
    match e {
        Expr::Meta(m) => Some(*m),
        _ => None,
    }
}

fn watch(graph: &Graph, c: &Constraint, out: &mut FnvHashSet<MetaId>) {
    match c {
        Constraint::Equal(e1, e2) => {
            graph.unset_metas(e1, out);
            graph.unset_metas(e2, out);
        }
        Constraint::EqualReplace { target, source, reps } => {
            graph.unset_metas(&Expr::Meta(*target), out);
            graph.unset_metas(&Expr::Meta(*source), out);
            for (_, e) in reps {
                graph.unset_metas(e, out)
            }
        }
        Constraint::FnTypeType { target, input, output } => {
            graph.unset_metas(&Expr::Meta(*target), out);
            graph.unset_metas(input, out);
            graph.unset_metas(output, out);
        }
        Constraint::Typeof { target, source } => {
            graph.unset_metas(&Expr::Meta(*target), out);
            graph.unset_metas(&Expr::Meta(*source), out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_writes_the_unknown() {
        let mut elab = Elab::new();
        let m = elab.graph.fresh_meta();
        elab.add_equal(Expr::level(3), Expr::Meta(m));
        assert!(elab.solve_constraints());
        assert!(elab.cs.is_settled());
        let value = elab.graph.deref(&Expr::Meta(m));
        assert!(elab.graph.same_q(&value, &Expr::level(3)));
    }

    #[test]
    fn pattern_unknowns_are_written_last() {
        let mut elab = Elab::new();
        let p = elab.graph.fresh_meta();
        elab.graph.meta_mut(p).is_pattern = true;
        let m = elab.graph.fresh_meta();
        elab.add_equal(Expr::Meta(p), Expr::Meta(m));
        assert!(elab.solve_constraints());
        assert!(elab.graph.meta(m).value.is_some());
        assert!(elab.graph.meta(p).value.is_none());
    }

    #[test]
    fn occurs_check_errors() {
        let mut elab = Elab::new();
        let bs = elab.graph.builtins;
        let m = elab.graph.fresh_meta();
        let cyclic = Expr::appl(Expr::Sym(bs.succ), Expr::Meta(m), 0);
        elab.add_equal(Expr::Meta(m), cyclic);
        elab.solve_constraints();
        assert!(elab.graph.meta(m).value.is_none());
        assert_eq!(elab.cs.errored.len(), 1);
    }

    #[test]
    fn rigid_calls_decompose() {
        let mut elab = Elab::new();
        let m = elab.graph.fresh_meta();
        let t1 = elab.graph.type_expr(Expr::Meta(m));
        let t2 = elab.graph.type_expr(Expr::level(1));
        elab.add_equal(t1, t2);
        assert!(elab.solve_constraints());
        assert!(elab.cs.is_settled());
        let value = elab.graph.deref(&Expr::Meta(m));
        assert!(elab.graph.same_q(&value, &Expr::level(1)));
    }

    #[test]
    fn distinct_rigid_symbols_error() {
        let mut elab = Elab::new();
        let bs = elab.graph.builtins;
        elab.add_equal(Expr::Sym(bs.void_ty), Expr::Sym(bs.void_val));
        elab.solve_constraints();
        assert!(elab.cs.active.len() + elab.cs.errored.len() == 1);
    }

    #[test]
    fn function_types_decompose_under_a_shared_binder() {
        let mut elab = Elab::new();
        let bs = elab.graph.builtins;
        let lv = Expr::Sym(bs.level);
        let x = elab.graph.fresh_var(Some("x"), Some(lv.clone()));
        let y = elab.graph.fresh_var(Some("y"), Some(lv.clone()));
        let m = elab.graph.fresh_meta();
        // (x: ?m) -> Type(x) === (y: Level) -> Type(y)
        let p1 = Expr::prod(Expr::Meta(m), Some(x), elab.graph.type_expr(Expr::Var(x)), 0);
        let p2 = Expr::prod(lv.clone(), Some(y), elab.graph.type_expr(Expr::Var(y)), 0);
        elab.add_equal(p1, p2);
        assert!(elab.solve_constraints());
        assert!(elab.cs.is_settled());
        let value = elab.graph.deref(&Expr::Meta(m));
        assert!(elab.graph.same_q(&value, &lv));
    }

    #[test]
    fn mismatched_colors_error() {
        let mut elab = Elab::new();
        let bs = elab.graph.builtins;
        let lv = Expr::Sym(bs.level);
        let p1 = Expr::prod(lv.clone(), None, lv.clone(), 0);
        let p2 = Expr::prod(lv.clone(), None, lv, 1);
        elab.add_equal(p1, p2);
        elab.solve_constraints();
        assert_eq!(elab.cs.errored.len(), 1);
    }

    #[test]
    fn typeof_fires_when_the_source_resolves() {
        let mut elab = Elab::new();
        let bs = elab.graph.builtins;
        let source = elab.graph.fresh_meta();
        let ty = elab.type_of(&Expr::Meta(source));
        elab.solve_constraints();
        // still waiting for the source
        assert!(!elab.cs.is_settled());
        elab.add_equal(Expr::Meta(source), Expr::level(3));
        assert!(elab.solve_constraints());
        assert!(elab.cs.is_settled());
        let ty = elab.graph.deref(&ty);
        assert!(matches!(ty, Expr::Sym(s) if s == bs.level));
    }

    #[test]
    fn fn_type_type_takes_the_level_maximum() {
        let mut elab = Elab::new();
        let target = elab.graph.fresh_meta();
        let t1 = elab.graph.type_expr(Expr::level(1));
        let t2 = elab.graph.type_expr(Expr::level(3));
        elab.add_constraint(Constraint::FnTypeType {
            target,
            input: t1,
            output: t2,
        });
        assert!(elab.solve_constraints());
        let value = elab.graph.deref(&Expr::Meta(target));
        let expected = elab.graph.type_expr(Expr::level(3));
        assert!(elab.graph.same_q(&value, &expected));
    }

    #[test]
    fn eta_rewrites_stuck_equalities() {
        let mut elab = Elab::new();
        let bs = elab.graph.builtins;
        let lv = Expr::Sym(bs.level);
        let m = elab.graph.fresh_meta();
        let v = elab.graph.fresh_var(Some("v"), Some(lv.clone()));
        elab.graph.exclude(m, v);
        // ?m v === succ v, so ?m must become succ
        let call = Expr::appl(Expr::Meta(m), Expr::Var(v), 0);
        let succ_v = Expr::appl(Expr::Sym(bs.succ), Expr::Var(v), 0);
        elab.add_equal(call, succ_v);
        assert!(elab.solve_constraints());
        let value = elab.graph.deref(&Expr::Meta(m));
        assert!(matches!(value, Expr::Sym(s) if s == bs.succ));
    }
}
