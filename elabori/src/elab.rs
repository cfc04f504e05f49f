//! The HIR solver: one resolution action per register, each polled once per
//! iteration, alternating with constraint-solver passes until neither makes
//! progress. Actions never raise; failures become diagnostics.

use crate::diag::Diagnostic;
use crate::expr::{Color, Expr, VarId};
use crate::fmt::Show;
use crate::graph::Graph;
use crate::hir::{Hir, RegId, RegKind};
use crate::symbol::{Flags, Rule};
use crate::typing::CombKey;
use crate::unify::Constraints;
use fnv::{FnvHashMap, FnvHashSet};

/// The elaboration session: the expression graph, the constraint solver
/// state, and the type cache, shared by every subsystem.
pub struct Elab {
    pub graph: Graph,
    pub cs: Constraints,
    pub(crate) type_cache: FnvHashMap<CombKey, Expr>,
}

impl Elab {
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
            cs: Constraints::new(),
            type_cache: Default::default(),
        }
    }
}

impl Default for Elab {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolution state of one register.
#[derive(Clone, Debug, Default)]
pub struct Slot {
    /// Expected type, propagated from context.
    pub ty: Option<Expr>,
    /// Resolved value.
    pub value: Option<Expr>,
}

/// Result of elaborating a register array.
pub struct Elaborated {
    pub elab: Elab,
    pub slots: Vec<Slot>,
    /// Values of the top-level expression statements.
    pub outputs: Vec<Expr>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Elaborate a register array with a fresh session.
pub fn elaborate(hir: &Hir) -> Elaborated {
    Elab::new().run(hir)
}

enum Progress {
    Unchanged,
    Changed,
    Done,
}

struct Action {
    reg: RegId,
    st: St,
}

enum St {
    Simple,
    Call(CallSt),
    Lambda(LambdaSt),
    Assign(AssignSt),
}

#[derive(Default)]
struct CallSt {
    applied: Option<Applied>,
    sent_arg_ty: bool,
}

/// The function with erased arguments inserted, and the input type
/// of the matching-color function type.
#[derive(Clone)]
struct Applied {
    fun: Expr,
    input: Expr,
}

#[derive(Default)]
struct LambdaSt {
    /// Binders invented while unwinding mismatched colors, outermost first.
    wrappers: Vec<(VarId, Expr, Color)>,
    inner: Option<Inner>,
    sent_body_ty: bool,
}

#[derive(Clone)]
struct Inner {
    var: Option<VarId>,
    input: Expr,
    /// Expected body type; absent for self-resolved annotated lambdas.
    body_ty: Option<Expr>,
}

#[derive(Default)]
struct AssignSt {
    sent_ty: bool,
}

impl Elab {
    /// Run the register actions and the constraint solver to joint fixed
    /// point, then collect diagnostics.
    pub fn run(mut self, hir: &Hir) -> Elaborated {
        let mut slots: Vec<Slot> = hir.regs.iter().map(|_| Slot::default()).collect();
        let mut actions: Vec<Action> = hir
            .regs
            .iter()
            .enumerate()
            .map(|(reg, r)| Action {
                reg,
                st: match &r.kind {
                    RegKind::Call { .. } => St::Call(Default::default()),
                    RegKind::Lambda { .. } => St::Lambda(Default::default()),
                    RegKind::SymbolAssign { .. } => St::Assign(Default::default()),
                    _ => St::Simple,
                },
            })
            .collect();
        let mut diags = Vec::new();

        loop {
            let mut progress = false;
            let pending = std::mem::take(&mut actions);
            for mut action in pending {
                match self.poll(hir, &mut slots, &mut action, &mut diags) {
                    Progress::Done => {
                        progress = true;
                        if let Some(value) = &slots[action.reg].value {
                            debug!(
                                "register {} resolved to {}",
                                action.reg,
                                Show(&self.graph, value)
                            )
                        }
                    }
                    Progress::Changed => {
                        progress = true;
                        actions.push(action)
                    }
                    Progress::Unchanged => actions.push(action),
                }
            }
            let solved = self.solve_constraints();
            if !progress && !solved {
                break;
            }
        }

        for action in &actions {
            diags.push(Diagnostic::UnresolvedRegister {
                span: hir.regs[action.reg].span.clone(),
            })
        }
        for c in self.cs.active.iter().chain(self.cs.errored.iter()) {
            diags.push(Diagnostic::UnresolvedConstraint {
                detail: Show(&self.graph, c).to_string(),
            })
        }
        self.uninferred(hir, &slots, &mut diags);

        let outputs = hir
            .outputs
            .iter()
            .filter_map(|reg| slots[*reg].value.clone())
            .collect();
        Elaborated {
            elab: self,
            slots,
            outputs,
            diagnostics: diags,
        }
    }

    /// Report every unresolved metavariable reachable from the installed
    /// symbol fields or the output statements.
    fn uninferred(&self, hir: &Hir, slots: &[Slot], diags: &mut Vec<Diagnostic>) {
        let mut unset = FnvHashSet::default();
        for id in self.graph.sym_ids() {
            let sym = self.graph.sym(id);
            for e in sym.ty.iter().chain(sym.value.iter()) {
                self.graph.unset_metas(e, &mut unset)
            }
            for rule in sym.down_values.iter().chain(sym.up_values.iter()) {
                self.graph.unset_metas(&rule.lhs, &mut unset);
                self.graph.unset_metas(&rule.rhs, &mut unset);
            }
        }
        for reg in &hir.outputs {
            if let Some(value) = &slots[*reg].value {
                self.graph.unset_metas(value, &mut unset)
            }
        }
        let mut ids: Vec<_> = unset.into_iter().collect();
        ids.sort();
        for m in ids {
            let detail = match &self.graph.meta(m).ty {
                Some(ty) => format!("expected of type {}", Show(&self.graph, ty)),
                None => "no value was inferred".to_string(),
            };
            diags.push(Diagnostic::Uninferred {
                unknown: m.0,
                detail,
            })
        }
    }

    fn poll(
        &mut self,
        hir: &Hir,
        slots: &mut [Slot],
        action: &mut Action,
        diags: &mut Vec<Diagnostic>,
    ) -> Progress {
        let reg = action.reg;
        match (&hir.regs[reg].kind, &mut action.st) {
            (RegKind::Root, _) => {
                slots[reg].value = Some(Expr::Sym(self.graph.builtins.root));
                Progress::Done
            }
            (RegKind::Expr(e), _) => {
                slots[reg].value = Some(e.clone());
                Progress::Done
            }
            (RegKind::Number(v), _) => self.poll_number(*v, reg, slots),
            (RegKind::Unknown { ty }, _) => self.poll_unknown(*ty, reg, slots),
            (RegKind::Variable { name, ty }, _) => self.poll_variable(name, *ty, reg, slots),
            (RegKind::Member { lhs, name }, _) => self.poll_member(*lhs, name, reg, slots),
            (RegKind::Symbol {
                name,
                parent,
                flags,
            }, _) => self.poll_symbol(name, *parent, *flags, reg, slots),
            (RegKind::SymbolType { symbol, ty }, _) => {
                self.poll_symbol_type(*symbol, *ty, reg, hir, slots, diags)
            }
            (RegKind::SymbolAssign { symbol, value }, St::Assign(st)) => {
                self.poll_symbol_assign(*symbol, *value, reg, hir, slots, st, diags)
            }
            (RegKind::SymbolRule {
                symbol,
                lhs,
                rhs,
                is_up,
            }, _) => self.poll_symbol_rule(*symbol, *lhs, *rhs, *is_up, reg, hir, slots, diags),
            (RegKind::Call {
                fun,
                arg,
                color,
                is_pattern,
            }, St::Call(st)) => self.poll_call(*fun, *arg, *color, *is_pattern, reg, slots, st),
            (RegKind::Lambda {
                arg,
                arg_ty,
                body,
                color,
            }, St::Lambda(st)) => self.poll_lambda(*arg, *arg_ty, *body, *color, reg, slots, st),
            (RegKind::FnType {
                input,
                arg,
                output,
                color,
            }, _) => self.poll_fn_type(*input, *arg, *output, *color, reg, slots),
            (RegKind::Equiv { lhs, rhs }, _) => self.poll_equiv(*lhs, *rhs, reg, slots),
            _ => unreachable!("register kind and action state out of step"),
        }
    }

    /// Numbers resolve only once context has typed their slot
    /// as `Level` or `number`.
    fn poll_number(&mut self, v: i64, reg: RegId, slots: &mut [Slot]) -> Progress {
        let ty = match &slots[reg].ty {
            Some(ty) => ty.clone(),
            None => return Progress::Unchanged,
        };
        let bs = self.graph.builtins;
        match self.evaluate(&ty) {
            Expr::Sym(s) if s == bs.level => {
                slots[reg].value = Some(Expr::level(v));
                Progress::Done
            }
            Expr::Sym(s) if s == bs.number => {
                slots[reg].value = Some(Expr::number(v));
                Progress::Done
            }
            _ => Progress::Unchanged,
        }
    }

    fn poll_unknown(&mut self, ty: Option<RegId>, reg: RegId, slots: &mut [Slot]) -> Progress {
        let m = match ty {
            Some(tr) => match slots[tr].value.clone() {
                Some(t) => self.graph.fresh_meta_typed(t),
                None => return Progress::Unchanged,
            },
            None => self.graph.fresh_meta(),
        };
        slots[reg].value = Some(Expr::Meta(m));
        Progress::Done
    }

    fn poll_variable(
        &mut self,
        name: &Option<String>,
        ty: Option<RegId>,
        reg: RegId,
        slots: &mut [Slot],
    ) -> Progress {
        let ty = match ty {
            Some(tr) => match slots[tr].value.clone() {
                Some(t) => t,
                None => return Progress::Unchanged,
            },
            None => Expr::Meta(self.graph.fresh_meta()),
        };
        let v = self.graph.fresh_var(name.as_deref(), Some(ty));
        slots[reg].value = Some(Expr::Var(v));
        Progress::Done
    }

    fn poll_member(&mut self, lhs: RegId, name: &str, reg: RegId, slots: &mut [Slot]) -> Progress {
        let base = match slots[lhs].value.clone() {
            Some(e) => e,
            None => return Progress::Unchanged,
        };
        match self.graph.deref(&base) {
            Expr::Sym(s) => match self.graph.sym(s).subs.get(name) {
                Some(child) => {
                    slots[reg].value = Some(Expr::Sym(*child));
                    Progress::Done
                }
                // the member may be declared by a later register
                None => Progress::Unchanged,
            },
            _ => Progress::Unchanged,
        }
    }

    fn poll_symbol(
        &mut self,
        name: &Option<String>,
        parent: Option<RegId>,
        flags: Flags,
        reg: RegId,
        slots: &mut [Slot],
    ) -> Progress {
        let parent = match parent {
            Some(p) => match slots[p].value.clone() {
                Some(e) => match self.graph.deref(&e) {
                    Expr::Sym(s) => s,
                    _ => return Progress::Unchanged,
                },
                None => return Progress::Unchanged,
            },
            None => self.graph.builtins.root,
        };
        let name = match name {
            Some(n) => n.clone(),
            None => format!("_{}", reg),
        };
        let id = self.graph.new_symbol(&name, parent, flags);
        let ty = if flags.intersects(Flags::DEF_TYPE | Flags::ASSIGNMENT) {
            Expr::Meta(self.graph.fresh_meta())
        } else {
            Expr::Sym(self.graph.builtins.untyped)
        };
        self.graph.sym_mut(id).ty = Some(ty);
        slots[reg].value = Some(Expr::Sym(id));
        Progress::Done
    }

    fn poll_symbol_type(
        &mut self,
        symbol: RegId,
        ty: RegId,
        reg: RegId,
        hir: &Hir,
        slots: &mut [Slot],
        diags: &mut Vec<Diagnostic>,
    ) -> Progress {
        let (s, t) = match (slots[symbol].value.clone(), slots[ty].value.clone()) {
            (Some(s), Some(t)) => (s, t),
            _ => return Progress::Unchanged,
        };
        let s = match self.graph.deref(&s) {
            Expr::Sym(s) => s,
            _ => return Progress::Unchanged,
        };
        slots[reg].value = Some(Expr::Sym(s));
        if !self.graph.sym(s).flags.contains(Flags::DEF_TYPE) {
            diags.push(Diagnostic::InvalidDeclaration {
                span: hir.regs[reg].span.clone(),
                reason: format!("`{}` cannot be given a type", self.graph.sym(s).name),
            });
            return Progress::Done;
        }
        match self.graph.sym(s).ty.clone() {
            Some(existing) => self.add_equal(existing, t.clone()),
            None => self.graph.sym_mut(s).ty = Some(t.clone()),
        }
        // the declared type must itself live in some universe
        let tt = self.type_of(&t);
        let u = self.graph.fresh_meta();
        let universe = self.graph.type_expr(Expr::Meta(u));
        self.add_equal(tt, universe);
        Progress::Done
    }

    fn poll_symbol_assign(
        &mut self,
        symbol: RegId,
        value: RegId,
        reg: RegId,
        hir: &Hir,
        slots: &mut [Slot],
        st: &mut AssignSt,
        diags: &mut Vec<Diagnostic>,
    ) -> Progress {
        let s = match slots[symbol].value.clone() {
            Some(e) => match self.graph.deref(&e) {
                Expr::Sym(s) => s,
                _ => return Progress::Unchanged,
            },
            None => return Progress::Unchanged,
        };
        if !self.graph.sym(s).flags.contains(Flags::ASSIGNMENT) {
            slots[reg].value = Some(Expr::Sym(s));
            diags.push(Diagnostic::InvalidDeclaration {
                span: hir.regs[reg].span.clone(),
                reason: format!("`{}` cannot be assigned", self.graph.sym(s).name),
            });
            return Progress::Done;
        }
        if !st.sent_ty {
            if let Some(ty) = self.graph.sym(s).ty.clone() {
                if slots[value].ty.is_none() {
                    slots[value].ty = Some(ty)
                }
            }
            st.sent_ty = true;
            return Progress::Changed;
        }
        let v = match slots[value].value.clone() {
            Some(v) => v,
            None => return Progress::Unchanged,
        };
        slots[reg].value = Some(Expr::Sym(s));
        if self.graph.sym(s).value.is_some() {
            diags.push(Diagnostic::InvalidDeclaration {
                span: hir.regs[reg].span.clone(),
                reason: format!("`{}` is assigned twice", self.graph.sym(s).name),
            });
            return Progress::Done;
        }
        trace!(
            "assign {} := {}",
            self.graph.sym(s).name,
            Show(&self.graph, &v)
        );
        self.graph.sym_mut(s).value = Some(v.clone());
        if let Some(ty) = self.graph.sym(s).ty.clone() {
            let vt = self.type_of(&v);
            self.add_equal(ty, vt)
        }
        Progress::Done
    }

    #[allow(clippy::too_many_arguments)]
    fn poll_symbol_rule(
        &mut self,
        symbol: RegId,
        lhs: RegId,
        rhs: RegId,
        is_up: bool,
        reg: RegId,
        hir: &Hir,
        slots: &mut [Slot],
        diags: &mut Vec<Diagnostic>,
    ) -> Progress {
        let s = match slots[symbol].value.clone() {
            Some(e) => match self.graph.deref(&e) {
                Expr::Sym(s) => s,
                _ => return Progress::Unchanged,
            },
            None => return Progress::Unchanged,
        };
        let (l, r) = match (slots[lhs].value.clone(), slots[rhs].value.clone()) {
            (Some(l), Some(r)) => (l, r),
            _ => return Progress::Unchanged,
        };
        // the rule is only stable once no queued constraint can still
        // write one of its metavariables
        let mut metas = FnvHashSet::default();
        self.graph.unset_metas(&l, &mut metas);
        self.graph.unset_metas(&r, &mut metas);
        if metas.iter().any(|m| self.cs.watches(*m)) {
            return Progress::Unchanged;
        }
        // alias pattern unknowns to fresh scope variables
        for m in metas {
            if self.graph.meta(m).is_pattern {
                let ty = self.graph.meta(m).ty.clone();
                let v = self.graph.fresh_var(None, ty);
                self.set_unknown(m, Expr::Var(v));
            }
        }
        slots[reg].value = Some(Expr::Sym(s));
        let (l, l_closed) = self.graph.resolve_deep(&l);
        let (r, r_closed) = self.graph.resolve_deep(&r);
        if !(l_closed && r_closed) {
            diags.push(Diagnostic::InvalidDeclaration {
                span: hir.regs[reg].span.clone(),
                reason: "rule contains unresolved unknowns".to_string(),
            });
            return Progress::Done;
        }
        let bound = self.graph.free_vars(&l);
        if !self.graph.free_vars(&r).iter().all(|v| bound.contains(v)) {
            diags.push(Diagnostic::InvalidDeclaration {
                span: hir.regs[reg].span.clone(),
                reason: "rule right-hand side mentions variables absent from its left-hand side"
                    .to_string(),
            });
            return Progress::Done;
        }
        let need = if is_up {
            Flags::UP_VALUE
        } else {
            Flags::DOWN_VALUE
        };
        if !self.graph.sym(s).flags.contains(need) {
            diags.push(Diagnostic::InvalidDeclaration {
                span: hir.regs[reg].span.clone(),
                reason: format!(
                    "`{}` does not accept rewrite rules",
                    self.graph.sym(s).name
                ),
            });
            return Progress::Done;
        }
        let rule = Rule { lhs: l, rhs: r };
        trace!(
            "install rule {} on {}",
            Show(&self.graph, &rule),
            self.graph.sym(s).name
        );
        if is_up {
            self.graph.sym_mut(s).up_values.push(rule)
        } else {
            self.graph.sym_mut(s).down_values.push(rule)
        }
        Progress::Done
    }

    fn poll_call(
        &mut self,
        fun: RegId,
        arg: RegId,
        color: Color,
        is_pattern: bool,
        reg: RegId,
        slots: &mut [Slot],
        st: &mut CallSt,
    ) -> Progress {
        let mut changed = false;
        if st.applied.is_none() {
            let mut f = match slots[fun].value.clone() {
                Some(f) => f,
                None => return Progress::Unchanged,
            };
            let fty = self.type_of(&f);
            let mut fty = self.evaluate(&fty);
            loop {
                let (input, var, output, c) = match fty.as_comb() {
                    Some(crate::expr::Comb::Prod {
                        input,
                        var,
                        output,
                        color: c,
                    }) => (input.clone(), *var, output.clone(), *c),
                    _ => return Progress::Unchanged,
                };
                if c == color {
                    st.applied = Some(Applied { fun: f, input });
                    break;
                }
                // walk through the mismatched color by inserting
                // a fresh erased argument
                let u = self.graph.fresh_meta_typed(input);
                let ua = Expr::Meta(u);
                f = Expr::appl(f, ua.clone(), c);
                fty = match var {
                    Some(v) => self.replace_vars(&output, &vec![(v, ua)]),
                    None => output,
                };
                fty = self.evaluate(&fty);
            }
            changed = true;
        }
        let applied = st.applied.clone().expect("function type was applied");
        if slots[arg].value.is_none() {
            // propagate the expected type so literals can resolve
            if !st.sent_arg_ty && slots[arg].ty.is_none() {
                slots[arg].ty = Some(applied.input);
                st.sent_arg_ty = true;
                return Progress::Changed;
            }
            return if changed {
                Progress::Changed
            } else {
                Progress::Unchanged
            };
        }
        let a = slots[arg].value.clone().expect("argument value");
        let at = self.type_of(&a);
        self.add_equal(at, applied.input);
        if is_pattern {
            self.mark_patterns(&a)
        }
        slots[reg].value = Some(Expr::appl(applied.fun, a, color));
        Progress::Done
    }

    /// Unknowns appearing in a pattern call become pattern unknowns.
    fn mark_patterns(&mut self, e: &Expr) {
        let mut metas = FnvHashSet::default();
        self.graph.unset_metas(e, &mut metas);
        for m in metas {
            self.graph.meta_mut(m).is_pattern = true
        }
    }

    fn poll_lambda(
        &mut self,
        arg: Option<RegId>,
        arg_ty: Option<RegId>,
        body: RegId,
        color: Color,
        reg: RegId,
        slots: &mut [Slot],
        st: &mut LambdaSt,
    ) -> Progress {
        if st.inner.is_none() {
            if let Some(ty) = slots[reg].ty.clone() {
                return self.lambda_from_context(ty, arg, color, slots, st);
            }
            // a fully annotated lambda resolves without a contextual type
            if let Some(tr) = arg_ty {
                let input = match slots[tr].value.clone() {
                    Some(t) => t,
                    None => return Progress::Unchanged,
                };
                let bound = match self.bound_var(arg, slots) {
                    Ok(bound) => bound,
                    Err(()) => return Progress::Unchanged,
                };
                st.inner = Some(Inner {
                    var: bound,
                    input,
                    body_ty: None,
                });
                st.sent_body_ty = true;
                return Progress::Changed;
            }
            return Progress::Unchanged;
        }
        let inner = st.inner.clone().expect("lambda binder");
        if !st.sent_body_ty {
            if let Some(body_ty) = &inner.body_ty {
                if slots[body].ty.is_none() {
                    slots[body].ty = Some(body_ty.clone())
                }
            }
            st.sent_body_ty = true;
            return Progress::Changed;
        }
        let bv = match slots[body].value.clone() {
            Some(v) => v,
            None => return Progress::Unchanged,
        };
        if let Some(body_ty) = &inner.body_ty {
            let bt = self.type_of(&bv);
            self.add_equal(bt, body_ty.clone())
        }
        let mut lam = Expr::abst(inner.var, inner.input, bv, color);
        for (w, wty, c) in st.wrappers.iter().rev() {
            lam = Expr::abst(Some(*w), wty.clone(), lam, *c)
        }
        slots[reg].value = Some(lam);
        Progress::Done
    }

    /// Unwind the contextual function type across mismatched colors,
    /// inventing a binder per skipped color, until the lambda's own color
    /// is reached; then bind the explicit argument and compute the
    /// expected body type.
    fn lambda_from_context(
        &mut self,
        ty: Expr,
        arg: Option<RegId>,
        color: Color,
        slots: &mut [Slot],
        st: &mut LambdaSt,
    ) -> Progress {
        let mut t = self.evaluate(&ty);
        let mut wrappers: Vec<(VarId, Expr, Color)> = Vec::new();
        loop {
            let (input, var, output, c) = match t.as_comb() {
                Some(crate::expr::Comb::Prod {
                    input,
                    var,
                    output,
                    color: c,
                }) => (input.clone(), *var, output.clone(), *c),
                _ => return Progress::Unchanged,
            };
            if c != color {
                let name = var.and_then(|v| self.graph.var(v).name.clone());
                let w = self.graph.fresh_var(name.as_deref(), Some(input.clone()));
                wrappers.push((w, input, c));
                t = match var {
                    Some(v) => self.replace_vars(&output, &vec![(v, Expr::Var(w))]),
                    None => output,
                };
                t = self.evaluate(&t);
                continue;
            }
            let bound = match self.bound_var(arg, slots) {
                Ok(bound) => bound,
                Err(()) => return Progress::Unchanged,
            };
            if let Some(v) = bound {
                if let Some(vt) = self.graph.var(v).ty.clone() {
                    self.add_equal(vt, input.clone())
                }
            }
            let body_ty = match var {
                Some(pv) => {
                    let repl = match bound {
                        Some(v) => Expr::Var(v),
                        None => Expr::Meta(self.graph.fresh_meta_typed(input.clone())),
                    };
                    Some(self.replace_vars(&output, &vec![(pv, repl)]))
                }
                None => Some(output),
            };
            st.wrappers = wrappers;
            st.inner = Some(Inner {
                var: bound,
                input,
                body_ty,
            });
            return Progress::Changed;
        }
    }

    /// The scope variable bound by a lambda's argument register.
    /// `Err(())` means the register has not resolved yet.
    fn bound_var(&self, arg: Option<RegId>, slots: &[Slot]) -> Result<Option<VarId>, ()> {
        match arg {
            Some(vr) => match &slots[vr].value {
                Some(e) => match self.graph.deref(e) {
                    Expr::Var(v) => Ok(Some(v)),
                    _ => Err(()),
                },
                None => Err(()),
            },
            None => Ok(None),
        }
    }

    fn poll_fn_type(
        &mut self,
        input: RegId,
        arg: Option<RegId>,
        output: RegId,
        color: Color,
        reg: RegId,
        slots: &mut [Slot],
    ) -> Progress {
        let i = match slots[input].value.clone() {
            Some(i) => i,
            None => return Progress::Unchanged,
        };
        let var = match self.bound_var(arg, slots) {
            Ok(var) => var,
            Err(()) => return Progress::Unchanged,
        };
        let o = match slots[output].value.clone() {
            Some(o) => o,
            None => return Progress::Unchanged,
        };
        slots[reg].value = Some(Expr::prod(i, var, o, color));
        Progress::Done
    }

    fn poll_equiv(&mut self, lhs: RegId, rhs: RegId, reg: RegId, slots: &mut [Slot]) -> Progress {
        let (l, r) = match (slots[lhs].value.clone(), slots[rhs].value.clone()) {
            (Some(l), Some(r)) => (l, r),
            _ => return Progress::Unchanged,
        };
        self.add_equal(l.clone(), r);
        slots[reg].value = Some(l);
        Progress::Done
    }
}
