//! Reduction to normal form: δ-expansion of symbol values, β-reduction,
//! built-in evaluators, user rewrite rules, and η-reduction of lambdas.
//!
//! The machine is iterative: an explicit frame stack replaces host
//! recursion, so deeply right-nested calls cannot exhaust the stack.

use crate::elab::Elab;
use crate::expr::{Color, Comb, Expr, VarId};
use crate::fmt::Show;
use crate::subst::Reps;
use crate::symbol::{Flags, Prim, Rule};

/// Reduction toggles, all on by default.
#[derive(Clone, Copy, Debug)]
pub struct EvalFlags {
    /// Unfold symbol values (δ).
    pub own_value: bool,
    /// Apply user rewrite rules.
    pub down_value: bool,
    /// β-reduce lambda applications.
    pub expand_lambda: bool,
}

impl Default for EvalFlags {
    fn default() -> Self {
        Self {
            own_value: true,
            down_value: true,
            expand_lambda: true,
        }
    }
}

enum Frame {
    /// Evaluating the function; the argument is pending.
    AppFun { arg: Expr, color: Color },
    /// Function evaluated; evaluating the argument.
    AppArg { fun: Expr, color: Color },
    /// Evaluating a lambda body.
    AbstBody {
        var: Option<VarId>,
        ty: Expr,
        color: Color,
    },
    /// Evaluating a function type's input.
    ProdInput {
        var: Option<VarId>,
        output: Expr,
        color: Color,
    },
    /// Input evaluated; evaluating the output.
    ProdOutput {
        input: Expr,
        var: Option<VarId>,
        color: Color,
    },
}

impl Elab {
    pub fn evaluate(&mut self, e: &Expr) -> Expr {
        self.eval_with(e, EvalFlags::default())
    }

    pub fn eval_with(&mut self, e: &Expr, flags: EvalFlags) -> Expr {
        let mut stack: Vec<Frame> = Vec::new();
        let mut cur = e.clone();
        let mut descending = true;
        loop {
            if descending {
                match &cur {
                    Expr::Sym(s) => {
                        let sym = self.graph.sym(*s);
                        if flags.own_value && !sym.flags.contains(Flags::HOLD) {
                            if let Some(value) = sym.value.clone() {
                                cur = value;
                                continue;
                            }
                        }
                        descending = false
                    }
                    Expr::Meta(m) => match self.graph.meta(*m).value.clone() {
                        Some(value) => cur = value,
                        None => descending = false,
                    },
                    Expr::Var(_) | Expr::Num(_) | Expr::Str(_) => descending = false,
                    Expr::Comb(c) => match &**c {
                        Comb::Appl { fun, arg, color } => {
                            stack.push(Frame::AppFun {
                                arg: arg.clone(),
                                color: *color,
                            });
                            cur = fun.clone();
                        }
                        Comb::Abst {
                            var,
                            ty,
                            body,
                            color,
                        } => {
                            stack.push(Frame::AbstBody {
                                var: *var,
                                ty: ty.clone(),
                                color: *color,
                            });
                            cur = body.clone();
                        }
                        Comb::Prod {
                            input,
                            var,
                            output,
                            color,
                        } => {
                            stack.push(Frame::ProdInput {
                                var: *var,
                                output: output.clone(),
                                color: *color,
                            });
                            cur = input.clone();
                        }
                    },
                }
            } else {
                // `cur` holds a value; unwind one frame
                match stack.pop() {
                    None => return cur,
                    Some(Frame::AppFun { arg, color }) => {
                        stack.push(Frame::AppArg { fun: cur, color });
                        cur = arg;
                        descending = true;
                    }
                    Some(Frame::AppArg { fun, color }) => {
                        let arg = cur;
                        if let Some(next) = self.apply(&fun, &arg, color, flags) {
                            cur = next;
                            descending = true;
                        } else {
                            cur = Expr::appl(fun, arg, color);
                        }
                    }
                    Some(Frame::AbstBody { var, ty, color }) => {
                        if let Some(fun) = self.eta(var, &cur, color) {
                            cur = fun
                        } else {
                            cur = Expr::abst(var, ty, cur, color)
                        }
                    }
                    Some(Frame::ProdInput { var, output, color }) => {
                        stack.push(Frame::ProdOutput {
                            input: cur,
                            var,
                            color,
                        });
                        cur = output;
                        descending = true;
                    }
                    Some(Frame::ProdOutput { input, var, color }) => {
                        cur = Expr::prod(input, var, cur, color)
                    }
                }
            }
        }
    }

    /// One application step on evaluated function and argument:
    /// β-reduction, a built-in evaluator, or the first matching rewrite
    /// rule. `None` leaves the call as a fixed point.
    fn apply(&mut self, fun: &Expr, arg: &Expr, color: Color, flags: EvalFlags) -> Option<Expr> {
        if flags.expand_lambda {
            if let Some(Comb::Abst {
                var,
                body,
                color: lc,
                ..
            }) = fun.as_comb()
            {
                if *lc == color {
                    return match var {
                        Some(v) => Some(self.replace_vars(&body.clone(), &vec![(*v, arg.clone())])),
                        None => Some(body.clone()),
                    };
                }
            }
        }
        let call = Expr::appl(fun.clone(), arg.clone(), color);
        self.rewrite(&call, flags)
    }

    /// η-reduce `λv. f v` to `f` when `v` is not free in `f`.
    fn eta(&self, var: Option<VarId>, body: &Expr, color: Color) -> Option<Expr> {
        let v = var?;
        match body.as_comb() {
            Some(Comb::Appl {
                fun,
                arg,
                color: ac,
            }) if *ac == color => match self.graph.deref(arg) {
                Expr::Var(x) if x == v && !self.graph.free_in(v, fun) => Some(fun.clone()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Consult the built-in evaluator of the call head, then the applicable
    /// rewrite rules: up values of the argument heads first, then down
    /// values of the call head, each in declaration order.
    fn rewrite(&mut self, call: &Expr, flags: EvalFlags) -> Option<Expr> {
        let (head, args) = self.graph.spine(call);
        let f = match head {
            Expr::Sym(s) => s,
            _ => return None,
        };
        if let Some(prim) = self.graph.sym(f).prim {
            if let Some(value) = self.eval_prim(prim, &args) {
                trace!("reduce {} to {}", Show(&self.graph, call), Show(&self.graph, &value));
                return Some(value);
            }
        }
        if !flags.down_value {
            return None;
        }
        let mut rules: Vec<Rule> = Vec::new();
        for (arg, _) in &args {
            if let Some(s) = self.graph.head_sym(arg) {
                rules.extend(self.graph.sym(s).up_values.iter().cloned())
            }
        }
        rules.extend(self.graph.sym(f).down_values.iter().cloned());
        for rule in rules {
            if let Some(subst) = self.graph.match_pattern(&rule.lhs, call) {
                trace!("rewrite {} by {}", Show(&self.graph, call), Show(&self.graph, &rule));
                let reps: Reps = subst.into_iter().collect();
                return Some(self.replace_vars(&rule.rhs, &reps));
            }
        }
        None
    }

    fn eval_prim(&self, prim: Prim, args: &[(Expr, Color)]) -> Option<Expr> {
        match (prim, args) {
            (Prim::LevelSucc, [(a, _)]) => match self.graph.deref(a) {
                Expr::Num(n) if n.is_level => Some(Expr::level(n.value + 1)),
                _ => None,
            },
            (Prim::LevelMax, [(a, _), (b, _)]) => {
                let da = self.graph.deref(a);
                let db = self.graph.deref(b);
                match (&da, &db) {
                    (Expr::Num(x), Expr::Num(y)) if x.is_level && y.is_level => {
                        Some(Expr::level(x.value.max(y.value)))
                    }
                    _ if self.graph.same_q(&da, &db) => Some(da),
                    (Expr::Num(x), _) if x.is_level && x.value == 0 => Some(db),
                    (_, Expr::Num(y)) if y.is_level && y.value == 0 => Some(da),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level_call(prim: crate::expr::SymId, args: &[i64]) -> Expr {
        let mut e = Expr::Sym(prim);
        for a in args {
            e = Expr::appl(e, Expr::level(*a), 0)
        }
        e
    }

    #[test]
    fn level_arithmetic() {
        let mut elab = Elab::new();
        let bs = elab.graph.builtins;
        let succ3 = level_call(bs.succ, &[3]);
        assert!(matches!(elab.evaluate(&succ3), Expr::Num(n) if n.value == 4 && n.is_level));
        let max02 = level_call(bs.max, &[0, 2]);
        assert!(matches!(elab.evaluate(&max02), Expr::Num(n) if n.value == 2));
        let max55 = level_call(bs.max, &[5, 5]);
        assert!(matches!(elab.evaluate(&max55), Expr::Num(n) if n.value == 5));
        // max(0, x) = x on a symbolic argument
        let x = elab.graph.fresh_var(Some("x"), Some(Expr::Sym(bs.level)));
        let max0x = Expr::appl(
            Expr::appl(Expr::Sym(bs.max), Expr::level(0), 0),
            Expr::Var(x),
            0,
        );
        assert!(matches!(elab.evaluate(&max0x), Expr::Var(v) if v == x));
    }

    #[test]
    fn beta_reduction() {
        let mut elab = Elab::new();
        let bs = elab.graph.builtins;
        let lv = Expr::Sym(bs.level);
        let x = elab.graph.fresh_var(Some("x"), Some(lv.clone()));
        let succ_x = Expr::appl(Expr::Sym(bs.succ), Expr::Var(x), 0);
        let lam = Expr::abst(Some(x), lv, succ_x, 0);
        let call = Expr::appl(lam, Expr::level(3), 0);
        assert!(matches!(elab.evaluate(&call), Expr::Num(n) if n.value == 4 && n.is_level));
    }

    #[test]
    fn beta_respects_colors() {
        let mut elab = Elab::new();
        let bs = elab.graph.builtins;
        let lv = Expr::Sym(bs.level);
        let x = elab.graph.fresh_var(Some("x"), Some(lv.clone()));
        let lam = Expr::abst(Some(x), lv, Expr::Var(x), 1);
        let call = Expr::appl(lam.clone(), Expr::level(3), 0);
        // color mismatch: no reduction
        let r = elab.evaluate(&call);
        assert!(matches!(&r, Expr::Comb(_)));
    }

    #[test]
    fn delta_expansion_and_hold() {
        let mut elab = Elab::new();
        let bs = elab.graph.builtins;
        // unit is defined as the unit type
        let r = elab.evaluate(&Expr::Sym(bs.unit));
        assert!(matches!(r, Expr::Sym(s) if s == bs.void_ty));
        // ownValue off keeps the symbol
        let flags = EvalFlags {
            own_value: false,
            ..EvalFlags::default()
        };
        let r = elab.eval_with(&Expr::Sym(bs.unit), flags);
        assert!(matches!(r, Expr::Sym(s) if s == bs.unit));
        // Hold blocks unfolding
        let held = elab.graph.new_symbol(
            "held",
            bs.root,
            Flags::ASSIGNMENT | Flags::HOLD,
        );
        elab.graph.sym_mut(held).value = Some(Expr::level(1));
        let r = elab.evaluate(&Expr::Sym(held));
        assert!(matches!(r, Expr::Sym(s) if s == held));
    }

    #[test]
    fn down_values_rewrite() {
        let mut elab = Elab::new();
        let bs = elab.graph.builtins;
        let f = elab.graph.new_symbol("f", bs.root, Flags::DOWN_VALUE);
        let x = elab.graph.fresh_var(Some("x"), None);
        let lhs = Expr::appl(Expr::Sym(f), Expr::Var(x), 0);
        elab.graph.sym_mut(f).down_values.push(Rule {
            lhs,
            rhs: Expr::Var(x),
        });
        let call = Expr::appl(Expr::Sym(f), Expr::number(5), 0);
        assert!(matches!(elab.evaluate(&call), Expr::Num(n) if n.value == 5));
    }

    #[test]
    fn up_values_fire_from_argument_heads() {
        let mut elab = Elab::new();
        let bs = elab.graph.builtins;
        let f = elab.graph.new_symbol("f", bs.root, Flags::empty());
        let g = elab.graph.new_symbol("g", bs.root, Flags::UP_VALUE);
        let x = elab.graph.fresh_var(Some("x"), None);
        // f(g(x)) = x, installed as an up value on g
        let gx = Expr::appl(Expr::Sym(g), Expr::Var(x), 0);
        let lhs = Expr::appl(Expr::Sym(f), gx, 0);
        elab.graph.sym_mut(g).up_values.push(Rule {
            lhs,
            rhs: Expr::Var(x),
        });
        let g7 = Expr::appl(Expr::Sym(g), Expr::number(7), 0);
        let call = Expr::appl(Expr::Sym(f), g7, 0);
        assert!(matches!(elab.evaluate(&call), Expr::Num(n) if n.value == 7));
    }

    #[test]
    fn rule_order_is_declaration_order() {
        let mut elab = Elab::new();
        let bs = elab.graph.builtins;
        let f = elab.graph.new_symbol("f", bs.root, Flags::DOWN_VALUE);
        let x = elab.graph.fresh_var(Some("x"), None);
        let lhs = Expr::appl(Expr::Sym(f), Expr::Var(x), 0);
        elab.graph.sym_mut(f).down_values.push(Rule {
            lhs: lhs.clone(),
            rhs: Expr::number(1),
        });
        elab.graph.sym_mut(f).down_values.push(Rule {
            lhs,
            rhs: Expr::number(2),
        });
        let call = Expr::appl(Expr::Sym(f), Expr::number(0), 0);
        assert!(matches!(elab.evaluate(&call), Expr::Num(n) if n.value == 1));
    }

    #[test]
    fn eta_reduction() {
        let mut elab = Elab::new();
        let bs = elab.graph.builtins;
        let lv = Expr::Sym(bs.level);
        let f = elab.graph.new_symbol("f", bs.root, Flags::empty());
        let v = elab.graph.fresh_var(Some("v"), Some(lv.clone()));
        let body = Expr::appl(Expr::Sym(f), Expr::Var(v), 0);
        let lam = Expr::abst(Some(v), lv.clone(), body, 0);
        assert!(matches!(elab.evaluate(&lam), Expr::Sym(s) if s == f));
        // an unknown that may mention v blocks the reduction
        let m = elab.graph.fresh_meta();
        let body = Expr::appl(Expr::Meta(m), Expr::Var(v), 0);
        let lam = Expr::abst(Some(v), lv.clone(), body, 0);
        assert!(matches!(elab.evaluate(&lam), Expr::Comb(_)));
        // excluding v from the unknown unblocks it
        let m2 = elab.graph.fresh_meta();
        elab.graph.exclude(m2, v);
        let body = Expr::appl(Expr::Meta(m2), Expr::Var(v), 0);
        let lam = Expr::abst(Some(v), lv, body, 0);
        assert!(matches!(elab.evaluate(&lam), Expr::Meta(x) if x == m2));
    }

    #[test]
    fn evaluation_is_idempotent() {
        let mut elab = Elab::new();
        let bs = elab.graph.builtins;
        let f = elab.graph.new_symbol("f", bs.root, Flags::DOWN_VALUE);
        let x = elab.graph.fresh_var(Some("x"), None);
        let lhs = Expr::appl(Expr::Sym(f), Expr::Var(x), 0);
        let rhs = Expr::appl(Expr::Sym(bs.succ), Expr::Var(x), 0);
        elab.graph.sym_mut(f).down_values.push(Rule { lhs, rhs });
        let call = Expr::appl(Expr::Sym(f), Expr::level(2), 0);
        let once = elab.evaluate(&call);
        let twice = elab.evaluate(&once);
        assert!(elab.graph.same_q(&once, &twice));
    }

    #[test]
    fn deep_right_nested_calls() {
        let mut elab = Elab::new();
        let bs = elab.graph.builtins;
        let f = elab.graph.new_symbol("deep", bs.root, Flags::empty());
        let mut e = Expr::number(0);
        for _ in 0..10_000 {
            e = Expr::appl(Expr::Sym(f), e, 0)
        }
        let r = elab.evaluate(&e);
        assert!(elab.graph.same_q(&r, &e));
    }
}
