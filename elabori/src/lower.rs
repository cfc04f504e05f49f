//! Lowering of the AST to HIR registers.
//!
//! Declarations inside one module are pre-scanned so that every declared
//! name is visible to every body (registers may refer forward), and so that
//! a symbol's flags are the union over all declarations of its name:
//! every declared symbol may be typed, a `= value` declaration makes it
//! assignable, and a rule declaration makes its head rewritable.

use crate::error::LowerError;
use crate::expr::Expr;
use crate::graph::Graph;
use crate::hir::{Hir, RegId, RegKind};
use crate::symbol::Flags;
use fnv::FnvHashMap;
use lumo_parse::{Decl, Node, NodeKind, Span};

/// Lower a program to HIR against the built-ins of the given graph.
pub fn lower(decls: &[Decl], graph: &Graph) -> Result<Hir, Vec<LowerError>> {
    let mut lw = Lowerer {
        graph,
        hir: Hir::new(),
        root: 0,
        scopes: vec![Default::default()],
        patterns: None,
        in_pattern: false,
        errors: Vec::new(),
    };
    lw.root = lw.hir.push(None, RegKind::Root);
    lw.decls(decls, lw.root);
    if lw.errors.is_empty() {
        Ok(lw.hir)
    } else {
        Err(lw.errors)
    }
}

struct Lowerer<'g> {
    graph: &'g Graph,
    hir: Hir,
    root: RegId,
    scopes: Vec<FnvHashMap<String, RegId>>,
    /// Pattern name bindings, present only while lowering a rule.
    patterns: Option<FnvHashMap<String, RegId>>,
    /// Whether calls being lowered belong to a rule left-hand side.
    in_pattern: bool,
    errors: Vec<LowerError>,
}

impl<'g> Lowerer<'g> {
    fn bind(&mut self, name: String, reg: RegId) {
        self.scopes.last_mut().expect("scope stack").insert(name, reg);
    }

    fn lookup(&self, name: &str) -> Option<RegId> {
        if let Some(reg) = self.patterns.as_ref().and_then(|pats| pats.get(name)) {
            return Some(*reg);
        }
        self.scopes.iter().rev().find_map(|scope| scope.get(name)).copied()
    }

    /// The reserved built-in names, visible at the top of every scope.
    fn builtin(&self, name: &str) -> Option<Expr> {
        let bs = self.graph.builtins;
        if name == "Type" {
            return Some(Expr::Sym(bs.typ));
        }
        if name == "builtin" {
            return Some(Expr::Sym(bs.builtin));
        }
        let id = self.graph.sym(bs.builtin).subs.get(name)?;
        Some(Expr::Sym(*id))
    }

    fn decls(&mut self, decls: &[Decl], parent: RegId) {
        self.scopes.push(Default::default());

        // pre-scan: declared names, with flags unioned over declarations
        let mut order: Vec<String> = Vec::new();
        let mut pending: FnvHashMap<String, (Flags, Span)> = Default::default();
        for decl in decls {
            match decl {
                Decl::Define { lhs, ty, value, .. } => {
                    if let NodeKind::Ident(name) = &lhs.kind {
                        if ty.is_some() || value.is_some() {
                            let entry = pending.entry(name.clone()).or_insert_with(|| {
                                order.push(name.clone());
                                (Flags::empty(), lhs.span.clone())
                            });
                            entry.0 |= Flags::DEF_TYPE | Flags::UP_VALUE;
                            if value.is_some() {
                                entry.0 |= Flags::ASSIGNMENT
                            }
                        }
                    }
                }
                Decl::Module { name, span, .. } => {
                    pending.entry(name.clone()).or_insert_with(|| {
                        order.push(name.clone());
                        (Flags::empty(), span.clone())
                    });
                }
                Decl::Variable { .. } => (),
            }
        }
        for decl in decls {
            if let Decl::Define {
                lhs,
                value: Some(_),
                ..
            } = decl
            {
                if let NodeKind::Call { .. } = lhs.kind {
                    if let Some(name) = head_ident(lhs) {
                        if let Some(entry) = pending.get_mut(name) {
                            entry.0 |= Flags::DEF_TYPE | Flags::DOWN_VALUE
                        }
                    }
                }
            }
        }
        for name in order {
            let (flags, span) = pending[&name].clone();
            let reg = self.hir.push(
                Some(span),
                RegKind::Symbol {
                    name: Some(name.clone()),
                    parent: Some(parent),
                    flags,
                },
            );
            self.bind(name, reg)
        }

        for decl in decls {
            self.decl(decl)
        }
        self.scopes.pop();
    }

    fn decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Module { name, decls, .. } => {
                let reg = self.lookup(name).expect("module symbol was pre-scanned");
                self.decls(decls, reg)
            }
            Decl::Variable { name, ty, span } => {
                let ty = ty.as_ref().map(|t| self.expr(t));
                let reg = self.hir.push(
                    Some(span.clone()),
                    RegKind::Variable {
                        name: Some(name.clone()),
                        ty,
                    },
                );
                self.bind(name.clone(), reg)
            }
            Decl::Define {
                lhs,
                ty,
                value,
                span,
            } => match &lhs.kind {
                NodeKind::Ident(name) if ty.is_some() || value.is_some() => {
                    let symbol = match self.lookup(name) {
                        Some(reg) => reg,
                        None => {
                            let err = LowerError::UndeclaredSymbol(name.clone(), lhs.span.clone());
                            self.errors.push(err);
                            return;
                        }
                    };
                    if let Some(t) = ty {
                        let ty = self.expr(t);
                        self.hir.push(Some(t.span.clone()), RegKind::SymbolType { symbol, ty });
                    }
                    if let Some(v) = value {
                        let value = self.expr(v);
                        self.hir
                            .push(Some(v.span.clone()), RegKind::SymbolAssign { symbol, value });
                    }
                }
                NodeKind::Call { .. } if value.is_some() => {
                    if ty.is_some() {
                        let err =
                            LowerError::InvalidDeclaration("a rule cannot carry a type", span.clone());
                        self.errors.push(err);
                        return;
                    }
                    let head = head_of(lhs);
                    let symbol = match &head.kind {
                        NodeKind::Ident(name) => match self.lookup(name) {
                            Some(reg) => reg,
                            None => {
                                let err =
                                    LowerError::UndeclaredSymbol(name.clone(), head.span.clone());
                                self.errors.push(err);
                                return;
                            }
                        },
                        NodeKind::Member(..) => self.expr(head),
                        _ => {
                            let err = LowerError::InvalidDeclaration(
                                "a rule head must name a symbol",
                                head.span.clone(),
                            );
                            self.errors.push(err);
                            return;
                        }
                    };
                    self.patterns = Some(Default::default());
                    self.in_pattern = true;
                    let lhs_reg = self.expr(lhs);
                    self.in_pattern = false;
                    let rhs_reg = self.expr(value.as_ref().expect("rule right-hand side"));
                    self.patterns = None;
                    self.hir.push(
                        Some(span.clone()),
                        RegKind::SymbolRule {
                            symbol,
                            lhs: lhs_reg,
                            rhs: rhs_reg,
                            is_up: false,
                        },
                    );
                }
                _ if ty.is_none() && value.is_none() => {
                    let reg = self.expr(lhs);
                    self.hir.outputs.push(reg)
                }
                _ => {
                    let err =
                        LowerError::InvalidDeclaration("invalid declaration shape", span.clone());
                    self.errors.push(err)
                }
            },
        }
    }

    fn expr(&mut self, node: &Node) -> RegId {
        let span = Some(node.span.clone());
        match &node.kind {
            NodeKind::Ident(name) => {
                if let Some(reg) = self.lookup(name) {
                    return reg;
                }
                match self.builtin(name) {
                    Some(e) => self.hir.push(span, RegKind::Expr(e)),
                    None => {
                        let err = LowerError::UndeclaredSymbol(name.clone(), node.span.clone());
                        self.errors.push(err);
                        let dummy = Expr::Sym(self.graph.builtins.untyped);
                        self.hir.push(span, RegKind::Expr(dummy))
                    }
                }
            }
            NodeKind::Number(v) => self.hir.push(span, RegKind::Number(*v)),
            NodeKind::Str(s) => self
                .hir
                .push(span, RegKind::Expr(Expr::Str(s.as_str().into()))),
            NodeKind::Pattern(name) => {
                if self.patterns.is_none() {
                    self.errors
                        .push(LowerError::PatternOutsideRule(node.span.clone()));
                    let dummy = Expr::Sym(self.graph.builtins.untyped);
                    return self.hir.push(span, RegKind::Expr(dummy));
                }
                if let Some(reg) = self
                    .patterns
                    .as_ref()
                    .and_then(|pats| name.as_ref().and_then(|n| pats.get(n).copied()))
                {
                    return reg;
                }
                let reg = self.hir.push(span, RegKind::Unknown { ty: None });
                if let (Some(pats), Some(n)) = (self.patterns.as_mut(), name) {
                    pats.insert(n.clone(), reg);
                }
                reg
            }
            NodeKind::Member(lhs, name) => {
                let lhs = self.expr(lhs);
                self.hir.push(
                    span,
                    RegKind::Member {
                        lhs,
                        name: name.clone(),
                    },
                )
            }
            NodeKind::Call { fun, arg, color } => {
                let fun = self.expr(fun);
                let arg = self.expr(arg);
                self.hir.push(
                    span,
                    RegKind::Call {
                        fun,
                        arg,
                        color: *color,
                        is_pattern: self.in_pattern,
                    },
                )
            }
            NodeKind::Lambda {
                arg,
                arg_ty,
                body,
                color,
            } => {
                let arg_ty = arg_ty.as_ref().map(|t| self.expr(t));
                let var = self.hir.push(
                    span.clone(),
                    RegKind::Variable {
                        name: Some(arg.clone()),
                        ty: arg_ty,
                    },
                );
                self.scopes.push(Default::default());
                self.bind(arg.clone(), var);
                let body = self.expr(body);
                self.scopes.pop();
                self.hir.push(
                    span,
                    RegKind::Lambda {
                        arg: Some(var),
                        arg_ty,
                        body,
                        color: *color,
                    },
                )
            }
            NodeKind::FnType {
                binder,
                input,
                output,
                color,
            } => {
                let input = self.expr(input);
                let (arg, output) = match binder {
                    Some(name) => {
                        let var = self.hir.push(
                            span.clone(),
                            RegKind::Variable {
                                name: Some(name.clone()),
                                ty: Some(input),
                            },
                        );
                        self.scopes.push(Default::default());
                        self.bind(name.clone(), var);
                        let output = self.expr(output);
                        self.scopes.pop();
                        (Some(var), output)
                    }
                    None => (None, self.expr(output)),
                };
                self.hir.push(
                    span,
                    RegKind::FnType {
                        input,
                        arg,
                        output,
                        color: *color,
                    },
                )
            }
            NodeKind::Equiv(lhs, rhs) => {
                let lhs = self.expr(lhs);
                let rhs = self.expr(rhs);
                self.hir.push(span, RegKind::Equiv { lhs, rhs })
            }
        }
    }
}

fn head_of(node: &Node) -> &Node {
    match &node.kind {
        NodeKind::Call { fun, .. } => head_of(fun),
        _ => node,
    }
}

fn head_ident(node: &Node) -> Option<&String> {
    match &head_of(node).kind {
        NodeKind::Ident(name) => Some(name),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumo_parse::program;

    fn lower_src(src: &str) -> Result<Hir, Vec<LowerError>> {
        let decls = program(src).expect("parse");
        let graph = Graph::new();
        lower(&decls, &graph)
    }

    #[test]
    fn declarations_pre_scan_flags() {
        let hir = lower_src("f: number -> number; f(?x) = x; f(5)").unwrap();
        let sym = hir
            .regs
            .iter()
            .find_map(|reg| match &reg.kind {
                RegKind::Symbol { name: Some(n), flags, .. } if n == "f" => Some(*flags),
                _ => None,
            })
            .expect("symbol register for f");
        assert!(sym.contains(Flags::DEF_TYPE | Flags::UP_VALUE | Flags::DOWN_VALUE));
        assert!(!sym.contains(Flags::ASSIGNMENT));
        assert_eq!(hir.outputs.len(), 1);
    }

    #[test]
    fn assignments_make_symbols_assignable() {
        let hir = lower_src(r"id: (T: Type(0)) -> T -> T = \T \x x").unwrap();
        let flags = hir
            .regs
            .iter()
            .find_map(|reg| match &reg.kind {
                RegKind::Symbol { name: Some(n), flags, .. } if n == "id" => Some(*flags),
                _ => None,
            })
            .unwrap();
        assert!(flags.contains(Flags::DEF_TYPE | Flags::ASSIGNMENT | Flags::UP_VALUE));
    }

    #[test]
    fn forward_references_resolve() {
        // `g` is declared after its use inside the body of `h`
        assert!(lower_src("h: number = g; g: number").is_ok());
    }

    #[test]
    fn pattern_names_are_shared_within_a_rule() {
        let hir = lower_src("f: number -> number -> number; f(?x, ?x) = x").unwrap();
        let unknowns = hir
            .regs
            .iter()
            .filter(|reg| matches!(reg.kind, RegKind::Unknown { .. }))
            .count();
        assert_eq!(unknowns, 1);
        // calls in the left-hand side are pattern calls
        let pattern_calls = hir
            .regs
            .iter()
            .filter(|reg| matches!(reg.kind, RegKind::Call { is_pattern: true, .. }))
            .count();
        assert_eq!(pattern_calls, 2);
    }

    #[test]
    fn errors() {
        assert!(matches!(
            lower_src("undefined").unwrap_err()[0],
            LowerError::UndeclaredSymbol(..)
        ));
        assert!(matches!(
            lower_src("x: ?p").unwrap_err()[0],
            LowerError::PatternOutsideRule(..)
        ));
        assert!(matches!(
            lower_src("f: number; f(?x): number = x").unwrap_err()[0],
            LowerError::InvalidDeclaration(..)
        ));
    }

    #[test]
    fn modules_nest() {
        let hir = lower_src("module m { a: Type(0) }; m.a").unwrap();
        let has_member = hir
            .regs
            .iter()
            .any(|reg| matches!(&reg.kind, RegKind::Member { name, .. } if name == "a"));
        assert!(has_member);
    }
}
