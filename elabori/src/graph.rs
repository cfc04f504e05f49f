//! The shared expression graph: arenas for symbols, variables, and
//! metavariables, plus the built-in symbols created at startup.

use crate::expr::{Color, Expr, MetaId, SymId, VarId};
use crate::symbol::{Flags, Prim, Symbol, Unknown, Variable};

/// Indices of the built-in symbols, created once and fixed thereafter.
#[derive(Clone, Copy, Debug)]
pub struct Builtins {
    pub root: SymId,
    pub typ: SymId,
    pub builtin: SymId,
    pub level: SymId,
    pub succ: SymId,
    pub max: SymId,
    pub number: SymId,
    pub string: SymId,
    pub untyped: SymId,
    pub error_ty: SymId,
    /// The unit type.
    pub void_ty: SymId,
    /// The unit value; shares its display name with the unit type
    /// but not its identity.
    pub void_val: SymId,
    pub unit: SymId,
}

pub struct Graph {
    syms: Vec<Symbol>,
    vars: Vec<Variable>,
    metas: Vec<Unknown>,
    pub builtins: Builtins,
}

impl Graph {
    pub fn new() -> Self {
        let mut syms = Vec::new();
        let root = alloc(&mut syms, "root", None, Flags::empty(), None);
        let typ = alloc(&mut syms, "Type", Some(root), Flags::empty(), None);
        let builtin = alloc(&mut syms, "builtin", Some(root), Flags::empty(), None);
        let level = alloc(&mut syms, "Level", Some(builtin), Flags::empty(), None);
        let succ = alloc(&mut syms, "succ", Some(level), Flags::empty(), Some(Prim::LevelSucc));
        let max = alloc(&mut syms, "max", Some(level), Flags::empty(), Some(Prim::LevelMax));
        let number = alloc(&mut syms, "number", Some(builtin), Flags::empty(), None);
        let string = alloc(&mut syms, "string", Some(builtin), Flags::empty(), None);
        let untyped = alloc(&mut syms, "untyped", Some(builtin), Flags::empty(), None);
        let error_ty = alloc(&mut syms, "error-type", Some(builtin), Flags::empty(), None);
        let void_ty = alloc(&mut syms, "void", Some(builtin), Flags::empty(), None);
        let void_val = alloc(&mut syms, "void", Some(builtin), Flags::empty(), None);
        let unit = alloc(&mut syms, "unit", Some(builtin), Flags::ASSIGNMENT, None);
        let builtins = Builtins {
            root,
            typ,
            builtin,
            level,
            succ,
            max,
            number,
            string,
            untyped,
            error_ty,
            void_ty,
            void_val,
            unit,
        };
        let mut graph = Self {
            syms,
            vars: Vec::new(),
            metas: Vec::new(),
            builtins,
        };

        let lv = Expr::Sym(level);
        let type0 = graph.type_expr(Expr::level(0));
        for s in [level, number, string, void_ty, unit].iter() {
            graph.sym_mut(*s).ty = Some(type0.clone());
        }
        graph.sym_mut(void_val).ty = Some(Expr::Sym(void_ty));
        graph.sym_mut(unit).value = Some(Expr::Sym(void_ty));
        graph.sym_mut(succ).ty = Some(Expr::prod(lv.clone(), None, lv.clone(), 0));
        let max_ty = Expr::prod(lv.clone(), None, Expr::prod(lv.clone(), None, lv.clone(), 0), 0);
        graph.sym_mut(max).ty = Some(max_ty);
        // Type : (l: Level) -> Type(succ(l))
        let l = graph.fresh_var(Some("l"), Some(lv.clone()));
        let succ_l = Expr::appl(Expr::Sym(succ), Expr::Var(l), 0);
        let out = graph.type_expr(succ_l);
        graph.sym_mut(typ).ty = Some(Expr::prod(lv, Some(l), out, 0));
        graph
    }

    pub fn sym(&self, id: SymId) -> &Symbol {
        &self.syms[id.0 as usize]
    }

    pub fn sym_mut(&mut self, id: SymId) -> &mut Symbol {
        &mut self.syms[id.0 as usize]
    }

    pub fn var(&self, id: VarId) -> &Variable {
        &self.vars[id.0 as usize]
    }

    pub fn meta(&self, id: MetaId) -> &Unknown {
        &self.metas[id.0 as usize]
    }

    pub fn meta_mut(&mut self, id: MetaId) -> &mut Unknown {
        &mut self.metas[id.0 as usize]
    }

    pub fn meta_count(&self) -> usize {
        self.metas.len()
    }

    pub fn sym_ids(&self) -> impl Iterator<Item = SymId> {
        (0..self.syms.len() as u32).map(SymId)
    }

    /// Deep copy with every resolved metavariable replaced by its value.
    /// The flag is false if an unresolved metavariable remains.
    pub fn resolve_deep(&self, e: &Expr) -> (Expr, bool) {
        match e {
            Expr::Meta(m) => match &self.meta(*m).value {
                Some(value) => self.resolve_deep(&value.clone()),
                None => (e.clone(), false),
            },
            Expr::Comb(c) => match &**c {
                crate::expr::Comb::Appl { fun, arg, color } => {
                    let (fun, f_ok) = self.resolve_deep(fun);
                    let (arg, a_ok) = self.resolve_deep(arg);
                    (Expr::appl(fun, arg, *color), f_ok && a_ok)
                }
                crate::expr::Comb::Prod {
                    input,
                    var,
                    output,
                    color,
                } => {
                    let (input, i_ok) = self.resolve_deep(input);
                    let (output, o_ok) = self.resolve_deep(output);
                    (Expr::prod(input, *var, output, *color), i_ok && o_ok)
                }
                crate::expr::Comb::Abst {
                    var,
                    ty,
                    body,
                    color,
                } => {
                    let (ty, t_ok) = self.resolve_deep(ty);
                    let (body, b_ok) = self.resolve_deep(body);
                    (Expr::abst(*var, ty, body, *color), t_ok && b_ok)
                }
            },
            _ => (e.clone(), true),
        }
    }

    /// Create a symbol and register it with its parent.
    /// On a name collision the first writer keeps the `subSymbols` slot.
    pub fn new_symbol(&mut self, name: &str, parent: SymId, flags: Flags) -> SymId {
        alloc(&mut self.syms, name, Some(parent), flags, None)
    }

    pub fn fresh_var(&mut self, name: Option<&str>, ty: Option<Expr>) -> VarId {
        let id = VarId(self.vars.len() as u32);
        self.vars.push(Variable {
            name: name.map(String::from),
            ty,
        });
        id
    }

    pub fn fresh_meta(&mut self) -> MetaId {
        let id = MetaId(self.metas.len() as u32);
        self.metas.push(Unknown::default());
        id
    }

    pub fn fresh_meta_typed(&mut self, ty: Expr) -> MetaId {
        let id = self.fresh_meta();
        self.meta_mut(id).ty = Some(ty);
        id
    }

    /// Low-level write of a metavariable value. Callers are responsible for
    /// the occurs check; the write-once invariant is enforced here.
    pub fn resolve_meta(&mut self, id: MetaId, value: Expr) {
        let meta = self.meta_mut(id);
        assert!(meta.value.is_none(), "metavariable resolved twice");
        meta.value = Some(value)
    }

    /// Forbid a scope variable from ever occurring in a metavariable's value.
    pub fn exclude(&mut self, id: MetaId, v: VarId) {
        self.meta_mut(id).excluded.insert(v);
    }

    /// Follow the value chain of resolved metavariables.
    pub fn deref(&self, e: &Expr) -> Expr {
        let mut e = e.clone();
        while let Expr::Meta(m) = e {
            match &self.meta(m).value {
                Some(value) => e = value.clone(),
                None => return Expr::Meta(m),
            }
        }
        e
    }

    /// Split an application spine into its head and arguments.
    pub fn spine(&self, e: &Expr) -> (Expr, Vec<(Expr, Color)>) {
        let mut head = self.deref(e);
        let mut args = Vec::new();
        loop {
            match head.as_comb() {
                Some(crate::expr::Comb::Appl { fun, arg, color }) => {
                    args.push((arg.clone(), *color));
                    head = self.deref(fun);
                }
                _ => break,
            }
        }
        args.reverse();
        (head, args)
    }

    /// The symbol heading an application spine, if any.
    pub fn head_sym(&self, e: &Expr) -> Option<SymId> {
        match self.spine(e).0 {
            Expr::Sym(s) => Some(s),
            _ => None,
        }
    }

    /// A symbol is rigid if solving can never refine its head position:
    /// it has no value, no rewrite rules, and no built-in evaluator.
    pub fn is_rigid(&self, s: SymId) -> bool {
        let sym = self.sym(s);
        !sym.flags.intersects(Flags::ASSIGNMENT | Flags::DOWN_VALUE) && sym.prim.is_none()
    }

    /// `Type(l)` for a level expression `l`.
    pub fn type_expr(&self, l: Expr) -> Expr {
        Expr::appl(Expr::Sym(self.builtins.typ), l, 0)
    }

    /// The level `l` of a `Type(l)` expression, if it is one.
    pub fn level_of_type(&self, e: &Expr) -> Option<Expr> {
        match self.deref(e).as_comb() {
            Some(crate::expr::Comb::Appl { fun, arg, .. }) => match self.deref(fun) {
                Expr::Sym(s) if s == self.builtins.typ => Some(arg.clone()),
                _ => None,
            },
            _ => None,
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

fn alloc(
    syms: &mut Vec<Symbol>,
    name: &str,
    parent: Option<SymId>,
    flags: Flags,
    prim: Option<Prim>,
) -> SymId {
    let id = SymId(syms.len() as u32);
    syms.push(Symbol {
        name: name.to_string(),
        parent,
        flags,
        prim,
        ty: None,
        value: None,
        subs: Default::default(),
        down_values: Vec::new(),
        up_values: Vec::new(),
    });
    if let Some(p) = parent {
        syms[p.0 as usize].subs.entry(name.to_string()).or_insert(id);
    }
    id
}

#[test]
fn builtin_tree() {
    let graph = Graph::new();
    let bs = graph.builtins;
    assert_eq!(graph.sym(bs.succ).parent, Some(bs.level));
    assert_eq!(graph.sym(bs.builtin).subs.get("Level"), Some(&bs.level));
    assert_eq!(graph.sym(bs.level).subs.get("max"), Some(&bs.max));
    // two symbols named `void`: the first writer keeps the name slot
    assert_eq!(graph.sym(bs.builtin).subs.get("void"), Some(&bs.void_ty));
    assert_ne!(bs.void_ty, bs.void_val);
    assert_eq!(graph.sym(bs.void_val).name, graph.sym(bs.void_ty).name);
}

#[test]
fn rigidity() {
    let graph = Graph::new();
    assert!(graph.is_rigid(graph.builtins.typ));
    // primitive evaluators rule out head decomposition
    assert!(!graph.is_rigid(graph.builtins.max));
    assert!(!graph.is_rigid(graph.builtins.unit));
}

#[test]
fn spines() {
    let graph = Graph::new();
    let bs = graph.builtins;
    let call = Expr::appl(
        Expr::appl(Expr::Sym(bs.max), Expr::level(0), 0),
        Expr::level(2),
        0,
    );
    let (head, args) = graph.spine(&call);
    assert!(matches!(head, Expr::Sym(s) if s == bs.max));
    assert_eq!(args.len(), 2);
    assert_eq!(graph.head_sym(&call), Some(bs.max));
}
