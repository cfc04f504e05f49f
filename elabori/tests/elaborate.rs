//! End-to-end elaboration scenarios: parse, lower, elaborate, evaluate.

use elabori::{lower, Comb, Elab, Elaborated, Expr, Show, SymId};
use lumo_parse::program;

fn run(src: &str) -> Elaborated {
    let decls = program(src).expect("parse");
    let elab = Elab::new();
    let hir = lower(&decls, &elab.graph).expect("lower");
    elab.run(&hir)
}

fn top_level(out: &Elaborated, name: &str) -> SymId {
    let root = out.elab.graph.builtins.root;
    *out.elab
        .graph
        .sym(root)
        .subs
        .get(name)
        .unwrap_or_else(|| panic!("no top-level symbol `{}`", name))
}

#[test]
fn identity_function() {
    let out = run(r"id: (T: Type(0)) -> T -> T = \T \x x");
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    let id = top_level(&out, "id");
    let ty = out.elab.graph.sym(id).ty.clone().unwrap();
    assert_eq!(
        Show(&out.elab.graph, &ty).to_string(),
        "(T: Type(0)) -> T -> T"
    );
    let value = out.elab.graph.sym(id).value.clone().unwrap();
    assert_eq!(
        Show(&out.elab.graph, &value).to_string(),
        r"\(T: Type(0)) \(x: T) x"
    );
}

#[test]
fn erased_parameters_are_inserted() {
    let out = run(r"const: [T: Type(0)] -> [U: Type(0)] -> T -> U -> T = \x \_ x");
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    let konst = top_level(&out, "const");
    let value = out.elab.graph.sym(konst).value.clone().unwrap();
    // a lambda of depth 4 around x, with the two inferred binders erased
    let mut colors = Vec::new();
    let mut cur = out.elab.graph.deref(&value);
    loop {
        let body = match cur.as_comb() {
            Some(Comb::Abst { body, color, .. }) => {
                colors.push(*color);
                body.clone()
            }
            _ => break,
        };
        cur = out.elab.graph.deref(&body);
    }
    assert_eq!(colors, vec![1, 1, 0, 0]);
    assert!(matches!(cur, Expr::Var(_)));
}

#[test]
fn rules_rewrite_calls() {
    let mut out = run("f: number -> number; f(?x) = x; f(5)");
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    let f = top_level(&out, "f");
    assert_eq!(out.elab.graph.sym(f).down_values.len(), 1);
    let call = out.outputs[0].clone();
    let value = out.elab.evaluate(&call);
    assert!(matches!(value, Expr::Num(n) if n.value == 5 && !n.is_level));
}

#[test]
fn builtin_level_max() {
    let mut out = run("Level.max(0, 2)");
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    let call = out.outputs[0].clone();
    let value = out.elab.evaluate(&call);
    assert!(matches!(value, Expr::Num(n) if n.value == 2 && n.is_level));
}

#[test]
fn equating_rigid_symbols_is_reported() {
    let out = run("T: Type(0); v: T; w: T; eq: v === w");
    let unresolved: Vec<_> = out
        .diagnostics
        .iter()
        .map(|d| d.to_string())
        .filter(|d| d.contains("v === w"))
        .collect();
    assert!(!unresolved.is_empty(), "{:?}", out.diagnostics);
}

#[test]
fn annotated_lambda_applies() {
    let mut out = run(r"(\(x: Level) Level.succ(x))(3)");
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    let call = out.outputs[0].clone();
    let value = out.elab.evaluate(&call);
    assert!(matches!(value, Expr::Num(n) if n.value == 4 && n.is_level));
}

#[test]
fn scope_variables_act_as_patterns() {
    let mut out = run("f: number -> number; variable y: number; f(y) = y; f(8)");
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    let call = out.outputs[0].clone();
    let value = out.elab.evaluate(&call);
    assert!(matches!(value, Expr::Num(n) if n.value == 8));
}

#[test]
fn modules_scope_their_symbols() {
    let mut out = run("module m { a: Type(0) }; m.a");
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    let member = out.outputs[0].clone();
    let value = out.elab.evaluate(&member);
    let m = top_level(&out, "m");
    let a = *out.elab.graph.sym(m).subs.get("a").unwrap();
    assert!(matches!(value, Expr::Sym(s) if s == a));
}

#[test]
fn declared_types_are_checked_against_values() {
    // 5 is a number, not a string
    let out = run("s: string = 5");
    assert!(!out.diagnostics.is_empty());
}

#[test]
fn duplicate_assignment_is_reported() {
    let out = run("x: number = 1; x = 2");
    assert!(out
        .diagnostics
        .iter()
        .any(|d| d.to_string().contains("assigned twice")));
}

#[test]
fn underconstrained_values_are_reported() {
    // the declared type is not a function type, so the lambda never resolves
    let out = run("q: untyped = \\z z");
    assert!(!out.diagnostics.is_empty());
}

#[test]
fn strings_elaborate() {
    let out = run("s: string = \"hello\"");
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    let s = top_level(&out, "s");
    let value = out.elab.graph.sym(s).value.clone().unwrap();
    assert!(matches!(value, Expr::Str(v) if &*v == "hello"));
}
