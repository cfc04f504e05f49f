//! Declaration parser.

use crate::ast::{Decl, Node};
use crate::lex::Token;
use crate::term::{Error, Tokens};

type Result<T> = core::result::Result<T, Error>;

impl<'s> Tokens<'s> {
    fn decl(&mut self) -> Result<Decl> {
        let start = self.here().start;
        if self.eat(&Token::Module) {
            let (name, _) = self.ident()?;
            self.expect(&Token::LBrace)?;
            let decls = self.decls(Some(&Token::RBrace))?;
            let end = self.expect(&Token::RBrace)?;
            return Ok(Decl::Module {
                name,
                decls,
                span: start..end.end,
            });
        }
        if self.eat(&Token::Variable) {
            let (name, span) = self.ident()?;
            let ty = if self.eat(&Token::Colon) {
                Some(self.expr()?)
            } else {
                None
            };
            let end = ty.as_ref().map_or(span.end, |ty| ty.span.end);
            return Ok(Decl::Variable {
                name,
                ty,
                span: start..end,
            });
        }

        let lhs = self.expr()?;
        let ty = if self.eat(&Token::Colon) {
            Some(self.expr()?)
        } else {
            None
        };
        let value = if self.eat(&Token::Eq) {
            Some(self.expr()?)
        } else {
            None
        };
        let end = value
            .as_ref()
            .or(ty.as_ref())
            .map_or(lhs.span.end, |n: &Node| n.span.end);
        Ok(Decl::Define {
            lhs,
            ty,
            value,
            span: start..end,
        })
    }

    /// Declarations up to the closing token (or end of input),
    /// separated by any number of semicolons.
    fn decls(&mut self, close: Option<&Token<'s>>) -> Result<Vec<Decl>> {
        let mut decls = Vec::new();
        loop {
            while self.eat(&Token::Semi) {}
            if self.at_end() || self.peek() == close {
                return Ok(decls);
            }
            decls.push(self.decl()?);
            if !self.at_end() && self.peek() != close {
                self.expect(&Token::Semi)?;
            }
        }
    }
}

/// Parse a whole program.
pub fn program(src: &str) -> Result<Vec<Decl>> {
    let mut toks = Tokens::new(crate::lex(src))?;
    toks.decls(None)
}

#[test]
fn declarations() -> Result<()> {
    use crate::ast::NodeKind;
    let decls = program("T: Type(0); v: T; w: T; eq: v === w")?;
    assert_eq!(decls.len(), 4);

    let decls = program(r"f: number -> number; f(?x) = x; f(5)")?;
    match &decls[1] {
        Decl::Define { lhs, value, ty, .. } => {
            assert!(matches!(lhs.kind, NodeKind::Call { .. }));
            assert!(value.is_some() && ty.is_none());
        }
        decl => panic!("expected rule, got {:?}", decl),
    }
    match &decls[2] {
        Decl::Define { ty, value, .. } => assert!(ty.is_none() && value.is_none()),
        decl => panic!("expected statement, got {:?}", decl),
    }
    Ok(())
}

#[test]
fn modules_and_variables() -> Result<()> {
    let decls = program("module m { a: Type(0); variable x: a; g(x) = x }")?;
    match &decls[0] {
        Decl::Module { name, decls, .. } => {
            assert_eq!(name, "m");
            assert_eq!(decls.len(), 3);
            assert!(matches!(decls[1], Decl::Variable { .. }));
        }
        decl => panic!("expected module, got {:?}", decl),
    }
    Ok(())
}
