//! Expression parser.

use crate::ast::{Node, NodeKind, Span};
use crate::lex::Token;
use core::fmt::{self, Display};

#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    UnexpectedChar(Span),
    UnexpectedToken(Span, String),
    UnexpectedEnd,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnexpectedChar(_) => write!(f, "unexpected character"),
            Self::UnexpectedToken(_, tok) => write!(f, "unexpected token `{}`", tok),
            Self::UnexpectedEnd => write!(f, "unexpected end of input"),
        }
    }
}

impl Error {
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::UnexpectedChar(span) | Self::UnexpectedToken(span, _) => Some(span.clone()),
            Self::UnexpectedEnd => None,
        }
    }
}

type Result<T> = core::result::Result<T, Error>;

/// Token cursor shared by the expression and declaration parsers.
pub(crate) struct Tokens<'s> {
    toks: Vec<(Token<'s>, Span)>,
    pos: usize,
}

impl<'s> Tokens<'s> {
    pub(crate) fn new(toks: Vec<(Token<'s>, Span)>) -> Result<Self> {
        if let Some((_, span)) = toks.iter().find(|(tok, _)| *tok == Token::Error) {
            return Err(Error::UnexpectedChar(span.clone()));
        }
        Ok(Self { toks, pos: 0 })
    }

    pub(crate) fn peek(&self) -> Option<&Token<'s>> {
        self.toks.get(self.pos).map(|(tok, _)| tok)
    }

    fn peek_at(&self, n: usize) -> Option<&Token<'s>> {
        self.toks.get(self.pos + n).map(|(tok, _)| tok)
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.toks.len()
    }

    /// Span of the token about to be read, or of the end of input.
    pub(crate) fn here(&self) -> Span {
        match self.toks.get(self.pos) {
            Some((_, span)) => span.clone(),
            None => match self.toks.last() {
                Some((_, span)) => span.end..span.end,
                None => 0..0,
            },
        }
    }

    pub(crate) fn advance(&mut self) -> Result<(Token<'s>, Span)> {
        let item = self.toks.get(self.pos).cloned().ok_or(Error::UnexpectedEnd)?;
        self.pos += 1;
        Ok(item)
    }

    pub(crate) fn eat(&mut self, tok: &Token<'s>) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, tok: &Token<'s>) -> Result<Span> {
        let (found, span) = self.advance()?;
        if found == *tok {
            Ok(span)
        } else {
            Err(Error::UnexpectedToken(span, found.to_string()))
        }
    }

    pub(crate) fn ident(&mut self) -> Result<(String, Span)> {
        match self.advance()? {
            (Token::Ident(s), span) => Ok((s.to_string(), span)),
            (found, span) => Err(Error::UnexpectedToken(span, found.to_string())),
        }
    }

    /// Expression entry point: function types bind loosest.
    pub(crate) fn expr(&mut self) -> Result<Node> {
        // `(x: A) -> B` needs lookahead to tell it apart from `(expr)`.
        if self.peek() == Some(&Token::LPar)
            && matches!(self.peek_at(1), Some(Token::Ident(_)))
            && self.peek_at(2) == Some(&Token::Colon)
        {
            return self.binder_fn_type(&Token::RPar, 0);
        }
        if self.peek() == Some(&Token::LBrk) {
            if matches!(self.peek_at(1), Some(Token::Ident(_)))
                && self.peek_at(2) == Some(&Token::Colon)
            {
                return self.binder_fn_type(&Token::RBrk, 1);
            }
            // `[A] -> B`: erased function type without a binder
            let start = self.here().start;
            self.expect(&Token::LBrk)?;
            let input = self.expr()?;
            self.expect(&Token::RBrk)?;
            self.expect(&Token::Arrow)?;
            let output = self.expr()?;
            let span = start..output.span.end;
            let kind = NodeKind::FnType {
                binder: None,
                input: Box::new(input),
                output: Box::new(output),
                color: 1,
            };
            return Ok(Node::new(span, kind));
        }

        let lhs = self.equiv()?;
        if self.eat(&Token::Arrow) {
            let output = self.expr()?;
            let span = lhs.span.start..output.span.end;
            let kind = NodeKind::FnType {
                binder: None,
                input: Box::new(lhs),
                output: Box::new(output),
                color: 0,
            };
            Ok(Node::new(span, kind))
        } else {
            Ok(lhs)
        }
    }

    /// `(x: A) -> B` or `[x: A] -> B`, with the opening token already peeked.
    fn binder_fn_type(&mut self, close: &Token<'s>, color: u8) -> Result<Node> {
        let start = self.here().start;
        self.advance()?;
        let (binder, _) = self.ident()?;
        self.expect(&Token::Colon)?;
        let input = self.expr()?;
        self.expect(close)?;
        self.expect(&Token::Arrow)?;
        let output = self.expr()?;
        let span = start..output.span.end;
        let kind = NodeKind::FnType {
            binder: Some(binder),
            input: Box::new(input),
            output: Box::new(output),
            color,
        };
        Ok(Node::new(span, kind))
    }

    fn equiv(&mut self) -> Result<Node> {
        let lhs = self.postfix()?;
        if self.eat(&Token::Equiv) {
            let rhs = self.postfix()?;
            let span = lhs.span.start..rhs.span.end;
            Ok(Node::new(span, NodeKind::Equiv(Box::new(lhs), Box::new(rhs))))
        } else {
            Ok(lhs)
        }
    }

    fn postfix(&mut self) -> Result<Node> {
        let mut node = self.atom()?;
        loop {
            if self.eat(&Token::Dot) {
                let (name, span) = self.ident()?;
                let span = node.span.start..span.end;
                node = Node::new(span, NodeKind::Member(Box::new(node), name));
            } else if self.peek() == Some(&Token::LPar) {
                node = self.call_args(node, &Token::RPar, 0)?;
            } else if self.peek() == Some(&Token::LBrk) {
                node = self.call_args(node, &Token::RBrk, 1)?;
            } else {
                return Ok(node);
            }
        }
    }

    /// Comma-separated arguments currying into nested single-argument calls.
    fn call_args(&mut self, mut fun: Node, close: &Token<'s>, color: u8) -> Result<Node> {
        self.advance()?;
        loop {
            let arg = self.expr()?;
            let span = fun.span.start..arg.span.end;
            let kind = NodeKind::Call {
                fun: Box::new(fun),
                arg: Box::new(arg),
                color,
            };
            fun = Node::new(span, kind);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        let end = self.expect(close)?;
        fun.span.end = end.end;
        Ok(fun)
    }

    fn atom(&mut self) -> Result<Node> {
        let (tok, span) = self.advance()?;
        match tok {
            Token::Ident(s) => Ok(Node::new(span, NodeKind::Ident(s.to_string()))),
            Token::Number(n) => Ok(Node::new(span, NodeKind::Number(n))),
            Token::Str(s) => Ok(Node::new(span, NodeKind::Str(s))),
            Token::Question => {
                if let Some(Token::Ident(_)) = self.peek() {
                    let (name, end) = self.ident()?;
                    Ok(Node::new(span.start..end.end, NodeKind::Pattern(Some(name))))
                } else {
                    Ok(Node::new(span, NodeKind::Pattern(None)))
                }
            }
            Token::LPar => {
                let mut node = self.expr()?;
                let end = self.expect(&Token::RPar)?;
                node.span = span.start..end.end;
                Ok(node)
            }
            Token::Lambda => self.lambda(span, 0),
            Token::ErasedLambda => self.lambda(span, 1),
            found => Err(Error::UnexpectedToken(span, found.to_string())),
        }
    }

    /// Lambda body extends as far right as possible.
    fn lambda(&mut self, start: Span, color: u8) -> Result<Node> {
        let (arg, arg_ty) = if self.eat(&Token::LPar) {
            let (name, _) = self.ident()?;
            self.expect(&Token::Colon)?;
            let ty = self.expr()?;
            self.expect(&Token::RPar)?;
            (name, Some(Box::new(ty)))
        } else {
            (self.ident()?.0, None)
        };
        let body = self.expr()?;
        let span = start.start..body.span.end;
        let kind = NodeKind::Lambda {
            arg,
            arg_ty,
            body: Box::new(body),
            color,
        };
        Ok(Node::new(span, kind))
    }
}

/// Parse a single expression, expecting the input to be exhausted.
pub fn parse_expr(src: &str) -> Result<Node> {
    let mut toks = Tokens::new(crate::lex(src))?;
    let node = toks.expr()?;
    match toks.peek() {
        None => Ok(node),
        Some(tok) => Err(Error::UnexpectedToken(toks.here(), tok.to_string())),
    }
}

#[test]
fn positive() -> Result<()> {
    parse_expr(r"\T \x x")?;
    parse_expr("(T: Type(0)) -> T -> T")?;
    parse_expr("[T: Type(0)] -> [U: Type(0)] -> T -> U -> T")?;
    parse_expr("Level.max(0, 2)")?;
    parse_expr(r"(\(x: Level) Level.succ(x))(3)")?;
    parse_expr("f(?x)")?;
    parse_expr("v === w")?;
    parse_expr("f[T](x)")?;
    parse_expr("[number] -> number")?;
    Ok(())
}

#[test]
fn negative() {
    assert_eq!(parse_expr("->").unwrap_err(), Error::UnexpectedToken(0..2, "->".into()));
    assert!(matches!(parse_expr("(a").unwrap_err(), Error::UnexpectedEnd));
    assert!(matches!(parse_expr("a )").unwrap_err(), Error::UnexpectedToken(..)));
    assert!(matches!(parse_expr("if").unwrap_err(), Error::UnexpectedToken(..)));
    assert!(matches!(parse_expr("a + b").unwrap_err(), Error::UnexpectedToken(..)));
    assert!(matches!(parse_expr("\u{1f980}").unwrap_err(), Error::UnexpectedChar(..)));
}

#[test]
fn display_round_trip() -> Result<()> {
    for src in [
        r"\T \x x",
        "(T: Type(0)) -> T -> T",
        "[T: Type(0)] -> T -> T",
        "Level.max(0, 2)",
        "f(?x)",
        "v === w",
        r"\(x: Level) Level.succ(x)",
    ] {
        let node = parse_expr(src)?;
        let printed = node.to_string();
        let reparsed = parse_expr(&printed)?;
        assert_eq!(strip_spans(&node), strip_spans(&reparsed), "{}", printed);
    }
    Ok(())
}

#[cfg(test)]
fn strip_spans(node: &Node) -> Node {
    use crate::ast::NodeKind::*;
    let kind = match &node.kind {
        Member(lhs, name) => Member(Box::new(strip_spans(lhs)), name.clone()),
        Call { fun, arg, color } => Call {
            fun: Box::new(strip_spans(fun)),
            arg: Box::new(strip_spans(arg)),
            color: *color,
        },
        Lambda {
            arg,
            arg_ty,
            body,
            color,
        } => Lambda {
            arg: arg.clone(),
            arg_ty: arg_ty.as_ref().map(|ty| Box::new(strip_spans(ty))),
            body: Box::new(strip_spans(body)),
            color: *color,
        },
        FnType {
            binder,
            input,
            output,
            color,
        } => FnType {
            binder: binder.clone(),
            input: Box::new(strip_spans(input)),
            output: Box::new(strip_spans(output)),
            color: *color,
        },
        Equiv(lhs, rhs) => Equiv(Box::new(strip_spans(lhs)), Box::new(strip_spans(rhs))),
        kind => kind.clone(),
    };
    Node::new(0..0, kind)
}
