//! Tokens for the lumo surface language.

use crate::ast::Span;
use core::fmt::{self, Display};
use logos::Logos;

#[derive(Logos, Clone, Debug, PartialEq)]
pub enum Token<'s> {
    #[token("module", priority = 3)]
    Module,

    #[token("variable", priority = 3)]
    Variable,

    /// Keywords of the full language that the declaration subset rejects.
    #[regex(
        "if|else|while|struct|enum|inductive|return|break|continue|defer|var|let|pub|priv|inline",
        |lex| lex.slice(),
        priority = 3
    )]
    Reserved(&'s str),

    #[token("->")]
    Arrow,

    #[token(r"\\")]
    ErasedLambda,

    #[token(r"\")]
    Lambda,

    #[token("===")]
    Equiv,

    #[token("==")]
    EqEq,

    #[token("=")]
    Eq,

    #[token("?")]
    Question,

    #[token(":")]
    Colon,

    #[token(".")]
    Dot,

    #[token(",")]
    Comma,

    #[token(";")]
    Semi,

    #[token("(")]
    LPar,

    #[token(")")]
    RPar,

    #[token("[")]
    LBrk,

    #[token("]")]
    RBrk,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[regex("[A-Za-z_][A-Za-z0-9_']*", |lex| lex.slice())]
    Ident(&'s str),

    #[regex("[0-9]+", |lex| lex.slice().parse().ok())]
    Number(i64),

    #[regex(r#""([^"\\]|\\.)*""#, unescape)]
    Str(String),

    /// Operator characters that are lexed but given no meaning
    /// by the declaration subset.
    #[regex("[><|~!&@^%+*/-]", |lex| lex.slice())]
    Op(&'s str),

    #[error]
    #[regex(r"[ \t\r\n]+", logos::skip)]
    #[regex("//[^\n]*", logos::skip)]
    Error,
}

fn unescape<'s>(lex: &mut logos::Lexer<'s, Token<'s>>) -> Option<String> {
    let s = lex.slice();
    let inner = &s[1..s.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next()? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                c => out.push(c),
            }
        } else {
            out.push(c)
        }
    }
    Some(out)
}

impl<'s> Display for Token<'s> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Module => "module".fmt(f),
            Self::Variable => "variable".fmt(f),
            Self::Reserved(s) => s.fmt(f),
            Self::Arrow => "->".fmt(f),
            Self::ErasedLambda => r"\\".fmt(f),
            Self::Lambda => r"\".fmt(f),
            Self::Equiv => "===".fmt(f),
            Self::EqEq => "==".fmt(f),
            Self::Eq => "=".fmt(f),
            Self::Question => "?".fmt(f),
            Self::Colon => ":".fmt(f),
            Self::Dot => ".".fmt(f),
            Self::Comma => ",".fmt(f),
            Self::Semi => ";".fmt(f),
            Self::LPar => "(".fmt(f),
            Self::RPar => ")".fmt(f),
            Self::LBrk => "[".fmt(f),
            Self::RBrk => "]".fmt(f),
            Self::LBrace => "{".fmt(f),
            Self::RBrace => "}".fmt(f),
            Self::Ident(s) => s.fmt(f),
            Self::Number(n) => n.fmt(f),
            Self::Str(s) => write!(f, "{:?}", s),
            Self::Op(s) => s.fmt(f),
            Self::Error => "<error>".fmt(f),
        }
    }
}

/// Tokenize a whole source file, keeping the span of every token.
pub fn lex(src: &str) -> Vec<(Token, Span)> {
    let mut lexer = Token::lexer(src);
    let mut toks = Vec::new();
    while let Some(tok) = lexer.next() {
        toks.push((tok, lexer.span()))
    }
    toks
}

#[test]
fn tokens() {
    let toks: Vec<_> = lex(r"id: (T: Type(0)) -> T -> T = \T \x x")
        .into_iter()
        .map(|(tok, _)| tok)
        .collect();
    use Token::*;
    assert_eq!(
        toks,
        vec![
            Ident("id"),
            Colon,
            LPar,
            Ident("T"),
            Colon,
            Ident("Type"),
            LPar,
            Number(0),
            RPar,
            RPar,
            Arrow,
            Ident("T"),
            Arrow,
            Ident("T"),
            Eq,
            Lambda,
            Ident("T"),
            Lambda,
            Ident("x"),
            Ident("x"),
        ]
    );
}

#[test]
fn operators() {
    use Token::*;
    let toks: Vec<_> = lex("a === b == c = d ? e").into_iter().map(|(t, _)| t).collect();
    assert_eq!(
        toks,
        vec![
            Ident("a"),
            Equiv,
            Ident("b"),
            EqEq,
            Ident("c"),
            Eq,
            Ident("d"),
            Question,
            Ident("e"),
        ]
    );
}

#[test]
fn comments_and_strings() {
    use Token::*;
    let toks: Vec<_> = lex("s = \"a\\nb\" // trailing\nt")
        .into_iter()
        .map(|(t, _)| t)
        .collect();
    assert_eq!(toks, vec![Ident("s"), Eq, Str("a\nb".into()), Ident("t")]);
}
