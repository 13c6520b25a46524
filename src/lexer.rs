//! Tokenizer for the declaration subset.
//!
//! Comments never reach the parser: they are folded into the `doc` field of the
//! next real token. Preprocessor lines are skipped. Attribute brackets `[[` and
//! `]]` are their own tokens so the parser can treat annotations structurally.
use std::ops::Range;

use logos::Logos;

use crate::error::{CodegenError, Result};
use crate::source::SourceFile;

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip(r"#[^\n]*", allow_greedy = true))]
pub enum Tok {
    #[regex(r"//[^\n]*", callback = |lex| line_comment(lex.slice()), allow_greedy = true)]
    LineComment(String),
    #[regex(r"/\*([^*]|\*+[^*/])*\*+/", |lex| block_comment(lex.slice()))]
    BlockComment(String),

    #[token("[[")]
    AttrOpen,
    #[token("]]")]
    AttrClose,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    // `>>` is never produced so nested template arguments close one at a time
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token("::")]
    ColonColon,
    #[token(":")]
    Colon,
    #[token("*")]
    Star,
    #[token("&")]
    Amp,
    #[token("=")]
    Eq,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
    #[regex(r"[0-9][0-9A-Za-z_.']*", |lex| lex.slice().to_string())]
    #[regex(r"\.[0-9][0-9A-Za-z_']*", |lex| lex.slice().to_string())]
    Number(String),
    /// Kept with its quotes.
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| lex.slice().to_string())]
    Str(String),
    #[regex(r"'([^'\\\n]|\\.)*'", |lex| lex.slice().to_string())]
    Char(String),
    #[regex(r"[-+/%!~^|?.@$\\]", |lex| lex.slice().chars().next())]
    Punct(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub tok: Tok,
    pub span: Range<usize>,
    /// Comments immediately preceding this token, joined with spaces.
    pub doc: String,
}

impl Tok {
    /// Short human-readable form for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Tok::LineComment(_) | Tok::BlockComment(_) => "comment".into(),
            Tok::AttrOpen => "[[".into(),
            Tok::AttrClose => "]]".into(),
            Tok::LBracket => "[".into(),
            Tok::RBracket => "]".into(),
            Tok::LParen => "(".into(),
            Tok::RParen => ")".into(),
            Tok::LBrace => "{".into(),
            Tok::RBrace => "}".into(),
            Tok::Lt => "<".into(),
            Tok::Gt => ">".into(),
            Tok::Comma => ",".into(),
            Tok::Semi => ";".into(),
            Tok::ColonColon => "::".into(),
            Tok::Colon => ":".into(),
            Tok::Star => "*".into(),
            Tok::Amp => "&".into(),
            Tok::Eq => "=".into(),
            Tok::Ident(s) | Tok::Number(s) | Tok::Str(s) | Tok::Char(s) => s.clone(),
            Tok::Punct(c) => c.to_string(),
        }
    }
}

pub fn tokenize(source: &SourceFile) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut pending_doc: Vec<String> = Vec::new();
    let mut lexer = Tok::lexer(&source.text);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(Tok::LineComment(text)) | Ok(Tok::BlockComment(text)) => {
                if !text.is_empty() {
                    pending_doc.push(text);
                }
            }
            Ok(tok) => {
                let doc = pending_doc.join(" ");
                pending_doc.clear();
                tokens.push(Token { tok, span, doc });
            }
            Err(()) => {
                return Err(CodegenError::Lex {
                    location: source.location(span.start),
                    text: source.slice(span).to_string(),
                });
            }
        }
    }
    tracing::trace!(file = %source.name, count = tokens.len(), "tokenized");
    Ok(tokens)
}

fn line_comment(raw: &str) -> String {
    raw.trim_start_matches('/').trim_start_matches('!').trim().to_string()
}

fn block_comment(raw: &str) -> String {
    let body = raw
        .strip_prefix("/*")
        .and_then(|s| s.strip_suffix("*/"))
        .unwrap_or(raw);
    body.lines()
        .map(|line| line.trim().trim_start_matches('*').trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
