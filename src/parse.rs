//! Recursive-descent front end over the token stream.
//!
//! `shape` parses type expressions, `attr` parses `[[codegen::...]]` lists and
//! `decl` drives the whole file: annotated structs (with nested structs and
//! enums) and exported functions, in declaration order.
pub mod attr;
pub mod decl;
pub mod shape;

use std::ops::Range;

use crate::error::{CodegenError, Result};
use crate::ir::Unit;
use crate::lexer::{Tok, Token};
use crate::source::{Location, SourceFile};

pub use decl::parse_unit;

/// Parses a whole file into a `Unit`.
pub fn parse(source: &SourceFile, tokens: &[Token]) -> Result<Unit> {
    parse_unit(source, tokens)
}

pub struct Cursor<'a> {
    source: &'a SourceFile,
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(source: &'a SourceFile, tokens: &'a [Token]) -> Self {
        Self { source, tokens, pos: 0 }
    }

    pub fn source(&self) -> &'a SourceFile {
        self.source
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    pub fn peek_at(&self, n: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + n)
    }

    pub fn at(&self, tok: &Tok) -> bool {
        self.peek().is_some_and(|t| &t.tok == tok)
    }

    pub fn at_ident(&self, name: &str) -> bool {
        matches!(self.peek(), Some(Token { tok: Tok::Ident(s), .. }) if s == name)
    }

    pub fn bump(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    pub fn eat(&mut self, tok: &Tok) -> bool {
        if self.at(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn eat_ident(&mut self, name: &str) -> bool {
        if self.at_ident(name) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, tok: &Tok) -> Result<&'a Token> {
        if self.at(tok) {
            let tokens = self.tokens;
            Ok(&tokens[self.advance()])
        } else {
            Err(self.error(format!("`{}`", tok.describe())))
        }
    }

    pub fn expect_ident(&mut self, what: &str) -> Result<(String, Range<usize>)> {
        match self.peek() {
            Some(Token { tok: Tok::Ident(name), span, .. }) => {
                self.pos += 1;
                Ok((name.clone(), span.clone()))
            }
            _ => Err(self.error(what)),
        }
    }

    fn advance(&mut self) -> usize {
        self.pos += 1;
        self.pos - 1
    }

    /// Byte offset of the current token, or the end of the text.
    pub fn offset(&self) -> usize {
        self.peek().map(|t| t.span.start).unwrap_or(self.source.text.len())
    }

    /// End offset of the most recently consumed token.
    pub fn prev_end(&self) -> usize {
        if self.pos == 0 {
            0
        } else {
            self.tokens[self.pos - 1].span.end
        }
    }

    pub fn location(&self, offset: usize) -> Location {
        self.source.location(offset)
    }

    pub fn here(&self) -> Location {
        self.location(self.offset())
    }

    /// Documentation attached to the current token.
    pub fn doc(&self) -> String {
        self.peek().map(|t| t.doc.clone()).unwrap_or_default()
    }

    /// Source text of the tokens inside `span`. Token text, string and char
    /// literals included, is copied verbatim; any gap between two tokens
    /// becomes a single space.
    pub fn text(&self, span: Range<usize>) -> String {
        let mut out = String::new();
        let mut prev_end: Option<usize> = None;
        for token in self.tokens.iter().filter(|t| t.span.start >= span.start && t.span.end <= span.end) {
            if prev_end.is_some_and(|end| end < token.span.start) {
                out.push(' ');
            }
            out.push_str(self.source.slice(token.span.clone()));
            prev_end = Some(token.span.end);
        }
        out
    }

    pub fn error(&self, expected: impl Into<String>) -> CodegenError {
        let found = self
            .peek()
            .map(|t| t.tok.describe())
            .unwrap_or_else(|| "end of file".to_string());
        CodegenError::Parse { location: self.here(), expected: expected.into(), found }
    }

    /// Name being declared by the upcoming declaration: the last identifier before
    /// the first `stop` token outside template and attribute brackets. Used only
    /// for diagnostics, so an empty string is an acceptable answer.
    pub fn declared_name(&self, stop: impl Fn(&Tok) -> bool) -> String {
        let mut depth = 0usize;
        let mut last = String::new();
        let mut n = 0;
        while let Some(token) = self.peek_at(n) {
            if depth == 0 && stop(&token.tok) {
                break;
            }
            match &token.tok {
                Tok::Lt | Tok::AttrOpen => depth += 1,
                Tok::Gt | Tok::AttrClose => depth = depth.saturating_sub(1),
                Tok::Ident(name) if depth == 0 => last = name.clone(),
                Tok::Semi | Tok::LBrace | Tok::RBrace => break,
                _ => {}
            }
            n += 1;
        }
        last
    }

    /// Consumes a bracketed group starting at `open`, including the matching `close`.
    pub fn skip_balanced(&mut self, open: &Tok, close: &Tok) -> Result<()> {
        self.expect(open)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.bump() {
                Some(t) if &t.tok == open => depth += 1,
                Some(t) if &t.tok == close => depth -= 1,
                Some(_) => {}
                None => return Err(self.error(format!("`{}`", close.describe()))),
            }
        }
        Ok(())
    }

    /// Captures an expression up to (not including) a top-level token for which
    /// `stop` holds. `<` opens a template argument list only right after a name;
    /// every other `<` or `>` is an operator.
    pub fn capture_expression(&mut self, stop: impl Fn(&Tok) -> bool) -> Result<Range<usize>> {
        let start = self.offset();
        let first = self.pos;
        let mut open: Vec<Tok> = Vec::new();
        loop {
            let Some(token) = self.peek() else {
                return Err(self.error("end of expression"));
            };
            let ends_angles =
                matches!(token.tok, Tok::Semi | Tok::RParen | Tok::RBrace | Tok::RBracket | Tok::AttrClose);
            if ends_angles && open.iter().all(|t| *t == Tok::Lt) {
                // a `<` still open here was a comparison
                open.clear();
            }
            if open.is_empty() && stop(&token.tok) {
                break;
            }
            match &token.tok {
                Tok::LParen | Tok::LBrace | Tok::LBracket | Tok::AttrOpen => open.push(token.tok.clone()),
                Tok::Lt if self.pos > first && matches!(self.tokens[self.pos - 1].tok, Tok::Ident(_)) => {
                    open.push(Tok::Lt);
                }
                Tok::Gt if open.last() == Some(&Tok::Lt) => {
                    open.pop();
                }
                Tok::RParen | Tok::RBrace | Tok::RBracket | Tok::AttrClose => {
                    while open.last() == Some(&Tok::Lt) {
                        open.pop();
                    }
                    if open.pop().is_none() {
                        return Err(self.error("balanced expression"));
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        let end = self.prev_end().max(start);
        if end == start {
            return Err(self.error("expression"));
        }
        Ok(start..end)
    }
}

/// Removes the quotes of a string literal token and decodes its escape
/// sequences; `None` if it is not one.
pub fn unquote(literal: &str) -> Option<String> {
    let inner = literal.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escape) = chars.next() else {
            out.push('\\');
            break;
        };
        match escape {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\u{7}'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            'x' => {
                let mut digits = String::new();
                while let Some(d) = chars.next_if(|d| d.is_ascii_hexdigit()) {
                    digits.push(d);
                }
                match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\x");
                        out.push_str(&digits);
                    }
                }
            }
            '0'..='7' => {
                let mut value = escape.to_digit(8).unwrap_or_default();
                for _ in 0..2 {
                    match chars.next_if(|d| d.is_digit(8)) {
                        Some(d) => value = value * 8 + d.to_digit(8).unwrap_or_default(),
                        None => break,
                    }
                }
                out.extend(char::from_u32(value));
            }
            '\\' | '"' | '\'' | '?' => out.push(escape),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    #[test]
    fn capture_stops_at_top_level_comma_only() {
        let file = SourceFile::new("t.cpp", "std::map<std::string, int>{ 1, 2 }, next");
        let tokens = tokenize(&file).unwrap();
        let mut cur = Cursor::new(&file, &tokens);
        let span = cur.capture_expression(|t| matches!(t, Tok::Comma)).unwrap();
        assert_eq!(cur.text(span), "std::map<std::string, int>{ 1, 2 }");
        assert!(cur.at(&Tok::Comma));
    }

    fn capture(text: &str, stop: impl Fn(&Tok) -> bool) -> Result<String> {
        let file = SourceFile::new("t.cpp", text);
        let tokens = tokenize(&file)?;
        let mut cur = Cursor::new(&file, &tokens);
        let span = cur.capture_expression(stop)?;
        Ok(cur.text(span))
    }

    #[test]
    fn captured_text_keeps_literals_verbatim() {
        let text = capture(r#"f( "a  b,c" ,   'x' ), next"#, |t| matches!(t, Tok::Comma)).unwrap();
        assert_eq!(text, r#"f( "a  b,c" , 'x' )"#);
    }

    #[test]
    fn shifts_and_comparisons_are_operators() {
        let to_comma = |t: &Tok| matches!(t, Tok::Comma);
        let to_semi = |t: &Tok| matches!(t, Tok::Semi);
        assert_eq!(capture("(1 << 2), next", to_comma).unwrap(), "(1 << 2)");
        assert_eq!(capture("1 << 4)", |t| matches!(t, Tok::RParen)).unwrap(), "1 << 4");
        assert_eq!(capture("2 > 1; int x;", to_semi).unwrap(), "2 > 1");
        assert_eq!(capture("a < b; int x;", to_semi).unwrap(), "a < b");
        assert_eq!(capture("(a < b), next", to_comma).unwrap(), "(a < b)");
        assert_eq!(
            capture("std::array<int, 2>{ 1, 2 }, next", to_comma).unwrap(),
            "std::array<int, 2>{ 1, 2 }"
        );
        assert!(capture("1 ), x", to_comma).is_err());
    }

    #[test]
    fn unquote_handles_escapes() {
        assert_eq!(unquote(r#""a\"b""#).as_deref(), Some("a\"b"));
        assert_eq!(unquote(r#""\x41\101\\\q""#).as_deref(), Some("AA\\\\q"));
        assert_eq!(unquote(r#""Two  Spaces""#).as_deref(), Some("Two  Spaces"));
        assert_eq!(unquote("abc"), None);
    }
}
