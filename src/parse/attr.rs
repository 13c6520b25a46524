//! `[[codegen::name(args...)]]` lists and the member attribute vocabulary.
use std::ops::Range;

use crate::error::{CodegenError, Result};
use crate::ir::AttributeBag;
use crate::lexer::Tok;
use crate::source::SourceFile;

use super::{unquote, Cursor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute {
    pub name: String,
    /// Argument expressions as source text; literals are kept verbatim.
    pub args: Vec<String>,
    pub span: Range<usize>,
}

/// Parses every consecutive `[[...]]` group at the cursor. Attributes outside
/// the `codegen` namespace (`maybe_unused`, ...) are dropped.
pub fn parse_attribute_groups(cur: &mut Cursor) -> Result<Vec<RawAttribute>> {
    let mut out = Vec::new();
    while cur.eat(&Tok::AttrOpen) {
        if !cur.at(&Tok::AttrClose) {
            loop {
                let start = cur.offset();
                let mut path = vec![cur.expect_ident("an attribute name")?.0];
                while cur.eat(&Tok::ColonColon) {
                    path.push(cur.expect_ident("an attribute name")?.0);
                }
                let args = if cur.at(&Tok::LParen) { parse_arguments(cur)? } else { Vec::new() };
                if let [ns, name] = path.as_slice() {
                    if ns == "codegen" {
                        out.push(RawAttribute { name: name.clone(), args, span: start..cur.prev_end() });
                    }
                }
                if !cur.eat(&Tok::Comma) {
                    break;
                }
            }
        }
        cur.expect(&Tok::AttrClose)?;
    }
    Ok(out)
}

fn parse_arguments(cur: &mut Cursor) -> Result<Vec<String>> {
    cur.expect(&Tok::LParen)?;
    let mut args = Vec::new();
    if cur.eat(&Tok::RParen) {
        return Ok(args);
    }
    loop {
        let span = cur.capture_expression(|t| matches!(t, Tok::Comma | Tok::RParen))?;
        args.push(cur.text(span));
        if !cur.eat(&Tok::Comma) {
            break;
        }
    }
    cur.expect(&Tok::RParen)?;
    Ok(args)
}

/// Folds raw attributes into an `AttributeBag` for the member `member`.
pub fn member_attributes(
    source: &SourceFile,
    member: &str,
    attributes: &[RawAttribute],
) -> Result<AttributeBag> {
    let mut bag = AttributeBag::default();
    let mut seen: Vec<&str> = Vec::new();

    for attr in attributes {
        let location = || source.location(attr.span.start);
        if seen.contains(&attr.name.as_str()) {
            return Err(CodegenError::DuplicateAttribute {
                location: location(),
                member: member.to_string(),
                attribute: attr.name.clone(),
            });
        }
        seen.push(attr.name.as_str());

        let arity = |expected: &str| CodegenError::AttributeArity {
            location: location(),
            attribute: attr.name.clone(),
            expected: expected.to_string(),
        };
        let single = || match attr.args.as_slice() {
            [one] => Ok(one.clone()),
            _ => Err(arity("exactly one argument")),
        };
        let pair = || match attr.args.as_slice() {
            [a, b] => Ok((a.clone(), b.clone())),
            _ => Err(arity("exactly two arguments")),
        };
        let list = || {
            if attr.args.is_empty() { Err(arity("at least one argument")) } else { Ok(attr.args.clone()) }
        };
        let string = || {
            let arg = single()?;
            unquote(&arg).ok_or_else(|| arity("a string literal"))
        };
        let flag = || {
            if attr.args.is_empty() { Ok(true) } else { Err(arity("no arguments")) }
        };

        match attr.name.as_str() {
            "inrange" => bag.in_range = Some(pair()?),
            "notinrange" => bag.not_in_range = Some(pair()?),
            "less" => bag.less = Some(single()?),
            "lessequal" => bag.less_equal = Some(single()?),
            "greater" => bag.greater = Some(single()?),
            "greaterequal" => bag.greater_equal = Some(single()?),
            "unequal" => bag.unequal = Some(single()?),
            "inlist" => bag.in_list = Some(list()?),
            "notinlist" => bag.not_in_list = Some(list()?),
            "reference" => bag.reference = Some(string()?),
            "annotation" => bag.annotation = Some(string()?),
            "key" => bag.key = Some(string()?),
            "color" => bag.is_color = flag()?,
            "directory" => bag.is_directory = flag()?,
            "datetime" => bag.is_date_time = flag()?,
            "identifier" => bag.is_identifier = flag()?,
            "mustbenotempty" => bag.must_be_not_empty = flag()?,
            "private" => bag.is_private = flag()?,
            _ => {
                return Err(CodegenError::UnknownAttribute { location: location(), name: attr.name.clone() });
            }
        }
    }
    Ok(bag)
}
