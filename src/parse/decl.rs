//! Declaration grammar: annotated structs with their nested structs and enums,
//! and `luawrap` functions. Everything else in the file is skipped.
use crate::error::{CodegenError, Result};
use crate::ir::{EnumDecl, EnumValue, Function, StructDecl, StructId, Unit, Variable};
use crate::lexer::{Tok, Token};
use crate::source::SourceFile;

use super::attr::{member_attributes, parse_attribute_groups, RawAttribute};
use super::shape::{parse_shape, ShapeContext};
use super::{unquote, Cursor};

pub fn parse_unit(source: &SourceFile, tokens: &[Token]) -> Result<Unit> {
    let mut unit = Unit { file: source.name.clone(), ..Unit::default() };
    let mut cur = Cursor::new(source, tokens);

    while !cur.is_eof() {
        if cur.at_ident("struct") && cur.peek_at(1).is_some_and(|t| t.tok == Tok::AttrOpen) {
            let doc = cur.doc();
            let start = cur.offset();
            cur.bump();
            let attrs = parse_attribute_groups(&mut cur)?;
            if let Some(marker) = attrs.iter().find(|a| a.name == "Dictionary") {
                let binding = dictionary_binding(&cur, marker)?;
                let exhaustive = struct_flags(&cur, &attrs)?;
                let id = parse_struct(&mut cur, &mut unit, None, Some(binding), exhaustive, doc, start)?;
                tracing::debug!(name = %unit.get(id).name, "parsed dictionary struct");
            }
        } else if cur.at(&Tok::AttrOpen) {
            let doc = cur.doc();
            let start = cur.offset();
            let attrs = parse_attribute_groups(&mut cur)?;
            if let Some(marker) = attrs.iter().find(|a| a.name == "luawrap") {
                let function = parse_function(&mut cur, &unit, marker, doc, start)?;
                tracing::debug!(name = %function.name, "parsed exported function");
                unit.functions.push(function);
            }
        } else {
            cur.bump();
        }
    }
    Ok(unit)
}

fn dictionary_binding(cur: &Cursor, marker: &RawAttribute) -> Result<String> {
    match marker.args.as_slice() {
        [name] if !name.is_empty() => Ok(unquote(name).unwrap_or_else(|| name.clone())),
        _ => Err(CodegenError::AttributeArity {
            location: cur.location(marker.span.start),
            attribute: "Dictionary".into(),
            expected: "exactly one argument".into(),
        }),
    }
}

/// Validates struct-level attributes; returns the `exhaustive` flag.
fn struct_flags(cur: &Cursor, attrs: &[RawAttribute]) -> Result<bool> {
    let mut exhaustive = true;
    for attr in attrs {
        match attr.name.as_str() {
            "Dictionary" => {}
            "noexhaustive" => exhaustive = false,
            other => {
                return Err(CodegenError::UnknownAttribute {
                    location: cur.location(attr.span.start),
                    name: other.to_string(),
                });
            }
        }
    }
    Ok(exhaustive)
}

/// Parses `Name { body };` with the cursor on the name. The struct is entered
/// into the arena before its body so nested declarations can point back to it.
fn parse_struct(
    cur: &mut Cursor,
    unit: &mut Unit,
    parent: Option<StructId>,
    binding: Option<String>,
    exhaustive: bool,
    documentation: String,
    start: usize,
) -> Result<StructId> {
    let (name, name_span) = cur.expect_ident("a struct name")?;
    let id = StructId(unit.structs.len());
    unit.structs.push(StructDecl {
        name,
        binding,
        documentation,
        parent,
        children: Vec::new(),
        enums: Vec::new(),
        variables: Vec::new(),
        exhaustive,
        symbol: String::new(),
        span: start..name_span.end,
    });
    match parent {
        Some(parent) => unit.structs[parent.0].children.push(id),
        None => unit.roots.push(id),
    }

    cur.eat_ident("final");
    cur.expect(&Tok::LBrace)?;
    loop {
        if cur.eat(&Tok::RBrace) {
            break;
        }
        if cur.is_eof() {
            return Err(cur.error("`}` closing the struct"));
        }
        let doc = cur.doc();
        let start = cur.offset();
        if cur.eat_ident("struct") {
            let attrs = parse_attribute_groups(cur)?;
            let exhaustive = struct_flags(cur, &attrs)?;
            parse_struct(cur, unit, Some(id), None, exhaustive, doc, start)?;
        } else if cur.eat_ident("enum") {
            let decl = parse_enum(cur, start)?;
            unit.structs[id.0].enums.push(decl);
        } else if cur.at_ident("using") || cur.at_ident("static") || cur.at_ident("friend") {
            cur.capture_expression(|t| matches!(t, Tok::Semi))?;
            cur.expect(&Tok::Semi)?;
        } else {
            let variable = parse_member(cur, unit, id, doc, start)?;
            unit.structs[id.0].variables.push(variable);
        }
    }
    cur.expect(&Tok::Semi)?;
    Ok(id)
}

fn parse_member(
    cur: &mut Cursor,
    unit: &Unit,
    scope: StructId,
    documentation: String,
    start: usize,
) -> Result<Variable> {
    let mut raw = parse_attribute_groups(cur)?;
    let member = cur.declared_name(|t| matches!(t, Tok::Semi | Tok::Eq | Tok::AttrOpen | Tok::LBrace));
    let ctx = ShapeContext { unit, scope: Some(scope), member };
    let shape = parse_shape(cur, &ctx)?;
    let (name, name_span) = cur.expect_ident("a member name")?;
    raw.extend(parse_attribute_groups(cur)?);

    // default member initializers are irrelevant to decoding
    if cur.eat(&Tok::Eq) {
        cur.capture_expression(|t| matches!(t, Tok::Semi))?;
    } else if cur.at(&Tok::LBrace) {
        cur.skip_balanced(&Tok::LBrace, &Tok::RBrace)?;
    }
    cur.expect(&Tok::Semi)?;

    let attributes = member_attributes(cur.source(), &name, &raw)?;
    Ok(Variable {
        name,
        key: String::new(),
        shape,
        documentation,
        attributes,
        default: None,
        span: start..name_span.end,
    })
}

/// `enum (class)? Name (: type)? { A, B [[codegen::key("b")]] = 2, };`
/// with the cursor just past `enum`.
fn parse_enum(cur: &mut Cursor, start: usize) -> Result<EnumDecl> {
    if !cur.eat_ident("class") {
        cur.eat_ident("struct");
    }
    let attrs = parse_attribute_groups(cur)?;
    if let Some(attr) = attrs.first() {
        return Err(CodegenError::UnknownAttribute {
            location: cur.location(attr.span.start),
            name: attr.name.clone(),
        });
    }
    let (name, name_span) = cur.expect_ident("an enum name")?;
    if cur.eat(&Tok::Colon) {
        cur.capture_expression(|t| matches!(t, Tok::LBrace))?;
    }

    cur.expect(&Tok::LBrace)?;
    let mut values = Vec::new();
    while !cur.eat(&Tok::RBrace) {
        let (value, _) = cur.expect_ident("an enumerator")?;
        let mut key = value.clone();
        for attr in parse_attribute_groups(cur)? {
            match (attr.name.as_str(), attr.args.as_slice()) {
                ("key", [literal]) if unquote(literal).is_some() => {
                    key = unquote(literal).unwrap_or_default();
                }
                ("key", _) => {
                    return Err(CodegenError::AttributeArity {
                        location: cur.location(attr.span.start),
                        attribute: "key".into(),
                        expected: "a string literal".into(),
                    });
                }
                (other, _) => {
                    return Err(CodegenError::UnknownAttribute {
                        location: cur.location(attr.span.start),
                        name: other.to_string(),
                    });
                }
            }
        }
        if cur.eat(&Tok::Eq) {
            cur.capture_expression(|t| matches!(t, Tok::Comma | Tok::RBrace))?;
        }
        values.push(EnumValue { name: value, key });
        if !cur.eat(&Tok::Comma) {
            cur.expect(&Tok::RBrace)?;
            break;
        }
    }
    cur.expect(&Tok::Semi)?;
    Ok(EnumDecl { name, values, span: start..name_span.end })
}

/// Parses the declaration following a `luawrap` marker.
fn parse_function(
    cur: &mut Cursor,
    unit: &Unit,
    marker: &RawAttribute,
    documentation: String,
    start: usize,
) -> Result<Function> {
    let lua_override = match marker.args.as_slice() {
        [] => None,
        [literal] => Some(unquote(literal).ok_or_else(|| CodegenError::AttributeArity {
            location: cur.location(marker.span.start),
            attribute: "luawrap".into(),
            expected: "a string literal".into(),
        })?),
        _ => {
            return Err(CodegenError::AttributeArity {
                location: cur.location(marker.span.start),
                attribute: "luawrap".into(),
                expected: "at most one argument".into(),
            });
        }
    };

    loop {
        if cur.eat_ident("static") || cur.eat_ident("inline") || cur.eat_ident("constexpr") {
            continue;
        }
        if cur.at(&Tok::AttrOpen) {
            parse_attribute_groups(cur)?;
            continue;
        }
        break;
    }

    let name_hint = cur.declared_name(|t| matches!(t, Tok::LParen));
    let return_shape = if cur.at_ident("void") && !cur.peek_at(1).is_some_and(|t| t.tok == Tok::Star) {
        cur.bump();
        None
    } else {
        let ctx = ShapeContext { unit, scope: None, member: name_hint };
        Some(parse_shape(cur, &ctx)?)
    };
    let (name, name_span) = cur.expect_ident("a function name")?;

    cur.expect(&Tok::LParen)?;
    let mut arguments = Vec::new();
    if cur.at_ident("void") && cur.peek_at(1).is_some_and(|t| t.tok == Tok::RParen) {
        cur.bump();
    }
    if !cur.eat(&Tok::RParen) {
        loop {
            arguments.push(parse_argument(cur, unit)?);
            if !cur.eat(&Tok::Comma) {
                cur.expect(&Tok::RParen)?;
                break;
            }
        }
    }

    cur.eat_ident("noexcept");
    if cur.at(&Tok::LBrace) {
        cur.skip_balanced(&Tok::LBrace, &Tok::RBrace)?;
    } else {
        cur.expect(&Tok::Semi)?;
    }

    Ok(Function {
        lua_name: lua_override.unwrap_or_else(|| name.clone()),
        name,
        documentation,
        arguments,
        return_shape,
        span: start..name_span.end,
    })
}

fn parse_argument(cur: &mut Cursor, unit: &Unit) -> Result<Variable> {
    let start = cur.offset();
    let member = cur.declared_name(|t| matches!(t, Tok::Comma | Tok::RParen | Tok::Eq));
    let ctx = ShapeContext { unit, scope: None, member };
    let shape = parse_shape(cur, &ctx)?;
    let (name, name_span) = cur.expect_ident("a parameter name")?;
    let default = if cur.eat(&Tok::Eq) {
        let span = cur.capture_expression(|t| matches!(t, Tok::Comma | Tok::RParen))?;
        Some(cur.text(span))
    } else {
        None
    };
    Ok(Variable {
        key: name.clone(),
        name,
        shape,
        documentation: String::new(),
        attributes: Default::default(),
        default,
        span: start..name_span.end,
    })
}
