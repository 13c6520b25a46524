//! Type-shape grammar.
//!
//! Template shapes are recognized by name and recurse into their arguments,
//! pointers by trailing `*` sigils, glm vectors and matrices by a fixed
//! spelling table. Anything else is resolved against the enclosing scopes.
use crate::error::{CodegenError, Result, ShapeError};
use crate::ir::{BasicKind, EnumRef, NumericKind, Shape, StructId, StructRef, Unit};
use crate::lexer::{Tok, Token};

use super::Cursor;

/// Where a type expression appears: the struct whose nested declarations are
/// visible, and the member being declared (for diagnostics).
pub struct ShapeContext<'u> {
    pub unit: &'u Unit,
    pub scope: Option<StructId>,
    pub member: String,
}

impl ShapeContext<'_> {
    fn fail(&self, cur: &Cursor, offset: usize, reason: ShapeError) -> CodegenError {
        CodegenError::Shape { location: cur.location(offset), member: self.member.clone(), reason }
    }
}

enum Base {
    Ready(Shape),
    Named(Vec<String>),
}

pub fn parse_shape(cur: &mut Cursor, ctx: &ShapeContext) -> Result<Shape> {
    cur.eat_ident("const");
    let start = cur.offset();
    let base = parse_base(cur, ctx)?;
    let spelled_end = cur.prev_end();

    let mut depth = 0usize;
    while cur.eat(&Tok::Star) {
        depth += 1;
    }
    cur.eat_ident("const");
    while cur.eat(&Tok::Amp) {}

    if depth > 0 {
        if depth > 2 {
            return Err(ctx.fail(cur, start, ShapeError::PointerDepth(depth)));
        }
        return Ok(Shape::Pointer { pointee: cur.text(start..spelled_end), depth: depth as u8 });
    }

    match base {
        Base::Ready(shape) => Ok(shape),
        Base::Named(path) => resolve_named(cur, ctx, start, &path),
    }
}

fn parse_base(cur: &mut Cursor, ctx: &ShapeContext) -> Result<Base> {
    let path = parse_path(cur)?;
    let template = match path.as_slice() {
        [std, name] if std == "std" => Some(name.as_str()),
        [name] => Some(name.as_str()),
        _ => None,
    };
    let template = template.filter(|name| {
        matches!(*name, "optional" | "vector" | "array" | "map" | "variant" | "tuple")
    });
    let Some(template) = template else {
        return Ok(Base::Named(path));
    };
    if !cur.at(&Tok::Lt) {
        return Ok(Base::Named(path));
    }

    let open = cur.offset();
    cur.expect(&Tok::Lt)?;
    let shape = match template {
        "optional" => {
            let inner = parse_shape(cur, ctx)?;
            if inner.is_optional() {
                return Err(ctx.fail(cur, open, ShapeError::DoubleOptional));
            }
            Shape::Optional { inner: Box::new(inner) }
        }
        "vector" => Shape::Vector { inner: Box::new(parse_shape(cur, ctx)?) },
        "array" => {
            let inner = parse_shape(cur, ctx)?;
            cur.expect(&Tok::Comma)?;
            let size = parse_array_size(cur, ctx)?;
            Shape::Array { inner: Box::new(inner), size }
        }
        "map" => {
            let key_start = cur.offset();
            let key = parse_shape(cur, ctx)?;
            if key != Shape::basic(BasicKind::String) {
                return Err(ctx.fail(cur, key_start, ShapeError::MapKey(key.cpp_type())));
            }
            cur.expect(&Tok::Comma)?;
            Shape::Map { value: Box::new(parse_shape(cur, ctx)?) }
        }
        "variant" => {
            let alternatives = parse_shape_list(cur, ctx)?;
            if alternatives.len() < 2 {
                return Err(ctx.fail(cur, open, ShapeError::VariantArity));
            }
            for alternative in &alternatives {
                if matches!(alternative, Shape::Optional { .. } | Shape::Pointer { .. }) {
                    return Err(ctx.fail(
                        cur,
                        open,
                        ShapeError::VariantAlternative(alternative.cpp_type()),
                    ));
                }
            }
            Shape::Variant { alternatives }
        }
        "tuple" => {
            let elements = parse_shape_list(cur, ctx)?;
            if elements.is_empty() {
                return Err(ctx.fail(cur, open, ShapeError::TupleArity));
            }
            Shape::Tuple { elements }
        }
        _ => unreachable!("filtered above"),
    };
    cur.expect(&Tok::Gt)?;
    Ok(Base::Ready(shape))
}

/// Comma-separated shapes up to (not including) the closing `>`.
fn parse_shape_list(cur: &mut Cursor, ctx: &ShapeContext) -> Result<Vec<Shape>> {
    let mut shapes = Vec::new();
    if cur.at(&Tok::Gt) {
        return Ok(shapes);
    }
    loop {
        shapes.push(parse_shape(cur, ctx)?);
        if !cur.eat(&Tok::Comma) {
            break;
        }
    }
    Ok(shapes)
}

fn parse_array_size(cur: &mut Cursor, ctx: &ShapeContext) -> Result<usize> {
    let start = cur.offset();
    if let Some(Token { tok: Tok::Number(text), .. }) = cur.peek() {
        if let Ok(size) = text.trim_end_matches(['u', 'U', 'l', 'L']).parse::<usize>() {
            if size > 0 && cur.peek_at(1).is_some_and(|t| t.tok == Tok::Gt) {
                cur.bump();
                return Ok(size);
            }
        }
    }
    let span = cur.capture_expression(|t| matches!(t, Tok::Gt))?;
    Err(ctx.fail(cur, start, ShapeError::ArraySize(cur.text(span))))
}

/// `a::b::c`, with an optional leading `::`.
fn parse_path(cur: &mut Cursor) -> Result<Vec<String>> {
    cur.eat(&Tok::ColonColon);
    let mut path = vec![cur.expect_ident("a type")?.0];
    while cur.at(&Tok::ColonColon) {
        cur.bump();
        path.push(cur.expect_ident("a type name after `::`")?.0);
    }
    Ok(path)
}

fn resolve_named(cur: &Cursor, ctx: &ShapeContext, start: usize, path: &[String]) -> Result<Shape> {
    let joined = path.join("::");
    if let Some(kind) = basic_kind(&joined) {
        return Ok(Shape::basic(kind));
    }
    if let [glm, name] = path {
        if glm == "glm" {
            if let Some(shape) = glm_shape(name) {
                return Ok(shape);
            }
        }
    }
    match resolve_in_scope(ctx.unit, ctx.scope, path) {
        Some(Resolved::Enum(target)) => Ok(Shape::Enum { target }),
        Some(Resolved::Struct(id)) => {
            if is_self_or_ancestor(ctx.unit, ctx.scope, id) {
                return Err(ctx.fail(cur, start, ShapeError::SelfReference(joined)));
            }
            Ok(Shape::Struct { target: StructRef { id, qualified: ctx.unit.qualified_name(id) } })
        }
        None => Err(ctx.fail(cur, start, ShapeError::UnknownType(joined))),
    }
}

fn basic_kind(spelling: &str) -> Option<BasicKind> {
    Some(match spelling {
        "bool" => BasicKind::Bool,
        "int" => BasicKind::Int,
        "double" => BasicKind::Double,
        "float" => BasicKind::Float,
        "std::string" => BasicKind::String,
        "std::filesystem::path" => BasicKind::Path,
        "ghoul::Dictionary" => BasicKind::Dictionary,
        _ => return None,
    })
}

/// `vec3`, `dvec2`, `ivec4`, `mat3`, `dmat2x4`, ...
pub fn glm_shape(name: &str) -> Option<Shape> {
    fn dim(text: &str) -> Option<u8> {
        match text {
            "2" => Some(2),
            "3" => Some(3),
            "4" => Some(4),
            _ => None,
        }
    }

    for (prefix, element) in
        [("dvec", NumericKind::Double), ("ivec", NumericKind::Int), ("vec", NumericKind::Float)]
    {
        if let Some(rest) = name.strip_prefix(prefix) {
            return dim(rest).map(|dims| Shape::FixedVector { dims, element });
        }
    }
    for (prefix, element) in [("dmat", NumericKind::Double), ("mat", NumericKind::Float)] {
        if let Some(rest) = name.strip_prefix(prefix) {
            let (rows, cols) = match rest.split_once('x') {
                Some((r, c)) => (dim(r)?, dim(c)?),
                None => {
                    let n = dim(rest)?;
                    (n, n)
                }
            };
            return Some(Shape::FixedMatrix { rows, cols, element });
        }
    }
    None
}

enum Resolved {
    Enum(EnumRef),
    Struct(StructId),
}

/// Looks `path` up from `scope` outwards, then among top-level structs.
fn resolve_in_scope(unit: &Unit, scope: Option<StructId>, path: &[String]) -> Option<Resolved> {
    let (first, rest) = path.split_first()?;
    let mut cursor = scope;
    while let Some(id) = cursor {
        if let Some(found) = lookup_member(unit, id, first) {
            return descend(unit, found, rest);
        }
        let decl = unit.get(id);
        if &decl.name == first {
            return descend(unit, Resolved::Struct(id), rest);
        }
        cursor = decl.parent;
    }
    let root = unit.roots.iter().copied().find(|id| &unit.get(*id).name == first)?;
    descend(unit, Resolved::Struct(root), rest)
}

fn lookup_member(unit: &Unit, owner: StructId, name: &str) -> Option<Resolved> {
    let decl = unit.get(owner);
    if let Some(e) = decl.enums.iter().find(|e| e.name == name) {
        return Some(Resolved::Enum(EnumRef {
            qualified: format!("{}::{}", unit.qualified_name(owner), e.name),
            values: e.values.clone(),
        }));
    }
    decl.children
        .iter()
        .copied()
        .find(|child| unit.get(*child).name == name)
        .map(Resolved::Struct)
}

fn descend(unit: &Unit, found: Resolved, rest: &[String]) -> Option<Resolved> {
    match (found, rest.split_first()) {
        (found, None) => Some(found),
        (Resolved::Struct(id), Some((next, rest))) => descend(unit, lookup_member(unit, id, next)?, rest),
        (Resolved::Enum(_), Some(_)) => None,
    }
}

fn is_self_or_ancestor(unit: &Unit, scope: Option<StructId>, id: StructId) -> bool {
    let mut cursor = scope;
    while let Some(current) = cursor {
        if current == id {
            return true;
        }
        cursor = unit.get(current).parent;
    }
    false
}
