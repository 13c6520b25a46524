//! Attribute legality per element shape, and literal normalization.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CodegenError, Result, ShapeError};
use crate::ir::{AttributeBag, BasicKind, NumericKind, Shape, Variable};
use crate::source::SourceFile;

static COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*,\s*").unwrap());
static OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"([(\[{])\s+").unwrap());
static CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([)\]}])").unwrap());

/// Validates the attributes of a dictionary member against its element shape
/// and rewrites comparison literals into their canonical form.
pub fn resolve_variable(source: &SourceFile, variable: &mut Variable) -> Result<()> {
    let location = || source.location(variable.span.start);
    if contains_pointer(&variable.shape) {
        return Err(CodegenError::Shape {
            location: location(),
            member: variable.name.clone(),
            reason: ShapeError::PointerInDictionary,
        });
    }

    let element = variable.shape.element().clone();
    let refinements = refinements(&variable.attributes);
    if let [first, second, ..] = refinements.as_slice() {
        return Err(CodegenError::ConflictingAttributes {
            location: location(),
            member: variable.name.clone(),
            first: first.to_string(),
            second: second.to_string(),
        });
    }
    if let Some(attribute) = refinements.first() {
        if !is_legal(attribute, &element) {
            return Err(CodegenError::IllegalAttribute {
                location: location(),
                member: variable.name.clone(),
                attribute: attribute.to_string(),
                shape: variable.shape.cpp_type(),
            });
        }
    }

    normalize_literals(&mut variable.attributes, &element);
    Ok(())
}

/// Attributes that select or refine the leaf verifier, in a fixed order.
/// At most one may be present on a member.
fn refinements(bag: &AttributeBag) -> Vec<&'static str> {
    [
        ("inrange", bag.in_range.is_some()),
        ("notinrange", bag.not_in_range.is_some()),
        ("less", bag.less.is_some()),
        ("lessequal", bag.less_equal.is_some()),
        ("greater", bag.greater.is_some()),
        ("greaterequal", bag.greater_equal.is_some()),
        ("unequal", bag.unequal.is_some()),
        ("inlist", bag.in_list.is_some()),
        ("notinlist", bag.not_in_list.is_some()),
        ("reference", bag.reference.is_some()),
        ("annotation", bag.annotation.is_some()),
        ("color", bag.is_color),
        ("directory", bag.is_directory),
        ("datetime", bag.is_date_time),
        ("identifier", bag.is_identifier),
        ("mustbenotempty", bag.must_be_not_empty),
    ]
    .into_iter()
    .filter_map(|(name, present)| present.then_some(name))
    .collect()
}

fn is_legal(attribute: &str, element: &Shape) -> bool {
    let numeric_scalar = matches!(
        element,
        Shape::Basic { kind: BasicKind::Int | BasicKind::Float | BasicKind::Double }
    );
    let glm = matches!(element, Shape::FixedVector { .. } | Shape::FixedMatrix { .. });
    let string = matches!(element, Shape::Basic { kind: BasicKind::String });
    match attribute {
        "inrange" | "notinrange" | "less" | "lessequal" | "greater" | "greaterequal" | "unequal" => {
            numeric_scalar || glm
        }
        "inlist" | "notinlist" => numeric_scalar || string,
        "mustbenotempty" | "identifier" | "datetime" | "annotation" => string,
        "directory" => matches!(element, Shape::Basic { kind: BasicKind::Path }),
        "color" => matches!(
            element,
            Shape::FixedVector { dims: 3 | 4, element: NumericKind::Float | NumericKind::Double }
        ),
        "reference" => matches!(element, Shape::Basic { kind: BasicKind::Dictionary } | Shape::Struct { .. }),
        _ => false,
    }
}

fn contains_pointer(shape: &Shape) -> bool {
    match shape {
        Shape::Pointer { .. } => true,
        Shape::Optional { inner } | Shape::Vector { inner } | Shape::Array { inner, .. } => {
            contains_pointer(inner)
        }
        Shape::Map { value } => contains_pointer(value),
        Shape::Variant { alternatives: shapes } | Shape::Tuple { elements: shapes } => {
            shapes.iter().any(contains_pointer)
        }
        Shape::Basic { .. }
        | Shape::FixedVector { .. }
        | Shape::FixedMatrix { .. }
        | Shape::Enum { .. }
        | Shape::Struct { .. } => false,
    }
}

/// Canonical spacing, plus promotion of non-double glm literals to the double
/// type the verifiers operate on.
fn normalize_literals(bag: &mut AttributeBag, element: &Shape) {
    let promote = |text: &str| -> String {
        let text = canonical_spacing(text);
        match element {
            Shape::FixedVector { dims, element: NumericKind::Int | NumericKind::Float } => {
                format!("glm::dvec{dims}({text})")
            }
            Shape::FixedMatrix { rows, cols, element: NumericKind::Int | NumericKind::Float } => {
                format!("glm::dmat{rows}x{cols}({text})")
            }
            _ => text,
        }
    };
    for pair in [&mut bag.in_range, &mut bag.not_in_range].into_iter().flatten() {
        *pair = (promote(pair.0.as_str()), promote(pair.1.as_str()));
    }
    for single in [
        &mut bag.less,
        &mut bag.less_equal,
        &mut bag.greater,
        &mut bag.greater_equal,
        &mut bag.unequal,
    ]
    .into_iter()
    .flatten()
    {
        *single = promote(single.as_str());
    }
    for list in [&mut bag.in_list, &mut bag.not_in_list].into_iter().flatten() {
        for item in list.iter_mut() {
            *item = canonical_spacing(item.as_str());
        }
    }
}

/// Canonical spacing around commas and brackets. String and char literals are
/// copied as written.
pub fn canonical_spacing(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut code = String::new();
    let mut prev: Option<char> = None;
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        // `'` after a digit is a digit separator
        let opens_literal = c == '"' || (c == '\'' && !prev.is_some_and(|p| p.is_ascii_digit()));
        if !opens_literal {
            code.push(c);
            prev = Some(c);
            continue;
        }
        out.push_str(&code_spacing(&code));
        code.clear();
        out.push(c);
        let mut escaped = false;
        for inner in chars.by_ref() {
            out.push(inner);
            if escaped {
                escaped = false;
            } else if inner == '\\' {
                escaped = true;
            } else if inner == c {
                break;
            }
        }
        prev = Some(c);
    }
    out.push_str(&code_spacing(&code));
    out.trim().to_string()
}

fn code_spacing(code: &str) -> String {
    let mut collapsed = String::with_capacity(code.len());
    for c in code.chars() {
        if c.is_whitespace() {
            if !collapsed.ends_with(' ') {
                collapsed.push(' ');
            }
        } else {
            collapsed.push(c);
        }
    }
    let text = COMMA.replace_all(&collapsed, ", ");
    let text = OPEN.replace_all(&text, "$1");
    CLOSE.replace_all(&text, "$1").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::AttributeBag;
    use pretty_assertions::assert_eq;

    fn variable(shape: Shape, attributes: AttributeBag) -> Variable {
        Variable {
            name: "value".into(),
            key: String::new(),
            shape,
            documentation: String::new(),
            attributes,
            default: None,
            span: 0..0,
        }
    }

    fn check(shape: Shape, attributes: AttributeBag) -> Result<Variable> {
        let source = SourceFile::new("t.cpp", "");
        let mut v = variable(shape, attributes);
        resolve_variable(&source, &mut v)?;
        Ok(v)
    }

    fn vec3(element: NumericKind) -> Shape {
        Shape::FixedVector { dims: 3, element }
    }

    #[test]
    fn constraints_attach_to_the_element() {
        let less = AttributeBag { less: Some("5".into()), ..Default::default() };
        let scalar = Shape::basic(BasicKind::Int);
        let wrapped = Shape::Optional { inner: Box::new(Shape::Vector { inner: Box::new(scalar.clone()) }) };
        let a = check(scalar, less.clone()).unwrap();
        let b = check(wrapped, less).unwrap();
        assert_eq!(a.attributes, b.attributes);
    }

    #[test]
    fn glm_literals_are_promoted_to_double() {
        let bag = AttributeBag { in_range: Some(("glm::vec3( 0.f )".into(), "glm::vec3(1.f,2.f , 3.f)".into())), ..Default::default() };
        let v = check(vec3(NumericKind::Float), bag.clone()).unwrap();
        assert_eq!(
            v.attributes.in_range,
            Some(("glm::dvec3(glm::vec3(0.f))".into(), "glm::dvec3(glm::vec3(1.f, 2.f, 3.f))".into()))
        );
        let v = check(vec3(NumericKind::Double), bag).unwrap();
        assert_eq!(v.attributes.in_range.unwrap().0, "glm::vec3(0.f)");
    }

    #[test]
    fn literal_text_is_never_respaced() {
        assert_eq!(canonical_spacing(r#"f( "x,y" ,"( z )" )"#), r#"f("x,y", "( z )")"#);
        assert_eq!(canonical_spacing(r#"'\'' , "a\"  ,b""#), r#"'\'', "a\"  ,b""#);
        assert_eq!(canonical_spacing("1'000 , 2"), "1'000, 2");

        let bag = AttributeBag {
            in_list: Some(vec![r#""x,y""#.into(), r#""( z )""#.into()]),
            ..Default::default()
        };
        let v = check(Shape::basic(BasicKind::String), bag).unwrap();
        assert_eq!(v.attributes.in_list, Some(vec![r#""x,y""#.to_string(), r#""( z )""#.to_string()]));
    }

    #[test]
    fn illegal_combinations_name_member_and_attribute() {
        let not_empty = AttributeBag { must_be_not_empty: true, ..Default::default() };
        match check(Shape::basic(BasicKind::Int), not_empty).unwrap_err() {
            CodegenError::IllegalAttribute { member, attribute, shape, .. } => {
                assert_eq!(member, "value");
                assert_eq!(attribute, "mustbenotempty");
                assert_eq!(shape, "int");
            }
            other => panic!("unexpected {other:?}"),
        }

        let dir = AttributeBag { is_directory: true, ..Default::default() };
        assert!(check(Shape::basic(BasicKind::Path), dir.clone()).is_ok());
        assert!(check(Shape::basic(BasicKind::String), dir).is_err());

        let color = AttributeBag { is_color: true, ..Default::default() };
        assert!(check(vec3(NumericKind::Float), color.clone()).is_ok());
        assert!(check(vec3(NumericKind::Int), color).is_err());

        let range = AttributeBag { in_range: Some(("0".into(), "1".into())), ..Default::default() };
        let variant = Shape::Variant { alternatives: vec![Shape::basic(BasicKind::Int), Shape::basic(BasicKind::Bool)] };
        assert!(check(variant, range).is_err());
    }

    #[test]
    fn two_refinements_conflict() {
        let bag = AttributeBag { less: Some("1".into()), greater: Some("0".into()), ..Default::default() };
        assert!(matches!(
            check(Shape::basic(BasicKind::Double), bag),
            Err(CodegenError::ConflictingAttributes { first, second, .. }) if first == "less" && second == "greater"
        ));
    }

    #[test]
    fn pointers_are_rejected_in_dictionaries() {
        let shape = Shape::Vector { inner: Box::new(Shape::Pointer { pointee: "Node".into(), depth: 1 }) };
        assert!(matches!(
            check(shape, AttributeBag::default()),
            Err(CodegenError::Shape { reason: ShapeError::PointerInDictionary, .. })
        ));
    }
}
