//! Verifier IR: what the generated documentation accepts for each member.
//!
//! The tree mirrors the runtime verifier hierarchy closely enough that
//! `type_name` reproduces the runtime `type()` strings. The C++ rendering lives
//! in `emit::schema`; the JSON view below backs the `schema` command.
use serde_json::{json, Value};

use crate::ir::{AttributeBag, BasicKind, NumericKind, Shape, StructId, Unit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    InRange,
    NotInRange,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Unequal,
}

impl Comparison {
    pub fn verifier_class(self) -> &'static str {
        match self {
            Comparison::InRange => "InRangeVerifier",
            Comparison::NotInRange => "NotInRangeVerifier",
            Comparison::Less => "LessVerifier",
            Comparison::LessEqual => "LessEqualVerifier",
            Comparison::Greater => "GreaterVerifier",
            Comparison::GreaterEqual => "GreaterEqualVerifier",
            Comparison::Unequal => "UnequalVerifier",
        }
    }

    fn attribute(self) -> &'static str {
        match self {
            Comparison::InRange => "inrange",
            Comparison::NotInRange => "notinrange",
            Comparison::Less => "less",
            Comparison::LessEqual => "lessequal",
            Comparison::Greater => "greater",
            Comparison::GreaterEqual => "greaterequal",
            Comparison::Unequal => "unequal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verifier {
    Bool,
    Int,
    Double,
    String { not_empty: bool },
    Identifier,
    DateTime,
    File,
    Directory,
    /// Free-form sub-table (`ghoul::Dictionary`).
    Table,
    Annotated { annotation: String },
    Referencing { identifier: String },
    /// `element` is `Int` or `Double`; float shapes verify as double.
    Vector { dims: u8, element: NumericKind },
    Matrix { rows: u8, cols: u8, element: NumericKind },
    Color { dims: u8 },
    Compare { comparison: Comparison, base: Box<Verifier>, args: Vec<String> },
    InList { negated: bool, base: Box<Verifier>, values: Vec<String> },
    /// Allowed enum keys, in declaration order.
    StringInList { values: Vec<String> },
    /// Table whose every key (`"*"`) carries the inner verifier.
    Wildcard(Box<Verifier>),
    /// Table with required keys `"1".."N"`.
    Positional(Vec<Verifier>),
    Or(Vec<Verifier>),
    /// The table built for a nested struct.
    Struct { id: StructId, symbol: String },
}

impl Verifier {
    pub fn type_name(&self) -> String {
        match self {
            Verifier::Bool => "Boolean".into(),
            Verifier::Int => "Integer".into(),
            Verifier::Double => "Double".into(),
            Verifier::String { .. } | Verifier::Annotated { .. } | Verifier::StringInList { .. } => {
                "String".into()
            }
            Verifier::Identifier => "Identifier".into(),
            Verifier::DateTime => "Date and time".into(),
            Verifier::File => "File".into(),
            Verifier::Directory => "Directory".into(),
            Verifier::Table
            | Verifier::Referencing { .. }
            | Verifier::Wildcard(_)
            | Verifier::Positional(_)
            | Verifier::Struct { .. } => "Table".into(),
            Verifier::Vector { dims, element } => format!("Vector{dims}<{}>", component(*element)),
            Verifier::Matrix { rows, cols, element } => {
                format!("Matrix{rows}x{cols}<{}>", component(*element))
            }
            Verifier::Color { dims } => format!("Color{dims}"),
            Verifier::Compare { base, .. } | Verifier::InList { base, .. } => base.type_name(),
            Verifier::Or(alternatives) => {
                or_join(&alternatives.iter().map(Verifier::type_name).collect::<Vec<_>>())
            }
        }
    }
}

fn component(element: NumericKind) -> &'static str {
    match element {
        NumericKind::Int => "int",
        NumericKind::Float | NumericKind::Double => "double",
    }
}

/// `A`, `A, or B`, `A, B, or C`.
pub fn or_join(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [one] => one.clone(),
        [init @ .., last] => format!("{}, or {last}", init.join(", ")),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaEntry {
    pub key: String,
    pub verifier: Verifier,
    pub optional: bool,
    pub private: bool,
    pub documentation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructSchema {
    pub id: StructId,
    pub symbol: String,
    pub binding: Option<String>,
    pub exhaustive: bool,
    pub documentation: String,
    /// One entry per member, in declaration order.
    pub entries: Vec<SchemaEntry>,
}

pub fn struct_schema(unit: &Unit, id: StructId) -> StructSchema {
    let decl = unit.get(id);
    let entries = decl
        .variables
        .iter()
        .map(|variable| SchemaEntry {
            key: variable.key.clone(),
            verifier: verifier_for(unit, &variable.shape, &variable.attributes),
            optional: variable.is_optional(),
            private: variable.is_private(),
            documentation: variable.documentation.clone(),
        })
        .collect();
    StructSchema {
        id,
        symbol: decl.symbol.clone(),
        binding: decl.binding.clone(),
        exhaustive: decl.exhaustive,
        documentation: decl.documentation.clone(),
        entries,
    }
}

/// Builds the verifier for `shape`; attribute refinements land on the element
/// reached through `Optional`, `Vector`, `Array` and `Map`.
pub fn verifier_for(unit: &Unit, shape: &Shape, attributes: &AttributeBag) -> Verifier {
    let plain = AttributeBag::default();
    match shape {
        Shape::Optional { inner } => verifier_for(unit, inner, attributes),
        Shape::Vector { inner } | Shape::Array { inner, .. } => {
            Verifier::Wildcard(Box::new(verifier_for(unit, inner, attributes)))
        }
        Shape::Map { value } => Verifier::Wildcard(Box::new(verifier_for(unit, value, attributes))),
        Shape::Variant { alternatives } => {
            Verifier::Or(alternatives.iter().map(|a| verifier_for(unit, a, &plain)).collect())
        }
        Shape::Tuple { elements } => {
            Verifier::Positional(elements.iter().map(|e| verifier_for(unit, e, &plain)).collect())
        }
        Shape::Enum { target } => {
            Verifier::StringInList { values: target.values.iter().map(|v| v.key.clone()).collect() }
        }
        Shape::Struct { target } => match &attributes.reference {
            Some(identifier) => Verifier::Referencing { identifier: identifier.clone() },
            None => Verifier::Struct {
                id: target.id,
                symbol: unit.get(target.id).symbol.clone(),
            },
        },
        Shape::Basic { .. } | Shape::FixedVector { .. } | Shape::FixedMatrix { .. } => {
            refine(leaf(shape, attributes), attributes)
        }
        // pointer members never reach here: the resolver rejects them
        Shape::Pointer { .. } => Verifier::Table,
    }
}

fn leaf(shape: &Shape, attributes: &AttributeBag) -> Verifier {
    let widen = |element: NumericKind| match element {
        NumericKind::Int => NumericKind::Int,
        NumericKind::Float | NumericKind::Double => NumericKind::Double,
    };
    match shape {
        Shape::Basic { kind } => match kind {
            BasicKind::Bool => Verifier::Bool,
            BasicKind::Int => Verifier::Int,
            BasicKind::Float | BasicKind::Double => Verifier::Double,
            BasicKind::String if attributes.is_identifier => Verifier::Identifier,
            BasicKind::String if attributes.is_date_time => Verifier::DateTime,
            BasicKind::String => match &attributes.annotation {
                Some(annotation) => Verifier::Annotated { annotation: annotation.clone() },
                None => Verifier::String { not_empty: attributes.must_be_not_empty },
            },
            BasicKind::Path if attributes.is_directory => Verifier::Directory,
            BasicKind::Path => Verifier::File,
            BasicKind::Dictionary => match &attributes.reference {
                Some(identifier) => Verifier::Referencing { identifier: identifier.clone() },
                None => Verifier::Table,
            },
        },
        Shape::FixedVector { dims, .. } if attributes.is_color => Verifier::Color { dims: *dims },
        Shape::FixedVector { dims, element } => Verifier::Vector { dims: *dims, element: widen(*element) },
        Shape::FixedMatrix { rows, cols, element } => {
            Verifier::Matrix { rows: *rows, cols: *cols, element: widen(*element) }
        }
        _ => Verifier::Table,
    }
}

fn refine(base: Verifier, attributes: &AttributeBag) -> Verifier {
    let compare = |comparison, args: Vec<String>| Verifier::Compare {
        comparison,
        base: Box::new(base.clone()),
        args,
    };
    if let Some((lo, hi)) = &attributes.in_range {
        return compare(Comparison::InRange, vec![lo.clone(), hi.clone()]);
    }
    if let Some((lo, hi)) = &attributes.not_in_range {
        return compare(Comparison::NotInRange, vec![lo.clone(), hi.clone()]);
    }
    let singles = [
        (Comparison::Less, &attributes.less),
        (Comparison::LessEqual, &attributes.less_equal),
        (Comparison::Greater, &attributes.greater),
        (Comparison::GreaterEqual, &attributes.greater_equal),
        (Comparison::Unequal, &attributes.unequal),
    ];
    for (comparison, value) in singles {
        if let Some(value) = value {
            return compare(comparison, vec![value.clone()]);
        }
    }
    for (negated, values) in [(false, &attributes.in_list), (true, &attributes.not_in_list)] {
        if let Some(values) = values {
            return Verifier::InList { negated, base: Box::new(base.clone()), values: values.clone() };
        }
    }
    base
}

// ————————————————————————————————————————————————————————————————————————————
// JSON VIEW
// ————————————————————————————————————————————————————————————————————————————

pub fn schema_to_json(unit: &Unit, schema: &StructSchema) -> Value {
    let decl = unit.get(schema.id);
    let mut o = json!({
        "name": decl.name,
        "type": "Table",
        "entries": entries_to_json(unit, &schema.entries),
    });
    if let Some(binding) = &schema.binding {
        o["binding"] = Value::from(binding.clone());
    }
    if !schema.documentation.is_empty() {
        o["documentation"] = Value::from(schema.documentation.clone());
    }
    if !schema.exhaustive {
        o["exhaustive"] = Value::from(false);
    }
    o
}

fn entries_to_json(unit: &Unit, entries: &[SchemaEntry]) -> Value {
    Value::Array(
        entries
            .iter()
            .map(|e| {
                json!({
                    "key": e.key,
                    "optional": e.optional,
                    "private": e.private,
                    "documentation": e.documentation,
                    "verifier": verifier_to_json(unit, &e.verifier),
                })
            })
            .collect(),
    )
}

pub fn verifier_to_json(unit: &Unit, verifier: &Verifier) -> Value {
    let mut o = json!({ "type": verifier.type_name() });
    match verifier {
        Verifier::String { not_empty: true } => o["mustBeNotEmpty"] = Value::from(true),
        Verifier::Annotated { annotation } => o["annotation"] = Value::from(annotation.clone()),
        Verifier::Referencing { identifier } => o["reference"] = Value::from(identifier.clone()),
        Verifier::Compare { comparison, args, .. } => {
            o["constraint"] = Value::from(comparison.attribute());
            o["values"] = Value::from(args.clone());
        }
        Verifier::InList { negated, values, .. } => {
            o["constraint"] = Value::from(if *negated { "notinlist" } else { "inlist" });
            o["values"] = Value::from(values.clone());
        }
        Verifier::StringInList { values } => o["allowed"] = Value::from(values.clone()),
        Verifier::Wildcard(inner) => {
            o["entries"] = json!([{ "key": "*", "optional": true, "verifier": verifier_to_json(unit, inner) }]);
        }
        Verifier::Positional(elements) => {
            o["entries"] = Value::Array(
                elements
                    .iter()
                    .enumerate()
                    .map(|(i, e)| json!({ "key": (i + 1).to_string(), "optional": false, "verifier": verifier_to_json(unit, e) }))
                    .collect(),
            );
        }
        Verifier::Or(alternatives) => {
            o["alternatives"] =
                Value::Array(alternatives.iter().map(|a| verifier_to_json(unit, a)).collect());
        }
        Verifier::Struct { id, .. } => {
            let nested = struct_schema(unit, *id);
            o["entries"] = entries_to_json(unit, &nested.entries);
        }
        _ => {}
    }
    o
}
