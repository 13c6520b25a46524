//! `bakeTo` overloads, one per distinct shape, and the per-struct `bake` entry.
use indexmap::IndexSet;

use super::{cpp_string, CodeWriter};
use crate::ir::{BasicKind, NumericKind, Shape, StructId, Unit};

/// What the dictionary must hold at a key for a variant alternative to be chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Bool,
    Number,
    String,
    /// Double-precision glm type the value is stored as.
    Glm(String),
    /// Sub-dictionary whose keys are exactly `"1".."N"`.
    Sequence,
    /// Any sub-dictionary.
    Table,
    /// Alternative that is itself a variant.
    Any(Vec<Predicate>),
}

impl Predicate {
    pub fn of(shape: &Shape) -> Predicate {
        match shape {
            Shape::Basic { kind } => match kind {
                BasicKind::Bool => Predicate::Bool,
                BasicKind::Int | BasicKind::Float | BasicKind::Double => Predicate::Number,
                BasicKind::String | BasicKind::Path => Predicate::String,
                BasicKind::Dictionary => Predicate::Table,
            },
            Shape::FixedVector { .. } | Shape::FixedMatrix { .. } => {
                Predicate::Glm(stored_glm_type(shape).unwrap_or_default())
            }
            Shape::Optional { inner } => Predicate::of(inner),
            Shape::Vector { .. } | Shape::Array { .. } | Shape::Tuple { .. } => Predicate::Sequence,
            Shape::Map { .. } | Shape::Struct { .. } | Shape::Pointer { .. } => Predicate::Table,
            Shape::Enum { .. } => Predicate::String,
            Shape::Variant { alternatives } => {
                Predicate::Any(alternatives.iter().map(Predicate::of).collect())
            }
        }
    }

    /// `Table` accepts every sequence too, so it is tried last.
    fn rank(&self) -> u8 {
        match self {
            Predicate::Table => 1,
            Predicate::Any(inner) => inner.iter().map(Predicate::rank).min().unwrap_or(1),
            _ => 0,
        }
    }

    pub fn needs_sequence_check(&self) -> bool {
        match self {
            Predicate::Sequence => true,
            Predicate::Any(inner) => inner.iter().any(Predicate::needs_sequence_check),
            _ => false,
        }
    }

    pub fn condition(&self, dict: &str, key: &str) -> String {
        match self {
            Predicate::Bool => format!("{dict}.hasValue<bool>({key})"),
            Predicate::Number => format!("{dict}.hasValue<double>({key})"),
            Predicate::String => format!("{dict}.hasValue<std::string>({key})"),
            Predicate::Glm(ty) => format!("{dict}.hasValue<{ty}>({key})"),
            Predicate::Sequence => format!(
                "{dict}.hasValue<ghoul::Dictionary>({key}) && isSequence({dict}.value<ghoul::Dictionary>({key}))"
            ),
            Predicate::Table => format!("{dict}.hasValue<ghoul::Dictionary>({key})"),
            Predicate::Any(inner) => format!(
                "({})",
                inner.iter().map(|p| p.condition(dict, key)).collect::<Vec<_>>().join(" || ")
            ),
        }
    }
}

/// Order in which variant alternatives are tested: declaration order, except
/// that plain-table alternatives come after everything more specific.
pub fn variant_order(alternatives: &[Shape]) -> Vec<(usize, Predicate)> {
    let mut order: Vec<_> = alternatives.iter().map(Predicate::of).enumerate().collect();
    order.sort_by_key(|(_, predicate)| predicate.rank());
    order
}

/// `glm::dvec3` for any three-component vector, `glm::dmat2x4` for any 2x4 matrix.
pub fn stored_glm_type(shape: &Shape) -> Option<String> {
    match shape {
        Shape::FixedVector { dims, .. } => Some(format!("glm::dvec{dims}")),
        Shape::FixedMatrix { rows, cols, .. } => Some(format!("glm::dmat{rows}x{cols}")),
        _ => None,
    }
}

/// Distinct shapes needing a decode overload, dependencies first.
#[derive(Debug, Default)]
pub struct Decoders {
    shapes: IndexSet<Shape>,
}

impl Decoders {
    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.iter()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn needs_sequence_check(&self) -> bool {
        self.shapes.iter().any(|shape| match shape {
            Shape::Variant { alternatives } => {
                alternatives.iter().any(|a| Predicate::of(a).needs_sequence_check())
            }
            _ => false,
        })
    }

    fn visit(&mut self, unit: &Unit, shape: &Shape) {
        if self.shapes.contains(shape) {
            return;
        }
        match shape {
            Shape::Optional { inner } | Shape::Vector { inner } | Shape::Array { inner, .. } => {
                self.visit(unit, inner)
            }
            Shape::Map { value } => self.visit(unit, value),
            Shape::Variant { alternatives: shapes } | Shape::Tuple { elements: shapes } => {
                for shape in shapes {
                    self.visit(unit, shape);
                }
            }
            Shape::Struct { target } => self.visit_struct(unit, target.id),
            Shape::Basic { .. }
            | Shape::FixedVector { .. }
            | Shape::FixedMatrix { .. }
            | Shape::Enum { .. } => {}
            Shape::Pointer { .. } => return,
        }
        self.shapes.insert(shape.clone());
    }

    fn visit_struct(&mut self, unit: &Unit, id: StructId) {
        for variable in &unit.get(id).variables {
            self.visit(unit, &variable.shape);
        }
    }
}

pub fn collect(unit: &Unit) -> Decoders {
    let mut decoders = Decoders::default();
    for &root in &unit.roots {
        decoders.visit_struct(unit, root);
    }
    tracing::trace!(overloads = decoders.len(), "collected decode shapes");
    decoders
}

pub fn write_sequence_check(w: &mut CodeWriter) {
    w.open("[[maybe_unused]] static bool isSequence(const ghoul::Dictionary& d) {");
    w.open("for (size_t i = 1; i <= d.size(); ++i) {");
    w.open("if (!d.hasKey(std::to_string(i))) {");
    w.line("return false;");
    w.close("}");
    w.close("}");
    w.line("return true;");
    w.close("}");
}

/// Pointers get no overload; their address is passed through by the caller.
pub fn write_overload(w: &mut CodeWriter, unit: &Unit, shape: &Shape) {
    if let Shape::Pointer { .. } = shape {
        return;
    }
    let ty = shape.cpp_type();
    w.open(format!(
        "[[maybe_unused]] static void bakeTo(const ghoul::Dictionary& d, std::string_view key, {ty}* val) {{"
    ));
    match shape {
        Shape::Basic { kind } => {
            let line = match kind {
                BasicKind::Bool => "*val = d.value<bool>(key);",
                BasicKind::Int => "*val = static_cast<int>(d.value<double>(key));",
                BasicKind::Float => "*val = static_cast<float>(d.value<double>(key));",
                BasicKind::Double => "*val = d.value<double>(key);",
                BasicKind::String | BasicKind::Path => "*val = d.value<std::string>(key);",
                BasicKind::Dictionary => "*val = d.value<ghoul::Dictionary>(key);",
            };
            w.line(line);
        }
        Shape::FixedVector { element, .. } | Shape::FixedMatrix { element, .. } => {
            let stored = stored_glm_type(shape).unwrap_or_default();
            match element {
                NumericKind::Double => w.line(format!("*val = d.value<{stored}>(key);")),
                NumericKind::Int | NumericKind::Float => {
                    w.line(format!("*val = {ty}(d.value<{stored}>(key));"))
                }
            }
        }
        Shape::Optional { inner } => {
            w.open("if (d.hasKey(key)) {");
            w.line(format!("{} v;", inner.cpp_type()));
            w.line("bakeTo(d, key, &v);");
            w.line("*val = std::move(v);");
            w.close("}");
            w.open("else {");
            w.line("*val = std::nullopt;");
            w.close("}");
        }
        Shape::Vector { inner } => {
            w.line("ghoul::Dictionary dict = d.value<ghoul::Dictionary>(key);");
            w.line(format!("{ty} res;"));
            w.line("res.reserve(dict.size());");
            w.open("for (size_t i = 1; i <= dict.size(); ++i) {");
            write_sequence_key(w);
            w.line(format!("{} v;", inner.cpp_type()));
            w.line("bakeTo(dict, k, &v);");
            w.line("res.push_back(std::move(v));");
            w.close("}");
            w.line("*val = std::move(res);");
        }
        Shape::Array { size, .. } => {
            w.line("ghoul::Dictionary dict = d.value<ghoul::Dictionary>(key);");
            w.open(format!("if (dict.size() != {size}) {{"));
            w.line(format!(
                "throw ghoul::RuntimeError(\"Expected {size} elements in '\" + std::string(key) + \"', got \" + std::to_string(dict.size()));"
            ));
            w.close("}");
            w.open(format!("for (size_t i = 1; i <= {size}; ++i) {{"));
            write_sequence_key(w);
            w.line("bakeTo(dict, k, &(*val)[i - 1]);");
            w.close("}");
        }
        Shape::Map { value } => {
            w.line("ghoul::Dictionary dict = d.value<ghoul::Dictionary>(key);");
            w.line(format!("{ty} res;"));
            w.open("for (std::string_view k : dict.keys()) {");
            w.line(format!("{} v;", value.cpp_type()));
            w.line("bakeTo(dict, k, &v);");
            w.line("res[std::string(k)] = std::move(v);");
            w.close("}");
            w.line("*val = std::move(res);");
        }
        Shape::Variant { alternatives } => {
            for (n, (index, predicate)) in variant_order(alternatives).into_iter().enumerate() {
                let keyword = if n == 0 { "if" } else { "else if" };
                w.open(format!("{keyword} ({}) {{", predicate.condition("d", "key")));
                w.line(format!("{} v;", alternatives[index].cpp_type()));
                w.line("bakeTo(d, key, &v);");
                w.line("*val = std::move(v);");
                w.close("}");
            }
            w.open("else {");
            w.line("throw ghoul::MissingCaseException();");
            w.close("}");
        }
        Shape::Tuple { elements } => {
            w.line("ghoul::Dictionary dict = d.value<ghoul::Dictionary>(key);");
            for i in 0..elements.len() {
                w.line(format!("bakeTo(dict, \"{}\", &std::get<{i}>(*val));", i + 1));
            }
        }
        Shape::Enum { target } => {
            w.line("std::string v = d.value<std::string>(key);");
            for (n, value) in target.values.iter().enumerate() {
                let keyword = if n == 0 { "if" } else { "else if" };
                w.open(format!("{keyword} (v == {}) {{", cpp_string(&value.key)));
                w.line(format!("*val = {}::{};", target.qualified, value.name));
                w.close("}");
            }
        }
        Shape::Struct { target } => {
            w.line("ghoul::Dictionary dict = d.value<ghoul::Dictionary>(key);");
            for variable in &unit.get(target.id).variables {
                w.line(format!(
                    "bakeTo(dict, {}, &val->{});",
                    cpp_string(&variable.key),
                    variable.name
                ));
            }
        }
        Shape::Pointer { .. } => {}
    }
    w.close("}");
}

fn write_sequence_key(w: &mut CodeWriter) {
    w.line("std::string k = std::to_string(i);");
    w.open("if (!dict.hasKey(k)) {");
    w.line("throw ghoul::RuntimeError(\"Missing key '\" + k + \"' in '\" + std::string(key) + \"'\");");
    w.close("}");
}

pub fn write_bake(w: &mut CodeWriter, unit: &Unit, id: StructId) {
    let decl = unit.get(id);
    let ty = unit.qualified_name(id);
    let binding = cpp_string(decl.binding.as_deref().unwrap_or(&decl.name));
    w.open(format!("template <> [[maybe_unused]] {ty} bake<{ty}>(const ghoul::Dictionary& dict) {{"));
    w.line(format!(
        "openspace::documentation::testSpecificationAndThrow(codegen::doc<{ty}>({binding}), dict, {binding});"
    ));
    w.line(format!("{ty} res;"));
    for variable in &decl.variables {
        w.line(format!(
            "internal::bakeTo(dict, {}, &res.{});",
            cpp_string(&variable.key),
            variable.name
        ));
    }
    w.line("return res;");
    w.close("}");
}
