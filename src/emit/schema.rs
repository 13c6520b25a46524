//! Verifier factories and `doc<S>` specializations.
use indexmap::IndexSet;

use super::{cpp_string, CodeWriter};
use crate::ir::{NumericKind, StructId, Unit};
use crate::schema::{struct_schema, Verifier};

/// Structs needing a factory, nested tables before the tables using them.
pub fn factory_order(unit: &Unit) -> Vec<StructId> {
    fn visit(unit: &Unit, id: StructId, seen: &mut IndexSet<StructId>) {
        if seen.contains(&id) {
            return;
        }
        for entry in struct_schema(unit, id).entries {
            nested(unit, &entry.verifier, seen);
        }
        seen.insert(id);
    }
    fn nested(unit: &Unit, verifier: &Verifier, seen: &mut IndexSet<StructId>) {
        match verifier {
            Verifier::Struct { id, .. } => visit(unit, *id, seen),
            Verifier::Wildcard(inner) => nested(unit, inner, seen),
            Verifier::Positional(all) | Verifier::Or(all) => {
                for v in all {
                    nested(unit, v, seen);
                }
            }
            _ => {}
        }
    }

    let mut seen = IndexSet::new();
    for &root in &unit.roots {
        visit(unit, root, &mut seen);
    }
    seen.into_iter().collect()
}

fn leaf_class(verifier: &Verifier) -> String {
    let numeric = |element: NumericKind| match element {
        NumericKind::Int => "Int",
        NumericKind::Float | NumericKind::Double => "Double",
    };
    match verifier {
        Verifier::Bool => "BoolVerifier".into(),
        Verifier::Int => "IntVerifier".into(),
        Verifier::Double => "DoubleVerifier".into(),
        Verifier::String { .. } => "StringVerifier".into(),
        Verifier::Identifier => "IdentifierVerifier".into(),
        Verifier::DateTime => "DateTimeVerifier".into(),
        Verifier::File => "FileVerifier".into(),
        Verifier::Directory => "DirectoryVerifier".into(),
        Verifier::Vector { dims, element } => format!("{}Vector{dims}Verifier", numeric(*element)),
        Verifier::Matrix { rows, cols, element } => {
            format!("{}Matrix{rows}x{cols}Verifier", numeric(*element))
        }
        Verifier::Color { dims } => format!("Color{dims}Verifier"),
        _ => "TableVerifier".into(),
    }
}

/// C++ expression allocating the verifier.
pub fn render_verifier(verifier: &Verifier) -> String {
    match verifier {
        Verifier::String { not_empty: true } => "new StringVerifier(true)".into(),
        Verifier::Annotated { annotation } => {
            format!("new StringAnnotationVerifier({})", cpp_string(annotation))
        }
        Verifier::Referencing { identifier } => {
            format!("new ReferencingVerifier({})", cpp_string(identifier))
        }
        Verifier::Compare { comparison, base, args } => format!(
            "new {}<{}>({})",
            comparison.verifier_class(),
            leaf_class(base),
            args.join(", ")
        ),
        Verifier::InList { negated, base, values } => format!(
            "new {}<{}>({{{}}})",
            if *negated { "NotInListVerifier" } else { "InListVerifier" },
            leaf_class(base),
            values.join(", ")
        ),
        Verifier::StringInList { values } => format!(
            "new StringInListVerifier({{{}}})",
            values.iter().map(|v| cpp_string(v)).collect::<Vec<_>>().join(", ")
        ),
        Verifier::Wildcard(inner) => {
            format!("new TableVerifier({{{{\"*\", {}, Optional::Yes}}}})", render_verifier(inner))
        }
        Verifier::Positional(elements) => format!(
            "new TableVerifier({{{}}})",
            elements
                .iter()
                .enumerate()
                .map(|(i, e)| format!("{{\"{}\", {}, Optional::No}}", i + 1, render_verifier(e)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Verifier::Or(alternatives) => format!(
            "new OrVerifier({{{}}})",
            alternatives.iter().map(render_verifier).collect::<Vec<_>>().join(", ")
        ),
        Verifier::Struct { symbol, .. } => format!("{symbol}()"),
        leaf => format!("new {}", leaf_class(leaf)),
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

pub fn write_factory(w: &mut CodeWriter, unit: &Unit, id: StructId) {
    let schema = struct_schema(unit, id);
    w.open(format!(
        "[[maybe_unused]] static openspace::documentation::TableVerifier* {}() {{",
        schema.symbol
    ));
    w.line("using namespace openspace::documentation;");
    w.line("TableVerifier* table = new TableVerifier;");
    for entry in &schema.entries {
        w.line(format!(
            "table->documentations.push_back({{ {}, {}, Optional::{}, Private::{}, {} }});",
            cpp_string(&entry.key),
            render_verifier(&entry.verifier),
            yes_no(entry.optional),
            yes_no(entry.private),
            cpp_string(&entry.documentation),
        ));
    }
    if !schema.exhaustive {
        w.line("table->exhaustive = false;");
    }
    w.line("return table;");
    w.close("}");
}

pub fn write_doc(w: &mut CodeWriter, unit: &Unit, id: StructId) {
    let decl = unit.get(id);
    let ty = unit.qualified_name(id);
    let binding = cpp_string(decl.binding.as_deref().unwrap_or(&decl.name));
    w.open(format!(
        "template <> [[maybe_unused]] openspace::documentation::Documentation doc<{ty}>(std::string id) {{"
    ));
    w.line(format!("openspace::documentation::TableVerifier* table = internal::{}();", decl.symbol));
    w.line(format!(
        "openspace::documentation::Documentation d = {{ {binding}, std::move(id), std::move(table->documentations) }};"
    ));
    w.line("delete table;");
    w.line("return d;");
    w.close("}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze;
    use crate::schema::Comparison;
    use crate::source::SourceFile;
    use pretty_assertions::assert_eq;

    fn unit(text: &str) -> Unit {
        analyze(&SourceFile::new("t.cpp", text)).unwrap()
    }

    #[test]
    fn verifiers_render_as_allocations() {
        assert_eq!(render_verifier(&Verifier::Bool), "new BoolVerifier");
        assert_eq!(render_verifier(&Verifier::String { not_empty: true }), "new StringVerifier(true)");
        assert_eq!(
            render_verifier(&Verifier::Vector { dims: 3, element: NumericKind::Int }),
            "new IntVector3Verifier"
        );
        assert_eq!(
            render_verifier(&Verifier::Compare {
                comparison: Comparison::InRange,
                base: Box::new(Verifier::Double),
                args: vec!["0.0".into(), "1.0".into()],
            }),
            "new InRangeVerifier<DoubleVerifier>(0.0, 1.0)"
        );
        assert_eq!(
            render_verifier(&Verifier::Wildcard(Box::new(Verifier::Int))),
            "new TableVerifier({{\"*\", new IntVerifier, Optional::Yes}})"
        );
        assert_eq!(
            render_verifier(&Verifier::Or(vec![Verifier::Bool, Verifier::Int])),
            "new OrVerifier({new BoolVerifier, new IntVerifier})"
        );
        assert_eq!(
            render_verifier(&Verifier::Positional(vec![Verifier::Int, Verifier::File])),
            "new TableVerifier({{\"1\", new IntVerifier, Optional::No}, {\"2\", new FileVerifier, Optional::No}})"
        );
    }

    #[test]
    fn factories_list_entries_in_declaration_order() {
        let unit = unit(
            "struct [[codegen::Dictionary(Thing)]] P {\n\
             // Turns it on\n\
             bool boolValue;\n\
             int intValue [[codegen::private()]];\n\
             std::optional<std::variant<bool, int>> optionalValue;\n\
             };",
        );
        let mut w = CodeWriter::new();
        write_factory(&mut w, &unit, unit.roots[0]);
        let out = w.finish();
        let lines: Vec<&str> = out.lines().filter(|l| l.contains("push_back")).map(str::trim).collect();
        assert_eq!(
            lines,
            vec![
                "table->documentations.push_back({ \"BoolValue\", new BoolVerifier, Optional::No, Private::No, \"Turns it on\" });",
                "table->documentations.push_back({ \"IntValue\", new IntVerifier, Optional::No, Private::Yes, \"\" });",
                "table->documentations.push_back({ \"OptionalValue\", new OrVerifier({new BoolVerifier, new IntVerifier}), Optional::Yes, Private::No, \"\" });",
            ]
        );
        assert!(!out.contains("exhaustive"));
    }

    #[test]
    fn nested_factories_precede_their_users() {
        let unit = unit(
            "struct [[codegen::Dictionary(A)]] P { struct Inner { struct Deep { int x; }; Deep deep; }; std::vector<Inner> inner; };",
        );
        let names: Vec<String> = factory_order(&unit).into_iter().map(|id| unit.get(id).symbol.clone()).collect();
        assert_eq!(names, vec!["codegen_P_Inner_Deep", "codegen_P_Inner", "codegen_P"]);
    }

    #[test]
    fn doc_wraps_the_factory_entries_with_the_binding() {
        let unit = unit("struct [[codegen::Dictionary(Renderable)]] P { int x; };");
        let mut w = CodeWriter::new();
        write_doc(&mut w, &unit, unit.roots[0]);
        let out = w.finish();
        assert!(out.contains("doc<P>(std::string id) {"));
        assert!(out.contains("table = internal::codegen_P();"));
        assert!(out.contains("{ \"Renderable\", std::move(id), std::move(table->documentations) }"));
    }
}
