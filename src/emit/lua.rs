//! Scripting adapters for `luawrap` functions and their library entries.
use super::{cpp_string, CodeWriter};
use crate::ir::{BasicKind, Function, Shape, Variable};
use crate::resolve::names::{adapter_local, adapter_symbol, library_symbol, LUA_STATE};
use crate::schema::or_join;

/// Human-readable type text shown in the scripting documentation.
pub fn type_text(shape: &Shape) -> String {
    match shape {
        Shape::Basic { kind } => match kind {
            BasicKind::Bool => "Boolean",
            BasicKind::Int => "Integer",
            BasicKind::Float | BasicKind::Double => "Number",
            BasicKind::String => "String",
            BasicKind::Path => "Path",
            BasicKind::Dictionary => "Table",
        }
        .into(),
        Shape::FixedVector { .. } | Shape::FixedMatrix { .. } => {
            shape.cpp_type().trim_start_matches("glm::").to_string()
        }
        Shape::Optional { inner } => format!("{}?", suffix_base(inner)),
        Shape::Vector { inner } => format!("{}[]", suffix_base(inner)),
        Shape::Array { inner, size } => format!("{}[{size}]", suffix_base(inner)),
        Shape::Map { value } => format!("String -> {}", type_text(value)),
        Shape::Variant { alternatives } => {
            or_join(&alternatives.iter().map(type_text).collect::<Vec<_>>())
        }
        Shape::Tuple { elements } => {
            format!("({})", elements.iter().map(type_text).collect::<Vec<_>>().join(", "))
        }
        Shape::Pointer { .. } | Shape::Enum { .. } | Shape::Struct { .. } => shape.cpp_type(),
    }
}

fn suffix_base(shape: &Shape) -> String {
    match shape {
        Shape::Map { .. } | Shape::Variant { .. } => format!("({})", type_text(shape)),
        _ => type_text(shape),
    }
}

/// Type text of a parameter; a defaulted one may be omitted by the caller.
pub fn argument_text(argument: &Variable) -> String {
    let text = type_text(&argument.shape);
    if argument.default.is_some() && !argument.shape.is_optional() {
        format!("{text}?")
    } else {
        text
    }
}

fn is_required(argument: &Variable) -> bool {
    argument.default.is_none() && !argument.shape.is_optional()
}

pub fn write_adapter(w: &mut CodeWriter, function: &Function) {
    let total = function.arguments.len();
    let required = function.arguments.iter().rposition(is_required).map_or(0, |i| i + 1);

    let l = LUA_STATE;
    w.open(format!("static int {}(lua_State* {l}) {{", adapter_symbol(&function.name)));
    let label = cpp_string(&format!("lua::{}", function.lua_name));
    if required == total {
        w.line(format!("ghoul::lua::checkArgumentsAndThrow({l}, {total}, {label});"));
    } else {
        w.line(format!("ghoul::lua::checkArgumentsAndThrow({l}, {{ {required}, {total} }}, {label});"));
    }

    let value = adapter_local("value");

    for (i, argument) in function.arguments.iter().enumerate() {
        let index = i + 1;
        let ty = argument.shape.cpp_type();
        let name = &argument.name;
        match &argument.default {
            None => w.line(format!("{ty} {name} = ghoul::lua::value<{ty}>({l}, {index});")),
            Some(default) if argument.shape.is_optional() => {
                w.line(format!("{ty} {name} = ghoul::lua::value<{ty}>({l}, {index});"));
                w.open(format!("if (!{name}.has_value()) {{"));
                w.line(format!("{name} = {default};"));
                w.close("}");
            }
            Some(default) => {
                w.line(format!("{ty} {name} = {default};"));
                w.open(format!(
                    "if (std::optional<{ty}> {value} = ghoul::lua::value<std::optional<{ty}>>({l}, {index}); {value}.has_value()) {{"
                ));
                w.line(format!("{name} = std::move(*{value});"));
                w.close("}");
            }
        }
    }
    if total > 0 {
        w.line(format!("lua_settop({l}, 0);"));
    }

    let call = format!(
        "{}({})",
        function.name,
        function.arguments.iter().map(|a| a.name.as_str()).collect::<Vec<_>>().join(", ")
    );
    match &function.return_shape {
        None => {
            w.line(format!("{call};"));
            w.line("return 0;");
        }
        Some(Shape::Tuple { elements }) => {
            let names: Vec<String> = (1..=elements.len()).map(|i| adapter_local(&format!("r{i}"))).collect();
            w.line(format!("auto [{}] = {call};", names.join(", ")));
            for name in &names {
                w.line(format!("ghoul::lua::push({l}, std::move({name}));"));
            }
            w.line(format!("return {};", names.len()));
        }
        Some(_) => {
            let result = adapter_local("result");
            w.line(format!("auto {result} = {call};"));
            w.line(format!("ghoul::lua::push({l}, std::move({result}));"));
            w.line("return 1;");
        }
    }
    w.close("}");
}

pub fn write_library_entry(w: &mut CodeWriter, function: &Function) {
    w.open(format!(
        "static const openspace::scripting::LuaLibrary::Function {} = {{",
        library_symbol(&function.name)
    ));
    w.line(format!("{},", cpp_string(&function.lua_name)));
    w.line(format!("&{},", adapter_symbol(&function.name)));
    if function.arguments.is_empty() {
        w.line("{},");
    } else {
        w.open("{");
        let count = function.arguments.len();
        for (i, argument) in function.arguments.iter().enumerate() {
            let mut fields = vec![cpp_string(&argument.name), cpp_string(&argument_text(argument))];
            if let Some(default) = &argument.default {
                fields.push(cpp_string(default));
            }
            let comma = if i + 1 < count { "," } else { "" };
            w.line(format!("{{ {} }}{comma}", fields.join(", ")));
        }
        w.close("},");
    }
    let returns = function.return_shape.as_ref().map(type_text).unwrap_or_default();
    w.line(format!("{},", cpp_string(&returns)));
    w.line(cpp_string(&function.documentation));
    w.close("};");
}
