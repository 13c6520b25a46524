//! Lookup keys and generated symbol names.
use indexmap::IndexMap;

use crate::error::{CodegenError, Result};
use crate::ir::{StructId, Unit};
use crate::source::SourceFile;

/// Default dictionary key: the member name with its first character upper-cased.
pub fn derive_key(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Symbol prefix used for everything generated on behalf of a struct.
pub fn struct_symbol(unit: &Unit, id: StructId) -> String {
    format!("codegen_{}", unit.scope_path(id).join("_"))
}

/// The adapters' `lua_State*` parameter.
pub const LUA_STATE: &str = "L";

/// Locals an adapter declares next to the parameters carry this prefix.
const ADAPTER_LOCAL_PREFIX: &str = "codegen_";

pub fn adapter_local(name: &str) -> String {
    format!("{ADAPTER_LOCAL_PREFIX}{name}")
}

pub fn adapter_symbol(function_name: &str) -> String {
    format!("{function_name}_adapter")
}

/// Name of the `LuaLibrary::Function` object for an exported function.
pub fn library_symbol(function_name: &str) -> String {
    derive_key(function_name)
}

pub fn assign_names(unit: &mut Unit, source: &SourceFile) -> Result<()> {
    for index in 0..unit.structs.len() {
        let symbol = struct_symbol(unit, StructId(index));
        let decl = &mut unit.structs[index];
        decl.symbol = symbol;

        let mut keys: IndexMap<String, String> = IndexMap::new();
        for variable in decl.variables.iter_mut() {
            variable.key = variable.attributes.key.clone().unwrap_or_else(|| derive_key(&variable.name));
            if let Some(first) = keys.insert(variable.key.clone(), variable.name.clone()) {
                return Err(CodegenError::DuplicateKey {
                    location: source.location(variable.span.start),
                    key: variable.key.clone(),
                    first,
                    second: variable.name.clone(),
                });
            }
        }

        for decl in &decl.enums {
            let mut keys: IndexMap<&str, &str> = IndexMap::new();
            for value in &decl.values {
                if let Some(first) = keys.insert(value.key.as_str(), value.name.as_str()) {
                    return Err(CodegenError::DuplicateKey {
                        location: source.location(decl.span.start),
                        key: value.key.clone(),
                        first: first.to_string(),
                        second: value.name.clone(),
                    });
                }
            }
        }
    }

    let mut symbols: IndexMap<String, String> = IndexMap::new();
    for (index, decl) in unit.structs.iter().enumerate() {
        let qualified = unit.qualified_name(StructId(index));
        if let Some(first) = symbols.insert(decl.symbol.clone(), qualified.clone()) {
            return Err(CodegenError::SymbolCollision {
                location: source.location(decl.span.start),
                symbol: decl.symbol.clone(),
                first,
                second: qualified,
            });
        }
    }

    let mut lua_names: IndexMap<String, String> = IndexMap::new();
    let mut cpp_names: IndexMap<String, String> = IndexMap::new();
    for function in &unit.functions {
        let location = || source.location(function.span.start);
        if let Some(first) = lua_names.insert(function.lua_name.clone(), function.name.clone()) {
            return Err(CodegenError::SymbolCollision {
                location: location(),
                symbol: function.lua_name.clone(),
                first,
                second: function.name.clone(),
            });
        }
        let adapter = adapter_symbol(&function.name);
        if let Some(argument) = function
            .arguments
            .iter()
            .find(|a| a.name == LUA_STATE || a.name.starts_with(ADAPTER_LOCAL_PREFIX))
        {
            return Err(CodegenError::SymbolCollision {
                location: source.location(argument.span.start),
                symbol: argument.name.clone(),
                first: adapter,
                second: format!("{}({})", function.name, argument.name),
            });
        }
        for symbol in [adapter, library_symbol(&function.name)] {
            if let Some(first) = cpp_names.insert(symbol.clone(), function.name.clone()) {
                return Err(CodegenError::SymbolCollision {
                    location: location(),
                    symbol,
                    first,
                    second: function.name.clone(),
                });
            }
        }
    }
    Ok(())
}
