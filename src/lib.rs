//! Generates dictionary decoders, verifier documentation and Lua adapters from
//! `codegen`-annotated C++ sources.
pub mod cli;
pub mod config;
pub mod emit;
pub mod error;
pub mod ir;
pub mod lexer;
pub mod parse;
pub mod path_de;
pub mod resolve;
pub mod schema;
pub mod source;

#[cfg(test)]
mod sim;

pub use error::{CodegenError, Result};
pub use source::SourceFile;

/// Tokenizes, parses and resolves one file.
pub fn analyze(source: &SourceFile) -> Result<ir::Unit> {
    let tokens = lexer::tokenize(source)?;
    let mut unit = parse::parse(source, &tokens)?;
    resolve::resolve(&mut unit, source)?;
    Ok(unit)
}

/// Full pipeline: the generated C++ text for one file.
pub fn generate(source: &SourceFile) -> Result<String> {
    let unit = analyze(source)?;
    Ok(emit::assemble(&unit))
}

/// Documentation of every top-level struct, as JSON.
pub fn documentation(unit: &ir::Unit) -> serde_json::Value {
    serde_json::Value::Array(
        unit.roots
            .iter()
            .map(|&id| schema::schema_to_json(unit, &schema::struct_schema(unit, id)))
            .collect(),
    )
}
