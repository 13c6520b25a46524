//! Semantic passes run between parsing and emission. Both annotate the unit in
//! place and stop at the first error.
pub mod attributes;
pub mod names;

use crate::error::Result;
use crate::ir::Unit;
use crate::source::SourceFile;

pub use names::derive_key;

pub fn resolve(unit: &mut Unit, source: &SourceFile) -> Result<()> {
    for decl in unit.structs.iter_mut() {
        for variable in decl.variables.iter_mut() {
            attributes::resolve_variable(source, variable)?;
        }
    }
    names::assign_names(unit, source)?;
    tracing::debug!(
        structs = unit.structs.len(),
        functions = unit.functions.len(),
        "resolved attributes and names"
    );
    Ok(())
}
