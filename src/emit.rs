//! Output assembly: everything generated for one source file, in a fixed order.
pub mod decode;
pub mod lua;
pub mod schema;

use crate::ir::Unit;

/// Line-oriented writer with four-space indentation.
#[derive(Debug, Default)]
pub struct CodeWriter {
    out: String,
    depth: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.out.push_str("    ");
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Writes `text` and indents what follows.
    pub fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.depth += 1;
    }

    pub fn close(&mut self, text: impl AsRef<str>) {
        self.depth = self.depth.saturating_sub(1);
        self.line(text);
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Quoted C++ string literal.
pub fn cpp_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            // three octal digits always end the escape
            c if c.is_ascii_control() => out.push_str(&format!("\\{:03o}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Renders the generated translation unit. The unit must already be resolved.
pub fn assemble(unit: &Unit) -> String {
    let mut w = CodeWriter::new();
    w.line("/*");
    w.line(" * This file has been auto-generated by the codegen tool by running codegen on file:");
    w.line(format!(" * {}", unit.file));
    w.line(" *");
    w.line(" * Do not change this file manually as any changes will be overwritten the next");
    w.line(" * time the codegen is run on the source file.");
    w.line(" */");
    w.blank();
    w.line("namespace codegen {");

    if !unit.roots.is_empty() {
        w.blank();
        w.line("template <typename T> [[maybe_unused]] openspace::documentation::Documentation doc(std::string id);");
        w.line("template <typename T> [[maybe_unused]] T bake(const ghoul::Dictionary& dict);");
        w.blank();
        w.line("namespace internal {");
        let decoders = decode::collect(unit);
        if decoders.needs_sequence_check() {
            w.blank();
            decode::write_sequence_check(&mut w);
        }
        for shape in decoders.shapes() {
            w.blank();
            decode::write_overload(&mut w, unit, shape);
        }
        for id in schema::factory_order(unit) {
            w.blank();
            schema::write_factory(&mut w, unit, id);
        }
        w.blank();
        w.line("} // namespace internal");

        for &root in &unit.roots {
            w.blank();
            schema::write_doc(&mut w, unit, root);
            w.blank();
            decode::write_bake(&mut w, unit, root);
        }
    }

    if !unit.functions.is_empty() {
        w.blank();
        w.line("namespace lua {");
        for function in &unit.functions {
            w.blank();
            lua::write_adapter(&mut w, function);
            w.blank();
            lua::write_library_entry(&mut w, function);
        }
        w.blank();
        w.line("} // namespace lua");
    }

    w.blank();
    w.line("} // namespace codegen");
    tracing::trace!(file = %unit.file, "assembled output");
    w.finish()
}
