// Strongly-typed declaration model shared by the parser, the resolver and the emitters.
use std::ops::Range;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BasicKind {
    Bool,
    Int,
    Double,
    Float,
    String,
    Path,
    Dictionary,
}

/// Component type of a glm vector or matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NumericKind {
    Int,
    Float,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StructId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EnumRef {
    /// C++ spelling, qualified by the enclosing structs (`Parameters::Mode`).
    pub qualified: String,
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EnumValue {
    pub name: String,
    /// String matched against the dictionary value.
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StructRef {
    pub id: StructId,
    pub qualified: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    Basic { kind: BasicKind },
    FixedVector { dims: u8, element: NumericKind },
    FixedMatrix { rows: u8, cols: u8, element: NumericKind },
    Optional { inner: Box<Shape> },
    Vector { inner: Box<Shape> },
    Array { inner: Box<Shape>, size: usize },
    /// Keys are always `std::string`.
    Map { value: Box<Shape> },
    Variant { alternatives: Vec<Shape> },
    Tuple { elements: Vec<Shape> },
    /// Opaque address; the pointee spelling is carried verbatim.
    Pointer { pointee: String, depth: u8 },
    Enum { target: EnumRef },
    Struct { target: StructRef },
}

impl Shape {
    pub fn basic(kind: BasicKind) -> Self {
        Shape::Basic { kind }
    }

    /// Strips containers that constraints look through.
    pub fn element(&self) -> &Shape {
        match self {
            Shape::Optional { inner } | Shape::Vector { inner } | Shape::Array { inner, .. } => {
                inner.element()
            }
            Shape::Map { value } => value.element(),
            _ => self,
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Shape::Optional { .. })
    }

    /// Canonical C++ spelling.
    pub fn cpp_type(&self) -> String {
        match self {
            Shape::Basic { kind } => match kind {
                BasicKind::Bool => "bool".into(),
                BasicKind::Int => "int".into(),
                BasicKind::Double => "double".into(),
                BasicKind::Float => "float".into(),
                BasicKind::String => "std::string".into(),
                BasicKind::Path => "std::filesystem::path".into(),
                BasicKind::Dictionary => "ghoul::Dictionary".into(),
            },
            Shape::FixedVector { dims, element } => {
                format!("glm::{}vec{dims}", glm_prefix(*element))
            }
            Shape::FixedMatrix { rows, cols, element } => {
                format!("glm::{}mat{rows}x{cols}", glm_prefix(*element))
            }
            Shape::Optional { inner } => format!("std::optional<{}>", inner.cpp_type()),
            Shape::Vector { inner } => format!("std::vector<{}>", inner.cpp_type()),
            Shape::Array { inner, size } => format!("std::array<{}, {size}>", inner.cpp_type()),
            Shape::Map { value } => format!("std::map<std::string, {}>", value.cpp_type()),
            Shape::Variant { alternatives } => format!("std::variant<{}>", join_cpp(alternatives)),
            Shape::Tuple { elements } => format!("std::tuple<{}>", join_cpp(elements)),
            Shape::Pointer { pointee, depth } => {
                format!("{pointee}{}", "*".repeat(*depth as usize))
            }
            Shape::Enum { target } => target.qualified.clone(),
            Shape::Struct { target } => target.qualified.clone(),
        }
    }
}

fn glm_prefix(kind: NumericKind) -> &'static str {
    match kind {
        NumericKind::Int => "i",
        NumericKind::Float => "",
        NumericKind::Double => "d",
    }
}

fn join_cpp(shapes: &[Shape]) -> String {
    shapes.iter().map(Shape::cpp_type).collect::<Vec<_>>().join(", ")
}

/// Per-variable attribute slots. Literal expressions are kept as source text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttributeBag {
    pub in_range: Option<(String, String)>,
    pub not_in_range: Option<(String, String)>,
    pub less: Option<String>,
    pub less_equal: Option<String>,
    pub greater: Option<String>,
    pub greater_equal: Option<String>,
    pub unequal: Option<String>,
    pub in_list: Option<Vec<String>>,
    pub not_in_list: Option<Vec<String>>,
    pub reference: Option<String>,
    pub annotation: Option<String>,
    pub key: Option<String>,
    pub is_color: bool,
    pub is_directory: bool,
    pub is_date_time: bool,
    pub is_identifier: bool,
    pub must_be_not_empty: bool,
    pub is_private: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Variable {
    pub name: String,
    /// Lookup key in the dictionary; filled in by the resolver.
    pub key: String,
    pub shape: Shape,
    pub documentation: String,
    pub attributes: AttributeBag,
    /// Verbatim default expression (function arguments only).
    pub default: Option<String>,
    #[serde(skip)]
    pub span: Range<usize>,
}

impl Variable {
    pub fn is_optional(&self) -> bool {
        self.shape.is_optional()
    }

    pub fn is_private(&self) -> bool {
        self.attributes.is_private
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnumDecl {
    pub name: String,
    pub values: Vec<EnumValue>,
    #[serde(skip)]
    pub span: Range<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StructDecl {
    pub name: String,
    /// Name given to `codegen::Dictionary`; only set on top-level structs.
    pub binding: Option<String>,
    pub documentation: String,
    pub parent: Option<StructId>,
    pub children: Vec<StructId>,
    pub enums: Vec<EnumDecl>,
    pub variables: Vec<Variable>,
    pub exhaustive: bool,
    /// Generated symbol (`codegen_Parameters_Nested`); filled in by the resolver.
    pub symbol: String,
    #[serde(skip)]
    pub span: Range<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Function {
    pub name: String,
    /// Name under which the function is exposed to Lua.
    pub lua_name: String,
    pub documentation: String,
    pub arguments: Vec<Variable>,
    pub return_shape: Option<Shape>,
    #[serde(skip)]
    pub span: Range<usize>,
}

/// Everything parsed from one source file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Unit {
    pub file: String,
    /// Arena of all structs, nested ones included.
    pub structs: Vec<StructDecl>,
    /// Top-level annotated structs in declaration order.
    pub roots: Vec<StructId>,
    pub functions: Vec<Function>,
}

impl Unit {
    pub fn get(&self, id: StructId) -> &StructDecl {
        &self.structs[id.0]
    }

    /// `Outer::Inner` spelling of a struct.
    pub fn qualified_name(&self, id: StructId) -> String {
        self.scope_path(id).join("::")
    }

    /// Names from the outermost struct down to `id`.
    pub fn scope_path(&self, id: StructId) -> Vec<String> {
        let mut path = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let decl = self.get(current);
            path.push(decl.name.clone());
            cursor = decl.parent;
        }
        path.reverse();
        path
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty() && self.functions.is_empty()
    }
}
