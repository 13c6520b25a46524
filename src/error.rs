//! Generation-time errors. Every variant aborts generation of the whole file.
use thiserror::Error;

use crate::source::Location;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodegenError {
    #[error("{location}: unexpected character `{text}`")]
    Lex { location: Location, text: String },

    #[error("{location}: expected {expected}, found `{found}`")]
    Parse { location: Location, expected: String, found: String },

    #[error("{location}: unknown attribute `codegen::{name}`")]
    UnknownAttribute { location: Location, name: String },

    #[error("{location}: attribute `{attribute}` expects {expected}")]
    AttributeArity { location: Location, attribute: String, expected: String },

    #[error("{location}: attribute `{attribute}` given twice on `{member}`")]
    DuplicateAttribute { location: Location, member: String, attribute: String },

    #[error("{location}: attribute `{attribute}` is not valid for `{member}` of type `{shape}`")]
    IllegalAttribute { location: Location, member: String, attribute: String, shape: String },

    #[error("{location}: attributes `{first}` and `{second}` cannot be combined on `{member}`")]
    ConflictingAttributes { location: Location, member: String, first: String, second: String },

    #[error("{location}: {reason} (in `{member}`)")]
    Shape { location: Location, member: String, reason: ShapeError },

    #[error("{location}: key `{key}` is used by both `{first}` and `{second}`")]
    DuplicateKey { location: Location, key: String, first: String, second: String },

    #[error("{location}: generated name `{symbol}` is produced by both `{first}` and `{second}`")]
    SymbolCollision { location: Location, symbol: String, first: String, second: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("unknown type `{0}`")]
    UnknownType(String),
    #[error("std::optional cannot wrap another std::optional")]
    DoubleOptional,
    #[error("std::variant needs at least two alternatives")]
    VariantArity,
    #[error("std::tuple needs at least one element")]
    TupleArity,
    #[error("std::array size must be a positive integer literal, found `{0}`")]
    ArraySize(String),
    #[error("std::map keys must be std::string, found `{0}`")]
    MapKey(String),
    #[error("pointer depth {0} is not supported")]
    PointerDepth(usize),
    #[error("`{0}` refers to itself or an enclosing struct")]
    SelfReference(String),
    #[error("pointers are only supported in exported functions")]
    PointerInDictionary,
    #[error("`{0}` cannot be an alternative of std::variant")]
    VariantAlternative(String),
}

impl CodegenError {
    pub fn location(&self) -> &Location {
        match self {
            CodegenError::Lex { location, .. }
            | CodegenError::Parse { location, .. }
            | CodegenError::UnknownAttribute { location, .. }
            | CodegenError::AttributeArity { location, .. }
            | CodegenError::DuplicateAttribute { location, .. }
            | CodegenError::IllegalAttribute { location, .. }
            | CodegenError::ConflictingAttributes { location, .. }
            | CodegenError::Shape { location, .. }
            | CodegenError::DuplicateKey { location, .. }
            | CodegenError::SymbolCollision { location, .. } => location,
        }
    }
}

pub type Result<T, E = CodegenError> = std::result::Result<T, E>;
