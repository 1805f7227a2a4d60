//! Error types for schema construction and id allocation

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Errors raised while building, closing or versioning a schema.
///
/// Every construction-time variant is fatal: a schema that fails to build must
/// stop the process before any rows are produced.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Duplicate {kind} name: {name}")]
    DuplicateName { kind: NameKind, name: String },

    #[error("Unknown type reference '{name}' in {context}{}", suggestion_suffix(.suggestion))]
    UnknownTypeReference {
        name: String,
        context: String,
        suggestion: Option<String>,
    },

    #[error("Cyclic union declaration: {}", .cycle.join(" -> "))]
    CyclicUnion { cycle: Vec<String> },

    #[error("Invalid key set on table '{table}': {reason}")]
    InvalidKeySet { table: String, reason: String },

    #[error("Conflicting modifiers on table '{table}': {reason}")]
    ConflictingModifiers { table: String, reason: String },

    #[error("Invalid {kind} name: '{name}'")]
    InvalidName { kind: NameKind, name: String },

    #[error("Type '{supertype}' used as a supertype of '{name}' is not a union")]
    InvalidSupertype { name: String, supertype: String },

    #[error("Cannot declare a case type on '{base}': {reason}")]
    InvalidCaseBase { base: String, reason: String },

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Semver error: {0}")]
    Semver(#[from] semver::Error),
}

/// Which namespace a name belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Type,
    Table,
    Column,
}

impl std::fmt::Display for NameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NameKind::Type => write!(f, "type"),
            NameKind::Table => write!(f, "table"),
            NameKind::Column => write!(f, "column"),
        }
    }
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean '{}'?)", s),
        None => String::new(),
    }
}

/// Errors raised by the id allocator after the schema is frozen.
///
/// `Exhausted` means an id domain ran out of room; callers treat it as fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Type '{0}' is not concrete and has no id domain")]
    NotConcrete(String),

    #[error("Id space exhausted for domain of '{0}'")]
    Exhausted(String),
}
