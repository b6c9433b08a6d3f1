//! Error types for the compatibility engine

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema build and check errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Unknown compatibility mode: {mode}{}", suggestion_hint(.suggestion))]
    UnknownMode {
        mode: String,
        suggestion: Option<String>,
    },

    #[error("Invalid syntax tag: {0}")]
    InvalidSyntax(String),

    #[error("Invalid label '{label}' on field {field}")]
    InvalidLabel { field: String, label: String },

    #[error("Duplicate field number {number} in message {message}")]
    DuplicateFieldNumber { message: String, number: u32 },

    #[error("Duplicate field name '{name}' in message {message}")]
    DuplicateFieldName { message: String, name: String },

    #[error("Duplicate value number {number} in enum {enumeration}")]
    DuplicateEnumValueNumber { enumeration: String, number: i32 },

    #[error("Duplicate value name '{name}' in enum {enumeration}")]
    DuplicateEnumValueName { enumeration: String, name: String },

    #[error("Duplicate {kind} declaration: {name}")]
    DuplicateDeclaration { kind: &'static str, name: String },

    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Not yet implemented: {0}")]
    NotImplemented(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Semver error: {0}")]
    Semver(#[from] semver::Error),
}

fn suggestion_hint(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean {}?)", s),
        None => String::new(),
    }
}
