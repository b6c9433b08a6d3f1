//! Parsed schema AST
//!
//! The boundary type handed over by the external IDL parser. The engine takes
//! no responsibility for lexical or grammatical validity; it only consumes
//! these declarations. Every type deserializes from the parser's JSON dump.

use serde::{Deserialize, Serialize};

/// One parsed schema file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileAst {
    /// Package declaration (absent means the root package)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    /// Syntax tag, e.g. "proto3"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syntax: Option<String>,
    /// Import paths in declaration order
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub messages: Vec<MessageDecl>,
    #[serde(default)]
    pub enums: Vec<EnumDecl>,
    #[serde(default)]
    pub services: Vec<ServiceDecl>,
}

impl FileAst {
    /// Parse the JSON form emitted by the parser
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }
}

/// A message declaration, possibly with nested declarations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageDecl {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    #[serde(default)]
    pub oneofs: Vec<OneofDecl>,
    /// Nested messages
    #[serde(default)]
    pub messages: Vec<MessageDecl>,
    /// Nested enums
    #[serde(default)]
    pub enums: Vec<EnumDecl>,
}

/// A field declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub number: u32,
    /// Type exactly as written: a scalar name, a type reference or `map<K, V>`
    #[serde(rename = "type")]
    pub type_name: String,
    /// Explicit cardinality, if the source had one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, number: u32, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            number,
            type_name: type_name.into(),
            label: None,
            deprecated: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// A `oneof` block; its members are ordinary fields of the owning message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OneofDecl {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: String,
    #[serde(default)]
    pub values: Vec<EnumValueDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValueDecl {
    pub name: String,
    pub number: i32,
}

impl EnumValueDecl {
    pub fn new(name: impl Into<String>, number: i32) -> Self {
        Self {
            name: name.into(),
            number,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceDecl {
    pub name: String,
    #[serde(default)]
    pub rpcs: Vec<RpcDecl>,
}

/// An RPC method declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcDecl {
    pub name: String,
    pub input_type: String,
    pub output_type: String,
    #[serde(default)]
    pub client_streaming: bool,
    #[serde(default)]
    pub server_streaming: bool,
}

impl RpcDecl {
    pub fn unary(
        name: impl Into<String>,
        input_type: impl Into<String>,
        output_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            input_type: input_type.into(),
            output_type: output_type.into(),
            client_streaming: false,
            server_streaming: false,
        }
    }
}
