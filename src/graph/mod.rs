//! Schema Graph
//!
//! Fully-indexed, in-memory model of one schema version. Built once by
//! [`builder::build`] and read-only afterwards; the comparator only ever
//! borrows it, so a graph can be shared across threads freely.
//!
//! All lookup structures are `BTreeMap`s so every walk over the graph visits
//! keys in sorted order.

pub mod builder;

pub use builder::build;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, SchemaError};

// =============================================================================
// Syntax
// =============================================================================

/// Syntax version tag of a schema file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Syntax {
    /// The older variant, assumed when a file has no syntax statement
    #[default]
    Proto2,
    Proto3,
}

impl Syntax {
    pub fn as_str(&self) -> &'static str {
        match self {
            Syntax::Proto2 => "proto2",
            Syntax::Proto3 => "proto3",
        }
    }

    pub fn parse(tag: &str) -> Result<Self> {
        match tag {
            "proto2" => Ok(Syntax::Proto2),
            "proto3" => Ok(Syntax::Proto3),
            other => Err(SchemaError::InvalidSyntax(other.to_string())),
        }
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Field types and labels
// =============================================================================

/// Built-in scalar kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 15] = [
        ScalarKind::Double,
        ScalarKind::Float,
        ScalarKind::Int32,
        ScalarKind::Int64,
        ScalarKind::Uint32,
        ScalarKind::Uint64,
        ScalarKind::Sint32,
        ScalarKind::Sint64,
        ScalarKind::Fixed32,
        ScalarKind::Fixed64,
        ScalarKind::Sfixed32,
        ScalarKind::Sfixed64,
        ScalarKind::Bool,
        ScalarKind::String,
        ScalarKind::Bytes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::Double => "double",
            ScalarKind::Float => "float",
            ScalarKind::Int32 => "int32",
            ScalarKind::Int64 => "int64",
            ScalarKind::Uint32 => "uint32",
            ScalarKind::Uint64 => "uint64",
            ScalarKind::Sint32 => "sint32",
            ScalarKind::Sint64 => "sint64",
            ScalarKind::Fixed32 => "fixed32",
            ScalarKind::Fixed64 => "fixed64",
            ScalarKind::Sfixed32 => "sfixed32",
            ScalarKind::Sfixed64 => "sfixed64",
            ScalarKind::Bool => "bool",
            ScalarKind::String => "string",
            ScalarKind::Bytes => "bytes",
        }
    }

    /// Classify a type name; `None` means it is not a scalar
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Scalar(ScalarKind),
    Message,
    Enum,
    Map,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Scalar(kind) => kind.as_str(),
            FieldType::Message => "message",
            FieldType::Enum => "enum",
            FieldType::Map => "map",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldLabel {
    #[default]
    Optional,
    Required,
    Repeated,
}

impl FieldLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldLabel::Optional => "optional",
            FieldLabel::Required => "required",
            FieldLabel::Repeated => "repeated",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "optional" => Some(FieldLabel::Optional),
            "required" => Some(FieldLabel::Required),
            "repeated" => Some(FieldLabel::Repeated),
            _ => None,
        }
    }
}

impl fmt::Display for FieldLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Declarations
// =============================================================================

/// A message field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    /// Wire identity
    pub number: u32,
    pub field_type: FieldType,
    pub label: FieldLabel,
    /// Referenced type for message/enum fields, `map<K,V>` signature for maps,
    /// empty for scalars
    pub type_name: String,
    /// The referenced type (map value for maps) is declared in this file
    pub local: bool,
    /// Owning `oneof` group, empty if none
    pub oneof: String,
    pub deprecated: bool,
}

impl Field {
    /// Human-readable type, as shown in findings
    pub fn type_display(&self) -> String {
        match self.field_type {
            FieldType::Scalar(kind) => kind.as_str().to_string(),
            _ => self.type_name.clone(),
        }
    }

    pub fn in_oneof(&self) -> bool {
        !self.oneof.is_empty()
    }
}

/// A message type with its nested declarations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub name: String,
    /// Fully-qualified name, e.g. `pkg.Outer.Inner`
    pub full_name: String,
    /// Fields keyed by number
    pub fields: BTreeMap<u32, Field>,
    /// Field name -> number
    pub field_names: BTreeMap<String, u32>,
    /// Nested messages keyed by simple name
    pub messages: BTreeMap<String, Message>,
    /// Nested enums keyed by simple name
    pub enums: BTreeMap<String, Enum>,
    /// `oneof` group name -> member field numbers in declaration order
    pub oneofs: BTreeMap<String, Vec<u32>>,
}

impl Message {
    pub fn field(&self, number: u32) -> Option<&Field> {
        self.fields.get(&number)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.field_names.get(name).and_then(|n| self.fields.get(n))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,
    pub number: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enum {
    pub name: String,
    pub full_name: String,
    /// Values keyed by number
    pub values: BTreeMap<i32, EnumValue>,
    /// Value name -> number
    pub value_names: BTreeMap<String, i32>,
}

impl Enum {
    pub fn value_by_name(&self, name: &str) -> Option<&EnumValue> {
        self.value_names.get(name).and_then(|n| self.values.get(n))
    }
}

/// An RPC method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub input_type: String,
    /// `input_type` is declared in this file
    pub input_local: bool,
    pub output_type: String,
    pub output_local: bool,
    pub client_streaming: bool,
    pub server_streaming: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub full_name: String,
    pub methods: BTreeMap<String, Method>,
}

// =============================================================================
// Schema Graph
// =============================================================================

/// One schema version
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaGraph {
    /// Package name, empty for the root package
    pub package: String,
    pub syntax: Syntax,
    pub imports: Vec<String>,
    /// Top-level messages keyed by fully-qualified name
    pub messages: BTreeMap<String, Message>,
    /// Top-level enums keyed by fully-qualified name
    pub enums: BTreeMap<String, Enum>,
    /// Services keyed by fully-qualified name
    pub services: BTreeMap<String, Service>,
}

impl SchemaGraph {
    /// Find a message at any nesting depth
    pub fn message(&self, full_name: &str) -> Option<&Message> {
        self.messages
            .values()
            .find_map(|m| find_nested_message(m, full_name))
    }

    /// Find an enum at any nesting depth
    pub fn enumeration(&self, full_name: &str) -> Option<&Enum> {
        if let Some(e) = self.enums.get(full_name) {
            return Some(e);
        }
        self.all_messages()
            .into_iter()
            .find_map(|m| m.enums.values().find(|e| e.full_name == full_name))
    }

    /// Every message in declaration-tree preorder, nested ones included
    pub fn all_messages(&self) -> Vec<&Message> {
        let mut out = Vec::new();
        for message in self.messages.values() {
            collect_messages(message, &mut out);
        }
        out
    }

    pub fn service(&self, full_name: &str) -> Option<&Service> {
        self.services.get(full_name)
    }
}

fn find_nested_message<'a>(message: &'a Message, full_name: &str) -> Option<&'a Message> {
    if message.full_name == full_name {
        return Some(message);
    }
    let prefix_len = message.full_name.len();
    let is_descendant = full_name.len() > prefix_len
        && full_name.starts_with(message.full_name.as_str())
        && full_name.as_bytes()[prefix_len] == b'.';
    if !is_descendant {
        return None;
    }
    message
        .messages
        .values()
        .find_map(|m| find_nested_message(m, full_name))
}

fn collect_messages<'a>(message: &'a Message, out: &mut Vec<&'a Message>) {
    out.push(message);
    for nested in message.messages.values() {
        collect_messages(nested, out);
    }
}

/// Join a scope and a simple name into a fully-qualified name
pub fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", scope, name)
    }
}
