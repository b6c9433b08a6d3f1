//! Graph Builder
//!
//! Converts a parsed [`FileAst`] into a [`SchemaGraph`]: assigns
//! fully-qualified names, classifies field types and labels, and rejects
//! duplicate declarations instead of letting a later one shadow an earlier one.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, trace};

use super::{
    qualify, Enum, EnumValue, Field, FieldLabel, FieldType, Message, Method, ScalarKind,
    SchemaGraph, Service, Syntax,
};
use crate::ast::{EnumDecl, FieldDecl, FileAst, MessageDecl, ServiceDecl};
use crate::error::{Result, SchemaError};

fn map_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^map\s*<\s*([\w.]+)\s*,\s*([\w.]+)\s*>$").expect("map pattern is valid")
    })
}

/// Kind of a named type declared in the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclKind {
    Message,
    Enum,
}

impl DeclKind {
    fn field_type(self) -> FieldType {
        match self {
            DeclKind::Message => FieldType::Message,
            DeclKind::Enum => FieldType::Enum,
        }
    }

    fn label(self) -> &'static str {
        match self {
            DeclKind::Message => "message",
            DeclKind::Enum => "enum",
        }
    }
}

/// Resolves type references against the types declared in this file
struct Resolver {
    declared: HashMap<String, DeclKind>,
}

impl Resolver {
    fn declare(&mut self, full_name: String, kind: DeclKind) -> Result<()> {
        if self.declared.contains_key(&full_name) {
            return Err(SchemaError::DuplicateDeclaration {
                kind: kind.label(),
                name: full_name,
            });
        }
        self.declared.insert(full_name, kind);
        Ok(())
    }

    fn declare_message(&mut self, scope: &str, decl: &MessageDecl) -> Result<()> {
        let full_name = qualify(scope, &decl.name);
        self.declare(full_name.clone(), DeclKind::Message)?;
        for nested in &decl.messages {
            self.declare_message(&full_name, nested)?;
        }
        for nested in &decl.enums {
            self.declare(qualify(&full_name, &nested.name), DeclKind::Enum)?;
        }
        Ok(())
    }

    /// Resolve `reference` as seen from `scope`, innermost scope first.
    ///
    /// Names that resolve to nothing in this file (imported types) are kept as
    /// written, classified as message references and marked non-local.
    fn resolve(&self, scope: &str, reference: &str) -> Resolved {
        if let Some(absolute) = reference.strip_prefix('.') {
            let found = self.declared.get(absolute);
            return Resolved {
                field_type: found.map(|k| k.field_type()).unwrap_or(FieldType::Message),
                name: absolute.to_string(),
                local: found.is_some(),
            };
        }

        let mut scope = scope;
        loop {
            let candidate = qualify(scope, reference);
            if let Some(kind) = self.declared.get(&candidate) {
                return Resolved {
                    field_type: kind.field_type(),
                    name: candidate,
                    local: true,
                };
            }
            if scope.is_empty() {
                break;
            }
            scope = match scope.rfind('.') {
                Some(idx) => &scope[..idx],
                None => "",
            };
        }

        Resolved {
            field_type: FieldType::Message,
            name: reference.to_string(),
            local: false,
        }
    }
}

/// Outcome of resolving one type reference
struct Resolved {
    field_type: FieldType,
    name: String,
    /// Declared in this file
    local: bool,
}

/// Build a schema graph from a parsed file
pub fn build(ast: &FileAst) -> Result<SchemaGraph> {
    let package = ast.package.clone().unwrap_or_default();
    let syntax = match ast.syntax.as_deref() {
        Some(tag) => Syntax::parse(tag)?,
        None => Syntax::default(),
    };

    let mut resolver = Resolver {
        declared: HashMap::new(),
    };
    for decl in &ast.messages {
        resolver.declare_message(&package, decl)?;
    }
    for decl in &ast.enums {
        resolver.declare(qualify(&package, &decl.name), DeclKind::Enum)?;
    }

    let mut graph = SchemaGraph {
        package: package.clone(),
        syntax,
        imports: ast.imports.clone(),
        ..Default::default()
    };

    for decl in &ast.messages {
        let message = build_message(&package, decl, &resolver)?;
        graph.messages.insert(message.full_name.clone(), message);
    }

    for decl in &ast.enums {
        let enumeration = build_enum(&package, decl)?;
        graph.enums.insert(enumeration.full_name.clone(), enumeration);
    }

    for decl in &ast.services {
        let service = build_service(&package, decl, &resolver)?;
        if graph.services.contains_key(&service.full_name) {
            return Err(SchemaError::DuplicateDeclaration {
                kind: "service",
                name: service.full_name,
            });
        }
        graph.services.insert(service.full_name.clone(), service);
    }

    debug!(
        package = %graph.package,
        syntax = %graph.syntax,
        messages = graph.messages.len(),
        enums = graph.enums.len(),
        services = graph.services.len(),
        "built schema graph"
    );

    Ok(graph)
}

fn build_message(scope: &str, decl: &MessageDecl, resolver: &Resolver) -> Result<Message> {
    let full_name = qualify(scope, &decl.name);
    trace!(message = %full_name, "building message");

    let mut message = Message {
        name: decl.name.clone(),
        full_name: full_name.clone(),
        ..Default::default()
    };

    for field in &decl.fields {
        let field = build_field(&full_name, field, "", resolver)?;
        insert_field(&mut message, field)?;
    }

    for oneof in &decl.oneofs {
        if message.oneofs.contains_key(&oneof.name) {
            return Err(SchemaError::DuplicateDeclaration {
                kind: "oneof",
                name: qualify(&full_name, &oneof.name),
            });
        }
        let mut members = Vec::with_capacity(oneof.fields.len());
        for field in &oneof.fields {
            let field = build_field(&full_name, field, &oneof.name, resolver)?;
            members.push(field.number);
            insert_field(&mut message, field)?;
        }
        message.oneofs.insert(oneof.name.clone(), members);
    }

    // Name clashes between nested declarations were rejected by the resolver
    for nested in &decl.messages {
        let nested = build_message(&full_name, nested, resolver)?;
        message.messages.insert(nested.name.clone(), nested);
    }
    for nested in &decl.enums {
        let nested = build_enum(&full_name, nested)?;
        message.enums.insert(nested.name.clone(), nested);
    }

    Ok(message)
}

fn insert_field(message: &mut Message, field: Field) -> Result<()> {
    if message.fields.contains_key(&field.number) {
        return Err(SchemaError::DuplicateFieldNumber {
            message: message.full_name.clone(),
            number: field.number,
        });
    }
    if message.field_names.contains_key(&field.name) {
        return Err(SchemaError::DuplicateFieldName {
            message: message.full_name.clone(),
            name: field.name,
        });
    }
    message.field_names.insert(field.name.clone(), field.number);
    message.fields.insert(field.number, field);
    Ok(())
}

fn build_field(
    message: &str,
    decl: &FieldDecl,
    oneof: &str,
    resolver: &Resolver,
) -> Result<Field> {
    let label = match decl.label.as_deref() {
        None => FieldLabel::default(),
        Some(label) => FieldLabel::parse(label).ok_or_else(|| SchemaError::InvalidLabel {
            field: qualify(message, &decl.name),
            label: label.to_string(),
        })?,
    };

    let written = decl.type_name.trim();
    let (field_type, type_name, local) = if let Some(caps) = map_pattern().captures(written) {
        let (value, local) = match ScalarKind::from_name(&caps[2]) {
            Some(kind) => (kind.as_str().to_string(), false),
            None => {
                let resolved = resolver.resolve(message, &caps[2]);
                (resolved.name, resolved.local)
            }
        };
        (FieldType::Map, format!("map<{},{}>", &caps[1], value), local)
    } else if let Some(kind) = ScalarKind::from_name(written) {
        (FieldType::Scalar(kind), String::new(), false)
    } else {
        let resolved = resolver.resolve(message, written);
        (resolved.field_type, resolved.name, resolved.local)
    };

    Ok(Field {
        name: decl.name.clone(),
        number: decl.number,
        field_type,
        label,
        type_name,
        local,
        oneof: oneof.to_string(),
        deprecated: decl.deprecated,
    })
}

fn build_enum(scope: &str, decl: &EnumDecl) -> Result<Enum> {
    let full_name = qualify(scope, &decl.name);
    let mut enumeration = Enum {
        name: decl.name.clone(),
        full_name,
        ..Default::default()
    };

    for value in &decl.values {
        if enumeration.values.contains_key(&value.number) {
            return Err(SchemaError::DuplicateEnumValueNumber {
                enumeration: enumeration.full_name,
                number: value.number,
            });
        }
        if enumeration.value_names.contains_key(&value.name) {
            return Err(SchemaError::DuplicateEnumValueName {
                enumeration: enumeration.full_name,
                name: value.name.clone(),
            });
        }
        enumeration.value_names.insert(value.name.clone(), value.number);
        enumeration.values.insert(
            value.number,
            EnumValue {
                name: value.name.clone(),
                number: value.number,
            },
        );
    }

    Ok(enumeration)
}

fn build_service(scope: &str, decl: &ServiceDecl, resolver: &Resolver) -> Result<Service> {
    let full_name = qualify(scope, &decl.name);
    let mut service = Service {
        name: decl.name.clone(),
        full_name,
        ..Default::default()
    };

    for rpc in &decl.rpcs {
        if service.methods.contains_key(&rpc.name) {
            return Err(SchemaError::DuplicateDeclaration {
                kind: "rpc",
                name: qualify(&service.full_name, &rpc.name),
            });
        }
        let input = resolver.resolve(scope, &rpc.input_type);
        let output = resolver.resolve(scope, &rpc.output_type);
        service.methods.insert(
            rpc.name.clone(),
            Method {
                name: rpc.name.clone(),
                input_type: input.name,
                input_local: input.local,
                output_type: output.name,
                output_local: output.local,
                client_streaming: rpc.client_streaming,
                server_streaming: rpc.server_streaming,
            },
        );
    }

    Ok(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{EnumValueDecl, OneofDecl, RpcDecl};

    fn user_file() -> FileAst {
        FileAst {
            package: Some("acme.v1".to_string()),
            syntax: Some("proto3".to_string()),
            imports: vec!["google/protobuf/timestamp.proto".to_string()],
            messages: vec![MessageDecl {
                name: "User".to_string(),
                fields: vec![
                    FieldDecl::new("id", 1, "int64"),
                    FieldDecl::new("status", 2, "Status"),
                    FieldDecl::new("tags", 3, "string").with_label("repeated"),
                    FieldDecl::new("attrs", 4, "map<string, Address>"),
                    FieldDecl::new("created_at", 5, "google.protobuf.Timestamp"),
                ],
                oneofs: vec![OneofDecl {
                    name: "contact".to_string(),
                    fields: vec![
                        FieldDecl::new("email", 6, "string"),
                        FieldDecl::new("phone", 7, "string"),
                    ],
                }],
                messages: vec![MessageDecl {
                    name: "Address".to_string(),
                    fields: vec![FieldDecl::new("city", 1, "string")],
                    ..Default::default()
                }],
                enums: vec![EnumDecl {
                    name: "Status".to_string(),
                    values: vec![
                        EnumValueDecl::new("STATUS_UNKNOWN", 0),
                        EnumValueDecl::new("STATUS_ACTIVE", 1),
                    ],
                }],
            }],
            enums: vec![],
            services: vec![ServiceDecl {
                name: "UserService".to_string(),
                rpcs: vec![RpcDecl::unary("GetUser", "User", ".acme.v1.User")],
            }],
        }
    }

    #[test]
    fn test_package_and_syntax() {
        let graph = build(&user_file()).unwrap();
        assert_eq!(graph.package, "acme.v1");
        assert_eq!(graph.syntax, Syntax::Proto3);
        assert_eq!(graph.imports.len(), 1);

        let bare = build(&FileAst::default()).unwrap();
        assert_eq!(bare.package, "");
        assert_eq!(bare.syntax, Syntax::Proto2);
    }

    #[test]
    fn test_fully_qualified_names() {
        let graph = build(&user_file()).unwrap();
        let user = &graph.messages["acme.v1.User"];
        assert_eq!(user.messages["Address"].full_name, "acme.v1.User.Address");
        assert_eq!(user.enums["Status"].full_name, "acme.v1.User.Status");
        assert!(graph.message("acme.v1.User.Address").is_some());
        assert!(graph.enumeration("acme.v1.User.Status").is_some());
        assert!(graph.service("acme.v1.UserService").is_some());
    }

    #[test]
    fn test_field_classification() {
        let graph = build(&user_file()).unwrap();
        let user = &graph.messages["acme.v1.User"];

        let id = user.field(1).unwrap();
        assert_eq!(id.field_type, FieldType::Scalar(ScalarKind::Int64));
        assert_eq!(id.label, FieldLabel::Optional);

        let status = user.field_by_name("status").unwrap();
        assert_eq!(status.field_type, FieldType::Enum);
        assert_eq!(status.type_name, "acme.v1.User.Status");

        assert_eq!(user.field(3).unwrap().label, FieldLabel::Repeated);

        let attrs = user.field(4).unwrap();
        assert_eq!(attrs.field_type, FieldType::Map);
        assert_eq!(attrs.type_name, "map<string,acme.v1.User.Address>");

        // Unresolvable references stay message references
        let created = user.field(5).unwrap();
        assert_eq!(created.field_type, FieldType::Message);
        assert_eq!(created.type_name, "google.protobuf.Timestamp");
    }

    #[test]
    fn test_oneof_members_are_fields() {
        let graph = build(&user_file()).unwrap();
        let user = &graph.messages["acme.v1.User"];
        assert_eq!(user.oneofs["contact"], vec![6, 7]);
        assert_eq!(user.field_by_name("email").unwrap().oneof, "contact");
        assert!(!user.field(1).unwrap().in_oneof());
    }

    #[test]
    fn test_rpc_types_resolved() {
        let graph = build(&user_file()).unwrap();
        let method = &graph.services["acme.v1.UserService"].methods["GetUser"];
        assert_eq!(method.input_type, "acme.v1.User");
        assert_eq!(method.output_type, "acme.v1.User");
        assert!(method.input_local && method.output_local);
    }

    #[test]
    fn test_imported_references_are_not_local() {
        let ast = FileAst {
            package: Some("acme".to_string()),
            messages: vec![MessageDecl {
                name: "Holder".to_string(),
                fields: vec![
                    FieldDecl::new("thing", 1, "acme.v2.Thing"),
                    FieldDecl::new("stamp", 2, ".google.protobuf.Timestamp"),
                    FieldDecl::new("self_ref", 3, "Holder"),
                    FieldDecl::new("things", 4, "map<string, acme.v2.Thing>"),
                ],
                ..Default::default()
            }],
            ..Default::default()
        };
        let graph = build(&ast).unwrap();
        let holder = graph.message("acme.Holder").unwrap();

        let thing = holder.field(1).unwrap();
        assert_eq!(thing.type_name, "acme.v2.Thing");
        assert!(!thing.local);
        assert_eq!(holder.field(2).unwrap().type_name, "google.protobuf.Timestamp");
        assert!(!holder.field(2).unwrap().local);
        assert!(holder.field(3).unwrap().local);
        assert!(!holder.field(4).unwrap().local);
    }

    #[test]
    fn test_duplicate_field_number_rejected() {
        let mut ast = user_file();
        ast.messages[0].fields.push(FieldDecl::new("other_id", 1, "int64"));
        let err = build(&ast).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateFieldNumber { number: 1, .. }));
    }

    #[test]
    fn test_duplicate_name_across_oneof_rejected() {
        let mut ast = user_file();
        ast.messages[0].fields.push(FieldDecl::new("email", 20, "string"));
        let err = build(&ast).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateFieldName { ref name, .. } if name == "email"));
    }

    #[test]
    fn test_duplicate_enum_values_rejected() {
        let mut ast = user_file();
        ast.enums.push(EnumDecl {
            name: "Role".to_string(),
            values: vec![EnumValueDecl::new("ADMIN", 0), EnumValueDecl::new("OWNER", 0)],
        });
        assert!(matches!(
            build(&ast).unwrap_err(),
            SchemaError::DuplicateEnumValueNumber { number: 0, .. }
        ));
    }

    #[test]
    fn test_duplicate_message_rejected() {
        let mut ast = user_file();
        ast.messages.push(MessageDecl {
            name: "User".to_string(),
            ..Default::default()
        });
        assert!(matches!(
            build(&ast).unwrap_err(),
            SchemaError::DuplicateDeclaration { kind: "message", .. }
        ));
    }

    #[test]
    fn test_invalid_label_rejected() {
        let mut ast = user_file();
        ast.messages[0].fields[0].label = Some("many".to_string());
        assert!(matches!(build(&ast).unwrap_err(), SchemaError::InvalidLabel { .. }));
    }
}
