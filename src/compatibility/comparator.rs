//! Compatibility Engine
//!
//! Compares two schema graphs under a [`CompatibilityMode`] and reports every
//! discrepancy as a [`Violation`]. Comparison is total: it has no error path.
//!
//! Five passes run in a fixed order: package, imports, messages, enums,
//! services. Declarations are matched by package-relative name, so a package
//! rename is reported once instead of as a removal of every type. Every map is
//! walked in sorted key order, which makes the finding list reproducible.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

use super::mode::CompatibilityMode;
use super::violation::{Category, CheckResult, RuleId, Severity, Violation};
use super::wire::is_wire_compatible;
use crate::graph::{qualify, Enum, Field, FieldLabel, FieldType, Message, SchemaGraph, Service};

/// Runs the structural diff passes
///
/// Reusable: all per-call state is reset at the start of [`Comparator::compare`].
#[derive(Debug, Default)]
pub struct Comparator {
    mode: CompatibilityMode,
    old_package: String,
    new_package: String,
    violations: Vec<Violation>,
}

/// Compare two graphs with a fresh comparator
pub fn compare(mode: CompatibilityMode, old: &SchemaGraph, new: &SchemaGraph) -> CheckResult {
    Comparator::new().compare(mode, old, new)
}

impl Comparator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check evolving `old` into `new`
    pub fn compare(
        &mut self,
        mode: CompatibilityMode,
        old: &SchemaGraph,
        new: &SchemaGraph,
    ) -> CheckResult {
        self.violations.clear();
        self.mode = mode;
        self.old_package = old.package.clone();
        self.new_package = new.package.clone();

        if mode == CompatibilityMode::None {
            debug!("compatibility mode NONE, skipping checks");
            return CheckResult::empty(mode);
        }

        self.check_package(old, new);
        self.check_imports(old, new);
        self.check_messages(old, new);
        self.check_enums(old, new);
        self.check_services(old, new);

        let result = CheckResult::new(mode, std::mem::take(&mut self.violations));
        debug!(
            mode = %mode,
            compatible = result.compatible,
            total = result.summary.total,
            errors = result.summary.errors,
            "compatibility check finished"
        );
        result
    }

    fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    // =========================================================================
    // Package / imports
    // =========================================================================

    fn check_package(&mut self, old: &SchemaGraph, new: &SchemaGraph) {
        if old.package == new.package {
            return;
        }
        self.push(
            Violation::new(
                RuleId::PackageChanged,
                Severity::Error,
                Category::Package,
                "package",
                format!(
                    "Package changed from '{}' to '{}'",
                    old.package, new.package
                ),
            )
            .values(Some(old.package.clone()), Some(new.package.clone()))
            .breaking(false, true)
            .suggest("Keep the package name stable; publish renamed types under a new file instead"),
        );
    }

    fn check_imports(&mut self, old: &SchemaGraph, new: &SchemaGraph) {
        let old_imports: BTreeSet<&str> = old.imports.iter().map(String::as_str).collect();
        let new_imports: BTreeSet<&str> = new.imports.iter().map(String::as_str).collect();

        for removed in old_imports.difference(&new_imports) {
            self.push(
                Violation::new(
                    RuleId::ImportRemoved,
                    Severity::Warning,
                    Category::Import,
                    *removed,
                    format!("Import '{}' was removed", removed),
                )
                .values(Some(removed.to_string()), None),
            );
        }
        for added in new_imports.difference(&old_imports) {
            self.push(
                Violation::new(
                    RuleId::ImportAdded,
                    Severity::Info,
                    Category::Import,
                    *added,
                    format!("Import '{}' was added", added),
                )
                .values(None, Some(added.to_string())),
            );
        }
    }

    // =========================================================================
    // Messages
    // =========================================================================

    fn check_messages(&mut self, old: &SchemaGraph, new: &SchemaGraph) {
        let before = self.violations.len();
        self.diff_messages(
            old.messages.values().map(|m| (m.name.as_str(), m)).collect(),
            new.messages.values().map(|m| (m.name.as_str(), m)).collect(),
        );
        debug!(findings = self.violations.len() - before, "message pass done");
    }

    fn diff_messages(
        &mut self,
        old: BTreeMap<&str, &Message>,
        new: BTreeMap<&str, &Message>,
    ) {
        for (name, old_message) in &old {
            match new.get(name) {
                Some(new_message) => self.check_message(old_message, new_message),
                None => self.push(
                    Violation::new(
                        RuleId::MessageRemoved,
                        Severity::Error,
                        Category::Message,
                        old_message.full_name.as_str(),
                        format!("Message {} was removed", old_message.full_name),
                    )
                    .values(Some(old_message.full_name.clone()), None)
                    .breaking(true, true)
                    .suggest("Deprecate the message instead of removing it"),
                ),
            }
        }

        for (name, new_message) in &new {
            if old.contains_key(name) {
                continue;
            }
            self.push(
                Violation::new(
                    RuleId::MessageAdded,
                    Severity::Info,
                    Category::Message,
                    new_message.full_name.as_str(),
                    format!("Message {} was added", new_message.full_name),
                )
                .values(None, Some(new_message.full_name.clone())),
            );
        }
    }

    fn check_message(&mut self, old: &Message, new: &Message) {
        self.check_fields(old, new);

        self.diff_messages(
            old.messages.iter().map(|(k, v)| (k.as_str(), v)).collect(),
            new.messages.iter().map(|(k, v)| (k.as_str(), v)).collect(),
        );
        self.diff_enums(
            old.enums.iter().map(|(k, v)| (k.as_str(), v)).collect(),
            new.enums.iter().map(|(k, v)| (k.as_str(), v)).collect(),
        );
    }

    // =========================================================================
    // Fields
    // =========================================================================

    fn check_fields(&mut self, old: &Message, new: &Message) {
        for (number, old_field) in &old.fields {
            match new.fields.get(number) {
                Some(new_field) => {
                    let location = qualify(&new.full_name, &new_field.name);
                    self.check_field(&location, old_field, new_field);
                }
                None => {
                    let location = qualify(&old.full_name, &old_field.name);
                    self.push(
                        Violation::new(
                            RuleId::FieldRemoved,
                            self.mode.removal_severity(),
                            Category::Field,
                            location,
                            format!(
                                "Field '{}' (number {}) was removed from {}",
                                old_field.name, number, old.full_name
                            ),
                        )
                        .values(Some(describe_field(old_field)), None)
                        .breaking(false, true)
                        .suggest(format!(
                            "Reserve number {} and name '{}' instead of deleting the field",
                            number, old_field.name
                        )),
                    );
                }
            }
        }

        for (number, new_field) in &new.fields {
            if old.fields.contains_key(number) {
                continue;
            }
            let location = qualify(&new.full_name, &new_field.name);
            let violation = if new_field.label == FieldLabel::Required {
                Violation::new(
                    RuleId::RequiredFieldAdded,
                    Severity::Error,
                    Category::Field,
                    location,
                    format!(
                        "Required field '{}' (number {}) was added to {}",
                        new_field.name, number, new.full_name
                    ),
                )
                .breaking(true, true)
                .suggest("Add the field as optional")
            } else {
                Violation::new(
                    RuleId::FieldAdded,
                    Severity::Info,
                    Category::Field,
                    location,
                    format!(
                        "Field '{}' (number {}) was added to {}",
                        new_field.name, number, new.full_name
                    ),
                )
            };
            self.push(violation.values(None, Some(describe_field(new_field))));
        }
    }

    fn check_field(&mut self, location: &str, old: &Field, new: &Field) {
        if old.name != new.name {
            self.push(
                Violation::new(
                    RuleId::FieldRenamed,
                    Severity::Warning,
                    Category::Field,
                    location,
                    format!(
                        "Field number {} renamed from '{}' to '{}'",
                        old.number, old.name, new.name
                    ),
                )
                .values(Some(old.name.clone()), Some(new.name.clone()))
                .breaking(false, true),
            );
        }

        if self.type_changed(old, new) {
            self.push(
                Violation::new(
                    RuleId::FieldTypeChanged,
                    Severity::Error,
                    Category::Field,
                    location,
                    format!(
                        "Field '{}' changed type from {} to {}",
                        new.name,
                        old.type_display(),
                        new.type_display()
                    ),
                )
                .values(Some(old.type_display()), Some(new.type_display()))
                .breaking(true, true)
                .suggest("Add a new field with the new type and deprecate the old one"),
            );
        }

        if old.label != new.label {
            let widening = old.label == FieldLabel::Optional && new.label == FieldLabel::Repeated;
            let (severity, wire) = if widening {
                (Severity::Warning, false)
            } else {
                (Severity::Error, true)
            };
            self.push(
                Violation::new(
                    RuleId::FieldLabelChanged,
                    severity,
                    Category::Field,
                    location,
                    format!(
                        "Field '{}' changed label from {} to {}",
                        new.name, old.label, new.label
                    ),
                )
                .values(Some(old.label.to_string()), Some(new.label.to_string()))
                .breaking(wire, true),
            );
        }

        if old.oneof != new.oneof {
            let message = match (old.in_oneof(), new.in_oneof()) {
                (false, true) => format!("Field '{}' moved into oneof '{}'", new.name, new.oneof),
                (true, false) => format!("Field '{}' moved out of oneof '{}'", new.name, old.oneof),
                _ => format!(
                    "Field '{}' moved from oneof '{}' to '{}'",
                    new.name, old.oneof, new.oneof
                ),
            };
            self.push(
                Violation::new(
                    RuleId::FieldOneofChanged,
                    Severity::Error,
                    Category::Field,
                    location,
                    message,
                )
                .values(non_empty(&old.oneof), non_empty(&new.oneof))
                .breaking(true, true),
            );
        }
    }

    fn type_changed(&self, old: &Field, new: &Field) -> bool {
        match (old.field_type, new.field_type) {
            (FieldType::Scalar(a), FieldType::Scalar(b)) => a != b && !is_wire_compatible(a, b),
            (a, b) if a != b => true,
            _ => {
                relative_type(&self.old_package, &old.type_name, old.local)
                    != relative_type(&self.new_package, &new.type_name, new.local)
            }
        }
    }

    // =========================================================================
    // Enums
    // =========================================================================

    fn check_enums(&mut self, old: &SchemaGraph, new: &SchemaGraph) {
        let before = self.violations.len();
        self.diff_enums(
            old.enums.values().map(|e| (e.name.as_str(), e)).collect(),
            new.enums.values().map(|e| (e.name.as_str(), e)).collect(),
        );
        debug!(findings = self.violations.len() - before, "enum pass done");
    }

    fn diff_enums(&mut self, old: BTreeMap<&str, &Enum>, new: BTreeMap<&str, &Enum>) {
        for (name, old_enum) in &old {
            match new.get(name) {
                Some(new_enum) => self.check_enum_values(old_enum, new_enum),
                None => self.push(
                    Violation::new(
                        RuleId::EnumRemoved,
                        Severity::Error,
                        Category::Enum,
                        old_enum.full_name.as_str(),
                        format!("Enum {} was removed", old_enum.full_name),
                    )
                    .values(Some(old_enum.full_name.clone()), None)
                    .breaking(true, true),
                ),
            }
        }

        for (name, new_enum) in &new {
            if old.contains_key(name) {
                continue;
            }
            self.push(
                Violation::new(
                    RuleId::EnumAdded,
                    Severity::Info,
                    Category::Enum,
                    new_enum.full_name.as_str(),
                    format!("Enum {} was added", new_enum.full_name),
                )
                .values(None, Some(new_enum.full_name.clone())),
            );
        }
    }

    fn check_enum_values(&mut self, old: &Enum, new: &Enum) {
        // Numbers consumed by a renumbering are not also reported as removed/added
        let mut renumbered_old = HashSet::new();
        let mut renumbered_new = HashSet::new();

        for old_value in old.values.values() {
            let Some(new_value) = new.value_by_name(&old_value.name) else {
                continue;
            };
            let (name, old_number, new_number) = (&old_value.name, old_value.number, new_value.number);
            if old_number == new_number {
                continue;
            }
            renumbered_old.insert(old_number);
            renumbered_new.insert(new_number);
            self.push(
                Violation::new(
                    RuleId::EnumValueNumberChanged,
                    Severity::Error,
                    Category::EnumValue,
                    qualify(&new.full_name, name),
                    format!(
                        "Enum value {} changed number from {} to {}",
                        name, old_number, new_number
                    ),
                )
                .values(Some(old_number.to_string()), Some(new_number.to_string()))
                .breaking(true, true)
                .suggest("Keep enum value numbers stable; add a new value instead"),
            );
        }

        for (number, value) in &old.values {
            if renumbered_old.contains(number) || new.values.contains_key(number) {
                continue;
            }
            self.push(
                Violation::new(
                    RuleId::EnumValueRemoved,
                    self.mode.removal_severity(),
                    Category::EnumValue,
                    qualify(&old.full_name, &value.name),
                    format!(
                        "Enum value {} ({}) was removed from {}",
                        value.name, number, old.full_name
                    ),
                )
                .values(Some(format!("{} = {}", value.name, number)), None)
                .breaking(false, true)
                .suggest(format!("Reserve number {} instead of deleting the value", number)),
            );
        }

        for (number, value) in &new.values {
            if renumbered_new.contains(number) || old.values.contains_key(number) {
                continue;
            }
            self.push(
                Violation::new(
                    RuleId::EnumValueAdded,
                    Severity::Info,
                    Category::EnumValue,
                    qualify(&new.full_name, &value.name),
                    format!("Enum value {} ({}) was added to {}", value.name, number, new.full_name),
                )
                .values(None, Some(format!("{} = {}", value.name, number))),
            );
        }
    }

    // =========================================================================
    // Services
    // =========================================================================

    fn check_services(&mut self, old: &SchemaGraph, new: &SchemaGraph) {
        let before = self.violations.len();
        let old_services: BTreeMap<&str, &Service> =
            old.services.values().map(|s| (s.name.as_str(), s)).collect();
        let new_services: BTreeMap<&str, &Service> =
            new.services.values().map(|s| (s.name.as_str(), s)).collect();

        for (name, old_service) in &old_services {
            match new_services.get(name) {
                Some(new_service) => self.check_methods(old_service, new_service),
                None => self.push(
                    Violation::new(
                        RuleId::ServiceRemoved,
                        Severity::Error,
                        Category::Service,
                        old_service.full_name.as_str(),
                        format!("Service {} was removed", old_service.full_name),
                    )
                    .values(Some(old_service.full_name.clone()), None)
                    .breaking(true, true),
                ),
            }
        }

        for (name, new_service) in &new_services {
            if old_services.contains_key(name) {
                continue;
            }
            self.push(
                Violation::new(
                    RuleId::ServiceAdded,
                    Severity::Info,
                    Category::Service,
                    new_service.full_name.as_str(),
                    format!("Service {} was added", new_service.full_name),
                )
                .values(None, Some(new_service.full_name.clone())),
            );
        }
        debug!(findings = self.violations.len() - before, "service pass done");
    }

    fn check_methods(&mut self, old: &Service, new: &Service) {
        for (name, old_method) in &old.methods {
            let Some(new_method) = new.methods.get(name) else {
                self.push(
                    Violation::new(
                        RuleId::RpcRemoved,
                        Severity::Error,
                        Category::Rpc,
                        qualify(&old.full_name, name),
                        format!("RPC {} was removed from {}", name, old.full_name),
                    )
                    .values(Some(name.clone()), None)
                    .breaking(true, true),
                );
                continue;
            };

            let location = qualify(&new.full_name, name);

            let old_input = relative_type(&self.old_package, &old_method.input_type, old_method.input_local);
            let new_input = relative_type(&self.new_package, &new_method.input_type, new_method.input_local);
            if old_input != new_input {
                self.push(
                    Violation::new(
                        RuleId::RpcInputTypeChanged,
                        Severity::Error,
                        Category::Rpc,
                        location.as_str(),
                        format!(
                            "RPC {} input type changed from {} to {}",
                            name, old_method.input_type, new_method.input_type
                        ),
                    )
                    .values(Some(old_method.input_type.clone()), Some(new_method.input_type.clone()))
                    .breaking(true, true),
                );
            }

            let old_output = relative_type(&self.old_package, &old_method.output_type, old_method.output_local);
            let new_output = relative_type(&self.new_package, &new_method.output_type, new_method.output_local);
            if old_output != new_output {
                self.push(
                    Violation::new(
                        RuleId::RpcOutputTypeChanged,
                        Severity::Error,
                        Category::Rpc,
                        location.as_str(),
                        format!(
                            "RPC {} output type changed from {} to {}",
                            name, old_method.output_type, new_method.output_type
                        ),
                    )
                    .values(Some(old_method.output_type.clone()), Some(new_method.output_type.clone()))
                    .breaking(true, true),
                );
            }

            if old_method.client_streaming != new_method.client_streaming {
                self.push(
                    Violation::new(
                        RuleId::RpcClientStreamingChanged,
                        Severity::Error,
                        Category::Rpc,
                        location.as_str(),
                        format!(
                            "RPC {} client streaming changed from {} to {}",
                            name, old_method.client_streaming, new_method.client_streaming
                        ),
                    )
                    .values(
                        Some(old_method.client_streaming.to_string()),
                        Some(new_method.client_streaming.to_string()),
                    )
                    .breaking(true, true),
                );
            }

            if old_method.server_streaming != new_method.server_streaming {
                self.push(
                    Violation::new(
                        RuleId::RpcServerStreamingChanged,
                        Severity::Error,
                        Category::Rpc,
                        location.as_str(),
                        format!(
                            "RPC {} server streaming changed from {} to {}",
                            name, old_method.server_streaming, new_method.server_streaming
                        ),
                    )
                    .values(
                        Some(old_method.server_streaming.to_string()),
                        Some(new_method.server_streaming.to_string()),
                    )
                    .breaking(true, true),
                );
            }
        }

        for (name, new_method) in &new.methods {
            if old.methods.contains_key(name) {
                continue;
            }
            self.push(
                Violation::new(
                    RuleId::RpcAdded,
                    Severity::Info,
                    Category::Rpc,
                    qualify(&new.full_name, name),
                    format!("RPC {} was added to {}", name, new.full_name),
                )
                .values(
                    None,
                    Some(format!("{}({}) returns ({})", name, new_method.input_type, new_method.output_type)),
                ),
            );
        }
    }
}

/// `label type name = number`, as written in a schema
fn describe_field(field: &Field) -> String {
    format!(
        "{} {} {} = {}",
        field.label,
        field.type_display(),
        field.name,
        field.number
    )
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Strip the schema's own package from a reference declared in the same file,
/// including the value side of a `map<K,V>` signature. Imported references
/// are compared as written.
fn relative_type(package: &str, type_name: &str, local: bool) -> String {
    if !local {
        return type_name.to_string();
    }
    if let Some(inner) = type_name
        .strip_prefix("map<")
        .and_then(|rest| rest.strip_suffix('>'))
    {
        if let Some((key, value)) = inner.split_once(',') {
            return format!("map<{},{}>", key, strip_package(package, value));
        }
    }
    strip_package(package, type_name).to_string()
}

fn strip_package<'a>(package: &str, name: &'a str) -> &'a str {
    if package.is_empty() {
        return name;
    }
    name.strip_prefix(package)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(name)
}
