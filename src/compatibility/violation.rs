//! Findings and check results

use serde::{Deserialize, Serialize};
use std::fmt;

use super::mode::CompatibilityMode;

/// Severity tier of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocking: flips the verdict to incompatible
    Error,
    /// Advisory
    Warning,
    /// Informational
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self, Severity::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of declaration a finding is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Package,
    Import,
    Message,
    Field,
    Enum,
    EnumValue,
    Service,
    Rpc,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Package => "package",
            Category::Import => "import",
            Category::Message => "message",
            Category::Field => "field",
            Category::Enum => "enum",
            Category::EnumValue => "enum_value",
            Category::Service => "service",
            Category::Rpc => "rpc",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable, machine-matchable rule identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleId {
    PackageChanged,
    ImportRemoved,
    ImportAdded,
    MessageRemoved,
    MessageAdded,
    FieldRemoved,
    FieldAdded,
    RequiredFieldAdded,
    FieldRenamed,
    FieldTypeChanged,
    FieldLabelChanged,
    FieldOneofChanged,
    EnumRemoved,
    EnumAdded,
    EnumValueRemoved,
    EnumValueAdded,
    EnumValueNumberChanged,
    ServiceRemoved,
    ServiceAdded,
    RpcRemoved,
    RpcAdded,
    RpcInputTypeChanged,
    RpcOutputTypeChanged,
    RpcClientStreamingChanged,
    RpcServerStreamingChanged,
}

impl RuleId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PackageChanged => "PACKAGE_CHANGED",
            Self::ImportRemoved => "IMPORT_REMOVED",
            Self::ImportAdded => "IMPORT_ADDED",
            Self::MessageRemoved => "MESSAGE_REMOVED",
            Self::MessageAdded => "MESSAGE_ADDED",
            Self::FieldRemoved => "FIELD_REMOVED",
            Self::FieldAdded => "FIELD_ADDED",
            Self::RequiredFieldAdded => "REQUIRED_FIELD_ADDED",
            Self::FieldRenamed => "FIELD_RENAMED",
            Self::FieldTypeChanged => "FIELD_TYPE_CHANGED",
            Self::FieldLabelChanged => "FIELD_LABEL_CHANGED",
            Self::FieldOneofChanged => "FIELD_ONEOF_CHANGED",
            Self::EnumRemoved => "ENUM_REMOVED",
            Self::EnumAdded => "ENUM_ADDED",
            Self::EnumValueRemoved => "ENUM_VALUE_REMOVED",
            Self::EnumValueAdded => "ENUM_VALUE_ADDED",
            Self::EnumValueNumberChanged => "ENUM_VALUE_NUMBER_CHANGED",
            Self::ServiceRemoved => "SERVICE_REMOVED",
            Self::ServiceAdded => "SERVICE_ADDED",
            Self::RpcRemoved => "RPC_REMOVED",
            Self::RpcAdded => "RPC_ADDED",
            Self::RpcInputTypeChanged => "RPC_INPUT_TYPE_CHANGED",
            Self::RpcOutputTypeChanged => "RPC_OUTPUT_TYPE_CHANGED",
            Self::RpcClientStreamingChanged => "RPC_CLIENT_STREAMING_CHANGED",
            Self::RpcServerStreamingChanged => "RPC_SERVER_STREAMING_CHANGED",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single compatibility finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub rule: RuleId,
    pub severity: Severity,
    pub category: Category,
    /// Human-readable description
    pub message: String,
    /// Dotted path to the element, e.g. `pkg.User.name`
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    /// Encoded data between the two versions is misread or rejected
    pub wire_breaking: bool,
    /// Generated code stops compiling or changes meaning
    pub source_breaking: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Violation {
    pub fn new(
        rule: RuleId,
        severity: Severity,
        category: Category,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule,
            severity,
            category,
            message: message.into(),
            location: location.into(),
            old_value: None,
            new_value: None,
            wire_breaking: false,
            source_breaking: false,
            suggestion: None,
        }
    }

    pub fn values(mut self, old: Option<String>, new: Option<String>) -> Self {
        self.old_value = old;
        self.new_value = new;
        self
    }

    pub fn breaking(mut self, wire: bool, source: bool) -> Self {
        self.wire_breaking = wire;
        self.source_breaking = source;
        self
    }

    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Aggregate counts over a list of findings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    pub wire_breaking: usize,
    pub source_breaking: usize,
}

impl Summary {
    pub fn from_violations(violations: &[Violation]) -> Self {
        let mut summary = Summary {
            total: violations.len(),
            ..Default::default()
        };
        for v in violations {
            match v.severity {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
                Severity::Info => summary.infos += 1,
            }
            if v.wire_breaking {
                summary.wire_breaking += 1;
            }
            if v.source_breaking {
                summary.source_breaking += 1;
            }
        }
        summary
    }
}

/// Outcome of comparing two schema versions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// True iff no finding is blocking
    pub compatible: bool,
    pub mode: CompatibilityMode,
    pub violations: Vec<Violation>,
    pub summary: Summary,
}

impl CheckResult {
    pub fn new(mode: CompatibilityMode, violations: Vec<Violation>) -> Self {
        let summary = Summary::from_violations(&violations);
        Self {
            compatible: !violations.iter().any(|v| v.severity.is_blocking()),
            mode,
            violations,
            summary,
        }
    }

    /// An empty, compatible result
    pub fn empty(mode: CompatibilityMode) -> Self {
        Self::new(mode, Vec::new())
    }

    pub fn mode_name(&self) -> &'static str {
        self.mode.as_str()
    }

    pub fn by_severity(&self, severity: Severity) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.severity == severity)
    }

    pub fn by_rule(&self, rule: RuleId) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.rule == rule)
    }
}
