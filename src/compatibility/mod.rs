//! Compatibility checking between schema versions
//!
//! Detects changes that break readers or generated code:
//! - Removed messages, enums, services or RPCs
//! - Removed fields or enum values (severity depends on the mode)
//! - Field type, label and oneof changes
//! - Enum value renumbering
//! - RPC signature and streaming changes
//!
//! Lossless widenings such as `int32` to `int64` are accepted silently.

pub mod comparator;
pub mod history;
pub mod mode;
pub mod violation;
pub mod wire;

pub use comparator::{compare, Comparator};
pub use history::{check_history, load_history, HistoryReport, VersionCheck, VersionedGraph};
pub use mode::CompatibilityMode;
pub use violation::{Category, CheckResult, RuleId, Severity, Summary, Violation};
pub use wire::is_wire_compatible;
