//! Familiar Protocol Compatibility
//!
//! Detects wire- and source-breaking changes between two versions of a
//! protocol schema (messages, enums, services) before the new version ships.
//!
//! ## Features
//!
//! - **Schema Graph**: Fully-qualified, immutable model built from the parser AST
//! - **Compatibility Modes**: NONE, BACKWARD, FORWARD, FULL and their transitive forms
//! - **Severity Tiers**: Blocking errors, advisory warnings, informational findings
//! - **Wire Awareness**: Lossless scalar widenings are accepted silently
//! - **History Checks**: Transitive modes check against every stored version
//!
//! ## Pipeline
//!
//! ```text
//! FileAst (JSON) ──build──▶ SchemaGraph ─┐
//!                                        ├─compare(mode)──▶ CheckResult ──▶ report
//! FileAst (JSON) ──build──▶ SchemaGraph ─┘
//! ```

pub mod ast;
pub mod compatibility;
pub mod config;
pub mod error;
pub mod graph;
pub mod report;
pub mod version;

pub use ast::FileAst;
pub use compatibility::{compare, CheckResult, Comparator, CompatibilityMode, Severity, Violation};
pub use config::{CompatConfig, FailOn};
pub use error::{Result, SchemaError};
pub use graph::{build, SchemaGraph};
pub use report::ReportFormat;
pub use version::{Bump, SchemaVersion};
