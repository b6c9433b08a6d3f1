//! Version history policy
//!
//! The comparator only ever looks at two graphs. Deciding which prior
//! versions a candidate must be checked against is done here: transitive
//! modes check every stored version, the others only the newest one.
//!
//! A history directory holds one parsed AST per version, named after the
//! version it captures:
//!
//! ```text
//! history/
//! ├── v1.0.0.json
//! ├── v1.1.0.json
//! └── v2.0.0.json
//! ```

use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::comparator::Comparator;
use super::mode::CompatibilityMode;
use super::violation::CheckResult;
use crate::ast::FileAst;
use crate::error::Result;
use crate::graph::{self, SchemaGraph};
use crate::version::SchemaVersion;

/// One stored schema version
#[derive(Debug, Clone)]
pub struct VersionedGraph {
    pub version: SchemaVersion,
    pub graph: SchemaGraph,
}

/// Result of checking a candidate against one stored version
#[derive(Debug, Clone, Serialize)]
pub struct VersionCheck {
    pub version: SchemaVersion,
    pub result: CheckResult,
}

/// Results of checking a candidate against its history
#[derive(Debug, Clone, Serialize)]
pub struct HistoryReport {
    pub mode: CompatibilityMode,
    /// True iff every per-version result is compatible
    pub compatible: bool,
    /// Oldest first
    pub checks: Vec<VersionCheck>,
}

impl HistoryReport {
    /// Versions the candidate is incompatible with
    pub fn failing_versions(&self) -> impl Iterator<Item = &SchemaVersion> {
        self.checks
            .iter()
            .filter(|c| !c.result.compatible)
            .map(|c| &c.version)
    }
}

/// Check `candidate` against the versions its mode requires.
///
/// `history` may be in any order. Each pair is checked with the base mode,
/// so a transitive mode applies its direction to every stored version.
pub fn check_history(
    mode: CompatibilityMode,
    history: &[VersionedGraph],
    candidate: &SchemaGraph,
) -> HistoryReport {
    let mut ordered: Vec<&VersionedGraph> = history.iter().collect();
    ordered.sort_by(|a, b| a.version.cmp(&b.version));

    let targets: Vec<&VersionedGraph> = if mode.is_transitive() {
        ordered
    } else {
        ordered.last().copied().into_iter().collect()
    };

    let mut comparator = Comparator::new();
    let checks: Vec<VersionCheck> = targets
        .into_iter()
        .map(|stored| {
            debug!(version = %stored.version, mode = %mode, "checking against stored version");
            VersionCheck {
                version: stored.version.clone(),
                result: comparator.compare(mode.base(), &stored.graph, candidate),
            }
        })
        .collect();

    HistoryReport {
        mode,
        compatible: checks.iter().all(|c| c.result.compatible),
        checks,
    }
}

/// Load every `v<semver>.json` AST under `dir`, sorted by version.
///
/// Files whose names are not versions are skipped with a warning. A file that
/// is named like a version but fails to parse or build is an error.
pub fn load_history(dir: &Path) -> Result<Vec<VersionedGraph>> {
    let mut versions = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        let version = match SchemaVersion::from_path(path) {
            Ok(v) => v,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping non-version file");
                continue;
            }
        };

        let content = std::fs::read_to_string(path)?;
        let ast = FileAst::from_json(&content)?;
        let graph = graph::build(&ast)?;
        debug!(version = %version, messages = graph.messages.len(), "loaded schema version");
        versions.push(VersionedGraph { version, graph });
    }

    versions.sort_by(|a, b| a.version.cmp(&b.version));
    Ok(versions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FieldDecl, MessageDecl};
    use tempfile::tempdir;

    fn user(fields: Vec<FieldDecl>) -> FileAst {
        FileAst {
            package: Some("acme".to_string()),
            messages: vec![MessageDecl {
                name: "User".to_string(),
                fields,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn versioned(tag: &str, ast: &FileAst) -> VersionedGraph {
        VersionedGraph {
            version: SchemaVersion::parse(tag).unwrap(),
            graph: graph::build(ast).unwrap(),
        }
    }

    /// v1 had `legacy`, v2 dropped it; the candidate matches v2
    fn history() -> Vec<VersionedGraph> {
        vec![
            versioned(
                "v2.0.0",
                &user(vec![FieldDecl::new("id", 1, "int64")]),
            ),
            versioned(
                "v1.0.0",
                &user(vec![FieldDecl::new("id", 1, "int64"), FieldDecl::new("legacy", 2, "string")]),
            ),
        ]
    }

    #[test]
    fn test_non_transitive_checks_latest_only() {
        let candidate = graph::build(&user(vec![FieldDecl::new("id", 1, "int64")])).unwrap();
        let report = check_history(CompatibilityMode::Backward, &history(), &candidate);

        assert_eq!(report.checks.len(), 1);
        assert_eq!(report.checks[0].version.tag_string(), "v2.0.0");
        assert!(report.compatible);
    }

    #[test]
    fn test_transitive_checks_every_version() {
        let candidate = graph::build(&user(vec![FieldDecl::new("id", 1, "int64")])).unwrap();
        let report = check_history(CompatibilityMode::BackwardTransitive, &history(), &candidate);

        assert_eq!(report.checks.len(), 2);
        assert_eq!(report.checks[0].version.tag_string(), "v1.0.0");
        assert!(!report.compatible);
        let failing: Vec<String> = report.failing_versions().map(|v| v.tag_string()).collect();
        assert_eq!(failing, vec!["v1.0.0"]);
        assert_eq!(report.checks[0].result.mode, CompatibilityMode::Backward);
    }

    #[test]
    fn test_empty_history_is_compatible() {
        let candidate = graph::build(&user(vec![])).unwrap();
        let report = check_history(CompatibilityMode::FullTransitive, &[], &candidate);
        assert!(report.checks.is_empty());
        assert!(report.compatible);
    }

    #[test]
    fn test_load_history_sorts_and_skips() {
        let dir = tempdir().unwrap();
        let v1 = serde_json::to_string(&user(vec![FieldDecl::new("id", 1, "int64")])).unwrap();
        std::fs::write(dir.path().join("v1.10.0.json"), &v1).unwrap();
        std::fs::write(dir.path().join("v1.2.0.json"), &v1).unwrap();
        std::fs::write(dir.path().join("notes.json"), "{}").unwrap();
        std::fs::write(dir.path().join("README.md"), "history").unwrap();

        let loaded = load_history(dir.path()).unwrap();
        let tags: Vec<String> = loaded.iter().map(|v| v.version.tag_string()).collect();
        assert_eq!(tags, vec!["v1.2.0", "v1.10.0"]);
        assert!(loaded[0].graph.message("acme.User").is_some());
    }

    #[test]
    fn test_load_history_rejects_bad_snapshot() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("v1.0.0.json"), "not json").unwrap();
        assert!(load_history(dir.path()).is_err());
    }
}
