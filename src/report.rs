//! Check result presentation
//!
//! Text output groups findings by severity, blocking ones first. Info
//! findings are only listed in verbose mode; they are always counted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::compatibility::{CheckResult, HistoryReport, Severity, Violation};
use crate::error::{Result, SchemaError};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!("unknown format '{}' (expected text or json)", other)),
        }
    }
}

/// Render one check result
pub fn render(result: &CheckResult, format: ReportFormat, verbose: bool) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(TextReport { result, verbose }.to_string()),
        ReportFormat::Json => Err(SchemaError::NotImplemented("json output")),
    }
}

/// Render a history check, one section per stored version
pub fn render_history(report: &HistoryReport, format: ReportFormat, verbose: bool) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(HistoryText { report, verbose }.to_string()),
        ReportFormat::Json => Err(SchemaError::NotImplemented("json output")),
    }
}

struct HistoryText<'a> {
    report: &'a HistoryReport,
    verbose: bool,
}

impl fmt::Display for HistoryText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.report.checks.is_empty() {
            return writeln!(f, "📭 No stored versions to check against");
        }
        for check in &self.report.checks {
            writeln!(f, "🔖 Against {}", check.version)?;
            let section = TextReport {
                result: &check.result,
                verbose: self.verbose,
            };
            writeln!(f, "{}", section)?;
        }
        if self.report.compatible {
            writeln!(f, "✅ Compatible with every checked version")
        } else {
            writeln!(f, "❌ Incompatible with at least one checked version")
        }
    }
}

struct TextReport<'a> {
    result: &'a CheckResult,
    verbose: bool,
}

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.result;
        writeln!(f, "🔍 Compatibility check ({})\n", result.mode_name())?;

        let sections = [
            (Severity::Error, "🔴 ERRORS"),
            (Severity::Warning, "🟡 WARNINGS"),
            (Severity::Info, "🔵 INFO"),
        ];
        for (severity, title) in sections {
            if severity == Severity::Info && !self.verbose {
                continue;
            }
            let findings: Vec<&Violation> = result.by_severity(severity).collect();
            if findings.is_empty() {
                continue;
            }
            writeln!(f, "{} ({}):", title, findings.len())?;
            for v in findings {
                write_violation(f, v, self.verbose)?;
            }
            writeln!(f)?;
        }

        let s = &result.summary;
        writeln!(f, "📊 SUMMARY:")?;
        writeln!(f, "   Errors:          {}", s.errors)?;
        writeln!(f, "   Warnings:        {}", s.warnings)?;
        writeln!(f, "   Info:            {}", s.infos)?;
        writeln!(f, "   Wire-breaking:   {}", s.wire_breaking)?;
        writeln!(f, "   Source-breaking: {}", s.source_breaking)?;

        if result.compatible {
            writeln!(f, "\n✅ Compatible")
        } else {
            writeln!(f, "\n❌ Incompatible")
        }
    }
}

fn write_violation(f: &mut fmt::Formatter<'_>, v: &Violation, verbose: bool) -> fmt::Result {
    let flags: Vec<&str> = [(v.wire_breaking, "wire"), (v.source_breaking, "source")]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect();
    write!(f, "   [{}] {}: {}", v.rule, v.location, v.message)?;
    if flags.is_empty() {
        writeln!(f)?;
    } else {
        writeln!(f, " [{}]", flags.join(", "))?;
    }

    if verbose {
        match (&v.old_value, &v.new_value) {
            (Some(old), Some(new)) => writeln!(f, "      - {} -> {}", old, new)?,
            (Some(old), None) => writeln!(f, "      - was: {}", old)?,
            (None, Some(new)) => writeln!(f, "      - now: {}", new)?,
            (None, None) => {}
        }
    }
    if let Some(suggestion) = &v.suggestion {
        writeln!(f, "      💡 {}", suggestion)?;
    }
    Ok(())
}
