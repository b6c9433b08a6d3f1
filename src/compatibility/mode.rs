//! Compatibility modes
//!
//! Confluent-style evolution levels. Parsing is a case-sensitive exact match
//! against the canonical names.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::violation::Severity;
use crate::error::SchemaError;

/// Read/write direction being validated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompatibilityMode {
    /// No checking at all
    None,
    /// New reader, old writer (default)
    #[default]
    Backward,
    /// Old reader, new writer
    Forward,
    /// Both directions
    Full,
    BackwardTransitive,
    ForwardTransitive,
    FullTransitive,
}

impl CompatibilityMode {
    pub const ALL: [CompatibilityMode; 7] = [
        CompatibilityMode::None,
        CompatibilityMode::Backward,
        CompatibilityMode::Forward,
        CompatibilityMode::Full,
        CompatibilityMode::BackwardTransitive,
        CompatibilityMode::ForwardTransitive,
        CompatibilityMode::FullTransitive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Backward => "BACKWARD",
            Self::Forward => "FORWARD",
            Self::Full => "FULL",
            Self::BackwardTransitive => "BACKWARD_TRANSITIVE",
            Self::ForwardTransitive => "FORWARD_TRANSITIVE",
            Self::FullTransitive => "FULL_TRANSITIVE",
        }
    }

    /// Forward-family modes only guarantee old readers keep working
    pub fn is_forward_only(&self) -> bool {
        matches!(self, Self::Forward | Self::ForwardTransitive)
    }

    /// Whether the caller must check against every prior version
    pub fn is_transitive(&self) -> bool {
        matches!(
            self,
            Self::BackwardTransitive | Self::ForwardTransitive | Self::FullTransitive
        )
    }

    /// The per-pair mode a transitive mode applies to each historical version
    pub fn base(&self) -> Self {
        match self {
            Self::BackwardTransitive => Self::Backward,
            Self::ForwardTransitive => Self::Forward,
            Self::FullTransitive => Self::Full,
            other => *other,
        }
    }

    /// Severity of removing a field or an enum value.
    ///
    /// Old readers skip unknown data, so under forward-family modes a removal
    /// is advisory; new readers lose the declaration, so everywhere else it
    /// blocks.
    pub fn removal_severity(&self) -> Severity {
        if self.is_forward_only() {
            Severity::Warning
        } else {
            Severity::Error
        }
    }
}

impl fmt::Display for CompatibilityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompatibilityMode {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(mode) = Self::ALL.iter().find(|m| m.as_str() == s) {
            return Ok(*mode);
        }

        let matcher = SkimMatcherV2::default().ignore_case();
        let suggestion = Self::ALL
            .iter()
            .filter_map(|m| matcher.fuzzy_match(m.as_str(), s).map(|score| (score, m)))
            .max_by_key(|(score, m)| (*score, std::cmp::Reverse(m.as_str().len())))
            .map(|(_, m)| m.as_str().to_string());

        Err(SchemaError::UnknownMode {
            mode: s.to_string(),
            suggestion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_names() {
        for mode in CompatibilityMode::ALL {
            assert_eq!(mode.as_str().parse::<CompatibilityMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        let err = "backward".parse::<CompatibilityMode>().unwrap_err();
        match err {
            SchemaError::UnknownMode { mode, suggestion } => {
                assert_eq!(mode, "backward");
                assert_eq!(suggestion.as_deref(), Some("BACKWARD"));
            }
            other => panic!("Expected UnknownMode, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_mode_without_suggestion() {
        let err = "zzz".parse::<CompatibilityMode>().unwrap_err();
        assert!(matches!(err, SchemaError::UnknownMode { suggestion: None, .. }));
        assert!(err.to_string().contains("zzz"));
    }

    #[test]
    fn test_removal_severity_flip() {
        assert_eq!(CompatibilityMode::Forward.removal_severity(), Severity::Warning);
        assert_eq!(CompatibilityMode::ForwardTransitive.removal_severity(), Severity::Warning);
        assert_eq!(CompatibilityMode::Backward.removal_severity(), Severity::Error);
        assert_eq!(CompatibilityMode::Full.removal_severity(), Severity::Error);
        assert_eq!(CompatibilityMode::FullTransitive.removal_severity(), Severity::Error);
    }

    #[test]
    fn test_transitive_base() {
        assert!(CompatibilityMode::FullTransitive.is_transitive());
        assert_eq!(CompatibilityMode::FullTransitive.base(), CompatibilityMode::Full);
        assert!(!CompatibilityMode::Forward.is_transitive());
        assert_eq!(CompatibilityMode::Forward.base(), CompatibilityMode::Forward);
    }
}
