//! Schema versioning utilities

use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::compatibility::CheckResult;
use crate::error::{Result, SchemaError};

/// A semantic version attached to one schema snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Semantic version (e.g., "1.2.3")
    pub version: Version,
}

/// Smallest version bump a check result calls for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bump {
    Patch,
    Minor,
    Major,
}

impl SchemaVersion {
    pub fn new(version: Version) -> Self {
        Self { version }
    }

    /// Parse "1.2.3" or "v1.2.3"
    pub fn parse(version_str: &str) -> Result<Self> {
        let version_str = version_str.strip_prefix('v').unwrap_or(version_str);
        let version = Version::parse(version_str)?;
        Ok(Self::new(version))
    }

    /// Version from a snapshot file name such as `v1.2.0.json`
    pub fn from_path(path: &Path) -> Result<Self> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| SchemaError::InvalidVersion(path.display().to_string()))?;
        if !stem.starts_with('v') {
            return Err(SchemaError::InvalidVersion(stem.to_string()));
        }
        Self::parse(stem)
    }

    /// Get the tag string (e.g., "v1.2.3")
    pub fn tag_string(&self) -> String {
        format!("v{}", self.version)
    }

    /// The version that follows this one after a bump of the given kind
    pub fn bumped(&self, bump: Bump) -> Self {
        let v = &self.version;
        let version = match bump {
            Bump::Major => Version::new(v.major + 1, 0, 0),
            Bump::Minor => Version::new(v.major, v.minor + 1, 0),
            Bump::Patch => Version::new(v.major, v.minor, v.patch + 1),
        };
        Self::new(version)
    }
}

impl Bump {
    /// Blocking findings need a major bump, any other finding a minor one
    pub fn required_for(result: &CheckResult) -> Self {
        if !result.compatible {
            Bump::Major
        } else if result.violations.is_empty() {
            Bump::Patch
        } else {
            Bump::Minor
        }
    }
}

impl fmt::Display for Bump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Bump::Patch => "patch",
            Bump::Minor => "minor",
            Bump::Major => "major",
        };
        f.write_str(s)
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.version)
    }
}

impl PartialEq for SchemaVersion {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl Eq for SchemaVersion {}

impl PartialOrd for SchemaVersion {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SchemaVersion {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.version.cmp(&other.version)
    }
}
