//! Configuration management for compatibility checks
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (protocompat.toml)
//! - Environment variables (PROTOCOMPAT__*)
//!
//! ## Example config file (protocompat.toml):
//! ```toml
//! [check]
//! mode = "FULL"
//! fail_on = "warning"
//!
//! [output]
//! format = "text"
//! verbose = true
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::compatibility::{CheckResult, CompatibilityMode};
use crate::report::ReportFormat;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompatConfig {
    #[serde(default)]
    pub check: CheckConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Check settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Compatibility mode applied when none is given on the command line
    #[serde(default)]
    pub mode: CompatibilityMode,

    /// Lowest severity that fails the gate
    #[serde(default)]
    pub fail_on: FailOn,
}

/// Which findings make the gate fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailOn {
    /// Only blocking findings
    #[default]
    Error,
    /// Blocking and advisory findings
    Warning,
}

impl FailOn {
    pub fn should_fail(&self, result: &CheckResult) -> bool {
        match self {
            FailOn::Error => !result.compatible,
            FailOn::Warning => !result.compatible || result.summary.warnings > 0,
        }
    }
}

impl std::str::FromStr for FailOn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(FailOn::Error),
            "warning" => Ok(FailOn::Warning),
            other => Err(format!("unknown fail-on level '{}' (expected error or warning)", other)),
        }
    }
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: ReportFormat,

    /// List informational findings too
    #[serde(default)]
    pub verbose: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            mode: CompatibilityMode::Backward,
            fail_on: FailOn::Error,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::Text,
            verbose: false,
        }
    }
}

impl CompatConfig {
    /// Load configuration, layering an explicit file over the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "protocompat.toml",
            ".protocompat.toml",
            "config/protocompat.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "protocompat") {
            let xdg_config = config_dir.config_dir().join("protocompat.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // PROTOCOMPAT__CHECK__MODE=FULL etc.
        builder = builder.add_source(
            Environment::with_prefix("PROTOCOMPAT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compatibility::{Category, RuleId, Severity, Violation};
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = CompatConfig::default();
        assert_eq!(config.check.mode, CompatibilityMode::Backward);
        assert_eq!(config.check.fail_on, FailOn::Error);
        assert_eq!(config.output.format, ReportFormat::Text);
        assert!(!config.output.verbose);
    }

    #[test]
    fn test_serialize_config() {
        let config = CompatConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[check]"));
        assert!(toml_str.contains("[output]"));
        assert!(toml_str.contains("mode = \"BACKWARD\""));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[check]\nmode = \"FULL_TRANSITIVE\"\nfail_on = \"warning\"\n\n[output]\nverbose = true\n",
        )
        .unwrap();

        let config = CompatConfig::load_from(path.to_str()).unwrap();
        assert_eq!(config.check.mode, CompatibilityMode::FullTransitive);
        assert_eq!(config.check.fail_on, FailOn::Warning);
        assert!(config.output.verbose);
        assert_eq!(config.output.format, ReportFormat::Text);
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = CompatConfig::default();
        config.check.mode = CompatibilityMode::Forward;
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = CompatConfig::load_from(path.to_str()).unwrap();
        assert_eq!(loaded.check.mode, CompatibilityMode::Forward);
    }

    #[test]
    fn test_fail_on_warning_gate() {
        let warning = Violation::new(RuleId::FieldRenamed, Severity::Warning, Category::Field, "a.B.c", "renamed");
        let result = CheckResult::new(CompatibilityMode::Backward, vec![warning]);
        assert!(result.compatible);
        assert!(!FailOn::Error.should_fail(&result));
        assert!(FailOn::Warning.should_fail(&result));
        assert!(!FailOn::Warning.should_fail(&CheckResult::empty(CompatibilityMode::Backward)));
    }
}
