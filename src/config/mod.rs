//! Configuration handling for lint-pipeline.
//!
//! The configuration file is optional. Every key has a default, and the
//! defaults reproduce the standard pipeline:
//!
//! ```text
//! isort --settings-path .isort.cfg .
//! black --line-length 120 --skip-string-normalization [--check] .
//! flake8 --config .flake8
//! mypy .
//! ```

use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "lint-pipeline.toml";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Pipeline-wide settings.
    pub pipeline: PipelineConfig,
    /// Import sorter settings.
    pub isort: IsortConfig,
    /// Formatter settings.
    pub black: BlackConfig,
    /// Style checker settings.
    pub flake8: Flake8Config,
    /// Type checker settings.
    pub mypy: MypyConfig,
}

impl Config {
    /// Loads configuration from the working directory, or a given path.
    ///
    /// An explicit path must exist; the default location may be absent.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        match Self::find_config_file() {
            Ok(path) => Self::load_from(&path),
            Err(Error::ConfigNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| Error::io("read config", e))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::config_parse(format!("invalid TOML in {}", path.display()), e))?;

        config.validate()?;

        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Finds the configuration file in the working directory.
    pub fn find_config_file() -> Result<PathBuf> {
        let cwd = std::env::current_dir().map_err(|e| Error::io("get current dir", e))?;
        let config_path = cwd.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(config_path)
        } else {
            Err(Error::ConfigNotFound { path: config_path })
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if let Some(ref timeout) = self.pipeline.timeout {
            if humantime::parse_duration(timeout).is_err() {
                return Err(Error::config_invalid(
                    "pipeline.timeout",
                    format!("Invalid duration: {timeout}"),
                ));
            }
        }

        if self.pipeline.shell.trim().is_empty() {
            return Err(Error::config_invalid("pipeline.shell", "must not be empty"));
        }

        if self.black.line_length == 0 {
            return Err(Error::config_invalid(
                "black.line_length",
                "must be greater than zero",
            ));
        }

        let paths = [
            ("isort.settings_path", &self.isort.settings_path),
            ("isort.target", &self.isort.target),
            ("black.target", &self.black.target),
            ("flake8.config", &self.flake8.config),
            ("mypy.target", &self.mypy.target),
        ];
        for (field, value) in paths {
            if value.trim().is_empty() {
                return Err(Error::config_invalid(field, "must not be empty"));
            }
        }

        let programs = [
            ("isort.program", &self.isort.tool.program),
            ("black.program", &self.black.tool.program),
            ("flake8.program", &self.flake8.tool.program),
            ("mypy.program", &self.mypy.tool.program),
        ];
        for (field, program) in programs {
            if program.as_deref().is_some_and(|p| p.trim().is_empty()) {
                return Err(Error::config_invalid(field, "must not be empty"));
            }
        }

        Ok(())
    }

    /// Returns the configured timeout for a single tool, if any.
    ///
    /// Callers should run [`Config::validate`] first; an unparseable value
    /// is treated as no timeout.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.pipeline
            .timeout
            .as_deref()
            .and_then(|s| humantime::parse_duration(s).ok())
    }

    /// Generates default configuration as a string.
    #[must_use]
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Pipeline-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Activation script, relative to the working directory.
    pub activate: String,
    /// Shell used to source the activation script.
    pub shell: String,
    /// Per-tool timeout. Unset means wait indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    /// Capture tool output and show it only on failure.
    pub capture_output: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            activate: "venv/bin/activate".to_string(),
            shell: "sh".to_string(),
            timeout: None,
            capture_output: false,
        }
    }
}

/// Settings shared by every tool table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Program to run instead of the tool's default name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    /// Arguments inserted before the tool's target.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_args: Vec<String>,
}

impl ToolConfig {
    /// Returns the configured program, or `default`.
    #[must_use]
    pub fn program_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.program.as_deref().unwrap_or(default)
    }
}

/// Import sorter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IsortConfig {
    /// Settings file passed via `--settings-path`.
    pub settings_path: String,
    /// Directory tree to sort.
    pub target: String,
    /// Program override and extra arguments.
    #[serde(flatten)]
    pub tool: ToolConfig,
}

impl Default for IsortConfig {
    fn default() -> Self {
        Self {
            settings_path: ".isort.cfg".to_string(),
            target: ".".to_string(),
            tool: ToolConfig::default(),
        }
    }
}

/// Formatter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlackConfig {
    /// Maximum line length.
    pub line_length: u32,
    /// Leave string quotes alone.
    pub skip_string_normalization: bool,
    /// Directory tree to format.
    pub target: String,
    /// Program override and extra arguments.
    #[serde(flatten)]
    pub tool: ToolConfig,
}

impl Default for BlackConfig {
    fn default() -> Self {
        Self {
            line_length: 120,
            skip_string_normalization: true,
            target: ".".to_string(),
            tool: ToolConfig::default(),
        }
    }
}

/// Style checker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Flake8Config {
    /// Configuration file passed via `--config`.
    pub config: String,
    /// Program override and extra arguments.
    #[serde(flatten)]
    pub tool: ToolConfig,
}

impl Default for Flake8Config {
    fn default() -> Self {
        Self {
            config: ".flake8".to_string(),
            tool: ToolConfig::default(),
        }
    }
}

/// Type checker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MypyConfig {
    /// Directory tree to type-check.
    pub target: String,
    /// Program override and extra arguments.
    #[serde(flatten)]
    pub tool: ToolConfig,
}

impl Default for MypyConfig {
    fn default() -> Self {
        Self {
            target: ".".to_string(),
            tool: ToolConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.pipeline.activate, "venv/bin/activate");
        assert_eq!(config.isort.settings_path, ".isort.cfg");
        assert_eq!(config.black.line_length, 120);
        assert!(config.black.skip_string_normalization);
        assert_eq!(config.flake8.config, ".flake8");
        assert_eq!(config.mypy.target, ".");
        assert!(config.timeout().is_none());
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_timeout() {
        let mut config = Config::default();
        config.pipeline.timeout = Some("soon".to_string());
        let err = config.validate().expect_err("should reject timeout");
        assert!(matches!(err, Error::ConfigInvalid { ref field, .. } if field == "pipeline.timeout"));
    }

    #[test]
    fn test_valid_timeout() {
        let mut config = Config::default();
        config.pipeline.timeout = Some("10m".to_string());
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_zero_line_length_rejected() {
        let mut config = Config::default();
        config.black.line_length = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_path_rejected() {
        let mut config = Config::default();
        config.flake8.config = "  ".to_string();
        let err = config.validate().expect_err("should reject empty path");
        assert!(matches!(err, Error::ConfigInvalid { ref field, .. } if field == "flake8.config"));
    }

    #[test]
    fn test_empty_program_rejected() {
        let mut config = Config::default();
        config.mypy.tool.program = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
[black]
line_length = 100

[mypy]
program = "dmypy"
extra_args = ["run", "--"]
"#,
        )
        .expect("parse");
        assert_eq!(config.black.line_length, 100);
        assert!(config.black.skip_string_normalization);
        assert_eq!(config.mypy.tool.program.as_deref(), Some("dmypy"));
        assert_eq!(config.mypy.tool.extra_args, ["run", "--"]);
        assert_eq!(config.isort.settings_path, ".isort.cfg");
    }

    #[test]
    fn test_default_toml_round_trips() {
        let toml = Config::default_toml();
        assert!(toml.contains("[pipeline]"));
        assert!(toml.contains("[black]"));
        let parsed: Config = toml::from_str(&toml).expect("parse generated config");
        assert_eq!(parsed.black.line_length, 120);
    }

    #[test]
    fn test_load_from_missing_path() {
        let temp = TempDir::new().expect("create temp dir");
        let err = Config::load_from(&temp.path().join(CONFIG_FILE_NAME)).expect_err("missing");
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn test_load_from_invalid_toml() {
        let temp = TempDir::new().expect("create temp dir");
        let path = temp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[black\nline_length = ").expect("write config");
        let err = Config::load_from(&path).expect_err("should fail to parse");
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_load_from_validates() {
        let temp = TempDir::new().expect("create temp dir");
        let path = temp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[pipeline]\ntimeout = \"never\"\n").expect("write config");
        let err = Config::load_from(&path).expect_err("should fail validation");
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }

    #[test]
    fn test_load_or_default_explicit_path() {
        let temp = TempDir::new().expect("create temp dir");
        let path = temp.path().join("custom.toml");
        std::fs::write(&path, "[flake8]\nconfig = \"tox.ini\"\n").expect("write config");
        let config = Config::load_or_default(Some(&path)).expect("load");
        assert_eq!(config.flake8.config, "tox.ini");
    }

    #[test]
    fn test_program_or() {
        let tool = ToolConfig::default();
        assert_eq!(tool.program_or("black"), "black");
        let tool = ToolConfig {
            program: Some("blackd".to_string()),
            extra_args: Vec::new(),
        };
        assert_eq!(tool.program_or("black"), "blackd");
    }
}
