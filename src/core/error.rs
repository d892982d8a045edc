//! Error types for lint-pipeline.
//!
//! A tool exiting non-zero is not an error here: it is a normal pipeline
//! result (see [`crate::core::runner::RunResult`]). These are the failures
//! that keep the pipeline from running at all.

use std::path::PathBuf;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Exit code used when a tool cannot be found, matching `sh`.
pub const EXIT_COMMAND_NOT_FOUND: i32 = 127;

/// Exit code for configuration problems (`EX_CONFIG` from sysexits.h).
pub const EXIT_CONFIG: i32 = 78;

/// All possible errors in lint-pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Configuration errors
    // =========================================================================
    /// Configuration file not found.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path where config was expected.
        path: PathBuf,
    },

    /// Failed to parse configuration file.
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        /// Description of the parse error.
        message: String,
        /// Underlying parser error, with the location of the problem.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {field} - {message}")]
    ConfigInvalid {
        /// Field name that is invalid.
        field: String,
        /// Description of why it's invalid.
        message: String,
    },

    // =========================================================================
    // Tool errors
    // =========================================================================
    /// A pipeline tool is not installed (or not on the active PATH).
    #[error("The program '{program}' is missing! Please install it")]
    ToolMissing {
        /// Program that could not be found.
        program: String,
    },

    // =========================================================================
    // I/O errors
    // =========================================================================
    /// File or process I/O error.
    #[error("I/O error: {message}")]
    Io {
        /// Description of what failed.
        message: String,
        /// Source error.
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Internal errors
    // =========================================================================
    /// Internal error (should never happen).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Creates a new configuration parse error.
    pub fn config_parse(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// Creates a new invalid configuration error.
    pub fn config_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a new I/O error with context.
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Formats the error followed by its causes, one per line.
    #[must_use]
    pub fn report(&self) -> String {
        let mut report = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            report.push_str(&format!("\n  Caused by: {cause}"));
            source = cause.source();
        }
        report
    }

    /// Returns an exit code appropriate for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::ToolMissing { .. } => EXIT_COMMAND_NOT_FOUND,
            Self::ConfigNotFound { .. } | Self::ConfigParse { .. } | Self::ConfigInvalid { .. } => {
                EXIT_CONFIG
            },
            Self::Io { .. } | Self::Internal { .. } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Display
    // =========================================================================

    #[test]
    fn test_display_config_not_found() {
        let err = Error::ConfigNotFound {
            path: PathBuf::from("/work/lint-pipeline.toml"),
        };
        assert_eq!(
            err.to_string(),
            "Configuration file not found: /work/lint-pipeline.toml"
        );
    }

    fn toml_error() -> toml::de::Error {
        toml::from_str::<toml::Value>("line_length = ").expect_err("should fail")
    }

    #[test]
    fn test_display_config_parse() {
        let err = Error::config_parse("invalid TOML in lint-pipeline.toml", toml_error());
        assert_eq!(
            err.to_string(),
            "Failed to parse configuration: invalid TOML in lint-pipeline.toml"
        );
    }

    #[test]
    fn test_display_config_invalid() {
        let err = Error::config_invalid("black.line_length", "must be greater than zero");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: black.line_length - must be greater than zero"
        );
    }

    #[test]
    fn test_display_tool_missing() {
        let err = Error::ToolMissing {
            program: "mypy".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "The program 'mypy' is missing! Please install it"
        );
    }

    #[test]
    fn test_display_io() {
        let err = Error::io("spawn black", std::io::Error::other("denied"));
        assert_eq!(err.to_string(), "I/O error: spawn black");
    }

    #[test]
    fn test_display_internal() {
        let err = Error::Internal {
            message: "unexpected state".to_string(),
        };
        assert_eq!(err.to_string(), "Internal error: unexpected state");
    }

    // =========================================================================
    // Exit codes
    // =========================================================================

    #[test]
    fn test_exit_code_tool_missing_matches_shell() {
        let err = Error::ToolMissing {
            program: "isort".into(),
        };
        assert_eq!(err.exit_code(), 127);
    }

    #[test]
    fn test_exit_code_config_errors() {
        assert_eq!(Error::config_parse("x", toml_error()).exit_code(), 78);
        assert_eq!(Error::config_invalid("x", "y").exit_code(), 78);
        assert_eq!(
            Error::ConfigNotFound {
                path: PathBuf::from("x")
            }
            .exit_code(),
            78
        );
    }

    #[test]
    fn test_exit_code_other_errors() {
        assert_eq!(Error::io("x", std::io::Error::other("y")).exit_code(), 1);
        assert_eq!(
            Error::Internal {
                message: "x".into()
            }
            .exit_code(),
            1
        );
    }

    // =========================================================================
    // Reports
    // =========================================================================

    #[test]
    fn test_report_includes_parser_location() {
        let err = Error::config_parse("invalid TOML in lint-pipeline.toml", toml_error());
        let report = err.report();
        assert!(report.starts_with("Failed to parse configuration: invalid TOML"));
        assert!(report.contains("Caused by: TOML parse error at line 1"));
    }

    #[test]
    fn test_report_includes_io_reason() {
        let err = Error::io("spawn black", std::io::Error::other("permission denied"));
        assert_eq!(
            err.report(),
            "I/O error: spawn black\n  Caused by: permission denied"
        );
    }

    #[test]
    fn test_report_without_source_is_display() {
        let err = Error::ToolMissing {
            program: "mypy".into(),
        };
        assert_eq!(err.report(), err.to_string());
    }
}
