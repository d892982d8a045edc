//! The four pipeline tools and how each one is invoked.
//!
//! The order is fixed: imports are sorted before formatting so the
//! formatter sees the final import layout, and the style and type checkers
//! run last against formatted code.

use crate::config::Config;
use crate::core::executor::Invocation;
use crate::core::mode::{CheckMode, CHECK_FLAG};

/// A pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// Import sorter.
    Isort,
    /// Code formatter.
    Black,
    /// Style checker.
    Flake8,
    /// Static type checker.
    Mypy,
}

impl Tool {
    /// All tools, in the order they run.
    pub const ALL: [Self; 4] = [Self::Isort, Self::Black, Self::Flake8, Self::Mypy];

    /// Returns the tool's name (also its default program).
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Isort => "isort",
            Self::Black => "black",
            Self::Flake8 => "flake8",
            Self::Mypy => "mypy",
        }
    }

    /// Returns a short description of what the step does.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Isort => "Sort imports",
            Self::Black => "Format code",
            Self::Flake8 => "Check style",
            Self::Mypy => "Check types",
        }
    }

    /// Builds the command line for this tool.
    ///
    /// Only the formatter honors check mode.
    #[must_use]
    pub fn invocation(&self, config: &Config, mode: CheckMode) -> Invocation {
        match self {
            Self::Isort => {
                let isort = &config.isort;
                Invocation::new(isort.tool.program_or(self.name()))
                    .arg("--settings-path")
                    .arg(&isort.settings_path)
                    .args(&isort.tool.extra_args)
                    .arg(&isort.target)
            },
            Self::Black => {
                let black = &config.black;
                let mut invocation = Invocation::new(black.tool.program_or(self.name()))
                    .arg("--line-length")
                    .arg(black.line_length.to_string());
                if black.skip_string_normalization {
                    invocation = invocation.arg("--skip-string-normalization");
                }
                if mode.is_check() {
                    invocation = invocation.arg(CHECK_FLAG);
                }
                invocation.args(&black.tool.extra_args).arg(&black.target)
            },
            Self::Flake8 => {
                let flake8 = &config.flake8;
                Invocation::new(flake8.tool.program_or(self.name()))
                    .arg("--config")
                    .arg(&flake8.config)
                    .args(&flake8.tool.extra_args)
            },
            Self::Mypy => {
                let mypy = &config.mypy;
                Invocation::new(mypy.tool.program_or(self.name()))
                    .args(&mypy.tool.extra_args)
                    .arg(&mypy.target)
            },
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn argv(tool: Tool, config: &Config, mode: CheckMode) -> Vec<String> {
        let invocation = tool.invocation(config, mode);
        std::iter::once(invocation.program.clone())
            .chain(invocation.args.iter().cloned())
            .collect()
    }

    #[test]
    fn test_order_is_fixed() {
        assert_eq!(
            Tool::ALL.map(|t| t.name()),
            ["isort", "black", "flake8", "mypy"]
        );
    }

    #[test]
    fn test_default_isort_command() {
        let config = Config::default();
        assert_eq!(
            argv(Tool::Isort, &config, CheckMode::Fix),
            ["isort", "--settings-path", ".isort.cfg", "."]
        );
    }

    #[test]
    fn test_default_black_command_without_check() {
        let config = Config::default();
        assert_eq!(
            argv(Tool::Black, &config, CheckMode::Fix),
            [
                "black",
                "--line-length",
                "120",
                "--skip-string-normalization",
                "."
            ]
        );
    }

    #[test]
    fn test_black_command_with_check() {
        let config = Config::default();
        assert_eq!(
            argv(Tool::Black, &config, CheckMode::Check),
            [
                "black",
                "--line-length",
                "120",
                "--skip-string-normalization",
                "--check",
                "."
            ]
        );
    }

    #[test]
    fn test_check_mode_only_affects_black() {
        let config = Config::default();
        for tool in [Tool::Isort, Tool::Flake8, Tool::Mypy] {
            assert_eq!(
                argv(tool, &config, CheckMode::Fix),
                argv(tool, &config, CheckMode::Check),
                "{tool} should ignore check mode"
            );
        }
    }

    #[test]
    fn test_default_flake8_command() {
        let config = Config::default();
        assert_eq!(
            argv(Tool::Flake8, &config, CheckMode::Fix),
            ["flake8", "--config", ".flake8"]
        );
    }

    #[test]
    fn test_default_mypy_command() {
        let config = Config::default();
        assert_eq!(argv(Tool::Mypy, &config, CheckMode::Fix), ["mypy", "."]);
    }

    #[test]
    fn test_overrides_change_command_lines() {
        let mut config = Config::default();
        config.black.line_length = 88;
        config.black.skip_string_normalization = false;
        config.black.tool.program = Some("python3-black".to_string());
        config.flake8.config = "setup.cfg".to_string();
        config.mypy.tool.extra_args = vec!["--strict".to_string()];
        config.mypy.target = "src".to_string();

        assert_eq!(
            argv(Tool::Black, &config, CheckMode::Check),
            ["python3-black", "--line-length", "88", "--check", "."]
        );
        assert_eq!(
            argv(Tool::Flake8, &config, CheckMode::Fix),
            ["flake8", "--config", "setup.cfg"]
        );
        assert_eq!(
            argv(Tool::Mypy, &config, CheckMode::Fix),
            ["mypy", "--strict", "src"]
        );
    }
}
