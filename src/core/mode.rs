//! Check-mode selection.
//!
//! In check mode the formatter only reports what it would change. This is
//! what CI runs; developers run the default fix mode locally.

/// The argument that selects check mode.
pub const CHECK_FLAG: &str = "--check";

/// Whether the pipeline may modify files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CheckMode {
    /// Tools rewrite files in place.
    #[default]
    Fix,
    /// Verify only; used in continuous integration.
    Check,
}

impl CheckMode {
    /// Selects the mode from the first command-line argument.
    ///
    /// Only an exact `--check` selects check mode; any other value, or no
    /// argument at all, leaves the default.
    #[must_use]
    pub fn from_first_arg(arg: Option<&str>) -> Self {
        match arg {
            Some(CHECK_FLAG) => Self::Check,
            _ => Self::Fix,
        }
    }

    /// Maps the CLI `--check` flag to a mode.
    #[must_use]
    pub const fn from_flag(check: bool) -> Self {
        if check {
            Self::Check
        } else {
            Self::Fix
        }
    }

    /// Returns the mode's name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Fix => "fix",
            Self::Check => "check",
        }
    }

    /// Returns true if tools must not modify files.
    #[must_use]
    pub const fn is_check(&self) -> bool {
        matches!(self, Self::Check)
    }
}

impl std::fmt::Display for CheckMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
