//! Command-line interface for lint-pipeline.
//!
//! Running `lint-pipeline` with no subcommand runs the pipeline. Only the
//! first argument is inspected: an exact `--check` selects check mode and
//! anything else is ignored. The subcommand names are reserved:
//! - `run`: Run the pipeline (the default)
//! - `list`: Show the command lines that would run
//! - `init`: Write a default configuration file
//! - `validate`: Validate the configuration
//! - `completions`: Generate shell completions

mod commands;

use crate::core::error::Result;
use crate::core::mode::CheckMode;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Runs isort, black, flake8 and mypy, stopping at the first failure.
#[derive(Debug, Parser)]
#[command(
    name = "lint-pipeline",
    author,
    version,
    about = "Runs isort, black, flake8 and mypy, stopping at the first failure",
    long_about = r#"
lint-pipeline runs the project's code-quality tools in a fixed order:

  isort --settings-path .isort.cfg .
  black --line-length 120 --skip-string-normalization [--check] .
  flake8 --config .flake8
  mypy .

If venv/bin/activate exists it is sourced first. The first tool that fails
stops the run, and its exit status becomes ours.

Quick start:
  lint-pipeline           # fix formatting locally
  lint-pipeline --check   # verify only, for CI

Every path and option above can be changed in lint-pipeline.toml
(see `lint-pipeline init`).
"#,
    propagate_version = true,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Arguments for the default `run` action.
    #[command(flatten)]
    pub run: RunArgs,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use color output.
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Configuration file (default: ./lint-pipeline.toml if present).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Arguments for running the pipeline.
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Pass `--check` first to verify formatting without modifying files
    /// (for CI). Anything else runs in fix mode and is ignored.
    #[arg(
        value_name = "ARGS",
        num_args = 1..,
        allow_hyphen_values = true,
        trailing_var_arg = true
    )]
    pub args: Vec<String>,
}

impl RunArgs {
    /// Returns the mode selected by the first argument.
    #[must_use]
    pub fn mode(&self) -> CheckMode {
        CheckMode::from_first_arg(self.args.first().map(String::as_str))
    }

    /// Returns the arguments after the first, which have no effect.
    #[must_use]
    pub fn ignored(&self) -> &[String] {
        self.args.get(1..).unwrap_or_default()
    }
}

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Always use color.
    Always,
    /// Auto-detect color support.
    #[default]
    Auto,
    /// Never use color.
    Never,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the pipeline (default when no subcommand is given).
    Run(RunArgs),

    /// Show the steps and the exact command lines they run.
    List {
        /// Show the command lines for check mode.
        #[arg(long)]
        check: bool,
    },

    /// Write a default configuration file.
    Init {
        /// Overwrite existing configuration.
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the configuration file.
    Validate,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Runs the CLI.
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);
    setup_color(cli.color);

    let config = cli.config.as_deref();

    match cli.command {
        Some(Commands::Run(args)) => commands::run(config, &args),
        Some(Commands::List { check }) => commands::list(config, CheckMode::from_flag(check)),
        Some(Commands::Init { force }) => commands::init(config, force),
        Some(Commands::Validate) => commands::validate(config),
        Some(Commands::Completions { shell }) => {
            commands::completions(shell);
            Ok(ExitCode::SUCCESS)
        },
        None => commands::run(config, &cli.run),
    }
}

/// Converts a tool's exit code into a process exit code.
#[must_use]
pub fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(exit_status(code))
}

/// Narrows an exit code to a status byte.
///
/// Codes outside `0..=255` cannot be passed through and become 1.
fn exit_status(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

/// Sets up logging based on verbosity flags.
fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Sets up color output.
fn setup_color(choice: ColorChoice) {
    match choice {
        ColorChoice::Always => {
            console::set_colors_enabled(true);
            console::set_colors_enabled_stderr(true);
        },
        ColorChoice::Never => {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        },
        ColorChoice::Auto => {
            // Let console crate auto-detect
        },
    }
}
