//! CLI command implementations.

use super::RunArgs;
use crate::config::{Config, CONFIG_FILE_NAME};
use crate::core::error::{Error, Result};
use crate::core::mode::CheckMode;
use crate::core::runner::Runner;
use console::style;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Lines of captured output shown for a failed step.
const FAILURE_OUTPUT_LINES: usize = 40;

/// Run the pipeline.
pub fn run(config_path: Option<&Path>, args: &RunArgs) -> Result<ExitCode> {
    let config = Config::load_or_default(config_path)?;
    let mode = args.mode();

    if !args.ignored().is_empty() {
        tracing::debug!(args = ?args.ignored(), "Ignoring extra arguments");
    }

    let root = std::env::current_dir().map_err(|e| Error::io("get current dir", e))?;
    let capture = config.pipeline.capture_output;
    let activate = config.pipeline.activate.clone();
    let runner = Runner::new(config, root);

    eprintln!(
        "{} Mode: {}",
        style("•").cyan(),
        style(mode.name()).bold()
    );

    let result = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Internal {
            message: format!("Failed to create runtime: {e}"),
        })?
        .block_on(runner.run(mode))?;

    if result.activated {
        tracing::info!(script = %activate, "Ran tools in activated environment");
    }

    eprintln!();
    if result.success() {
        eprintln!(
            "{} All {} tools passed in {:.2?} ({} mode)",
            style("✓").green().bold(),
            result.passed_count(),
            result.duration,
            result.mode
        );
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(step) = result.failed_step() {
        eprintln!(
            "{} {}",
            style("✗").red().bold(),
            step.output.describe(&step.invocation)
        );

        if capture {
            let output = step.output.combined_output();
            for line in output.lines().take(FAILURE_OUTPUT_LINES) {
                eprintln!("    {line}");
            }
        }
    }

    Ok(super::exit_code(result.exit_code()))
}

/// List the pipeline steps.
pub fn list(config_path: Option<&Path>, mode: CheckMode) -> Result<ExitCode> {
    let config = Config::load_or_default(config_path)?;
    let activate = config.pipeline.activate.clone();
    let root = std::env::current_dir().map_err(|e| Error::io("get current dir", e))?;
    let runner = Runner::new(config, root);

    println!("{}", style(format!("Pipeline ({mode} mode):")).bold());
    println!("  activate: {activate} (if present)");
    for (index, (tool, invocation)) in runner.plan(mode).iter().enumerate() {
        println!(
            "  {}. {} - {}",
            index + 1,
            style(tool.name()).cyan(),
            tool.description()
        );
        println!("     {invocation}");
    }

    Ok(ExitCode::SUCCESS)
}

/// Write a default configuration file.
pub fn init(config_path: Option<&Path>, force: bool) -> Result<ExitCode> {
    let path = config_path.map_or_else(|| PathBuf::from(CONFIG_FILE_NAME), Path::to_path_buf);

    if path.exists() && !force {
        eprintln!(
            "{} Configuration already exists: {}",
            style("!").yellow(),
            path.display()
        );
        eprintln!("  Use --force to overwrite.");
        return Ok(ExitCode::FAILURE);
    }

    std::fs::write(&path, Config::default_toml()).map_err(|e| Error::io("write config", e))?;

    eprintln!("{} Created {}", style("✓").green(), path.display());
    Ok(ExitCode::SUCCESS)
}

/// Validate configuration.
pub fn validate(config_path: Option<&Path>) -> Result<ExitCode> {
    let loaded = match config_path {
        Some(path) => Config::load_from(path),
        None => Config::find_config_file().and_then(|path| Config::load_from(&path)),
    };

    match loaded {
        Ok(_) => {
            eprintln!("{} Configuration is valid", style("✓").green());
            Ok(ExitCode::SUCCESS)
        },
        Err(Error::ConfigNotFound { path }) => {
            eprintln!(
                "{} Configuration not found: {}",
                style("!").yellow(),
                path.display()
            );
            eprintln!("  Defaults apply. Run `lint-pipeline init` to write them out.");
            Ok(ExitCode::FAILURE)
        },
        Err(e) => {
            eprintln!(
                "{} Configuration validation failed: {}",
                style("✗").red(),
                e.report()
            );
            Ok(ExitCode::FAILURE)
        },
    }
}

/// Generate shell completions.
pub fn completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    clap_complete::generate(
        shell,
        &mut super::Cli::command(),
        "lint-pipeline",
        &mut std::io::stdout(),
    );
}
