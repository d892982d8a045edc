//! Main entry point for the `lint-pipeline` CLI.

use lint_pipeline::cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    match cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e.report());
            cli::exit_code(e.exit_code())
        },
    }
}
