//! # lint-pipeline
//!
//! Runs a Python project's code-quality tools in a fixed order and stops at
//! the first failure:
//!
//! 1. `isort` sorts imports,
//! 2. `black` formats code (verify-only in check mode),
//! 3. `flake8` checks style,
//! 4. `mypy` checks types.
//!
//! If the project has a virtual environment (`venv/bin/activate`), it is
//! activated first so the tools come from it.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lint_pipeline::{CheckMode, Config, Runner};
//!
//! #[tokio::main]
//! async fn main() -> lint_pipeline::Result<()> {
//!     let config = Config::load_or_default(None)?;
//!     let runner = Runner::new(config, std::env::current_dir().expect("cwd"));
//!
//!     let result = runner.run(CheckMode::Check).await?;
//!     std::process::exit(result.exit_code());
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/lint-pipeline/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cli;
pub mod config;
pub mod core;
pub mod tools;

// Re-export main types for convenience
pub use config::Config;
pub use core::error::{Error, Result};
pub use core::mode::CheckMode;
pub use core::runner::{RunResult, Runner, StepResult};
pub use tools::Tool;
