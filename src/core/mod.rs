//! Core functionality for lint-pipeline.
//!
//! This module contains the main components:
//! - [`mode`]: Check-mode selection
//! - [`activation`]: Virtual-environment activation
//! - [`executor`]: Running tools as child processes
//! - [`runner`]: The fail-fast pipeline
//! - [`error`]: Error types and result handling

pub mod activation;
pub mod error;
pub mod executor;
pub mod mode;
pub mod runner;
