//! The lint pipeline.
//!
//! Steps run one at a time in [`Tool::ALL`] order. The first step that does
//! not succeed ends the run, and its exit code becomes the run's exit code.

use crate::config::Config;
use crate::core::activation;
use crate::core::error::{Error, Result};
use crate::core::executor::{CommandOutput, ExecuteOptions, Executor, Invocation, StepExecutor};
use crate::core::mode::CheckMode;
use crate::tools::Tool;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

/// Result of running a single step.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// The tool that ran.
    pub tool: Tool,
    /// The exact command line.
    pub invocation: Invocation,
    /// How it ended.
    pub output: CommandOutput,
}

impl StepResult {
    /// Returns true if the step succeeded.
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.output.success()
    }
}

/// Result of running the pipeline.
#[derive(Debug)]
pub struct RunResult {
    /// Mode that was used.
    pub mode: CheckMode,
    /// Steps that ran, in order. Steps after a failure are absent.
    pub steps: Vec<StepResult>,
    /// Whether a virtual environment was activated.
    pub activated: bool,
    /// Total duration.
    pub duration: Duration,
}

impl RunResult {
    /// Returns true if no step failed, i.e. the run exits with zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code() == 0
    }

    /// Returns the failing step, if any.
    #[must_use]
    pub fn failed_step(&self) -> Option<&StepResult> {
        self.steps.iter().find(|s| !s.passed())
    }

    /// Returns the number of passed steps.
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.passed()).count()
    }

    /// Returns the process exit code for this run.
    ///
    /// Zero on success, otherwise the failing step's exit code.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.failed_step() {
            Some(step) if step.output.exit_code != 0 => step.output.exit_code,
            Some(_) => 1,
            None => 0,
        }
    }
}

/// Runner for the lint pipeline.
#[derive(Debug)]
pub struct Runner<E = Executor> {
    config: Config,
    root: PathBuf,
    executor: E,
}

impl Runner<Executor> {
    /// Creates a runner that spawns real processes in `root`.
    #[must_use]
    pub fn new(config: Config, root: impl Into<PathBuf>) -> Self {
        Self::with_executor(config, root, Executor::new())
    }
}

impl<E: StepExecutor> Runner<E> {
    /// Creates a runner with a specific executor.
    #[must_use]
    pub fn with_executor(config: Config, root: impl Into<PathBuf>, executor: E) -> Self {
        Self {
            config,
            root: root.into(),
            executor,
        }
    }

    /// Returns the steps that would run for `mode`.
    #[must_use]
    pub fn plan(&self, mode: CheckMode) -> Vec<(Tool, Invocation)> {
        Tool::ALL
            .iter()
            .map(|tool| (*tool, tool.invocation(&self.config, mode)))
            .collect()
    }

    /// Runs the pipeline.
    ///
    /// A tool that fails is reported in the returned [`RunResult`]. `Err` is
    /// reserved for problems that keep a step from starting, such as a
    /// missing program.
    pub async fn run(&self, mode: CheckMode) -> Result<RunResult> {
        let start = std::time::Instant::now();

        let env = activation::activate(
            &self.root,
            &self.config.pipeline.activate,
            &self.config.pipeline.shell,
        )
        .await;
        let activated = env.is_some();

        let options = ExecuteOptions::default()
            .cwd(&self.root)
            .env(env)
            .timeout(self.config.timeout())
            .capture_output(self.config.pipeline.capture_output);

        let mut steps = Vec::with_capacity(Tool::ALL.len());

        for (tool, invocation) in self.plan(mode) {
            if !self.executor.program_exists(&invocation.program, &options) {
                return Err(Error::ToolMissing {
                    program: invocation.program,
                });
            }

            let output = self.run_step(tool, &invocation, &options).await?;
            let step = StepResult {
                tool,
                invocation,
                output,
            };

            let failed = !step.passed();
            steps.push(step);

            if failed {
                break;
            }
        }

        Ok(RunResult {
            mode,
            steps,
            activated,
            duration: start.elapsed(),
        })
    }

    /// Runs one step and reports it on stderr.
    async fn run_step(
        &self,
        tool: Tool,
        invocation: &Invocation,
        options: &ExecuteOptions,
    ) -> Result<CommandOutput> {
        let name = tool.name();

        let pb = if options.capture_output {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.cyan} {msg}")
                    .ok()
                    .unwrap_or_else(ProgressStyle::default_spinner),
            );
            pb.set_message(format!("Running {name}..."));
            pb.enable_steady_tick(Duration::from_millis(100));
            Some(pb)
        } else {
            eprintln!("{} {}", style("•").cyan(), style(invocation).dim());
            None
        };

        let result = self.executor.execute(invocation, options).await;

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        let output = result?;

        if output.success() {
            eprintln!("{} {name}", style("✓").green());
        } else if output.timed_out {
            eprintln!("{} {name} (timed out)", style("✗").red());
        } else {
            eprintln!("{} {name} (exit {})", style("✗").red(), output.exit_code);
        }

        Ok(output)
    }
}
