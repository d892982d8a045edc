//! Process execution for pipeline steps.
//!
//! Tools are run directly (no intermediate shell) with stdin closed. Output
//! either streams to the terminal or is captured for later display.

use crate::core::activation::Environment;
use crate::core::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Exit code reported when a tool is killed for exceeding its timeout.
pub const EXIT_TIMEOUT: i32 = 124;

/// How long to keep reading output after a timed-out command is killed.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name or path.
    pub program: String,
    /// Arguments, in order.
    pub args: Vec<String>,
}

impl Invocation {
    /// Creates an invocation with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Returns true if `arg` appears among the arguments.
    #[must_use]
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Output from a command execution.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code of the command. For signal deaths this is `128 + signal`.
    pub exit_code: i32,
    /// Signal that terminated the command, if any.
    pub signal: Option<i32>,
    /// Standard output (empty unless captured).
    pub stdout: String,
    /// Standard error (empty unless captured).
    pub stderr: String,
    /// Whether the command was killed due to timeout.
    pub timed_out: bool,
    /// Duration the command took to run.
    pub duration: Duration,
}

impl CommandOutput {
    /// Creates a successful output with nothing captured.
    #[must_use]
    pub const fn succeeded(duration: Duration) -> Self {
        Self {
            exit_code: 0,
            signal: None,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: false,
            duration,
        }
    }

    /// Returns true if the command succeeded (exit code 0).
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0 && self.signal.is_none() && !self.timed_out
    }

    /// Returns combined stdout and stderr output.
    #[must_use]
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }

    /// Describes how the command ended, for failure reports.
    #[must_use]
    pub fn describe(&self, invocation: &Invocation) -> String {
        if self.timed_out {
            return format!(
                "Command '{invocation}' timed out after {}.",
                humantime::format_duration(self.duration)
            );
        }
        match self.signal {
            Some(signal) => match signal_name(signal) {
                Some(name) => format!("Command '{invocation}' died with {name}."),
                None => format!("Command '{invocation}' died with unknown signal {signal}."),
            },
            None => format!(
                "Command '{invocation}' returned non-zero exit status {}.",
                self.exit_code
            ),
        }
    }
}

/// Returns the conventional name of a signal number.
#[cfg(unix)]
fn signal_name(signal: i32) -> Option<&'static str> {
    nix::sys::signal::Signal::try_from(signal)
        .ok()
        .map(nix::sys::signal::Signal::as_str)
}

#[cfg(not(unix))]
fn signal_name(_signal: i32) -> Option<&'static str> {
    None
}

/// Splits an exit status into an exit code and terminating signal.
fn exit_parts(status: ExitStatus) -> (i32, Option<i32>) {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return (128 + signal, Some(signal));
        }
    }
    (status.code().unwrap_or(1), None)
}

/// Options for command execution.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Working directory for the command.
    pub cwd: Option<PathBuf>,
    /// Timeout for the command. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Replacement environment. `None` inherits ours.
    pub env: Option<Environment>,
    /// Whether to capture output (vs streaming to console).
    pub capture_output: bool,
}

impl ExecuteOptions {
    /// Sets the working directory.
    #[must_use]
    pub fn cwd(mut self, path: impl AsRef<Path>) -> Self {
        self.cwd = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout = duration;
        self
    }

    /// Replaces the child environment.
    #[must_use]
    pub fn env(mut self, env: Option<Environment>) -> Self {
        self.env = env;
        self
    }

    /// Sets whether to capture output.
    #[must_use]
    pub const fn capture_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }
}

/// Runs pipeline steps. The runner only talks to processes through this.
#[allow(async_fn_in_trait)]
pub trait StepExecutor {
    /// Runs an invocation to completion.
    async fn execute(&self, invocation: &Invocation, options: &ExecuteOptions)
        -> Result<CommandOutput>;

    /// Returns true if `program` resolves on the PATH the step will see.
    fn program_exists(&self, program: &str, options: &ExecuteOptions) -> bool {
        Executor::locate(program, options).is_some()
    }
}

/// Executor for running tools as child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct Executor;

impl Executor {
    /// Creates a new executor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Resolves a program against the PATH in `options`.
    ///
    /// Programs containing a path separator are resolved relative to the
    /// working directory, as a shell would.
    #[must_use]
    pub fn locate(program: &str, options: &ExecuteOptions) -> Option<PathBuf> {
        let cwd = match options.cwd {
            Some(ref cwd) => cwd.clone(),
            None => std::env::current_dir().ok()?,
        };
        let path = match options.env {
            Some(ref env) => env.get("PATH").map(std::ffi::OsStr::to_os_string),
            None => std::env::var_os("PATH"),
        };
        which::which_in(program, path, cwd).ok()
    }
}

/// Captured bytes of one output stream, filled by a background reader.
#[derive(Debug, Default, Clone)]
struct StreamBuffer(Arc<Mutex<Vec<u8>>>);

impl StreamBuffer {
    /// Reads `stream` to EOF in the background.
    ///
    /// Bytes are kept as read, so a child that writes invalid UTF-8 is still
    /// drained and never blocks on (or dies writing to) a full pipe.
    fn spawn_reader<R>(&self, stream: Option<R>) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = self.clone();
        tokio::spawn(async move {
            let Some(mut stream) = stream else {
                return;
            };
            let mut chunk = [0u8; 8192];
            loop {
                match stream.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => buffer.append(&chunk[..n]),
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {},
                    Err(e) => {
                        tracing::debug!(error = %e, "Stopped reading command output");
                        break;
                    },
                }
            }
        })
    }

    fn append(&self, bytes: &[u8]) {
        if let Ok(mut buffer) = self.0.lock() {
            buffer.extend_from_slice(bytes);
        }
    }

    /// Returns what has been read so far.
    fn text(&self) -> String {
        self.0
            .lock()
            .map(|buffer| String::from_utf8_lossy(&buffer).into_owned())
            .unwrap_or_default()
    }
}

impl StepExecutor for Executor {
    async fn execute(
        &self,
        invocation: &Invocation,
        options: &ExecuteOptions,
    ) -> Result<CommandOutput> {
        let start = std::time::Instant::now();
        tracing::debug!(command = %invocation, "Running command");

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);

        if let Some(ref cwd) = options.cwd {
            cmd.current_dir(cwd);
        }

        if let Some(ref env) = options.env {
            cmd.env_clear();
            cmd.envs(env.iter());
        }

        cmd.stdin(Stdio::null());
        cmd.kill_on_drop(true);

        if options.capture_output {
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit());
            cmd.stderr(Stdio::inherit());
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::io(format!("spawn {}", invocation.program), e))?;

        // Without capture both streams are inherited and the readers return at once.
        let stdout = StreamBuffer::default();
        let stderr = StreamBuffer::default();
        let mut readers = [
            stdout.spawn_reader(child.stdout.take()),
            stderr.spawn_reader(child.stderr.take()),
        ];

        let waited = match options.timeout {
            Some(limit) => timeout(limit, child.wait()).await.ok(),
            None => Some(child.wait().await),
        };
        let status = match waited {
            Some(status) => Some(status.map_err(|e| Error::io("wait for command", e))?),
            None => {
                // Ignore the kill result; the child may have exited already.
                drop(child.kill().await);
                tracing::warn!(command = %invocation, timeout = ?options.timeout, "Command timed out");
                None
            },
        };

        let drain = async {
            for reader in &mut readers {
                if let Err(e) = reader.await {
                    tracing::debug!(error = %e, "Output reader failed");
                }
            }
        };
        if status.is_some() {
            drain.await;
        } else if timeout(DRAIN_GRACE, drain).await.is_err() {
            // A grandchild still holds the pipes open; keep what was read.
            tracing::debug!(command = %invocation, "Gave up draining output");
        }
        for reader in &readers {
            reader.abort();
        }

        let stdout = stdout.text();
        let stderr = stderr.text();

        let Some(status) = status else {
            return Ok(CommandOutput {
                exit_code: EXIT_TIMEOUT,
                signal: None,
                stdout,
                stderr,
                timed_out: true,
                duration: start.elapsed(),
            });
        };

        let (exit_code, signal) = exit_parts(status);

        tracing::debug!(command = %invocation, exit_code, ?signal, "Command finished");
        if !stdout.is_empty() {
            tracing::debug!(command = %invocation, %stdout, "Captured stdout");
        }
        if !stderr.is_empty() {
            tracing::debug!(command = %invocation, %stderr, "Captured stderr");
        }

        Ok(CommandOutput {
            exit_code,
            signal,
            stdout,
            stderr,
            timed_out: false,
            duration: start.elapsed(),
        })
    }
}
