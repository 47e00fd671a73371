//! External command execution behind a small trait so the `aws` CLI can be
//! scripted in tests.
//!
//! The real runner optionally carries a deadline shared by every command it
//! runs, so a multi-region query is bounded as a whole. Bounded runs use a
//! current-thread tokio runtime so an expired child is killed instead of left
//! blocking the caller.

use std::ffi::OsString;
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

/// Result of running an external command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code reported by the process, if available.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` when the exit code equals zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Human readable exit status used in error messages.
    #[must_use]
    pub fn status_text(&self) -> String {
        self.code
            .map_or_else(|| String::from("unknown"), |code| code.to_string())
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Errors raised before a command produces any output.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProcessError {
    /// Raised when a command cannot be spawned.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Command that failed to start.
        program: String,
        /// Operating system error string.
        message: String,
    },
    /// Raised when a bounded command does not finish in time.
    #[error("{program} did not finish within {timeout_ms} ms")]
    Timeout {
        /// Command that was killed.
        program: String,
        /// Timeout that expired, in milliseconds.
        timeout_ms: u128,
    },
}

/// Abstraction over command execution to support fakes in tests.
pub trait CommandRunner {
    /// Runs `program` with the given arguments, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Spawn`] if the command cannot be started and
    /// [`ProcessError::Timeout`] if a bounded run expires.
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, ProcessError>;
}

/// Time budget shared by all commands run through one runner.
#[derive(Clone, Copy, Debug)]
struct Deadline {
    budget: Duration,
    expires_at: Instant,
}

impl Deadline {
    fn starting_now(budget: Duration) -> Self {
        let now = Instant::now();
        Self {
            budget,
            expires_at: now.checked_add(budget).unwrap_or(now),
        }
    }

    fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

/// Real command runner that shells out to the host operating system.
#[derive(Clone, Debug, Default)]
pub struct ProcessCommandRunner {
    deadline: Option<Deadline>,
}

impl ProcessCommandRunner {
    /// Creates a runner that waits for commands indefinitely.
    #[must_use]
    pub const fn new() -> Self {
        Self { deadline: None }
    }

    /// Creates a runner whose commands must all finish within `timeout`,
    /// counted from now. A command still running at the deadline is killed,
    /// and once the budget is spent further commands fail without starting.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Deadline::starting_now(timeout)),
        }
    }

    /// Returns the time left before the deadline, if the runner has one.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.as_ref().map(Deadline::remaining)
    }

    fn spawn_error(program: &str, err: &std::io::Error) -> ProcessError {
        ProcessError::Spawn {
            program: program.to_owned(),
            message: err.to_string(),
        }
    }

    fn run_unbounded(program: &str, args: &[OsString]) -> Result<CommandOutput, ProcessError> {
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map(CommandOutput::from)
            .map_err(|err| Self::spawn_error(program, &err))
    }

    fn run_bounded(
        program: &str,
        args: &[OsString],
        deadline: &Deadline,
    ) -> Result<CommandOutput, ProcessError> {
        let expired = || ProcessError::Timeout {
            program: program.to_owned(),
            timeout_ms: deadline.budget.as_millis(),
        };
        let remaining = deadline.remaining();
        if remaining.is_zero() {
            return Err(expired());
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| Self::spawn_error(program, &err))?;

        runtime.block_on(async {
            let child = tokio::process::Command::new(program)
                .args(args)
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output();
            match tokio::time::timeout(remaining, child).await {
                Ok(result) => result
                    .map(CommandOutput::from)
                    .map_err(|err| Self::spawn_error(program, &err)),
                Err(_) => Err(expired()),
            }
        })
    }
}

impl CommandRunner for ProcessCommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, ProcessError> {
        debug!(program, ?args, remaining = ?self.remaining(), "running command");
        match &self.deadline {
            Some(deadline) => Self::run_bounded(program, args, deadline),
            None => Self::run_unbounded(program, args),
        }
    }
}
