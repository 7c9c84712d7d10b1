//! Process execution engine.
//!
//! A request passes through the validation gates in a fixed order and only
//! reaches the shell if every gate succeeds:
//!
//! 1. command key lookup
//! 2. extra argument permission and denylist
//! 3. working directory check
//! 4. log path creation
//! 5. command line construction
//! 6. spawn, wait, report
//!
//! The configuration is passed into every call; the executor itself holds
//! only its [`ExecutionPolicy`] and is safe to share between concurrent
//! executions.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::security::{validate_extra_args, validate_workdir};
use crate::config::Config;
use crate::error::{CommandError, CommandResult};
use crate::logs::{create_log_paths, write_streams, LogPaths};
use crate::shell::{build_command_line, with_redirection, ShellConfig};

/// Delay between child exit and reporting in redirect mode.
///
/// Some platforms close redirected files slightly after the exit
/// notification arrives.
pub const DEFAULT_EXIT_GRACE: Duration = Duration::from_millis(100);

/// How the child's output streams reach the log files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StreamCapture {
    /// The shell redirects both streams into the log files.
    #[default]
    Redirect,
    /// Both streams are piped to this process and drained into the log files.
    Pipe,
}

/// Tunables for the execution engine.
#[derive(Debug, Clone)]
pub struct ExecutionPolicy {
    /// Shell used to run command lines.
    pub shell: ShellConfig,
    /// Stream capture strategy.
    pub capture: StreamCapture,
    /// Wait after exit before reporting in redirect mode.
    pub exit_grace: Duration,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self {
            shell: ShellConfig::default(),
            capture: StreamCapture::default(),
            exit_grace: DEFAULT_EXIT_GRACE,
        }
    }
}

/// One invocation of a configured command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// Key of the command in the configuration.
    pub key: String,
    /// Caller-supplied extra arguments; empty means none.
    pub extra_args: Vec<String>,
}

impl ExecutionRequest {
    /// Creates a request without extra arguments.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            extra_args: Vec::new(),
        }
    }

    /// Sets the extra arguments.
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }
}

/// Outcome of a command that ran to completion.
///
/// A non-zero `exit_code` is still a successful execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// File holding the command's standard output.
    pub output_path: PathBuf,
    /// File holding the command's standard error.
    pub error_path: PathBuf,
    /// Exit code; 0 when the process ended without one (killed by a signal).
    pub exit_code: i32,
    /// Wall-clock time from spawn to exit.
    pub execution_time_ms: u64,
}

/// Runs configured commands under an [`ExecutionPolicy`].
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    policy: ExecutionPolicy,
}

impl CommandExecutor {
    /// Creates an executor with the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the execution policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ExecutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the execution policy.
    #[must_use]
    pub fn policy(&self) -> &ExecutionPolicy {
        &self.policy
    }

    /// Validates `request` against `config` and runs the command.
    ///
    /// Suspends until the child exits. Nothing is spawned and no log file or
    /// directory is created unless every validation gate passes.
    ///
    /// # Errors
    ///
    /// Returns a [`CommandError`] for an unknown key, rejected arguments, a
    /// missing working directory, a spawn failure or any other process error.
    pub async fn execute(
        &self,
        request: &ExecutionRequest,
        config: &Config,
    ) -> CommandResult<ExecutionResult> {
        let key = request.key.as_str();
        let definition = config
            .command(key)
            .ok_or_else(|| CommandError::unknown_command(key))?;

        if !request.extra_args.is_empty() {
            if !definition.allow_extra_args {
                warn!(
                    key = %key,
                    count = request.extra_args.len(),
                    "Security: extra arguments supplied for a command that does not allow them"
                );
                return Err(CommandError::arguments_not_allowed(key));
            }
            validate_extra_args(&request.extra_args)?;
        }

        let workdir = validate_workdir(&definition.workdir).await?;
        let paths = create_log_paths(key, config.output_dir());
        let line = build_command_line(&definition.command, &request.extra_args);

        let result = self.run(&line, &workdir, &paths).await?;
        info!(
            key = %key,
            exit_code = result.exit_code,
            elapsed_ms = result.execution_time_ms,
            output = %result.output_path.display(),
            "Command finished"
        );
        Ok(result)
    }

    async fn run(
        &self,
        line: &str,
        workdir: &Path,
        paths: &LogPaths,
    ) -> CommandResult<ExecutionResult> {
        if let Some(dir) = paths.dir() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                CommandError::execution(format!(
                    "Failed to create output directory {}: {e}",
                    dir.display()
                ))
            })?;
        }

        match self.policy.capture {
            StreamCapture::Redirect => self.run_redirected(line, workdir, paths).await,
            StreamCapture::Pipe => self.run_piped(line, workdir, paths).await,
        }
    }

    async fn run_redirected(
        &self,
        line: &str,
        workdir: &Path,
        paths: &LogPaths,
    ) -> CommandResult<ExecutionResult> {
        let line = with_redirection(line, paths);
        debug!(line = %line, workdir = %workdir.display(), "Spawning shell");

        // stdin/stdout stay off the server's own streams; stdout may be the
        // JSON-RPC channel.
        let started = Instant::now();
        let mut child = self
            .policy
            .shell
            .build_command(&line)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                warn!(shell = %self.policy.shell.command, error = %e, "Failed to spawn shell");
                CommandError::spawn_failure(&e)
            })?;

        let status = child
            .wait()
            .await
            .map_err(|e| CommandError::execution(format!("Failed to wait for process: {e}")))?;
        let elapsed = started.elapsed();

        tokio::time::sleep(self.policy.exit_grace).await;

        Ok(finish(paths, status, elapsed))
    }

    async fn run_piped(
        &self,
        line: &str,
        workdir: &Path,
        paths: &LogPaths,
    ) -> CommandResult<ExecutionResult> {
        debug!(line = %line, workdir = %workdir.display(), "Spawning shell with piped capture");

        let started = Instant::now();
        let mut child = self
            .policy
            .shell
            .build_command(line)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                warn!(shell = %self.policy.shell.command, error = %e, "Failed to spawn shell");
                CommandError::spawn_failure(&e)
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CommandError::execution("Child stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| CommandError::execution("Child stderr was not captured"))?;

        let (status, drained) = tokio::join!(child.wait(), write_streams(stdout, stderr, paths));
        let elapsed = started.elapsed();

        let status = status
            .map_err(|e| CommandError::execution(format!("Failed to wait for process: {e}")))?;
        drained.map_err(|e| CommandError::execution(format!("Failed to write log files: {e}")))?;

        Ok(finish(paths, status, elapsed))
    }
}

fn finish(paths: &LogPaths, status: ExitStatus, elapsed: Duration) -> ExecutionResult {
    ExecutionResult {
        output_path: paths.output_path.clone(),
        error_path: paths.error_path.clone(),
        exit_code: normalize_exit_code(status),
        execution_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
    }
}

/// Maps a missing exit code (termination by signal) to 0.
///
/// This reports an abnormal termination as success; the warning is the only
/// trace of it.
fn normalize_exit_code(status: ExitStatus) -> i32 {
    match status.code() {
        Some(code) => code,
        None => {
            warn!(status = %status, "Process ended without an exit code; reporting 0");
            0
        }
    }
}
