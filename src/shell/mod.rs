//! Cross-platform shell invocation and command line construction.
//!
//! Commands run through the platform shell (`/bin/sh -c` on Unix,
//! `cmd.exe /c` on Windows). The command line is a single string built from
//! the configured base command, the caller's extra arguments (each one
//! double-quoted) and, in redirect mode, the redirection of both streams into
//! the log files.
//!
//! Extra arguments must already have passed
//! [`validate_extra_args`](crate::tools::security::validate_extra_args);
//! quoting alone does not neutralise shell metacharacters.
//!
//! # Examples
//!
//! ```
//! use long_run_command_mcp::logs::LogPaths;
//! use long_run_command_mcp::shell::{build_command_line, with_redirection};
//! use std::path::PathBuf;
//!
//! let line = build_command_line("npm test", &["--watch=false".to_string()]);
//! assert_eq!(line, r#"npm test "--watch=false""#);
//!
//! let paths = LogPaths {
//!     output_path: PathBuf::from("/logs/1-test-output.log"),
//!     error_path: PathBuf::from("/logs/1-test-error.log"),
//! };
//! assert_eq!(
//!     with_redirection(&line, &paths),
//!     r#"npm test "--watch=false" > "/logs/1-test-output.log" 2> "/logs/1-test-error.log""#
//! );
//! ```

use tokio::process::Command;

use crate::logs::LogPaths;

/// Configuration for platform-specific shell execution.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct ShellConfig {
    /// The shell executable (e.g., "/bin/sh" or "cmd.exe").
    pub command: String,
    /// Arguments to pass before the command string (e.g., ["-c"] or ["/c"]).
    pub args: Vec<String>,
}

#[cfg(unix)]
impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            command: "/bin/sh".to_string(),
            args: vec!["-c".to_string()],
        }
    }
}

#[cfg(windows)]
impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            command: "cmd.exe".to_string(),
            args: vec!["/c".to_string()],
        }
    }
}

impl ShellConfig {
    /// Creates a shell configuration for a specific executable.
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    /// Creates a `Command` that runs `line` through this shell.
    ///
    /// The returned command is ready for further configuration (working
    /// directory, stdio) before spawning.
    #[must_use]
    pub fn build_command(&self, line: &str) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args).arg(line);
        cmd
    }
}

/// Double-quotes a single argument, escaping embedded double quotes.
///
/// # Examples
///
/// ```
/// use long_run_command_mcp::shell::quote_arg;
///
/// assert_eq!(quote_arg("src/main.rs"), r#""src/main.rs""#);
/// assert_eq!(quote_arg(r#"say "hi""#), r#""say \"hi\"""#);
/// ```
#[must_use]
pub fn quote_arg(arg: &str) -> String {
    format!("\"{}\"", arg.replace('"', "\\\""))
}

/// Appends the quoted extra arguments to the base command.
///
/// With no extra arguments the base command is returned unchanged.
#[must_use]
pub fn build_command_line(command: &str, extra_args: &[String]) -> String {
    if extra_args.is_empty() {
        return command.to_string();
    }

    let quoted: Vec<String> = extra_args.iter().map(|a| quote_arg(a)).collect();
    format!("{} {}", command, quoted.join(" "))
}

/// Redirects stdout and stderr of `line` into the log files.
#[must_use]
pub fn with_redirection(line: &str, paths: &LogPaths) -> String {
    format!(
        "{} > \"{}\" 2> \"{}\"",
        line,
        paths.output_path.display(),
        paths.error_path.display()
    )
}
