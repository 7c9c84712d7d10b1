//! Validation gates that run before any process is spawned.
//!
//! This module provides:
//! - The extra-argument denylist (shell metacharacters, command substitution,
//!   variable expansion and line breaks)
//! - Working directory resolution and existence checks

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{CommandError, CommandResult};
use crate::util::absolute_path;

/// Static collection of constructs that are never allowed in extra arguments.
///
/// Each entry pairs the compiled pattern with a short label used in logs.
pub(crate) static FORBIDDEN_ARG_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        // Command separators, pipes, redirection and backtick substitution
        (
            Regex::new(r"[;&|<>`]").expect("invalid regex: shell operators"),
            "shell operator",
        ),
        // Line breaks start a new command
        (
            Regex::new(r"[\r\n]").expect("invalid regex: line break"),
            "line break",
        ),
        (
            Regex::new(r"\$\(").expect("invalid regex: command substitution"),
            "command substitution",
        ),
        (
            Regex::new(r"\$\{").expect("invalid regex: variable expansion"),
            "variable expansion",
        ),
    ]
});

/// Returns the label of the first forbidden construct found in `arg`.
#[must_use]
pub fn find_forbidden(arg: &str) -> Option<&'static str> {
    FORBIDDEN_ARG_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(arg))
        .map(|(_, label)| *label)
}

/// Checks every extra argument against the denylist.
///
/// The batch is all-or-nothing: a single bad argument rejects all of them.
///
/// # Errors
///
/// Returns [`CommandError::InvalidArguments`] naming the first offending
/// argument.
///
/// # Examples
///
/// ```
/// use long_run_command_mcp::tools::security::validate_extra_args;
///
/// assert!(validate_extra_args(&["--out=dist/app".to_string()]).is_ok());
/// assert!(validate_extra_args(&["ok".to_string(), "x; rm -rf /".to_string()]).is_err());
/// ```
pub fn validate_extra_args(args: &[String]) -> CommandResult<()> {
    for arg in args {
        if let Some(label) = find_forbidden(arg) {
            warn!(
                argument = %arg.escape_debug(),
                reason = label,
                "Security: extra argument rejected"
            );
            return Err(CommandError::invalid_arguments(arg.as_str()));
        }
    }
    Ok(())
}

/// Resolves `workdir` to an absolute path and checks that it is an existing
/// directory.
///
/// # Errors
///
/// Returns [`CommandError::WorkdirNotFound`] with the resolved path if the
/// directory is missing, inaccessible or not a directory.
pub async fn validate_workdir(workdir: &Path) -> CommandResult<PathBuf> {
    let absolute = absolute_path(workdir).map_err(|e| {
        CommandError::execution(format!("Failed to resolve working directory: {e}"))
    })?;

    match tokio::fs::metadata(&absolute).await {
        Ok(meta) if meta.is_dir() => Ok(absolute),
        Ok(_) => {
            warn!(workdir = %absolute.display(), "Working directory is not a directory");
            Err(CommandError::workdir_not_found(absolute))
        }
        Err(e) => {
            warn!(
                workdir = %absolute.display(),
                error = %e,
                "Working directory is not accessible"
            );
            Err(CommandError::workdir_not_found(absolute))
        }
    }
}
