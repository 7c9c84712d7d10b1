//! Error types for command execution.
//!
//! Every way a single tool invocation can fail is a [`CommandError`]. The
//! `Display` text of each variant is the message reported back to the caller
//! in the `success=false` payload, so it is part of the server's contract.
//!
//! # Example
//!
//! ```
//! use long_run_command_mcp::error::{CommandError, ErrorKind};
//!
//! let err = CommandError::unknown_command("deploy");
//! assert_eq!(err.to_string(), "Unknown command key: deploy");
//! assert_eq!(err.kind(), ErrorKind::Configuration);
//! assert!(!err.is_security_related());
//! ```

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias using `CommandError`.
pub type CommandResult<T> = Result<T, CommandError>;

/// Coarse classification of a [`CommandError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request named a command that is not configured.
    Configuration,
    /// Extra arguments were disallowed or contained forbidden characters.
    ArgumentRejected,
    /// The command's working directory is missing or inaccessible.
    WorkdirNotFound,
    /// The shell process could not be started.
    SpawnFailure,
    /// Any other failure while running the process.
    Execution,
}

/// Errors produced while validating or running one command request.
#[derive(Debug, Error)]
pub enum CommandError {
    // ============== Configuration ==============
    /// No command is configured under the requested key.
    #[error("Unknown command key: {key}")]
    UnknownCommand {
        /// The key that was requested.
        key: String,
    },

    // ============== Argument rejection ==============
    /// Extra arguments were supplied for a command that does not accept them.
    #[error("Additional arguments are not allowed for command: {key}")]
    ArgumentsNotAllowed {
        /// The command key.
        key: String,
    },

    /// At least one extra argument contains a forbidden construct.
    #[error("Invalid characters in additional arguments")]
    InvalidArguments {
        /// The first offending argument.
        argument: String,
    },

    // ============== Working directory ==============
    /// The working directory does not exist or cannot be accessed.
    #[error("Working directory does not exist: {}", path.display())]
    WorkdirNotFound {
        /// The resolved absolute path.
        path: PathBuf,
    },

    // ============== Process ==============
    /// The shell executable could not be spawned.
    #[error("Command execution failed: {message}")]
    SpawnFailure {
        /// The underlying OS error message.
        message: String,
    },

    /// Unclassified failure while preparing or waiting for the process.
    #[error("Command execution error: {message}")]
    Execution {
        /// Description of the failure.
        message: String,
    },
}

impl CommandError {
    /// Creates an unknown command error.
    #[must_use]
    pub fn unknown_command(key: impl Into<String>) -> Self {
        Self::UnknownCommand { key: key.into() }
    }

    /// Creates an error for extra arguments on a command that forbids them.
    #[must_use]
    pub fn arguments_not_allowed(key: impl Into<String>) -> Self {
        Self::ArgumentsNotAllowed { key: key.into() }
    }

    /// Creates an error for an argument containing forbidden characters.
    #[must_use]
    pub fn invalid_arguments(argument: impl Into<String>) -> Self {
        Self::InvalidArguments {
            argument: argument.into(),
        }
    }

    /// Creates a missing working directory error.
    #[must_use]
    pub fn workdir_not_found(path: impl AsRef<Path>) -> Self {
        Self::WorkdirNotFound {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Creates a spawn failure from an I/O error.
    #[must_use]
    pub fn spawn_failure(err: &std::io::Error) -> Self {
        Self::SpawnFailure {
            message: err.to_string(),
        }
    }

    /// Creates an unclassified execution error.
    #[must_use]
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }

    /// Returns the category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownCommand { .. } => ErrorKind::Configuration,
            Self::ArgumentsNotAllowed { .. } | Self::InvalidArguments { .. } => {
                ErrorKind::ArgumentRejected
            }
            Self::WorkdirNotFound { .. } => ErrorKind::WorkdirNotFound,
            Self::SpawnFailure { .. } => ErrorKind::SpawnFailure,
            Self::Execution { .. } => ErrorKind::Execution,
        }
    }

    /// Returns `true` if the request was refused by a security gate.
    ///
    /// These rejections are logged at `warn` level by the executor.
    #[must_use]
    pub fn is_security_related(&self) -> bool {
        matches!(self.kind(), ErrorKind::ArgumentRejected)
    }
}
