//! Secure command execution.
//!
//! This module is organized into submodules:
//! - `executor`: the process execution engine
//! - `security`: validation gates for extra arguments and working directories

pub mod executor;
pub mod security;

pub use executor::{
    CommandExecutor, ExecutionPolicy, ExecutionRequest, ExecutionResult, StreamCapture,
};
pub use security::{validate_extra_args, validate_workdir};
