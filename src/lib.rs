//! long-run-command-mcp - run administrator-declared shell commands over MCP
//!
//! Each command in the configuration file becomes an MCP tool. Calling a tool
//! runs the command through the system shell and records its output streams
//! in timestamped log files; the caller gets back the log paths and the exit
//! code rather than the output itself.
//!
//! This library exposes the core types for testing and embedding.

pub mod config;
pub mod error;
pub mod logs;
pub mod mcp;
pub mod shell;
pub mod tools;
pub mod util;

// Re-export core types for convenient access
pub use config::{CommandDefinition, Config, ConfigError};
pub use error::{CommandError, CommandResult, ErrorKind};
pub use tools::{CommandExecutor, ExecutionPolicy, ExecutionRequest, ExecutionResult};
