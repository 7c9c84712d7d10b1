//! Server configuration.
//!
//! The configuration file is JSON and declares the output directory for log
//! files plus one [`CommandDefinition`] per command key:
//!
//! ```json
//! {
//!   "outputdir": "./output",
//!   "commands": {
//!     "build": { "workdir": "./", "command": "npm run build" },
//!     "test": { "workdir": "./", "command": "npm test", "additionalArgs": true }
//!   }
//! }
//! ```
//!
//! Loading validates the structure and produces a typed [`Config`]. Relative
//! paths are resolved against the directory containing the file. After
//! loading, the configuration is immutable and passed by reference into each
//! execution.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::util::{absolute_path, resolve_path};

/// Errors that can occur when loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("Config file not found: {}", path.display())]
    NotFound {
        /// Absolute path that was tried.
        path: PathBuf,
    },

    /// The configuration file exists but could not be read.
    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        /// Absolute path of the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON.
    #[error("Invalid JSON in config file: {0}")]
    InvalidJson(String),

    /// The JSON does not match the expected structure.
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// One administrator-declared command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDefinition {
    /// Directory the command runs in.
    pub workdir: PathBuf,
    /// Shell command line to execute.
    pub command: String,
    /// Whether callers may append extra arguments.
    pub allow_extra_args: bool,
    /// Optional human-readable description for the tool listing.
    pub description: Option<String>,
}

impl CommandDefinition {
    /// Creates a definition that does not accept extra arguments.
    #[must_use]
    pub fn new(workdir: impl Into<PathBuf>, command: impl Into<String>) -> Self {
        Self {
            workdir: workdir.into(),
            command: command.into(),
            allow_extra_args: false,
            description: None,
        }
    }

    /// Sets whether extra arguments are accepted.
    #[must_use]
    pub fn with_extra_args(mut self, allowed: bool) -> Self {
        self.allow_extra_args = allowed;
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Validated server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    output_dir: PathBuf,
    commands: BTreeMap<String, CommandDefinition>,
}

impl Config {
    /// Creates an empty configuration writing logs to `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            commands: BTreeMap::new(),
        }
    }

    /// Adds (or replaces) a command definition.
    #[must_use]
    pub fn with_command(mut self, key: impl Into<String>, definition: CommandDefinition) -> Self {
        self.commands.insert(key.into(), definition);
        self
    }

    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is missing, unreadable, not JSON
    /// or structurally invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let absolute = absolute_path(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let content = match std::fs::read_to_string(&absolute) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound { path: absolute });
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: absolute,
                    source,
                })
            }
        };

        let base_dir = absolute
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| absolute.clone());

        let config = Self::from_json(&content, &base_dir)?;
        tracing::info!(
            path = %absolute.display(),
            commands = config.commands.len(),
            output_dir = %config.output_dir.display(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parses and validates configuration JSON.
    ///
    /// Relative `outputdir` and `workdir` values are resolved against
    /// `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidJson`] or [`ConfigError::Validation`].
    pub fn from_json(content: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let value: Value =
            serde_json::from_str(content).map_err(|e| ConfigError::InvalidJson(e.to_string()))?;
        if !value.is_object() {
            return Err(invalid("config must be an object"));
        }

        let raw: RawConfig =
            serde_json::from_value(value).map_err(|e| invalid(e.to_string()))?;

        let output_dir = non_empty_string(raw.outputdir)
            .ok_or_else(|| invalid("outputdir is required and must be a string"))?;

        let Some(Value::Object(commands)) = raw.commands else {
            return Err(invalid("commands is required and must be an object"));
        };

        let mut config = Self::new(resolve_path(base_dir, Path::new(&output_dir)));
        for (key, entry) in commands {
            let definition = parse_command(&key, entry, base_dir)?;
            config.commands.insert(key, definition);
        }

        Ok(config)
    }

    /// Returns the definition for `key`, if configured.
    #[must_use]
    pub fn command(&self, key: &str) -> Option<&CommandDefinition> {
        self.commands.get(key)
    }

    /// Returns all configured keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Iterates over all key/definition pairs in key order.
    pub fn commands(&self) -> impl Iterator<Item = (&str, &CommandDefinition)> {
        self.commands.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the directory log files are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation(message.into())
}

/// Raw JSON structure for deserialization.
///
/// Fields stay untyped so that a wrong type gets the same message as a
/// missing field.
#[derive(Debug, Deserialize)]
struct RawConfig {
    outputdir: Option<Value>,
    commands: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCommand {
    workdir: Option<Value>,
    command: Option<Value>,
    #[serde(alias = "allowExtraArgs")]
    additional_args: Option<Value>,
    description: Option<Value>,
}

/// Returns the string in `value` unless it is absent, not a string or empty.
fn non_empty_string(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

fn parse_command(
    key: &str,
    entry: Value,
    base_dir: &Path,
) -> Result<CommandDefinition, ConfigError> {
    if !entry.is_object() {
        return Err(invalid(format!("commands.{key} must be an object")));
    }
    let raw: RawCommand =
        serde_json::from_value(entry).map_err(|e| invalid(format!("commands.{key}: {e}")))?;

    let workdir = non_empty_string(raw.workdir).ok_or_else(|| {
        invalid(format!("commands.{key}.workdir is required and must be a string"))
    })?;

    let command = non_empty_string(raw.command).ok_or_else(|| {
        invalid(format!("commands.{key}.command is required and must be a string"))
    })?;

    let allow_extra_args = match raw.additional_args {
        None => false,
        Some(Value::Bool(b)) => b,
        Some(_) => {
            return Err(invalid(format!(
                "commands.{key}.additionalArgs must be a boolean"
            )))
        }
    };

    let description = match raw.description {
        None => None,
        Some(Value::String(s)) => Some(s),
        Some(_) => {
            return Err(invalid(format!(
                "commands.{key}.description must be a string"
            )))
        }
    };

    Ok(CommandDefinition {
        workdir: resolve_path(base_dir, Path::new(&workdir)),
        command,
        allow_extra_args,
        description,
    })
}
