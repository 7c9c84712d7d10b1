//! Mapping from configured commands to MCP tools.
//!
//! Each command key becomes one tool named `run_<key>`, where every character
//! outside `[A-Za-z0-9_-]` is replaced by `_`. Tool results are a single text
//! content block holding a pretty-printed JSON payload:
//!
//! ```text
//! success=true:  { success, command, workdir, outputPath, errorPath, exitCode, executionTimeMs }
//! success=false: { success, error }
//! ```

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use thiserror::Error;

use crate::config::{CommandDefinition, Config};
use crate::error::CommandError;
use crate::tools::ExecutionResult;

/// Prefix of every generated tool name.
pub const TOOL_PREFIX: &str = "run_";

/// Errors raised while building the tool registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two command keys map to the same tool name.
    #[error("Duplicate tool name '{name}' for command keys '{first}' and '{second}'")]
    DuplicateToolName {
        /// The colliding tool name.
        name: String,
        /// The key registered first.
        first: String,
        /// The key that collided.
        second: String,
    },
}

/// Tool descriptor as listed by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct McpTool {
    /// Tool name (`run_<sanitized key>`).
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON schema of the tool input.
    pub input_schema: Value,
}

/// A registered tool and the command key it runs.
#[derive(Debug, Clone)]
pub struct CommandTool {
    /// Key of the command in the configuration.
    pub key: String,
    /// Listed descriptor.
    pub descriptor: McpTool,
}

/// Builds the tool name for a command key.
///
/// # Examples
///
/// ```
/// use long_run_command_mcp::mcp::tools::tool_name;
///
/// assert_eq!(tool_name("build"), "run_build");
/// assert_eq!(tool_name("test:unit v2"), "run_test_unit_v2");
/// ```
#[must_use]
pub fn tool_name(key: &str) -> String {
    let safe: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{TOOL_PREFIX}{safe}")
}

/// Returns the listed description of a command.
#[must_use]
pub fn tool_description(key: &str, definition: &CommandDefinition) -> String {
    match &definition.description {
        Some(description) => description.clone(),
        None => format!(
            "Execute {} command: {} (workdir: {})",
            key,
            definition.command,
            definition.workdir.display()
        ),
    }
}

/// Returns the input schema: empty, or a single `args` string array.
#[must_use]
pub fn input_schema(allow_extra_args: bool) -> Value {
    if allow_extra_args {
        json!({
            "type": "object",
            "properties": {
                "args": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Additional arguments appended to the command"
                }
            },
            "additionalProperties": false
        })
    } else {
        json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        })
    }
}

/// Tools generated from a configuration, in key order.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<CommandTool>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Registers one tool per configured command.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateToolName`] if two keys sanitize to
    /// the same tool name.
    pub fn from_config(config: &Config) -> Result<Self, RegistryError> {
        let mut registry = Self::default();

        for (key, definition) in config.commands() {
            let name = tool_name(key);
            if let Some(&existing) = registry.by_name.get(&name) {
                return Err(RegistryError::DuplicateToolName {
                    name,
                    first: registry.tools[existing].key.clone(),
                    second: key.to_string(),
                });
            }

            registry.by_name.insert(name.clone(), registry.tools.len());
            registry.tools.push(CommandTool {
                key: key.to_string(),
                descriptor: McpTool {
                    name,
                    description: tool_description(key, definition),
                    input_schema: input_schema(definition.allow_extra_args),
                },
            });
        }

        Ok(registry)
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CommandTool> {
        self.by_name.get(name).map(|&i| &self.tools[i])
    }

    /// Returns the descriptors of all tools.
    pub fn descriptors(&self) -> impl Iterator<Item = &McpTool> {
        self.tools.iter().map(|t| &t.descriptor)
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns true if no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Extracts the `args` field of a tool input.
///
/// Missing input, `null` input and a missing `args` field all mean no extra
/// arguments.
///
/// # Errors
///
/// Returns a description of the problem if the input is not an object or
/// `args` is not an array of strings.
pub fn parse_extra_args(arguments: Option<&Value>) -> Result<Vec<String>, String> {
    let object = match arguments {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(object)) => object,
        Some(_) => return Err("arguments must be an object".to_string()),
    };

    match object.get("args") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| "args must be an array of strings".to_string())
            })
            .collect(),
        Some(_) => Err("args must be an array of strings".to_string()),
    }
}

/// Payload of a successful execution.
#[must_use]
pub fn success_payload(definition: &CommandDefinition, result: &ExecutionResult) -> Value {
    json!({
        "success": true,
        "command": definition.command,
        "workdir": definition.workdir.display().to_string(),
        "outputPath": result.output_path.display().to_string(),
        "errorPath": result.error_path.display().to_string(),
        "exitCode": result.exit_code,
        "executionTimeMs": result.execution_time_ms,
    })
}

/// Payload of a failed execution.
#[must_use]
pub fn failure_payload(error: &CommandError) -> Value {
    json!({
        "success": false,
        "error": error.to_string(),
    })
}

/// Wraps a payload as the `tools/call` result.
#[must_use]
pub fn text_result(payload: &Value) -> Value {
    let text = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
    json!({
        "content": [
            { "type": "text", "text": text }
        ]
    })
}
