//! MCP server over newline-delimited JSON-RPC.
//!
//! The server reads one request per line and writes one response per line.
//! `tools/call` requests each run on their own task, so a long-running
//! command never blocks other calls; every other method is answered inline.
//! All responses pass through a single writer task, which keeps output lines
//! whole when several executions finish at once.
//!
//! # Example
//!
//! ```no_run
//! use long_run_command_mcp::config::Config;
//! use long_run_command_mcp::mcp::server::McpServer;
//! use long_run_command_mcp::tools::CommandExecutor;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::load(Path::new("config.json"))?;
//! let server = Arc::new(McpServer::new(config, CommandExecutor::new())?);
//! server.serve(tokio::io::stdin(), tokio::io::stdout()).await?;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, ToolCallParams, DEFAULT_PROTOCOL_VERSION,
};
use super::tools::{
    failure_payload, parse_extra_args, success_payload, text_result, RegistryError, ToolRegistry,
};
use crate::config::Config;
use crate::error::CommandError;
use crate::tools::{CommandExecutor, ExecutionRequest};

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "long-run-command-mcp";

/// Stdio MCP server exposing one tool per configured command.
#[derive(Debug)]
pub struct McpServer {
    config: Config,
    registry: ToolRegistry,
    executor: CommandExecutor,
}

impl McpServer {
    /// Creates a server for `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if two command keys map to the same tool name.
    pub fn new(config: Config, executor: CommandExecutor) -> Result<Self, RegistryError> {
        let registry = ToolRegistry::from_config(&config)?;
        Ok(Self {
            config,
            registry,
            executor,
        })
    }

    /// Returns the tool registry.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Serves requests from `reader` until EOF, writing responses to `writer`.
    ///
    /// A line that is not UTF-8 or not JSON gets a parse error response and
    /// the loop keeps reading. In-flight tool calls are allowed to finish and
    /// their responses are written before this returns, including when the
    /// reader fails.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from `reader` fails.
    pub async fn serve<R, W>(self: Arc<Self>, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        info!(tools = self.registry.len(), "MCP server started");

        let (tx, rx) = mpsc::channel::<String>(64);
        let writer_task = tokio::spawn(write_lines(writer, rx));
        let mut calls = JoinSet::new();

        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        let outcome: Result<()> = loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break Ok(()),
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Failed to read from input");
                    break Err(e).context("Failed to read request");
                }
            }

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line.trim(),
                Err(e) => {
                    warn!(error = %e, "Received input that is not UTF-8");
                    let response =
                        JsonRpcResponse::new_error(Value::Null, JsonRpcError::parse_error());
                    send(&tx, &response).await;
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }

            let request = match parse_line(line) {
                Ok(request) => request,
                Err(response) => {
                    send(&tx, &response).await;
                    continue;
                }
            };
            debug!(method = %request.method(), id = %request.id_value(), "Received request");

            if request.method() == "tools/call" && !request.is_notification() {
                let server = Arc::clone(&self);
                let tx = tx.clone();
                calls.spawn(async move {
                    if let Some(response) = server.handle_request(request).await {
                        send(&tx, &response).await;
                    }
                });
            } else if let Some(response) = self.handle_request(request).await {
                send(&tx, &response).await;
            }
        };

        info!(in_flight = calls.len(), "Input closed, waiting for running commands");
        while calls.join_next().await.is_some() {}

        drop(tx);
        if let Err(e) = writer_task.await {
            warn!(error = %e, "Writer task ended abnormally");
        }
        info!("MCP server stopped");
        outcome
    }

    /// Handles one request; returns `None` for notifications.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            debug!(method = %request.method(), "Notification received");
            return None;
        }

        let id = request.id_value();
        let outcome = match request.method() {
            "initialize" => Ok(self.initialize(request.params())),
            "ping" => Ok(json!({})),
            "tools/list" => {
                let tools: Vec<_> = self.registry.descriptors().collect();
                Ok(json!({ "tools": tools }))
            }
            "tools/call" => self.call_tool(request.params()).await,
            _ => Err(JsonRpcError::method_not_found()),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::new_error(id, error),
        })
    }

    fn initialize(&self, params: &Value) -> Value {
        let version = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);

        json!({
            "protocolVersion": version,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    /// Runs the command behind a tool.
    ///
    /// Execution failures become `success=false` payloads; only protocol
    /// misuse (unknown tool, malformed input) is a JSON-RPC error.
    async fn call_tool(&self, params: &Value) -> Result<Value, JsonRpcError> {
        let params: ToolCallParams = serde_json::from_value(params.clone())
            .map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?;

        let tool = self
            .registry
            .get(&params.name)
            .ok_or_else(|| {
                JsonRpcError::invalid_params(&format!("Tool {} not found", params.name))
            })?;

        let extra_args = parse_extra_args(params.arguments.as_ref())
            .map_err(|e| JsonRpcError::invalid_params(&e))?;

        let Some(definition) = self.config.command(&tool.key) else {
            return Ok(text_result(&failure_payload(
                &CommandError::unknown_command(tool.key.as_str()),
            )));
        };

        let request = ExecutionRequest::new(tool.key.as_str()).with_args(extra_args);
        let payload = match self.executor.execute(&request, &self.config).await {
            Ok(result) => success_payload(definition, &result),
            Err(err) => {
                if !err.is_security_related() {
                    info!(key = %tool.key, error = %err, "Command was not executed");
                }
                failure_payload(&err)
            }
        };

        Ok(text_result(&payload))
    }
}

/// Parses one input line, or returns the error response for it.
fn parse_line(line: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_str(line).map_err(|e| {
        warn!(error = %e, "Received invalid JSON");
        JsonRpcResponse::new_error(Value::Null, JsonRpcError::parse_error())
    })?;

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| {
        warn!(error = %e, "Received malformed request");
        JsonRpcResponse::new_error(id, JsonRpcError::invalid_request())
    })
}

async fn send(tx: &mpsc::Sender<String>, response: &JsonRpcResponse) {
    match serde_json::to_string(response) {
        Ok(line) => {
            if tx.send(line).await.is_err() {
                warn!("Writer task closed, dropping response");
            }
        }
        Err(e) => warn!(error = %e, "Failed to serialize response"),
    }
}

async fn write_lines<W>(mut writer: W, mut rx: mpsc::Receiver<String>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            tracing::error!("Failed to write response: {e}");
            break;
        }
        if let Err(e) = writer.write_all(b"\n").await {
            tracing::error!("Failed to write newline: {e}");
            break;
        }
        if let Err(e) = writer.flush().await {
            tracing::error!("Failed to flush output: {e}");
            break;
        }
    }
}
