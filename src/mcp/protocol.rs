//! JSON-RPC 2.0 message types for the MCP stdio server.
//!
//! Messages are exchanged as one JSON object per line. The server reads
//! [`JsonRpcRequest`]s (requests and notifications) and writes
//! [`JsonRpcResponse`]s.
//!
//! # Example
//!
//! ```
//! use long_run_command_mcp::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};
//! use serde_json::json;
//!
//! let request: JsonRpcRequest =
//!     serde_json::from_str(r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#).unwrap();
//! assert_eq!(request.method(), "ping");
//!
//! let response = JsonRpcResponse::success(request.id_value(), json!({}));
//! let line = serde_json::to_string(&response).unwrap();
//! assert!(line.contains("\"id\":7"));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version reported when the client does not request one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC 2.0 request ID, which can be a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID
    Number(i64),
    /// String request ID
    String(String),
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

impl From<RequestId> for Value {
    fn from(id: RequestId) -> Self {
        match id {
            RequestId::Number(n) => Value::from(n),
            RequestId::String(s) => Value::String(s),
        }
    }
}

/// A JSON-RPC 2.0 request message.
///
/// A request without an ID is a notification and gets no response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version, always "2.0"
    jsonrpc: String,

    /// Request ID (absent for notifications)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<RequestId>,

    /// Method name to invoke
    method: String,

    /// Method parameters
    #[serde(default)]
    params: Value,
}

impl JsonRpcRequest {
    /// Creates a new request with an ID.
    #[must_use]
    pub fn new(id: impl Into<RequestId>, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id.into()),
            method: method.to_string(),
            params,
        }
    }

    /// Creates a notification (request without ID, no response expected).
    #[must_use]
    pub fn notification(method: &str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: method.to_string(),
            params,
        }
    }

    /// Returns the method name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the request parameters.
    #[must_use]
    pub fn params(&self) -> &Value {
        &self.params
    }

    /// Returns the request ID, if present.
    #[must_use]
    pub fn id(&self) -> Option<&RequestId> {
        self.id.as_ref()
    }

    /// Returns the request ID as a JSON value (`null` for notifications).
    #[must_use]
    pub fn id_value(&self) -> Value {
        self.id.clone().map_or(Value::Null, Value::from)
    }

    /// Returns true if this is a notification (no ID).
    #[must_use]
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code (negative for predefined errors)
    code: i32,

    /// Human-readable error message
    message: String,

    /// Additional error data (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl JsonRpcError {
    /// Creates a new JSON-RPC error.
    #[must_use]
    pub fn new(code: i32, message: String, data: Option<Value>) -> Self {
        Self {
            code,
            message,
            data,
        }
    }

    /// Returns the error code.
    #[must_use]
    pub fn code(&self) -> i32 {
        self.code
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the additional error data, if present.
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Parse error (-32700): the line was not valid JSON.
    #[must_use]
    pub fn parse_error() -> Self {
        Self::new(-32700, "Parse error".to_string(), None)
    }

    /// Invalid Request (-32600): valid JSON but not a request object.
    #[must_use]
    pub fn invalid_request() -> Self {
        Self::new(-32600, "Invalid Request".to_string(), None)
    }

    /// Method not found (-32601).
    #[must_use]
    pub fn method_not_found() -> Self {
        Self::new(-32601, "Method not found".to_string(), None)
    }

    /// Invalid params (-32602).
    #[must_use]
    pub fn invalid_params(details: &str) -> Self {
        Self::new(-32602, format!("Invalid params: {details}"), None)
    }
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcError {}

/// A JSON-RPC 2.0 response message carrying either a result or an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version, always "2.0"
    jsonrpc: String,

    /// Request ID this response answers; `null` when it could not be read
    id: Value,

    /// Result value (present on success)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Value>,

    /// Error object (present on failure)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Creates a successful response.
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Creates an error response.
    #[must_use]
    pub fn new_error(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Returns true if this response indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_some() && self.error.is_none()
    }

    /// Returns the request ID.
    #[must_use]
    pub fn id(&self) -> &Value {
        &self.id
    }

    /// Returns the result value, if present.
    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Returns the error object, if present.
    #[must_use]
    pub fn error(&self) -> Option<&JsonRpcError> {
        self.error.as_ref()
    }
}

/// Parameters of a `tools/call` request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to invoke.
    pub name: String,
    /// Tool input; absent or `null` means no input.
    #[serde(default)]
    pub arguments: Option<Value>,
}
