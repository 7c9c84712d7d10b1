//! Tests for JSON-RPC message types and MCP tool descriptors.

use long_run_command_mcp::config::{CommandDefinition, Config};
use long_run_command_mcp::mcp::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId};
use long_run_command_mcp::mcp::tools::{input_schema, tool_name, ToolRegistry};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

// ============================================================================
// JSON-RPC
// ============================================================================

#[test]
fn test_request_with_string_id() {
    let request: JsonRpcRequest = serde_json::from_value(json!({
        "jsonrpc": "2.0",
        "id": "abc",
        "method": "tools/list"
    }))
    .unwrap();

    assert_eq!(request.id(), Some(&RequestId::String("abc".to_string())));
    assert_eq!(request.id_value(), json!("abc"));
    assert!(!request.is_notification());
}

#[test]
fn test_success_response_shape() {
    let response = JsonRpcResponse::success(json!(3), json!({"tools": []}));
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"jsonrpc": "2.0", "id": 3, "result": {"tools": []}})
    );
    assert!(response.is_success());
}

#[test]
fn test_error_codes() {
    assert_eq!(JsonRpcError::parse_error().code(), -32700);
    assert_eq!(JsonRpcError::invalid_request().code(), -32600);
    assert_eq!(JsonRpcError::method_not_found().code(), -32601);

    let err = JsonRpcError::invalid_params("Tool run_x not found");
    assert_eq!(err.code(), -32602);
    assert_eq!(err.message(), "Invalid params: Tool run_x not found");
    assert!(err.data().is_none());
}

#[test]
fn test_request_roundtrip_keeps_params() {
    let request = JsonRpcRequest::new(9, "tools/call", json!({"name": "run_build"}));
    let line = serde_json::to_string(&request).unwrap();
    let parsed: JsonRpcRequest = serde_json::from_str(&line).unwrap();
    assert_eq!(parsed.params()["name"], "run_build");
    assert_eq!(parsed.method(), "tools/call");
}

// ============================================================================
// Tool descriptors
// ============================================================================

#[test]
fn test_tool_name_sanitization() {
    assert_eq!(tool_name("deploy"), "run_deploy");
    assert_eq!(tool_name("../x"), "run____x");
    assert_eq!(tool_name("ünï"), "run__n_");
}

#[test]
fn test_schema_without_args() {
    assert_eq!(input_schema(false)["properties"], json!({}));
}

#[test]
fn test_listed_descriptors() {
    let config = Config::new("/tmp/out")
        .with_command("build", CommandDefinition::new("/srv", "make"))
        .with_command(
            "test",
            CommandDefinition::new("/srv", "make test")
                .with_extra_args(true)
                .with_description("Run tests"),
        );
    let registry = ToolRegistry::from_config(&config).unwrap();

    let listed: Vec<Value> = registry
        .descriptors()
        .map(|t| serde_json::to_value(t).unwrap())
        .collect();

    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["name"], "run_build");
    assert_eq!(
        listed[0]["description"],
        format!("Execute build command: make (workdir: {})", std::path::Path::new("/srv").display())
    );
    assert_eq!(listed[1]["name"], "run_test");
    assert_eq!(listed[1]["description"], "Run tests");
    assert_eq!(
        listed[1]["inputSchema"]["properties"]["args"]["items"],
        json!({"type": "string"})
    );
}
