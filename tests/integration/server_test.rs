//! In-process tests for the MCP server over an in-memory duplex stream.

use long_run_command_mcp::config::Config;
use long_run_command_mcp::mcp::McpServer;
use long_run_command_mcp::tools::CommandExecutor;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{
    AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf,
};
use tokio::task::JoinHandle;

use crate::common::TestContext;

/// Client end of a server running on a background task.
struct TestClient {
    writer: WriteHalf<DuplexStream>,
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    server: JoinHandle<anyhow::Result<()>>,
}

impl TestClient {
    fn start(config: Config) -> Self {
        let server = Arc::new(McpServer::new(config, CommandExecutor::new()).unwrap());
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server_io);
        let (client_read, writer) = tokio::io::split(client_io);

        Self {
            writer,
            lines: BufReader::new(client_read).lines(),
            server: tokio::spawn(server.serve(server_read, server_write)),
        }
    }

    async fn send_raw(&mut self, line: &str) {
        self.send_bytes(line.as_bytes()).await;
    }

    async fn send_bytes(&mut self, line: &[u8]) {
        self.writer.write_all(line).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
        self.writer.flush().await.unwrap();
    }

    async fn send(&mut self, message: Value) {
        self.send_raw(&message.to_string()).await;
    }

    async fn recv(&mut self) -> Value {
        let line = tokio::time::timeout(Duration::from_secs(10), self.lines.next_line())
            .await
            .expect("timed out waiting for response")
            .unwrap()
            .expect("server closed output");
        serde_json::from_str(&line).unwrap()
    }

    async fn call(&mut self, id: i64, method: &str, params: Value) -> Value {
        self.send(json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}))
            .await;
        let response = self.recv().await;
        assert_eq!(response["id"], id);
        response
    }

    async fn shutdown(mut self) {
        self.writer.shutdown().await.unwrap();
        self.server.await.unwrap().unwrap();
    }
}

fn tool_call(id: i64, name: &str) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "method": "tools/call", "params": {"name": name}})
}

/// Parses the JSON payload inside a `tools/call` text result.
fn payload(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

fn fixture(ctx: &TestContext) -> Config {
    let path = ctx.write_config(json!({
        "echo": {"workdir": ".", "command": "echo hello"},
        "args": {"workdir": ".", "command": "echo", "additionalArgs": true},
        "slow": {"workdir": ".", "command": "sleep 1; echo slow"},
        "broken": {"workdir": "missing", "command": "true"}
    }));
    Config::load(&path).unwrap()
}

// ============================================================================
// Handshake and listing
// ============================================================================

#[tokio::test]
async fn test_initialize_and_ping() {
    let ctx = TestContext::new();
    let mut client = TestClient::start(fixture(&ctx));

    let response = client.call(1, "initialize", json!({})).await;
    assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(response["result"]["serverInfo"]["name"], "long-run-command-mcp");

    client
        .send(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .await;

    let response = client.call(2, "ping", json!(null)).await;
    assert_eq!(response["result"], json!({}));

    client.shutdown().await;
}

#[tokio::test]
async fn test_tools_list_sorted_with_schemas() {
    let ctx = TestContext::new();
    let mut client = TestClient::start(fixture(&ctx));

    let response = client.call(1, "tools/list", json!({})).await;
    let tools = response["result"]["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["run_args", "run_broken", "run_echo", "run_slow"]);

    assert_eq!(tools[0]["inputSchema"]["properties"]["args"]["type"], "array");
    assert_eq!(tools[2]["inputSchema"]["properties"], json!({}));
    assert!(tools[2]["description"]
        .as_str()
        .unwrap()
        .starts_with("Execute echo command: echo hello (workdir: "));

    client.shutdown().await;
}

// ============================================================================
// Tool calls
// ============================================================================

#[cfg(unix)]
#[tokio::test]
async fn test_call_reports_log_paths() {
    let ctx = TestContext::new();
    let mut client = TestClient::start(fixture(&ctx));

    let response = client
        .call(1, "tools/call", json!({"name": "run_echo", "arguments": {}}))
        .await;
    let result = payload(&response);

    assert_eq!(result["success"], true);
    assert_eq!(result["command"], "echo hello");
    assert_eq!(result["exitCode"], 0);
    assert!(result["executionTimeMs"].is_u64());
    let output = result["outputPath"].as_str().unwrap();
    assert_eq!(std::fs::read_to_string(output).unwrap(), "hello\n");

    client.shutdown().await;
}

#[tokio::test]
async fn test_rejections_are_payloads_not_errors() {
    let ctx = TestContext::new();
    let mut client = TestClient::start(fixture(&ctx));

    let response = client
        .call(1, "tools/call", json!({"name": "run_echo", "arguments": {"args": ["x"]}}))
        .await;
    assert!(response.get("error").is_none());
    assert_eq!(
        payload(&response),
        json!({
            "success": false,
            "error": "Additional arguments are not allowed for command: echo"
        })
    );

    let response = client
        .call(2, "tools/call", json!({"name": "run_args", "arguments": {"args": ["a; rm -rf /"]}}))
        .await;
    assert_eq!(
        payload(&response)["error"],
        "Invalid characters in additional arguments"
    );

    let response = client
        .call(3, "tools/call", json!({"name": "run_broken"}))
        .await;
    let message = payload(&response)["error"].as_str().unwrap().to_string();
    assert!(message.starts_with("Working directory does not exist: "), "{message}");

    assert!(ctx.log_files().is_empty());
    client.shutdown().await;
}

#[tokio::test]
async fn test_protocol_errors() {
    let ctx = TestContext::new();
    let mut client = TestClient::start(fixture(&ctx));

    let response = client.call(1, "tools/call", json!({"name": "run_nope"})).await;
    assert_eq!(response["error"]["code"], -32602);

    let response = client
        .call(2, "tools/call", json!({"name": "run_args", "arguments": {"args": "x"}}))
        .await;
    assert_eq!(response["error"]["code"], -32602);

    let response = client.call(3, "resources/list", json!({})).await;
    assert_eq!(response["error"]["code"], -32601);

    client.send_raw("{ not json").await;
    let response = client.recv().await;
    assert_eq!(response["error"]["code"], -32700);
    assert_eq!(response["id"], Value::Null);

    client.send(json!({"id": 4, "params": {}})).await;
    let response = client.recv().await;
    assert_eq!(response["error"]["code"], -32600);
    assert_eq!(response["id"], 4);

    client.shutdown().await;
}

#[cfg(unix)]
#[tokio::test]
async fn test_slow_call_does_not_block_others() {
    let ctx = TestContext::new();
    let mut client = TestClient::start(fixture(&ctx));

    client.send(tool_call(1, "run_slow")).await;
    client.send(tool_call(2, "run_echo")).await;
    client
        .send(json!({"jsonrpc": "2.0", "id": 3, "method": "ping"}))
        .await;

    let mut order = Vec::new();
    for _ in 0..3 {
        order.push(client.recv().await["id"].as_i64().unwrap());
    }
    assert_eq!(order.last(), Some(&1));

    client.shutdown().await;
}

#[cfg(unix)]
#[tokio::test]
async fn test_eof_waits_for_running_calls() {
    let ctx = TestContext::new();
    let mut client = TestClient::start(fixture(&ctx));

    client.send(tool_call(9, "run_slow")).await;

    let TestClient { mut writer, mut lines, server } = client;
    writer.shutdown().await.unwrap();

    let line = lines.next_line().await.unwrap().expect("response before close");
    let response: Value = serde_json::from_str(&line).unwrap();
    assert_eq!(response["id"], 9);
    assert_eq!(payload(&response)["success"], true);

    server.await.unwrap().unwrap();
    assert!(lines.next_line().await.unwrap().is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn test_invalid_utf8_line_does_not_stop_server() {
    let ctx = TestContext::new();
    let mut client = TestClient::start(fixture(&ctx));

    client.send(tool_call(1, "run_slow")).await;
    client.send_bytes(b"\xff\xfe").await;
    client.send(json!({"jsonrpc": "2.0", "id": 2, "method": "ping"})).await;

    let parse_error = client.recv().await;
    assert_eq!(parse_error["error"]["code"], -32700);
    assert_eq!(parse_error["id"], Value::Null);

    let ping = client.recv().await;
    assert_eq!(ping["id"], 2);
    assert_eq!(ping["result"], json!({}));

    let slow = client.recv().await;
    assert_eq!(slow["id"], 1);
    assert_eq!(payload(&slow)["success"], true);

    client.shutdown().await;
}
