//! MCP (Model Context Protocol) server
//!
//! Exposes every configured command as a tool over JSON-RPC 2.0 on stdio.

pub mod protocol;
pub mod server;
pub mod tools;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId};
pub use server::McpServer;
pub use tools::{RegistryError, ToolRegistry};
