//! Clade MCP - stdio client for MCP servers.
//!
//! Consumes validated server records from clade-config: spawns the
//! server executable with its working directory and environment, then
//! exchanges JSON-RPC requests over the child's stdin/stdout.

mod client;
pub mod types;

pub use client::McpClient;
pub use types::{
    CallToolResult, GetPromptResult, InitializeResult, ListToolsResult, ReadResourceResult,
    ServerCapabilities, ServerInfo, Tool, ToolContent, MCP_PROTOCOL_VERSION,
};
