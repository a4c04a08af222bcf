//! MCP stdio client.
//!
//! Spawns a server process described by a validated [`ServerConfig`] and
//! exchanges line-delimited JSON-RPC over its stdin/stdout. One client
//! owns one server process; there is no reconnection and no retry.

use std::process::Stdio;
use std::time::Duration;

use serde_json::{json, Value as JsonValue};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use clade_config::ServerConfig;
use clade_core::{CladeError, CladeResult, McpError};

use crate::types::{
    CallToolResult, GetPromptResult, InitializeResult, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, ReadResourceResult, Tool, MCP_PROTOCOL_VERSION,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

struct Connection {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    next_id: u64,
}

/// Client for one MCP server process.
pub struct McpClient {
    name: String,
    config: ServerConfig,
    connection: Option<Connection>,
    request_timeout: Duration,
}

impl McpClient {
    /// Create a disconnected client for a named server.
    pub fn new(name: impl Into<String>, config: ServerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            connection: None,
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Spawn the server process and run the initialize handshake.
    pub async fn connect(&mut self) -> CladeResult<InitializeResult> {
        let mut command = Command::new(self.config.server_path());
        command.stdin(Stdio::piped()).stdout(Stdio::piped());
        if let Some(dir) = self.config.working_dir() {
            command.current_dir(dir);
        }
        command.envs(self.config.env_vars());
        command.kill_on_drop(true);

        let mut child = command.spawn().map_err(|err| {
            CladeError::Mcp(McpError::SpawnFailed {
                server: self.name.clone(),
                reason: err.to_string(),
            })
        })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            CladeError::Mcp(McpError::Transport {
                reason: "child stdin unavailable".to_string(),
            })
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            CladeError::Mcp(McpError::Transport {
                reason: "child stdout unavailable".to_string(),
            })
        })?;

        self.connection = Some(Connection {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            next_id: 1,
        });

        let params = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "clade",
                "version": env!("CARGO_PKG_VERSION"),
            },
        });
        let result = self.request("initialize", params).await?;
        let init: InitializeResult = serde_json::from_value(result).map_err(|err| {
            CladeError::Mcp(McpError::Protocol {
                reason: format!("invalid initialize result: {}", err),
            })
        })?;

        self.notify("notifications/initialized", json!({})).await?;

        tracing::info!(
            server = %self.name,
            remote = %init.server_info.name,
            protocol = %init.protocol_version,
            "connected to MCP server"
        );
        Ok(init)
    }

    /// Close the connection and kill the server process.
    pub async fn disconnect(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            drop(connection.stdin);
            if let Err(err) = connection.child.kill().await {
                tracing::debug!(server = %self.name, error = %err, "server process already exited");
            }
            tracing::info!(server = %self.name, "disconnected from MCP server");
        }
    }

    /// List the tools the server exposes.
    pub async fn list_tools(&mut self) -> CladeResult<Vec<Tool>> {
        let result = self.request("tools/list", json!({})).await?;
        let parsed: ListToolsResult = Self::parse("tools/list", result)?;
        Ok(parsed.tools)
    }

    /// Call a tool on the server.
    pub async fn call_tool(
        &mut self,
        tool_name: &str,
        arguments: JsonValue,
    ) -> CladeResult<CallToolResult> {
        let params = json!({"name": tool_name, "arguments": arguments});
        let result = self.request("tools/call", params).await?;
        Self::parse("tools/call", result)
    }

    /// Read a resource from the server.
    pub async fn read_resource(&mut self, uri: &str) -> CladeResult<ReadResourceResult> {
        let params = json!({"uri": uri});
        let result = self.request("resources/read", params).await?;
        Self::parse("resources/read", result)
    }

    /// Fetch a prompt template from the server.
    pub async fn get_prompt(
        &mut self,
        prompt_name: &str,
        arguments: JsonValue,
    ) -> CladeResult<GetPromptResult> {
        let params = json!({"name": prompt_name, "arguments": arguments});
        let result = self.request("prompts/get", params).await?;
        Self::parse("prompts/get", result)
    }

    fn parse<T: serde::de::DeserializeOwned>(method: &str, value: JsonValue) -> CladeResult<T> {
        serde_json::from_value(value).map_err(|err| {
            CladeError::Mcp(McpError::Protocol {
                reason: format!("invalid {} result: {}", method, err),
            })
        })
    }

    /// Send a request and wait for the matching response, skipping any
    /// server-initiated messages in between.
    async fn request(&mut self, method: &str, params: JsonValue) -> CladeResult<JsonValue> {
        let timeout = self.request_timeout;
        let connection = self
            .connection
            .as_mut()
            .ok_or(CladeError::Mcp(McpError::NotConnected))?;

        let id = connection.next_id;
        connection.next_id += 1;

        let request = JsonRpcRequest::new(id, method, params);
        let mut line = serde_json::to_string(&request).map_err(|err| {
            CladeError::Mcp(McpError::Protocol {
                reason: format!("failed to encode request: {}", err),
            })
        })?;
        line.push('\n');

        let exchange = async {
            connection
                .stdin
                .write_all(line.as_bytes())
                .await
                .map_err(transport)?;
            connection.stdin.flush().await.map_err(transport)?;

            loop {
                let mut buf = String::new();
                let read = connection.stdout.read_line(&mut buf).await.map_err(transport)?;
                if read == 0 {
                    return Err(CladeError::Mcp(McpError::Transport {
                        reason: "server closed stdout".to_string(),
                    }));
                }
                let trimmed = buf.trim();
                if trimmed.is_empty() {
                    continue;
                }

                let response: JsonRpcResponse = match serde_json::from_str(trimmed) {
                    Ok(response) => response,
                    Err(err) => {
                        return Err(CladeError::Mcp(McpError::Protocol {
                            reason: format!("invalid JSON-RPC frame: {}", err),
                        }))
                    }
                };

                match &response.id {
                    Some(value) if value.as_u64() == Some(id) => {
                        if let Some(error) = response.error {
                            return Err(CladeError::Mcp(McpError::ServerError {
                                code: error.code,
                                message: error.message,
                            }));
                        }
                        return Ok(response.result.unwrap_or(JsonValue::Null));
                    }
                    // A different id or a server-initiated message; skip.
                    _ => continue,
                }
            }
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(CladeError::Mcp(McpError::Transport {
                reason: format!("request {} timed out", method),
            })),
        }
    }

    /// Send a notification (no reply expected).
    async fn notify(&mut self, method: &str, params: JsonValue) -> CladeResult<()> {
        let connection = self
            .connection
            .as_mut()
            .ok_or(CladeError::Mcp(McpError::NotConnected))?;

        let notification = JsonRpcNotification::new(method, params);
        let mut line = serde_json::to_string(&notification).map_err(|err| {
            CladeError::Mcp(McpError::Protocol {
                reason: format!("failed to encode notification: {}", err),
            })
        })?;
        line.push('\n');

        connection
            .stdin
            .write_all(line.as_bytes())
            .await
            .map_err(transport)?;
        connection.stdin.flush().await.map_err(transport)?;
        Ok(())
    }
}

fn transport(err: std::io::Error) -> CladeError {
    CladeError::Mcp(McpError::Transport {
        reason: err.to_string(),
    })
}
