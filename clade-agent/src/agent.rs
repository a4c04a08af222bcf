//! Agent coordinating the completion provider and MCP servers.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;

use clade_config::ServerConfig;
use clade_core::{CladeResult, ConversationState, Settings};
use clade_llm::{AnthropicCompletionProvider, CompletionProvider};
use clade_mcp::McpClient;

/// Outcome of sending a command to one server.
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutcome {
    pub server: String,
    #[serde(flatten)]
    pub status: CommandStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CommandStatus {
    Success { response: String },
    Error { error: String },
}

/// Agent that coordinates between the completion provider and MCP servers.
///
/// Owns one MCP client per configured server and a conversation state
/// that records every processed command.
pub struct Agent {
    settings: Settings,
    completion: Box<dyn CompletionProvider>,
    clients: BTreeMap<String, McpClient>,
    conversation: ConversationState,
}

impl Agent {
    /// Build an agent from resolved settings and server records.
    ///
    /// When the settings name a non-empty default server list, only those
    /// servers get clients; otherwise every resolved server does.
    pub fn new(settings: Settings, servers: BTreeMap<String, ServerConfig>) -> Self {
        let completion: Box<dyn CompletionProvider> = Box::new(
            AnthropicCompletionProvider::with_default_model(settings.api_key.clone()),
        );

        let clients: BTreeMap<String, McpClient> = servers
            .into_iter()
            .filter(|(name, _)| {
                settings.mcp_servers.is_empty() || settings.mcp_servers.contains(name)
            })
            .map(|(name, config)| (name.clone(), McpClient::new(name, config)))
            .collect();

        let mut conversation = ConversationState::new("agent session");
        conversation.metadata.insert(
            "servers".to_string(),
            json!(clients.keys().collect::<Vec<_>>()),
        );

        Self {
            settings,
            completion,
            clients,
            conversation,
        }
    }

    /// Swap the completion provider (seam for tests and other backends).
    pub fn with_completion_provider(mut self, provider: Box<dyn CompletionProvider>) -> Self {
        self.completion = provider;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn server_names(&self) -> Vec<&str> {
        self.clients.keys().map(String::as_str).collect()
    }

    /// Connect every configured server. Per-server failures are logged
    /// and do not abort startup.
    pub async fn start(&mut self) {
        tracing::info!("starting clade agent");
        for (name, client) in &mut self.clients {
            if let Err(err) = client.connect().await {
                tracing::error!(server = %name, error = %err, "failed to connect to MCP server");
            }
        }
    }

    /// Disconnect all servers.
    pub async fn stop(&mut self) {
        tracing::info!("stopping clade agent");
        for client in self.clients.values_mut() {
            client.disconnect().await;
        }
    }

    /// Enhance a command through the completion provider and forward it
    /// to the targeted server, or to all servers when none is named.
    ///
    /// Per-server failures become error outcomes; only a completion
    /// failure aborts the call.
    pub async fn process_command(
        &mut self,
        command: &str,
        server: Option<&str>,
    ) -> CladeResult<Vec<CommandOutcome>> {
        let prompt = format!("Process this MCP server command: {}", command);
        let enhanced = self.completion.complete(&prompt).await?;

        self.conversation.add_message("user", command);
        self.conversation.add_message("assistant", enhanced.as_str());

        let targets: Vec<String> = match server {
            Some(name) => vec![name.to_string()],
            None => self.clients.keys().cloned().collect(),
        };

        let mut outcomes = Vec::new();
        for name in targets {
            let Some(client) = self.clients.get_mut(&name) else {
                outcomes.push(CommandOutcome {
                    server: name,
                    status: CommandStatus::Error {
                        error: "unknown server".to_string(),
                    },
                });
                continue;
            };

            match client
                .call_tool("process_command", json!({"command": enhanced}))
                .await
            {
                Ok(result) => outcomes.push(CommandOutcome {
                    server: name,
                    status: CommandStatus::Success {
                        response: result.text(),
                    },
                }),
                Err(err) => {
                    tracing::error!(server = %name, error = %err, "failed to process command");
                    outcomes.push(CommandOutcome {
                        server: name,
                        status: CommandStatus::Error {
                            error: err.to_string(),
                        },
                    });
                }
            }
        }

        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubProvider;

    #[async_trait]
    impl CompletionProvider for StubProvider {
        async fn complete(&self, prompt: &str) -> CladeResult<String> {
            Ok(format!("enhanced: {}", prompt))
        }

        fn model_id(&self) -> &str {
            "stub"
        }
    }

    fn test_settings() -> Settings {
        Settings {
            api_key: "test_key".to_string(),
            mcp_servers: Vec::new(),
            log_level: "info".to_string(),
        }
    }

    #[tokio::test]
    async fn test_process_command_records_conversation() {
        let mut agent = Agent::new(test_settings(), BTreeMap::new())
            .with_completion_provider(Box::new(StubProvider));

        let outcomes = agent.process_command("list files", None).await.unwrap();
        assert!(outcomes.is_empty());

        let conversation = agent.conversation();
        assert_eq!(conversation.conversation_history.len(), 2);
        assert_eq!(conversation.conversation_history[0].role, "user");
        assert_eq!(conversation.conversation_history[0].content, "list files");
        assert_eq!(conversation.conversation_history[1].role, "assistant");
        assert!(conversation.conversation_history[1]
            .content
            .contains("list files"));
        // dual bookkeeping: the generic history log got both messages too
        assert_eq!(conversation.history.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_server_yields_error_outcome() {
        let mut agent = Agent::new(test_settings(), BTreeMap::new())
            .with_completion_provider(Box::new(StubProvider));

        let outcomes = agent
            .process_command("status", Some("missing"))
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].server, "missing");
        assert!(matches!(
            outcomes[0].status,
            CommandStatus::Error { .. }
        ));
    }

    #[test]
    fn test_settings_server_list_filters_clients() {
        let settings = Settings {
            api_key: "test_key".to_string(),
            mcp_servers: vec!["alpha".to_string()],
            log_level: "info".to_string(),
        };
        // no resolved servers match, so no clients are created
        let agent = Agent::new(settings, BTreeMap::new());
        assert!(agent.server_names().is_empty());
    }

    #[test]
    fn test_conversation_metadata_names_servers() {
        let agent = Agent::new(test_settings(), BTreeMap::new());
        assert!(agent.conversation().metadata.contains_key("servers"));
    }
}
