//! Anthropic completion provider implementation.

use async_trait::async_trait;

use clade_core::{CladeError, CladeResult, LlmError};

use super::client::AnthropicClient;
use super::types::{ContentBlock, Message, MessageRequest, MessageResponse};
use crate::CompletionProvider;

const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const DEFAULT_MAX_TOKENS: i32 = 1024;

/// Completion provider backed by the Anthropic messages API.
pub struct AnthropicCompletionProvider {
    client: AnthropicClient,
    model: String,
    max_tokens: i32,
}

impl AnthropicCompletionProvider {
    /// Create a provider for a specific model.
    ///
    /// # Arguments
    /// * `api_key` - Anthropic API key
    /// * `model` - Model name (e.g., "claude-3-5-sonnet-20241022")
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: AnthropicClient::new(api_key, 4),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Create a provider with the default model.
    pub fn with_default_model(api_key: impl Into<String>) -> Self {
        Self::new(api_key, DEFAULT_MODEL)
    }

    pub fn with_max_tokens(mut self, max_tokens: i32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Extract text from content blocks.
    fn extract_text(content: Vec<ContentBlock>) -> String {
        content
            .into_iter()
            .map(|block| match block {
                ContentBlock::Text { text } => text,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl CompletionProvider for AnthropicCompletionProvider {
    async fn complete(&self, prompt: &str) -> CladeResult<String> {
        let request = MessageRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.max_tokens,
            system: None,
            temperature: None,
        };

        let response: MessageResponse = self.client.request("messages", request).await?;

        if response.content.is_empty() {
            return Err(CladeError::Llm(LlmError::InvalidResponse {
                provider: "anthropic".to_string(),
                reason: "empty content".to_string(),
            }));
        }

        Ok(Self::extract_text(response.content))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
