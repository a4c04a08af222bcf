//! Anthropic HTTP client.

use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Semaphore;

use clade_core::{CladeError, CladeResult, LlmError};

use super::types::ApiError;

const PROVIDER: &str = "anthropic";

/// Anthropic API client with bounded concurrency.
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    base_url: String,
    concurrency: Arc<Semaphore>,
}

impl AnthropicClient {
    /// Create a new Anthropic client.
    ///
    /// # Arguments
    /// * `api_key` - Anthropic API key
    /// * `max_in_flight` - Maximum concurrent requests
    pub fn new(api_key: impl Into<String>, max_in_flight: usize) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com/v1".to_string(),
            concurrency: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    /// Override the API base URL (for proxies and tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Make an API request, holding a concurrency permit for its duration.
    pub async fn request<Req: Serialize, Res: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Req,
    ) -> CladeResult<Res> {
        let _permit = self.concurrency.acquire().await.map_err(|e| {
            CladeError::Llm(LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                status: 0,
                message: format!("Concurrency limiter closed: {}", e),
            })
        })?;

        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                CladeError::Llm(LlmError::RequestFailed {
                    provider: PROVIDER.to_string(),
                    status: 0,
                    message: format!("HTTP request failed: {}", e),
                })
            })?;

        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| {
                CladeError::Llm(LlmError::InvalidResponse {
                    provider: PROVIDER.to_string(),
                    reason: format!("Failed to parse response: {}", e),
                })
            })
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let message = if let Ok(api_error) = serde_json::from_str::<ApiError>(&error_text) {
                api_error.error.message
            } else {
                error_text
            };

            Err(match status {
                StatusCode::TOO_MANY_REQUESTS => CladeError::Llm(LlmError::RateLimited {
                    provider: PROVIDER.to_string(),
                }),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    CladeError::Llm(LlmError::InvalidApiKey {
                        provider: PROVIDER.to_string(),
                    })
                }
                _ => CladeError::Llm(LlmError::RequestFailed {
                    provider: PROVIDER.to_string(),
                    status: status.as_u16(),
                    message,
                }),
            })
        }
    }
}
