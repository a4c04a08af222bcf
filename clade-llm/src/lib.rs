//! Clade LLM - completion provider abstraction.
//!
//! Provider-agnostic trait for outbound completions plus the Anthropic
//! implementation. The interface is deliberately narrow: a prompt string
//! in, a completion string out; failure modes stay opaque to the rest of
//! the system.

pub mod providers;

use async_trait::async_trait;
use clade_core::CladeResult;

pub use providers::anthropic::{AnthropicClient, AnthropicCompletionProvider};

/// Trait for completion providers.
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Produce a completion for the given prompt.
    ///
    /// # Returns
    /// * `Ok(String)` - The completion text
    /// * `Err(CladeError::Llm)` - If the request fails
    async fn complete(&self, prompt: &str) -> CladeResult<String>;

    /// Model identifier used by this provider.
    fn model_id(&self) -> &str;
}
