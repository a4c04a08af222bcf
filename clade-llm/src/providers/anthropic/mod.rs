//! Anthropic (Claude) provider implementation.

pub mod client;
pub mod completion;
pub mod types;

pub use client::AnthropicClient;
pub use completion::AnthropicCompletionProvider;
