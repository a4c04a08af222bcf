//! Error types for Clade operations

use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors.
///
/// Raised while loading, merging, or materializing server configuration.
/// A missing or corrupt *base* configuration file is the one tolerated
/// case (degraded to an empty base and a warning by the resolver); every
/// variant here is fatal to the call that produced it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Config file not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("Invalid JSON in config file {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("Error reading config file {}: {reason}", .path.display())]
    Io { path: PathBuf, reason: String },

    #[error("No 'servers' section in config file")]
    MissingServers,

    #[error("'servers' section must be an object")]
    ServersNotObject,

    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid config for server {server}: {source}")]
    InvalidServer {
        server: String,
        source: ValidationError,
    },
}

/// Per-field validation errors raised during `ServerConfig` construction.
///
/// The Display text of the path variants is part of the contract: callers
/// distinguish failure causes by matching on "not found", "not executable",
/// and "does not exist".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Path for {field} is not absolute: {}", .path.display())]
    NotAbsolute { field: String, path: PathBuf },

    #[error("Server executable not found: {}", .path.display())]
    ServerNotFound { path: PathBuf },

    #[error("Server path is not executable: {}", .path.display())]
    NotExecutable { path: PathBuf },

    #[error("Config file not found: {}", .path.display())]
    ConfigFileNotFound { path: PathBuf },

    #[error("Working directory does not exist: {}", .path.display())]
    WorkingDirNotFound { path: PathBuf },
}

/// LLM provider errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("No completion provider configured")]
    ProviderNotConfigured,

    #[error("Invalid API key for {provider}")]
    InvalidApiKey { provider: String },

    #[error("Rate limited by {provider}")]
    RateLimited { provider: String },

    #[error("Request to {provider} failed with status {status}: {message}")]
    RequestFailed {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// MCP client errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum McpError {
    #[error("Not connected to MCP server")]
    NotConnected,

    #[error("Failed to spawn server {server}: {reason}")]
    SpawnFailed { server: String, reason: String },

    #[error("Transport error: {reason}")]
    Transport { reason: String },

    #[error("Protocol error: {reason}")]
    Protocol { reason: String },

    #[error("Server returned error {code}: {message}")]
    ServerError { code: i64, message: String },
}

/// Master error type for all Clade errors.
#[derive(Debug, Clone, Error)]
pub enum CladeError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("MCP error: {0}")]
    Mcp(#[from] McpError),
}

/// Result type alias for Clade operations.
pub type CladeResult<T> = Result<T, CladeError>;
