//! Process-wide settings resolved once from environment variables.
//!
//! Constructed at startup and passed by reference to whatever needs it;
//! there is no global lookup.

use crate::error::ConfigError;

/// Application settings loaded from environment variables.
///
/// Environment variables:
/// - `CLADE_API_KEY`: API key for the completion provider (required)
/// - `CLADE_MCP_SERVERS`: Comma-separated server names to connect at startup
/// - `CLADE_LOG_LEVEL`: Log level filter (default: "info")
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// API key for the completion provider.
    pub api_key: String,
    /// Default list of server identifiers to connect at startup.
    pub mcp_servers: Vec<String>,
    /// Log level consumed by telemetry setup.
    pub log_level: String,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key =
            std::env::var("CLADE_API_KEY").map_err(|_| ConfigError::MissingRequired {
                field: "CLADE_API_KEY".to_string(),
            })?;

        let mcp_servers = std::env::var("CLADE_MCP_SERVERS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let log_level =
            std::env::var("CLADE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            api_key,
            mcp_servers,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment mutation is process-wide, so the from_env cases run in
    // one test to avoid interference under the parallel test runner.
    #[test]
    fn test_settings_from_env() {
        std::env::set_var("CLADE_API_KEY", "test_key");
        std::env::set_var("CLADE_MCP_SERVERS", "server1, server2,,");
        std::env::set_var("CLADE_LOG_LEVEL", "debug");

        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.api_key, "test_key");
        assert_eq!(settings.mcp_servers, vec!["server1", "server2"]);
        assert_eq!(settings.log_level, "debug");

        std::env::remove_var("CLADE_MCP_SERVERS");
        std::env::remove_var("CLADE_LOG_LEVEL");
        let settings = Settings::from_env().unwrap();
        assert!(settings.mcp_servers.is_empty());
        assert_eq!(settings.log_level, "info");

        std::env::remove_var("CLADE_API_KEY");
        let result = Settings::from_env();
        assert!(matches!(
            result,
            Err(ConfigError::MissingRequired { field }) if field == "CLADE_API_KEY"
        ));
    }
}
