//! Clade agent entry point.
//!
//! Bootstraps settings from the environment, initializes telemetry,
//! resolves server configuration, and runs the agent until interrupted.
//!
//! Usage: `clade [overlay-config.json]`. The base configuration path
//! comes from `CLADE_BASE_CONFIG` when set.

use std::path::PathBuf;

use clade_agent::{telemetry, Agent};
use clade_config::ConfigResolver;
use clade_core::{CladeResult, Settings};

#[tokio::main]
async fn main() -> CladeResult<()> {
    let settings = Settings::from_env()?;
    telemetry::init(&settings);

    let base_path = std::env::var("CLADE_BASE_CONFIG").ok().map(PathBuf::from);
    let overlay_path = std::env::args().nth(1).map(PathBuf::from);

    let resolver = ConfigResolver::new(base_path);
    let servers = resolver.load_server_configs(overlay_path.as_deref())?;
    tracing::info!(count = servers.len(), "resolved server configs");

    let mut agent = Agent::new(settings, servers);
    agent.start().await;
    tracing::info!("clade agent running; press Ctrl-C to stop");

    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");

    agent.stop().await;
    Ok(())
}
