//! Clade Agent - coordination layer.
//!
//! Wires resolved settings and server records into a running agent: one
//! MCP client per server, a completion provider for command enhancement,
//! and a conversation state tracking the session.

pub mod agent;
pub mod telemetry;

pub use agent::{Agent, CommandOutcome, CommandStatus};
