//! Clade Core - Entity Types
//!
//! Pure data structures with no I/O. All other crates depend on this.
//! This crate contains the state lineage family, the error taxonomy, and
//! the process-wide settings bag.

pub mod error;
pub mod identity;
pub mod settings;
pub mod state;

pub use error::{CladeError, CladeResult, ConfigError, LlmError, McpError, ValidationError};
pub use identity::{new_state_id, StateId, Timestamp};
pub use settings::Settings;
pub use state::{
    BaseState, ConversationMessage, ConversationState, HistoryEntry, State, StateOverrides,
    Subtask, TaskState,
};
