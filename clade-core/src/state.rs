//! State lineage types for conversational and task context.
//!
//! Every state record keeps an append-only `history` of timestamped
//! mutation entries. Child states fork from a parent by copying the
//! parent's history by value and recording the parent's id; parent and
//! child never share mutable storage afterwards.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::ValidationError;
use crate::identity::{new_state_id, StateId, Timestamp};

// ============================================================================
// HISTORY
// ============================================================================

/// A single timestamped mutation record.
///
/// Entries are audit data: insertion order is causal order, and a state's
/// history is only ever appended to or copied wholesale into a fork.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Discriminator for the kind of mutation ("message", "status_update", ...).
    #[serde(rename = "type")]
    pub entry_type: String,
    /// Free-form payload describing the mutation.
    pub data: Value,
    /// When the mutation happened. Entries deserialized without a
    /// timestamp are assigned one at that point, never left empty.
    #[serde(default = "Utc::now")]
    pub timestamp: Timestamp,
}

impl HistoryEntry {
    /// Create an entry stamped with the current time.
    pub fn new(entry_type: impl Into<String>, data: Value) -> Self {
        Self {
            entry_type: entry_type.into(),
            data,
            timestamp: Utc::now(),
        }
    }
}

// ============================================================================
// BASE STATE
// ============================================================================

/// Base lineage-tracked context record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseState {
    #[serde(default = "new_state_id")]
    pub state_id: StateId,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Lineage back-reference to the state this one was forked from.
    /// A relation only, never an ownership pointer; `None` for roots.
    #[serde(default)]
    pub parent_state_id: Option<StateId>,
}

impl BaseState {
    /// Create a root state with a fresh id and empty history.
    pub fn new() -> Self {
        Self {
            state_id: new_state_id(),
            history: Vec::new(),
            metadata: Map::new(),
            parent_state_id: None,
        }
    }

    /// Append a timestamped entry to the history log.
    pub fn add_history_entry(&mut self, entry_type: impl Into<String>, data: Value) {
        self.history.push(HistoryEntry::new(entry_type, data));
    }

    /// Fork a child state: fresh id, deep copy of this history, parent
    /// link set. All other fields start from type defaults.
    pub fn create_child(&self) -> Self {
        Self {
            state_id: new_state_id(),
            history: self.history.clone(),
            metadata: Map::new(),
            parent_state_id: Some(self.state_id),
        }
    }
}

impl Default for BaseState {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// CONVERSATION STATE
// ============================================================================

/// A single conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: String,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub timestamp: Timestamp,
}

/// Lineage-tracked conversation context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    #[serde(default = "new_state_id")]
    pub state_id: StateId,
    /// What the conversation is currently working towards. Required.
    pub current_task: String,
    #[serde(default)]
    pub relevant_facts: Vec<String>,
    #[serde(default)]
    pub user_preferences: Map<String, Value>,
    #[serde(default)]
    pub conversation_history: Vec<ConversationMessage>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub parent_state_id: Option<StateId>,
}

impl ConversationState {
    /// Create a root conversation state.
    pub fn new(current_task: impl Into<String>) -> Self {
        Self {
            state_id: new_state_id(),
            current_task: current_task.into(),
            relevant_facts: Vec::new(),
            user_preferences: Map::new(),
            conversation_history: Vec::new(),
            history: Vec::new(),
            metadata: Map::new(),
            parent_state_id: None,
        }
    }

    /// Append a timestamped entry to the history log.
    pub fn add_history_entry(&mut self, entry_type: impl Into<String>, data: Value) {
        self.history.push(HistoryEntry::new(entry_type, data));
    }

    /// Record a message in the conversation.
    ///
    /// The message lands in `conversation_history` AND as a generic
    /// `"message"` history entry carrying the same payload.
    pub fn add_message(&mut self, role: impl Into<String>, content: impl Into<String>) {
        let message = ConversationMessage {
            role: role.into(),
            content: content.into(),
            timestamp: Utc::now(),
        };
        let payload = json!({
            "role": message.role,
            "content": message.content,
            "timestamp": message.timestamp,
        });
        self.conversation_history.push(message);
        self.add_history_entry("message", payload);
    }

    /// Fork a child conversation. The child inherits a copy of this
    /// history and the parent link; every other field starts from type
    /// defaults, with the required `current_task` supplied by the caller.
    pub fn create_child(&self, current_task: impl Into<String>) -> Self {
        Self {
            state_id: new_state_id(),
            current_task: current_task.into(),
            relevant_facts: Vec::new(),
            user_preferences: Map::new(),
            conversation_history: Vec::new(),
            history: self.history.clone(),
            metadata: Map::new(),
            parent_state_id: Some(self.state_id),
        }
    }
}

// ============================================================================
// TASK STATE
// ============================================================================

/// A subtask record inside a [`TaskState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default = "Utc::now")]
    pub created_at: Timestamp,
}

fn default_task_status() -> String {
    "pending".to_string()
}

/// Lineage-tracked task execution context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskState {
    #[serde(default = "new_state_id")]
    pub state_id: StateId,
    /// Name of the task being executed. Required.
    pub task_name: String,
    #[serde(default = "default_task_status")]
    pub task_status: String,
    #[serde(default)]
    pub task_data: Map<String, Value>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub parent_state_id: Option<StateId>,
}

impl TaskState {
    /// Create a root task state with status `"pending"`.
    pub fn new(task_name: impl Into<String>) -> Self {
        Self {
            state_id: new_state_id(),
            task_name: task_name.into(),
            task_status: default_task_status(),
            task_data: Map::new(),
            subtasks: Vec::new(),
            history: Vec::new(),
            metadata: Map::new(),
            parent_state_id: None,
        }
    }

    /// Append a timestamped entry to the history log.
    pub fn add_history_entry(&mut self, entry_type: impl Into<String>, data: Value) {
        self.history.push(HistoryEntry::new(entry_type, data));
    }

    /// Update the task status, recording a `"status_update"` history
    /// entry that merges `{status}` with any supplied details.
    pub fn update_status(&mut self, status: impl Into<String>, details: Option<Map<String, Value>>) {
        let status = status.into();
        self.task_status = status.clone();

        let mut data = Map::new();
        data.insert("status".to_string(), Value::String(status));
        if let Some(details) = details {
            data.extend(details);
        }
        self.add_history_entry("status_update", Value::Object(data));
    }

    /// Add a pending subtask, recording a `"subtask_added"` history entry
    /// with the same payload.
    pub fn add_subtask(&mut self, name: impl Into<String>, data: Option<Map<String, Value>>) {
        let subtask = Subtask {
            name: name.into(),
            status: "pending".to_string(),
            data: data.unwrap_or_default(),
            created_at: Utc::now(),
        };
        let payload = json!({
            "name": subtask.name,
            "status": subtask.status,
            "data": subtask.data,
            "created_at": subtask.created_at,
        });
        self.subtasks.push(subtask);
        self.add_history_entry("subtask_added", payload);
    }

    /// Fork a child task. The child inherits a copy of this history and
    /// the parent link; status resets to the type default, with the
    /// required `task_name` supplied by the caller.
    pub fn create_child(&self, task_name: impl Into<String>) -> Self {
        Self {
            state_id: new_state_id(),
            task_name: task_name.into(),
            task_status: default_task_status(),
            task_data: Map::new(),
            subtasks: Vec::new(),
            history: self.history.clone(),
            metadata: Map::new(),
            parent_state_id: Some(self.state_id),
        }
    }
}

// ============================================================================
// TAGGED FAMILY
// ============================================================================

/// Closed tagged family over the concrete state types.
///
/// The `state_type` discriminator is the serde tag: `"base"`,
/// `"conversation"`, or `"task"`. Variant identity is fixed at
/// construction and cannot change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state_type", rename_all = "lowercase")]
pub enum State {
    Base(BaseState),
    Conversation(ConversationState),
    Task(TaskState),
}

/// Field overrides for [`State::create_child`].
///
/// Only the fields listed here may be supplied at fork time; everything
/// else starts from the concrete type's defaults. Required fields of the
/// specialized variants must be present or the fork fails the same way a
/// root construction would.
#[derive(Debug, Clone, Default)]
pub struct StateOverrides {
    /// Required when forking a conversation state.
    pub current_task: Option<String>,
    /// Required when forking a task state.
    pub task_name: Option<String>,
    /// Initial metadata for the child.
    pub metadata: Option<Map<String, Value>>,
}

impl State {
    /// The discriminator tag for this state.
    pub fn state_type(&self) -> &'static str {
        match self {
            State::Base(_) => "base",
            State::Conversation(_) => "conversation",
            State::Task(_) => "task",
        }
    }

    pub fn state_id(&self) -> StateId {
        match self {
            State::Base(s) => s.state_id,
            State::Conversation(s) => s.state_id,
            State::Task(s) => s.state_id,
        }
    }

    pub fn parent_state_id(&self) -> Option<StateId> {
        match self {
            State::Base(s) => s.parent_state_id,
            State::Conversation(s) => s.parent_state_id,
            State::Task(s) => s.parent_state_id,
        }
    }

    pub fn history(&self) -> &[HistoryEntry] {
        match self {
            State::Base(s) => &s.history,
            State::Conversation(s) => &s.history,
            State::Task(s) => &s.history,
        }
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        match self {
            State::Base(s) => &s.metadata,
            State::Conversation(s) => &s.metadata,
            State::Task(s) => &s.metadata,
        }
    }

    /// Append a timestamped entry to the history log.
    pub fn add_history_entry(&mut self, entry_type: impl Into<String>, data: Value) {
        match self {
            State::Base(s) => s.add_history_entry(entry_type, data),
            State::Conversation(s) => s.add_history_entry(entry_type, data),
            State::Task(s) => s.add_history_entry(entry_type, data),
        }
    }

    /// Fork a child of the same concrete type.
    ///
    /// Fails with [`ValidationError::RequiredFieldMissing`] when the
    /// overrides omit a field the concrete variant requires.
    pub fn create_child(&self, overrides: StateOverrides) -> Result<State, ValidationError> {
        let child = match self {
            State::Base(s) => {
                let mut child = s.create_child();
                if let Some(metadata) = overrides.metadata {
                    child.metadata = metadata;
                }
                State::Base(child)
            }
            State::Conversation(s) => {
                let current_task =
                    overrides
                        .current_task
                        .ok_or_else(|| ValidationError::RequiredFieldMissing {
                            field: "current_task".to_string(),
                        })?;
                let mut child = s.create_child(current_task);
                if let Some(metadata) = overrides.metadata {
                    child.metadata = metadata;
                }
                State::Conversation(child)
            }
            State::Task(s) => {
                let task_name =
                    overrides
                        .task_name
                        .ok_or_else(|| ValidationError::RequiredFieldMissing {
                            field: "task_name".to_string(),
                        })?;
                let mut child = s.create_child(task_name);
                if let Some(metadata) = overrides.metadata {
                    child.metadata = metadata;
                }
                State::Task(child)
            }
        };
        Ok(child)
    }
}

impl From<BaseState> for State {
    fn from(state: BaseState) -> Self {
        State::Base(state)
    }
}

impl From<ConversationState> for State {
    fn from(state: ConversationState) -> Self {
        State::Conversation(state)
    }
}

impl From<TaskState> for State {
    fn from(state: TaskState) -> Self {
        State::Task(state)
    }
}
