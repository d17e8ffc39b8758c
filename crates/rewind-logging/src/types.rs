//! Audit log record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rewind_core::{ConversationId, DialogEntry, StateValue};

/// A stored content log entry: one dialog entry as it was written.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentLogEntry {
    /// Row ID.
    pub id: i64,
    /// Owning conversation.
    pub conversation_id: ConversationId,
    /// Turn the content belongs to.
    pub message_id: String,
    /// Producer role (`user`, `assistant`, `function`).
    pub role: String,
    /// Agent that produced the entry.
    pub agent_id: String,
    /// Logged content.
    pub content: String,
    /// Creation instant.
    pub created_time: DateTime<Utc>,
}

impl ContentLogEntry {
    /// Build an unsaved record mirroring a dialog entry.
    pub fn from_dialog(conversation_id: &ConversationId, entry: &DialogEntry) -> Self {
        Self {
            id: 0,
            conversation_id: conversation_id.clone(),
            message_id: entry.message_id.clone(),
            role: entry.role.to_string(),
            agent_id: entry.agent_id.to_string(),
            content: entry.content.clone(),
            created_time: entry.created_time,
        }
    }
}

/// A stored state log entry: one state write.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateLogEntry {
    /// Row ID.
    pub id: i64,
    /// Owning conversation.
    pub conversation_id: ConversationId,
    /// Turn that wrote the value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// State key.
    pub key: String,
    /// Written data.
    pub data: String,
    /// Data type tag.
    pub data_type: String,
    /// Writer.
    pub source: String,
    /// Write instant.
    pub created_time: DateTime<Utc>,
}

impl StateLogEntry {
    /// Build an unsaved record mirroring a state write.
    pub fn from_value(conversation_id: &ConversationId, key: &str, value: &StateValue) -> Self {
        Self {
            id: 0,
            conversation_id: conversation_id.clone(),
            message_id: value.message_id.clone(),
            key: key.to_owned(),
            data: value.data.clone(),
            data_type: value.data_type.to_string(),
            source: value.source.clone(),
            created_time: value.update_time,
        }
    }
}
