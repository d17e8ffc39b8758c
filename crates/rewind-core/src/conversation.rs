//! Conversation summaries: the denormalized record every mutation touches.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AgentId, ConversationId};
use crate::time;

/// Lifecycle status of a conversation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    /// Accepting new dialog.
    #[default]
    Open,
    /// Read-mostly; kept for history.
    Archived,
    /// Soft-deleted.
    Deleted,
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Archived => write!(f, "archived"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

impl FromStr for ConversationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "archived" => Ok(Self::Archived),
            "deleted" => Ok(Self::Deleted),
            other => Err(format!("invalid conversation status: '{other}'")),
        }
    }
}

/// Conversation record with denormalized counters.
///
/// `dialog_count` always equals the length of the conversation's dialog
/// timeline; it is written in the same unit as the dialogs themselves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    /// Conversation ID.
    pub id: ConversationId,
    /// Agent driving the conversation.
    pub agent_id: AgentId,
    /// End user, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Lifecycle status.
    #[serde(default)]
    pub status: ConversationStatus,
    /// Number of dialog entries.
    pub dialog_count: u64,
    /// Creation instant.
    pub created_time: DateTime<Utc>,
    /// Last mutation instant.
    pub updated_time: DateTime<Utc>,
    /// Free-form labels.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ConversationSummary {
    /// A fresh, empty, open conversation.
    pub fn new(id: ConversationId, agent_id: impl Into<AgentId>) -> Self {
        let now = time::now();
        Self {
            id,
            agent_id: agent_id.into(),
            user_id: None,
            title: None,
            status: ConversationStatus::Open,
            dialog_count: 0,
            created_time: now,
            updated_time: now,
            tags: Vec::new(),
        }
    }

    /// Set the user.
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Bump `updated_time`, never moving it backwards.
    pub fn touch(&mut self) {
        self.updated_time = time::now().max(self.updated_time);
    }

    /// Record a new dialog length and bump `updated_time`.
    pub fn set_dialog_count(&mut self, len: usize) {
        self.dialog_count = len as u64;
        self.touch();
    }
}
