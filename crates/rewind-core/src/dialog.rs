//! Dialog entries: the append-only conversational log.
//!
//! Entries are totally ordered by insertion; that order is the conversational
//! order. A single logical turn may produce several entries sharing a
//! `message_id` (a function call and its result, for instance), so
//! `message_id` identifies a turn, not an entry.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::AgentId;
use crate::time;

/// Who produced a dialog entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End-user input.
    User,
    /// Model output.
    Assistant,
    /// Function/tool call or result.
    Function,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Function => write!(f, "function"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "function" => Ok(Self::Function),
            other => Err(format!("invalid dialog role: '{other}'")),
        }
    }
}

/// One entry in a conversation's dialog timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogEntry {
    /// Producer of the entry.
    pub role: Role,
    /// Agent the entry belongs to.
    pub agent_id: AgentId,
    /// Turn identifier; shared by every entry of the same turn.
    pub message_id: String,
    /// Sender (user or bot identity), when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    /// Function name for `function` entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    /// Creation instant; the truncation boundary is read from here.
    pub created_time: DateTime<Utc>,
    /// Primary text content.
    pub content: String,
    /// Rich (markdown/structured) rendering of `content`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rich_content: Option<String>,
    /// Secondary content variant (e.g. a translated or display copy).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_content: Option<String>,
    /// Rich rendering of the secondary content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_rich_content: Option<String>,
    /// Arbitrary structured payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl DialogEntry {
    /// Build an entry stamped with the current time.
    pub fn new(
        role: Role,
        agent_id: impl Into<AgentId>,
        message_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role,
            agent_id: agent_id.into(),
            message_id: message_id.into(),
            sender_id: None,
            function_name: None,
            created_time: time::now(),
            content: content.into(),
            rich_content: None,
            secondary_content: None,
            secondary_rich_content: None,
            payload: None,
        }
    }

    /// Override the creation time.
    #[must_use]
    pub fn at(mut self, created_time: DateTime<Utc>) -> Self {
        self.created_time = time::normalize(created_time);
        self
    }

    /// Set the sender.
    #[must_use]
    pub fn with_sender(mut self, sender_id: impl Into<String>) -> Self {
        self.sender_id = Some(sender_id.into());
        self
    }

    /// Set the function name.
    #[must_use]
    pub fn with_function(mut self, name: impl Into<String>) -> Self {
        self.function_name = Some(name.into());
        self
    }

    /// Set the rich content.
    #[must_use]
    pub fn with_rich_content(mut self, rich: impl Into<String>) -> Self {
        self.rich_content = Some(rich.into());
        self
    }

    /// Set the secondary content pair.
    #[must_use]
    pub fn with_secondary(mut self, content: impl Into<String>, rich: Option<String>) -> Self {
        self.secondary_content = Some(content.into());
        self.secondary_rich_content = rich;
        self
    }

    /// Set the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Replace the content fields in place.
    ///
    /// Secondary fields are only overwritten when they already hold a
    /// non-empty value; an absent secondary variant stays absent.
    pub fn apply_content(&mut self, update: &DialogContent) {
        self.content.clone_from(&update.content);
        self.rich_content.clone_from(&update.rich_content);
        if self.secondary_content.as_deref().is_some_and(|s| !s.is_empty()) {
            self.secondary_content = Some(update.content.clone());
        }
        if self
            .secondary_rich_content
            .as_deref()
            .is_some_and(|s| !s.is_empty())
        {
            self.secondary_rich_content = update.rich_content.clone();
        }
    }
}

/// Replacement content for [`DialogEntry::apply_content`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogContent {
    /// New primary content.
    pub content: String,
    /// New rich content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rich_content: Option<String>,
}

impl DialogContent {
    /// Plain-text content with no rich variant.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            rich_content: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_roundtrip() {
        for role in [Role::User, Role::Assistant, Role::Function] {
            let parsed: Role = role.to_string().parse().unwrap();
            assert_eq!(parsed, role);
        }
        assert!("system".parse::<Role>().is_err());
    }

    #[test]
    fn role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Function).unwrap(), "\"function\"");
    }

    #[test]
    fn entry_serializes_camel_case_and_skips_none() {
        let entry = DialogEntry::new(Role::User, "a1", "m1", "hello").with_sender("u1");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["messageId"], "m1");
        assert_eq!(json["agentId"], "a1");
        assert_eq!(json["senderId"], "u1");
        assert!(json.get("functionName").is_none());
        assert!(json.get("payload").is_none());
    }

    #[test]
    fn apply_content_replaces_primary_fields() {
        let mut entry = DialogEntry::new(Role::Assistant, "a1", "m1", "old")
            .with_rich_content("**old**");
        entry.apply_content(&DialogContent::text("new"));
        assert_eq!(entry.content, "new");
        assert_eq!(entry.rich_content, None);
        assert_eq!(entry.secondary_content, None);
    }

    #[test]
    fn apply_content_mirrors_non_empty_secondary() {
        let mut entry = DialogEntry::new(Role::Assistant, "a1", "m1", "old")
            .with_secondary("old copy", Some("**old copy**".into()));
        let update = DialogContent {
            content: "new".into(),
            rich_content: Some("**new**".into()),
        };
        entry.apply_content(&update);
        assert_eq!(entry.secondary_content.as_deref(), Some("new"));
        assert_eq!(entry.secondary_rich_content.as_deref(), Some("**new**"));
    }

    #[test]
    fn apply_content_leaves_empty_secondary_alone() {
        let mut entry =
            DialogEntry::new(Role::Assistant, "a1", "m1", "old").with_secondary("", None);
        entry.apply_content(&DialogContent::text("new"));
        assert_eq!(entry.secondary_content.as_deref(), Some(""));
        assert_eq!(entry.secondary_rich_content, None);
    }
}
