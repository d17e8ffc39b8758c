//! Rollback markers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time;

/// A named rollback marker within a conversation.
///
/// Breakpoints are kept in append order; the active one is always the last.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakpoint {
    /// Message the marker was set at, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Rollback target instant.
    pub breakpoint: DateTime<Utc>,
    /// When the marker was appended; truncation filters on this.
    pub created_time: DateTime<Utc>,
    /// Why the marker was set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Breakpoint {
    /// A marker targeting `breakpoint`, created now.
    pub fn new(breakpoint: DateTime<Utc>) -> Self {
        Self {
            message_id: None,
            breakpoint: time::normalize(breakpoint),
            created_time: time::now(),
            reason: None,
        }
    }

    /// Attach the message the marker belongs to.
    #[must_use]
    pub fn for_message(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// Attach a reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Override the creation time.
    #[must_use]
    pub fn created_at(mut self, created_time: DateTime<Utc>) -> Self {
        self.created_time = time::normalize(created_time);
        self
    }
}
