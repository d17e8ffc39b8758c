//! Audit log collaborator interface.
//!
//! After a rewind with log cleaning enabled, the engine asks the audit log
//! service to drop every content/state log entry of the conversation
//! created at or after the rewind boundary. The call is fire-and-forget:
//! a failed purge never fails the rewind.

use chrono::{DateTime, Utc};

use crate::errors::PurgeError;
use crate::ids::ConversationId;

/// Something that can drop a conversation's audit logs from an instant on.
pub trait LogPurger: Send + Sync {
    /// Delete entries of `conversation_id` with `created_time >= since`.
    ///
    /// Returns the number of deleted entries.
    fn purge_logs_since(
        &self,
        conversation_id: &ConversationId,
        since: DateTime<Utc>,
    ) -> Result<usize, PurgeError>;
}

/// Purger for deployments without an audit log.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLogPurger;

impl LogPurger for NoopLogPurger {
    fn purge_logs_since(
        &self,
        _conversation_id: &ConversationId,
        _since: DateTime<Utc>,
    ) -> Result<usize, PurgeError> {
        Ok(0)
    }
}
