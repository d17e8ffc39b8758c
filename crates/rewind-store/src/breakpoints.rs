//! Rollback markers.

use std::sync::Arc;

use tracing::debug;

use rewind_core::{Breakpoint, ConversationId};

use crate::errors::Result;
use crate::repository::{ConversationRepository, WriteBatch};

/// Append-only list of a conversation's breakpoints.
#[derive(Clone)]
pub struct BreakpointLog {
    repo: Arc<dyn ConversationRepository>,
}

impl BreakpointLog {
    /// Breakpoint log over `repo`.
    pub fn new(repo: Arc<dyn ConversationRepository>) -> Self {
        Self { repo }
    }

    /// Append a marker. Returns `false` for an unknown conversation.
    pub fn append(&self, conversation_id: &ConversationId, breakpoint: Breakpoint) -> Result<bool> {
        let Some(mut summary) = self.repo.load_summary(conversation_id)? else {
            debug!(conversation_id = %conversation_id, "unknown conversation, breakpoint ignored");
            return Ok(false);
        };
        let mut breakpoints = self.repo.load_breakpoints(conversation_id)?;
        breakpoints.push(breakpoint);
        summary.touch();
        self.repo.apply(
            &WriteBatch::new(conversation_id.clone())
                .with_breakpoints(breakpoints)
                .with_summary(summary),
        )?;
        Ok(true)
    }

    /// The active (last appended) marker.
    pub fn latest(&self, conversation_id: &ConversationId) -> Result<Option<Breakpoint>> {
        Ok(self.repo.load_breakpoints(conversation_id)?.pop())
    }

    /// Every marker in append order.
    pub fn list(&self, conversation_id: &ConversationId) -> Result<Vec<Breakpoint>> {
        self.repo.load_breakpoints(conversation_id)
    }
}
