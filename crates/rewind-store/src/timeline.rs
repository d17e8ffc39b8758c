//! Dialog timeline: the ordered, append-only log of a conversation.

use std::sync::Arc;

use tracing::{debug, instrument};

use rewind_core::{ConversationId, DialogContent, DialogEntry, Role};

use crate::errors::Result;
use crate::repository::{ConversationRepository, WriteBatch};

/// Appends to and reads a conversation's dialog log.
///
/// Every write carries the updated summary (`dialog_count`, `updated_time`)
/// in the same [`WriteBatch`] as the dialogs.
#[derive(Clone)]
pub struct DialogTimeline {
    repo: Arc<dyn ConversationRepository>,
}

impl DialogTimeline {
    /// Timeline over `repo`.
    pub fn new(repo: Arc<dyn ConversationRepository>) -> Self {
        Self { repo }
    }

    /// Append `entries` in order to the tail.
    ///
    /// Returns `false` for an unknown conversation. An empty slice is a
    /// successful no-op that leaves the summary alone.
    #[instrument(skip(self, entries), fields(conversation_id = %conversation_id, count = entries.len()))]
    pub fn append(&self, conversation_id: &ConversationId, entries: &[DialogEntry]) -> Result<bool> {
        let Some(mut summary) = self.repo.load_summary(conversation_id)? else {
            debug!("unknown conversation, append ignored");
            return Ok(false);
        };
        if entries.is_empty() {
            return Ok(true);
        }
        summary.dialog_count += entries.len() as u64;
        summary.touch();
        self.repo.apply(
            &WriteBatch::new(conversation_id.clone())
                .append_dialogs(entries.to_vec())
                .with_summary(summary),
        )?;
        Ok(true)
    }

    /// The full timeline; empty for an unknown conversation.
    pub fn list(&self, conversation_id: &ConversationId) -> Result<Vec<DialogEntry>> {
        self.repo.load_dialogs(conversation_id)
    }

    /// Number of entries in the timeline.
    pub fn count(&self, conversation_id: &ConversationId) -> Result<usize> {
        Ok(self.repo.load_dialogs(conversation_id)?.len())
    }

    /// Entries belonging to one turn, in timeline order.
    pub fn entries_for_message(
        &self,
        conversation_id: &ConversationId,
        message_id: &str,
    ) -> Result<Vec<DialogEntry>> {
        Ok(self
            .repo
            .load_dialogs(conversation_id)?
            .into_iter()
            .filter(|d| d.message_id == message_id)
            .collect())
    }

    /// Rewrite the content of the `occurrence`-th (0-based) entry matching
    /// `(message_id, role)`.
    ///
    /// Secondary content is mirrored only where it was already present.
    /// Returns `false` if the conversation or the occurrence does not exist.
    #[instrument(skip(self, content), fields(conversation_id = %conversation_id))]
    pub fn update_entry_content(
        &self,
        conversation_id: &ConversationId,
        message_id: &str,
        role: Role,
        occurrence: usize,
        content: &DialogContent,
    ) -> Result<bool> {
        let Some(mut summary) = self.repo.load_summary(conversation_id)? else {
            return Ok(false);
        };
        let mut dialogs = self.repo.load_dialogs(conversation_id)?;
        let Some(entry) = dialogs
            .iter_mut()
            .filter(|d| d.message_id == message_id && d.role == role)
            .nth(occurrence)
        else {
            debug!("no matching occurrence");
            return Ok(false);
        };
        entry.apply_content(content);
        summary.touch();
        self.repo.apply(
            &WriteBatch::new(conversation_id.clone())
                .replace_dialogs(dialogs)
                .with_summary(summary),
        )?;
        Ok(true)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
