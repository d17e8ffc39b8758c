//! Persistence adapter.
//!
//! [`ConversationRepository`] is the only seam between the engine and a
//! storage technology. Backends supply load/save primitives for the four
//! parts of a conversation (summary, dialogs, state, breakpoints); every
//! higher-level operation (appending, truncating, counter maintenance) is
//! written once on top of them.
//!
//! Primitives never interpret data. A missing conversation loads as empty
//! (`Vec::new()` / `None`); saving to a missing conversation stores the part
//! as given.

use rewind_core::{Breakpoint, ConversationId, ConversationSummary, DialogEntry, StateEntry};

use crate::errors::Result;

/// How a [`WriteBatch`] changes the dialog timeline.
#[derive(Clone, Debug, PartialEq)]
pub enum DialogWrite {
    /// Replace the whole timeline.
    Replace(Vec<DialogEntry>),
    /// Append to the tail.
    Append(Vec<DialogEntry>),
}

/// A multi-part write to one conversation, persisted as one unit.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteBatch {
    /// Target conversation.
    pub conversation_id: ConversationId,
    /// Full replacement state, if changed.
    pub state: Option<Vec<StateEntry>>,
    /// Full replacement breakpoint list, if changed.
    pub breakpoints: Option<Vec<Breakpoint>>,
    /// Dialog change, if any.
    pub dialogs: Option<DialogWrite>,
    /// Updated summary, if changed.
    pub summary: Option<ConversationSummary>,
}

impl WriteBatch {
    /// An empty batch for `conversation_id`.
    pub fn new(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            state: None,
            breakpoints: None,
            dialogs: None,
            summary: None,
        }
    }

    /// Replace the state table.
    #[must_use]
    pub fn with_state(mut self, state: Vec<StateEntry>) -> Self {
        self.state = Some(state);
        self
    }

    /// Replace the breakpoint list.
    #[must_use]
    pub fn with_breakpoints(mut self, breakpoints: Vec<Breakpoint>) -> Self {
        self.breakpoints = Some(breakpoints);
        self
    }

    /// Replace the dialog timeline.
    #[must_use]
    pub fn replace_dialogs(mut self, dialogs: Vec<DialogEntry>) -> Self {
        self.dialogs = Some(DialogWrite::Replace(dialogs));
        self
    }

    /// Append to the dialog timeline.
    #[must_use]
    pub fn append_dialogs(mut self, dialogs: Vec<DialogEntry>) -> Self {
        self.dialogs = Some(DialogWrite::Append(dialogs));
        self
    }

    /// Write the summary.
    #[must_use]
    pub fn with_summary(mut self, summary: ConversationSummary) -> Self {
        self.summary = Some(summary);
        self
    }

    /// Whether the batch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.state.is_none()
            && self.breakpoints.is_none()
            && self.dialogs.is_none()
            && self.summary.is_none()
    }
}

/// Storage primitives for conversations.
///
/// Implementations must be safe to share across threads; the engine holds
/// them as `Arc<dyn ConversationRepository>`.
pub trait ConversationRepository: Send + Sync {
    /// Load a conversation summary.
    fn load_summary(&self, id: &ConversationId) -> Result<Option<ConversationSummary>>;

    /// Insert or overwrite a conversation summary.
    fn save_summary(&self, summary: &ConversationSummary) -> Result<()>;

    /// All conversation summaries, most recently updated first.
    fn list_summaries(&self) -> Result<Vec<ConversationSummary>>;

    /// Delete conversations and everything they own. Returns how many
    /// summaries were removed.
    fn delete_conversations(&self, ids: &[ConversationId]) -> Result<usize>;

    /// Load the dialog timeline in insertion order.
    fn load_dialogs(&self, id: &ConversationId) -> Result<Vec<DialogEntry>>;

    /// Overwrite the dialog timeline.
    fn save_dialogs(&self, id: &ConversationId, dialogs: &[DialogEntry]) -> Result<()>;

    /// Append entries to the tail of the dialog timeline.
    fn append_dialogs(&self, id: &ConversationId, dialogs: &[DialogEntry]) -> Result<()> {
        let mut all = self.load_dialogs(id)?;
        all.extend_from_slice(dialogs);
        self.save_dialogs(id, &all)
    }

    /// Load the state table.
    fn load_state(&self, id: &ConversationId) -> Result<Vec<StateEntry>>;

    /// Overwrite the state table.
    fn save_state(&self, id: &ConversationId, state: &[StateEntry]) -> Result<()>;

    /// Load the breakpoint list in append order.
    fn load_breakpoints(&self, id: &ConversationId) -> Result<Vec<Breakpoint>>;

    /// Overwrite the breakpoint list.
    fn save_breakpoints(&self, id: &ConversationId, breakpoints: &[Breakpoint]) -> Result<()>;

    /// Persist a batch as one unit.
    ///
    /// The default writes part by part: state, then breakpoints, then
    /// dialogs and summary. A dialog replacement writes the summary first
    /// and an append writes it last, so the dialogs only change once the
    /// rest of the batch is stored. A failure part-way therefore leaves the
    /// old timeline in place and re-running the same rewind recomputes the
    /// same batch. Backends that can write several parts atomically
    /// override this.
    fn apply(&self, batch: &WriteBatch) -> Result<()> {
        let id = &batch.conversation_id;
        if let Some(state) = &batch.state {
            self.save_state(id, state)?;
        }
        if let Some(breakpoints) = &batch.breakpoints {
            self.save_breakpoints(id, breakpoints)?;
        }
        match &batch.dialogs {
            Some(DialogWrite::Replace(dialogs)) => {
                if let Some(summary) = &batch.summary {
                    self.save_summary(summary)?;
                }
                self.save_dialogs(id, dialogs)?;
            }
            Some(DialogWrite::Append(dialogs)) => {
                self.append_dialogs(id, dialogs)?;
                if let Some(summary) = &batch.summary {
                    self.save_summary(summary)?;
                }
            }
            None => {
                if let Some(summary) = &batch.summary {
                    self.save_summary(summary)?;
                }
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
