//! Conversation state table.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, instrument};

use rewind_core::{ConversationId, StateEntry, StateScope, StateSnapshot, StateValue};

use crate::errors::Result;
use crate::repository::{ConversationRepository, WriteBatch};

/// Reads and overwrites a conversation's keyed state.
///
/// Writes are whole-table replacements. Callers that want to add a single
/// value use [`StateStore::push_value`], which builds the next snapshot with
/// [`StateSnapshot`] and submits it.
#[derive(Clone)]
pub struct StateStore {
    repo: Arc<dyn ConversationRepository>,
}

impl StateStore {
    /// State store over `repo`.
    pub fn new(repo: Arc<dyn ConversationRepository>) -> Self {
        Self { repo }
    }

    /// Every key with its full history; empty for an unknown conversation.
    pub fn get(&self, conversation_id: &ConversationId) -> Result<Vec<StateEntry>> {
        self.repo.load_state(conversation_id)
    }

    /// Overwrite the whole table. Returns `false` for an unknown conversation.
    #[instrument(skip(self, entries), fields(conversation_id = %conversation_id, keys = entries.len()))]
    pub fn replace(&self, conversation_id: &ConversationId, entries: Vec<StateEntry>) -> Result<bool> {
        let Some(mut summary) = self.repo.load_summary(conversation_id)? else {
            debug!("unknown conversation, state replace ignored");
            return Ok(false);
        };
        summary.touch();
        self.repo.apply(
            &WriteBatch::new(conversation_id.clone())
                .with_state(entries)
                .with_summary(summary),
        )?;
        Ok(true)
    }

    /// Record one value for `key` and persist the resulting snapshot.
    ///
    /// Fails with a state error if the key is readonly or lives in the other
    /// scope. Returns `false` for an unknown conversation.
    pub fn push_value(
        &self,
        conversation_id: &ConversationId,
        key: &str,
        scope: StateScope,
        value: StateValue,
    ) -> Result<bool> {
        if self.repo.load_summary(conversation_id)?.is_none() {
            return Ok(false);
        }
        let mut snapshot = StateSnapshot::new(self.repo.load_state(conversation_id)?);
        snapshot.push_value(key, scope, value)?;
        self.replace(conversation_id, snapshot.into_entries())
    }

    /// Current value of each key, ordered by key.
    pub fn current_values(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<BTreeMap<String, StateValue>> {
        let snapshot = StateSnapshot::new(self.repo.load_state(conversation_id)?);
        Ok(snapshot
            .current_values()
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.clone()))
            .collect())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
