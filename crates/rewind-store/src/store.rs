//! High-level conversation API.
//!
//! [`ConversationStore`] ties one repository to the four components
//! (timeline, state, breakpoints, truncation) and owns the conversation
//! lifecycle: create, look up, list, delete.

use std::sync::Arc;

use tracing::{info, instrument};

use rewind_core::{AgentId, ConversationId, ConversationStatus, ConversationSummary, LogPurger};
use rewind_settings::RewindSettings;

use crate::breakpoints::BreakpointLog;
use crate::errors::Result;
use crate::factory::open_repository;
use crate::repository::{ConversationRepository, WriteBatch};
use crate::state::StateStore;
use crate::timeline::DialogTimeline;
use crate::truncate::TruncationEngine;

/// Options for creating a conversation.
#[derive(Clone, Debug, Default)]
pub struct CreateConversationOptions {
    /// Explicit ID; generated when `None`.
    pub id: Option<ConversationId>,
    /// End user.
    pub user_id: Option<String>,
    /// Display title.
    pub title: Option<String>,
    /// Labels.
    pub tags: Vec<String>,
}

/// Facade over a [`ConversationRepository`].
#[derive(Clone)]
pub struct ConversationStore {
    repo: Arc<dyn ConversationRepository>,
    dialogs: DialogTimeline,
    state: StateStore,
    breakpoints: BreakpointLog,
    truncation: TruncationEngine,
    clean_logs_default: bool,
}

impl ConversationStore {
    /// Store without an audit log.
    pub fn new(repo: Arc<dyn ConversationRepository>) -> Self {
        Self {
            dialogs: DialogTimeline::new(Arc::clone(&repo)),
            state: StateStore::new(Arc::clone(&repo)),
            breakpoints: BreakpointLog::new(Arc::clone(&repo)),
            truncation: TruncationEngine::new(Arc::clone(&repo)),
            clean_logs_default: false,
            repo,
        }
    }

    /// Open the configured backend and apply the truncation defaults.
    ///
    /// `purger` is attached when given; the audit log is owned by the caller.
    pub fn from_settings(
        settings: &RewindSettings,
        purger: Option<Arc<dyn LogPurger>>,
    ) -> Result<Self> {
        let mut store = Self::new(open_repository(&settings.storage)?)
            .with_clean_logs_default(settings.truncation.clean_logs_by_default);
        if let Some(purger) = purger {
            store = store.with_log_purger(purger);
        }
        Ok(store)
    }

    /// Set whether [`rewind`](Self::rewind) cleans the audit log.
    #[must_use]
    pub fn with_clean_logs_default(mut self, clean_logs: bool) -> Self {
        self.clean_logs_default = clean_logs;
        self
    }

    /// Attach the audit log purged by `truncate(.., clean_logs = true)`.
    #[must_use]
    pub fn with_log_purger(mut self, purger: Arc<dyn LogPurger>) -> Self {
        self.truncation = self.truncation.with_purger(purger);
        self
    }

    /// The underlying repository.
    pub fn repository(&self) -> &Arc<dyn ConversationRepository> {
        &self.repo
    }

    /// Dialog timeline component.
    pub fn dialogs(&self) -> &DialogTimeline {
        &self.dialogs
    }

    /// State component.
    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// Breakpoint component.
    pub fn breakpoints(&self) -> &BreakpointLog {
        &self.breakpoints
    }

    /// Truncation component.
    pub fn truncation(&self) -> &TruncationEngine {
        &self.truncation
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Start a new, empty conversation.
    ///
    /// An explicit ID that already exists is left untouched and its current
    /// summary returned.
    #[instrument(skip(self, opts), fields(agent_id = %agent_id))]
    pub fn create_conversation(
        &self,
        agent_id: &AgentId,
        opts: CreateConversationOptions,
    ) -> Result<ConversationSummary> {
        let id = opts.id.unwrap_or_default();
        if let Some(existing) = self.repo.load_summary(&id)? {
            return Ok(existing);
        }
        let mut summary = ConversationSummary::new(id.clone(), agent_id.clone());
        summary.user_id = opts.user_id;
        summary.title = opts.title;
        summary.tags = opts.tags;
        self.repo.save_summary(&summary)?;
        info!(conversation_id = %id, "conversation created");
        Ok(summary)
    }

    /// Look up a conversation.
    pub fn get_conversation(&self, id: &ConversationId) -> Result<Option<ConversationSummary>> {
        self.repo.load_summary(id)
    }

    /// All conversations, most recently updated first.
    pub fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        self.repo.list_summaries()
    }

    /// Conversations of one agent, most recently updated first.
    pub fn list_for_agent(&self, agent_id: &AgentId) -> Result<Vec<ConversationSummary>> {
        Ok(self
            .repo
            .list_summaries()?
            .into_iter()
            .filter(|s| &s.agent_id == agent_id)
            .collect())
    }

    /// Change the lifecycle status. Returns `false` for an unknown conversation.
    pub fn set_status(&self, id: &ConversationId, status: ConversationStatus) -> Result<bool> {
        let Some(mut summary) = self.repo.load_summary(id)? else {
            return Ok(false);
        };
        summary.status = status;
        summary.touch();
        self.repo
            .apply(&WriteBatch::new(id.clone()).with_summary(summary))?;
        Ok(true)
    }

    /// Change the title. Returns `false` for an unknown conversation.
    pub fn rename(&self, id: &ConversationId, title: impl Into<String>) -> Result<bool> {
        let Some(mut summary) = self.repo.load_summary(id)? else {
            return Ok(false);
        };
        summary.title = Some(title.into());
        summary.touch();
        self.repo
            .apply(&WriteBatch::new(id.clone()).with_summary(summary))?;
        Ok(true)
    }

    /// Permanently delete conversations and everything they own. Returns
    /// how many existed.
    #[instrument(skip(self), fields(count = ids.len()))]
    pub fn delete_conversations(&self, ids: &[ConversationId]) -> Result<usize> {
        let removed = self.repo.delete_conversations(ids)?;
        info!(removed, "conversations deleted");
        Ok(removed)
    }

    /// Rewind a conversation; see [`TruncationEngine::truncate`].
    pub fn truncate(
        &self,
        id: &ConversationId,
        cutoff: &str,
        clean_logs: bool,
    ) -> Result<Vec<String>> {
        self.truncation.truncate(id, cutoff, clean_logs)
    }

    /// [`truncate`](Self::truncate) with the configured log-cleaning default.
    pub fn rewind(&self, id: &ConversationId, cutoff: &str) -> Result<Vec<String>> {
        self.truncate(id, cutoff, self.clean_logs_default)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
