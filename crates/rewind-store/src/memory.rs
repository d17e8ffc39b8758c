//! In-memory backend.
//!
//! Keeps every conversation as one aggregate in a map behind a single
//! `RwLock`. [`ConversationRepository::apply`] holds the write lock for the
//! whole batch, so readers never observe a half-applied rewind.

use std::collections::HashMap;

use parking_lot::RwLock;

use rewind_core::{Breakpoint, ConversationId, ConversationSummary, DialogEntry, StateEntry};

use crate::errors::Result;
use crate::repository::{ConversationRepository, DialogWrite, WriteBatch};

#[derive(Clone, Debug, Default)]
struct Aggregate {
    summary: Option<ConversationSummary>,
    dialogs: Vec<DialogEntry>,
    state: Vec<StateEntry>,
    breakpoints: Vec<Breakpoint>,
}

impl Aggregate {
    fn apply(&mut self, batch: &WriteBatch) {
        if let Some(state) = &batch.state {
            self.state.clone_from(state);
        }
        if let Some(breakpoints) = &batch.breakpoints {
            self.breakpoints.clone_from(breakpoints);
        }
        match &batch.dialogs {
            Some(DialogWrite::Replace(dialogs)) => self.dialogs.clone_from(dialogs),
            Some(DialogWrite::Append(dialogs)) => self.dialogs.extend_from_slice(dialogs),
            None => {}
        }
        if let Some(summary) = &batch.summary {
            self.summary = Some(summary.clone());
        }
    }
}

/// Process-local repository for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    conversations: RwLock<HashMap<ConversationId, Aggregate>>,
}

impl MemoryRepository {
    /// Empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, id: &ConversationId, f: impl FnOnce(&Aggregate) -> T) -> Option<T> {
        self.conversations.read().get(id).map(f)
    }

    fn write(&self, id: &ConversationId, f: impl FnOnce(&mut Aggregate)) {
        f(self.conversations.write().entry(id.clone()).or_default());
    }
}

impl ConversationRepository for MemoryRepository {
    fn load_summary(&self, id: &ConversationId) -> Result<Option<ConversationSummary>> {
        Ok(self.read(id, |a| a.summary.clone()).flatten())
    }

    fn save_summary(&self, summary: &ConversationSummary) -> Result<()> {
        self.write(&summary.id, |a| a.summary = Some(summary.clone()));
        Ok(())
    }

    fn list_summaries(&self) -> Result<Vec<ConversationSummary>> {
        let mut summaries: Vec<_> = self
            .conversations
            .read()
            .values()
            .filter_map(|a| a.summary.clone())
            .collect();
        sort_summaries(&mut summaries);
        Ok(summaries)
    }

    fn delete_conversations(&self, ids: &[ConversationId]) -> Result<usize> {
        let mut map = self.conversations.write();
        Ok(ids
            .iter()
            .filter_map(|id| map.remove(id))
            .filter(|a| a.summary.is_some())
            .count())
    }

    fn load_dialogs(&self, id: &ConversationId) -> Result<Vec<DialogEntry>> {
        Ok(self.read(id, |a| a.dialogs.clone()).unwrap_or_default())
    }

    fn save_dialogs(&self, id: &ConversationId, dialogs: &[DialogEntry]) -> Result<()> {
        self.write(id, |a| a.dialogs = dialogs.to_vec());
        Ok(())
    }

    fn append_dialogs(&self, id: &ConversationId, dialogs: &[DialogEntry]) -> Result<()> {
        self.write(id, |a| a.dialogs.extend_from_slice(dialogs));
        Ok(())
    }

    fn load_state(&self, id: &ConversationId) -> Result<Vec<StateEntry>> {
        Ok(self.read(id, |a| a.state.clone()).unwrap_or_default())
    }

    fn save_state(&self, id: &ConversationId, state: &[StateEntry]) -> Result<()> {
        self.write(id, |a| a.state = state.to_vec());
        Ok(())
    }

    fn load_breakpoints(&self, id: &ConversationId) -> Result<Vec<Breakpoint>> {
        Ok(self.read(id, |a| a.breakpoints.clone()).unwrap_or_default())
    }

    fn save_breakpoints(&self, id: &ConversationId, breakpoints: &[Breakpoint]) -> Result<()> {
        self.write(id, |a| a.breakpoints = breakpoints.to_vec());
        Ok(())
    }

    fn apply(&self, batch: &WriteBatch) -> Result<()> {
        if !batch.is_empty() {
            self.write(&batch.conversation_id, |a| a.apply(batch));
        }
        Ok(())
    }
}

/// Most recently updated first; ties by ID for a stable order.
pub(crate) fn sort_summaries(summaries: &mut [ConversationSummary]) {
    summaries.sort_by(|a, b| {
        b.updated_time
            .cmp(&a.updated_time)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use chrono::{Duration, Utc};
    use rewind_core::Role;

    use super::*;

    #[test]
    fn missing_conversation_loads_empty() {
        let repo = MemoryRepository::new();
        let id = ConversationId::from("ghost");
        assert!(repo.load_summary(&id).unwrap().is_none());
        assert!(repo.load_dialogs(&id).unwrap().is_empty());
        assert!(repo.load_state(&id).unwrap().is_empty());
        assert!(repo.load_breakpoints(&id).unwrap().is_empty());
    }

    #[test]
    fn apply_writes_every_part() {
        let repo = MemoryRepository::new();
        let id = ConversationId::from("c1");
        let mut summary = ConversationSummary::new(id.clone(), "a1");
        summary.set_dialog_count(1);
        let batch = WriteBatch::new(id.clone())
            .append_dialogs(vec![DialogEntry::new(Role::User, "a1", "m1", "hi")])
            .with_state(vec![StateEntry::session("locale")])
            .with_breakpoints(vec![Breakpoint::new(Utc::now())])
            .with_summary(summary.clone());
        repo.apply(&batch).unwrap();

        assert_eq!(repo.load_summary(&id).unwrap(), Some(summary));
        assert_eq!(repo.load_dialogs(&id).unwrap().len(), 1);
        assert_eq!(repo.load_state(&id).unwrap().len(), 1);
        assert_eq!(repo.load_breakpoints(&id).unwrap().len(), 1);
    }

    #[test]
    fn list_orders_by_updated_time() {
        let repo = MemoryRepository::new();
        let now = Utc::now();
        for (name, age) in [("old", 60), ("new", 0), ("mid", 30)] {
            let mut s = ConversationSummary::new(ConversationId::from(name), "a1");
            s.updated_time = now - Duration::seconds(age);
            repo.save_summary(&s).unwrap();
        }
        // Parts without a summary are not conversations.
        repo.save_dialogs(&ConversationId::from("orphan"), &[]).unwrap();

        let ids: Vec<_> = repo
            .list_summaries()
            .unwrap()
            .into_iter()
            .map(|s| s.id.into_inner())
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[test]
    fn delete_removes_everything() {
        let repo = MemoryRepository::new();
        let id = ConversationId::from("c1");
        repo.save_summary(&ConversationSummary::new(id.clone(), "a1")).unwrap();
        repo.append_dialogs(&id, &[DialogEntry::new(Role::User, "a1", "m1", "hi")])
            .unwrap();

        let removed = repo
            .delete_conversations(&[id.clone(), ConversationId::from("ghost")])
            .unwrap();
        assert_eq!(removed, 1);
        assert!(repo.load_dialogs(&id).unwrap().is_empty());
        assert!(repo.list_summaries().unwrap().is_empty());
    }
}
