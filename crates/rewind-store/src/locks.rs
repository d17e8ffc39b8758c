//! Per-conversation writer locks.
//!
//! The engine assumes a single writer per conversation but takes no lock
//! itself. Orchestration code that may run several writers for the same
//! conversation serializes them through [`ConversationLocks`]. Different
//! conversations never contend.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use rewind_core::ConversationId;

/// Registry of one mutex per conversation.
#[derive(Debug, Default)]
pub struct ConversationLocks {
    locks: DashMap<ConversationId, Arc<Mutex<()>>>,
}

impl ConversationLocks {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex for `id`, created on first use.
    pub fn handle(&self, id: &ConversationId) -> Arc<Mutex<()>> {
        self.locks.entry(id.clone()).or_default().clone()
    }

    /// Run `f` while holding the lock for `id`.
    pub fn with_lock<T>(&self, id: &ConversationId, f: impl FnOnce() -> T) -> T {
        let handle = self.handle(id);
        let _guard = handle.lock();
        f()
    }

    /// Forget the lock for a deleted conversation.
    pub fn remove(&self, id: &ConversationId) {
        let _ = self.locks.remove(id);
    }

    /// Number of conversations with a lock.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no lock has been created.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
