//! Shared fixtures: one store per backend, fixed timestamps.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use rewind_core::{AgentId, ConversationId, DialogEntry, Role};
use rewind_store::{
    ConversationRepository, ConversationStore, CreateConversationOptions, DocumentRepository,
    MemoryRepository, SqliteRepository, ConnectionConfig,
};

/// A store plus whatever keeps its backing files alive.
pub struct Backend {
    pub name: &'static str,
    pub repo: Arc<dyn ConversationRepository>,
    pub store: ConversationStore,
    _dir: Option<TempDir>,
}

impl Backend {
    fn new(name: &'static str, repo: Arc<dyn ConversationRepository>, dir: Option<TempDir>) -> Self {
        Self {
            name,
            store: ConversationStore::new(Arc::clone(&repo)),
            repo,
            _dir: dir,
        }
    }
}

pub fn memory() -> Backend {
    Backend::new("memory", Arc::new(MemoryRepository::new()), None)
}

pub fn sqlite_memory() -> Backend {
    Backend::new("sqlite-memory", Arc::new(SqliteRepository::in_memory().unwrap()), None)
}

pub fn sqlite_file() -> Backend {
    let dir = tempfile::tempdir().unwrap();
    let config = ConnectionConfig {
        pool_size: 4,
        ..ConnectionConfig::default()
    };
    let repo = SqliteRepository::open(&dir.path().join("rewind.db"), &config).unwrap();
    Backend::new("sqlite-file", Arc::new(repo), Some(dir))
}

pub fn documents() -> Backend {
    let dir = tempfile::tempdir().unwrap();
    let repo = DocumentRepository::open(dir.path().join("conversations")).unwrap();
    Backend::new("documents", Arc::new(repo), Some(dir))
}

/// Every shipped backend.
pub fn backends() -> Vec<Backend> {
    vec![memory(), sqlite_memory(), sqlite_file(), documents()]
}

pub fn t(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap() + Duration::seconds(secs)
}

/// A user entry for `message_id` created at `t(secs)`.
pub fn entry(message_id: &str, secs: i64) -> DialogEntry {
    DialogEntry::new(Role::User, "agent-1", message_id, format!("{message_id}@{secs}")).at(t(secs))
}

/// Entries for `ids`, ten seconds apart starting at `t(0)`.
pub fn timeline(ids: &[&str]) -> Vec<DialogEntry> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| entry(id, i64::try_from(i).unwrap() * 10))
        .collect()
}

pub fn create(store: &ConversationStore, id: &str) -> ConversationId {
    store
        .create_conversation(
            &AgentId::from("agent-1"),
            CreateConversationOptions {
                id: Some(ConversationId::from(id)),
                ..CreateConversationOptions::default()
            },
        )
        .unwrap()
        .id
}

pub fn message_ids(entries: &[DialogEntry]) -> Vec<&str> {
    entries.iter().map(|d| d.message_id.as_str()).collect()
}
