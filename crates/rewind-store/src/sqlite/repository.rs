//! [`ConversationRepository`] over a `SQLite` connection pool.
//!
//! Multi-part writes ([`ConversationRepository::apply`]) and deletes run in
//! a single transaction, so callers never observe partial state.

use std::path::Path;

use tracing::debug;

use rewind_core::{Breakpoint, ConversationId, ConversationSummary, DialogEntry, StateEntry};

use super::connection::{self, ConnectionConfig, ConnectionPool, PooledConnection};
use super::migrations::run_migrations;
use super::repositories::breakpoint::BreakpointRepo;
use super::repositories::conversation::ConversationRepo;
use super::repositories::dialog::DialogRepo;
use super::repositories::state::StateRepo;
use crate::errors::Result;
use crate::repository::{ConversationRepository, DialogWrite, WriteBatch};

/// Relational conversation storage.
pub struct SqliteRepository {
    pool: ConnectionPool,
}

impl SqliteRepository {
    /// Wrap an already-migrated pool.
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Open (or create) a database file and bring its schema up to date.
    pub fn open(path: &Path, config: &ConnectionConfig) -> Result<Self> {
        let pool = connection::new_file(path, config)?;
        Self::migrated(pool)
    }

    /// Fresh in-memory database (for tests).
    pub fn in_memory() -> Result<Self> {
        let pool = connection::new_in_memory(&ConnectionConfig::default())?;
        Self::migrated(pool)
    }

    fn migrated(pool: ConnectionPool) -> Result<Self> {
        {
            let conn = pool.get()?;
            let applied = run_migrations(&conn)?;
            debug!(applied, "sqlite repository ready");
        }
        Ok(Self::new(pool))
    }

    /// Get a connection from the pool.
    fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }
}

impl ConversationRepository for SqliteRepository {
    fn load_summary(&self, id: &ConversationId) -> Result<Option<ConversationSummary>> {
        let conn = self.conn()?;
        ConversationRepo::get(&conn, id)
    }

    fn save_summary(&self, summary: &ConversationSummary) -> Result<()> {
        let conn = self.conn()?;
        ConversationRepo::upsert(&conn, summary)
    }

    fn list_summaries(&self) -> Result<Vec<ConversationSummary>> {
        let conn = self.conn()?;
        ConversationRepo::list(&conn)
    }

    fn delete_conversations(&self, ids: &[ConversationId]) -> Result<usize> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        let mut removed = 0;
        for id in ids {
            let _ = DialogRepo::delete(&tx, id)?;
            let _ = StateRepo::delete(&tx, id)?;
            let _ = BreakpointRepo::delete(&tx, id)?;
            if ConversationRepo::delete(&tx, id)? {
                removed += 1;
            }
        }
        tx.commit()?;
        Ok(removed)
    }

    fn load_dialogs(&self, id: &ConversationId) -> Result<Vec<DialogEntry>> {
        let conn = self.conn()?;
        DialogRepo::list(&conn, id)
    }

    fn save_dialogs(&self, id: &ConversationId, dialogs: &[DialogEntry]) -> Result<()> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        DialogRepo::replace(&tx, id, dialogs)?;
        tx.commit()?;
        Ok(())
    }

    fn append_dialogs(&self, id: &ConversationId, dialogs: &[DialogEntry]) -> Result<()> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        DialogRepo::append(&tx, id, dialogs)?;
        tx.commit()?;
        Ok(())
    }

    fn load_state(&self, id: &ConversationId) -> Result<Vec<StateEntry>> {
        let conn = self.conn()?;
        StateRepo::load(&conn, id)
    }

    fn save_state(&self, id: &ConversationId, state: &[StateEntry]) -> Result<()> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        StateRepo::replace(&tx, id, state)?;
        tx.commit()?;
        Ok(())
    }

    fn load_breakpoints(&self, id: &ConversationId) -> Result<Vec<Breakpoint>> {
        let conn = self.conn()?;
        BreakpointRepo::list(&conn, id)
    }

    fn save_breakpoints(&self, id: &ConversationId, breakpoints: &[Breakpoint]) -> Result<()> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        BreakpointRepo::replace(&tx, id, breakpoints)?;
        tx.commit()?;
        Ok(())
    }

    fn apply(&self, batch: &WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let id = &batch.conversation_id;
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        if let Some(state) = &batch.state {
            StateRepo::replace(&tx, id, state)?;
        }
        if let Some(breakpoints) = &batch.breakpoints {
            BreakpointRepo::replace(&tx, id, breakpoints)?;
        }
        match &batch.dialogs {
            Some(DialogWrite::Replace(dialogs)) => DialogRepo::replace(&tx, id, dialogs)?,
            Some(DialogWrite::Append(dialogs)) => DialogRepo::append(&tx, id, dialogs)?,
            None => {}
        }
        if let Some(summary) = &batch.summary {
            ConversationRepo::upsert(&tx, summary)?;
        }

        tx.commit()?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
