//! `SQLite` content/state audit log.
//!
//! [`SqliteAuditLog`] records every dialog entry and state write a
//! conversation produces, independently of the conversation store. When a
//! conversation is rewound with log cleaning enabled, the engine calls
//! [`LogPurger::purge_logs_since`] and both tables lose every row of that
//! conversation at or after the rewind boundary.
//!
//! Timestamps are stored in the fixed-width RFC 3339 form from
//! [`rewind_core::time::format_time`], so the `>=` comparison in SQL is a
//! temporal comparison.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use thiserror::Error;
use tracing::debug;

use rewind_core::time::{format_time, parse_time};
use rewind_core::{ConversationId, LogPurger, PurgeError};
use rewind_settings::LoggingSettings;

use crate::types::{ContentLogEntry, StateLogEntry};

/// Errors from audit log operations.
#[derive(Debug, Error)]
pub enum AuditLogError {
    /// `SQLite` error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored timestamp could not be parsed.
    #[error("invalid stored timestamp: {0}")]
    Timestamp(String),
}

/// Result alias for audit log operations.
pub type Result<T> = std::result::Result<T, AuditLogError>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS content_logs (
    id              INTEGER PRIMARY KEY,
    conversation_id TEXT NOT NULL,
    message_id      TEXT NOT NULL,
    role            TEXT NOT NULL,
    agent_id        TEXT NOT NULL,
    content         TEXT NOT NULL,
    created_time    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_content_logs_conv_time
    ON content_logs(conversation_id, created_time);

CREATE TABLE IF NOT EXISTS state_logs (
    id              INTEGER PRIMARY KEY,
    conversation_id TEXT NOT NULL,
    message_id      TEXT,
    key             TEXT NOT NULL,
    data            TEXT NOT NULL,
    data_type       TEXT NOT NULL,
    source          TEXT NOT NULL,
    created_time    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_state_logs_conv_time
    ON state_logs(conversation_id, created_time);
";

/// Content/state audit log backed by a single `SQLite` connection.
pub struct SqliteAuditLog {
    conn: Mutex<Connection>,
}

impl SqliteAuditLog {
    /// Open (or create) an audit log database file.
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open the audit log configured in `settings`, if any.
    pub fn from_settings(settings: &LoggingSettings) -> Result<Option<Self>> {
        settings
            .audit_db_path
            .as_deref()
            .map(|path| Self::open(Path::new(path)))
            .transpose()
    }

    /// In-memory audit log (for tests).
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Wrap an existing connection, creating the tables if needed.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = match self.conn.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&guard)
    }

    /// Append a content log record. Returns the new row ID.
    pub fn record_content(&self, entry: &ContentLogEntry) -> Result<i64> {
        self.with_conn(|conn| {
            let _ = conn.execute(
                "INSERT INTO content_logs (conversation_id, message_id, role, agent_id, content, created_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    entry.conversation_id.as_str(),
                    entry.message_id,
                    entry.role,
                    entry.agent_id,
                    entry.content,
                    format_time(&entry.created_time),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Append a state log record. Returns the new row ID.
    pub fn record_state(&self, entry: &StateLogEntry) -> Result<i64> {
        self.with_conn(|conn| {
            let _ = conn.execute(
                "INSERT INTO state_logs (conversation_id, message_id, key, data, data_type, source, created_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    entry.conversation_id.as_str(),
                    entry.message_id,
                    entry.key,
                    entry.data,
                    entry.data_type,
                    entry.source,
                    format_time(&entry.created_time),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Content logs of a conversation, oldest first.
    pub fn content_logs(&self, conversation_id: &ConversationId) -> Result<Vec<ContentLogEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, message_id, role, agent_id, content, created_time
                 FROM content_logs WHERE conversation_id = ?1 ORDER BY created_time ASC, id ASC",
            )?;
            let rows = stmt
                .query_map(params![conversation_id.as_str()], |row| {
                    Ok((
                        ContentLogEntry {
                            id: row.get(0)?,
                            conversation_id: ConversationId::from(row.get::<_, String>(1)?),
                            message_id: row.get(2)?,
                            role: row.get(3)?,
                            agent_id: row.get(4)?,
                            content: row.get(5)?,
                            created_time: DateTime::<Utc>::MIN_UTC,
                        },
                        row.get::<_, String>(6)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter()
                .map(|(mut entry, raw)| {
                    entry.created_time = parse_stored_time(&raw)?;
                    Ok(entry)
                })
                .collect()
        })
    }

    /// State logs of a conversation, oldest first.
    pub fn state_logs(&self, conversation_id: &ConversationId) -> Result<Vec<StateLogEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, message_id, key, data, data_type, source, created_time
                 FROM state_logs WHERE conversation_id = ?1 ORDER BY created_time ASC, id ASC",
            )?;
            let rows = stmt
                .query_map(params![conversation_id.as_str()], |row| {
                    Ok((
                        StateLogEntry {
                            id: row.get(0)?,
                            conversation_id: ConversationId::from(row.get::<_, String>(1)?),
                            message_id: row.get(2)?,
                            key: row.get(3)?,
                            data: row.get(4)?,
                            data_type: row.get(5)?,
                            source: row.get(6)?,
                            created_time: DateTime::<Utc>::MIN_UTC,
                        },
                        row.get::<_, String>(7)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter()
                .map(|(mut entry, raw)| {
                    entry.created_time = parse_stored_time(&raw)?;
                    Ok(entry)
                })
                .collect()
        })
    }

    /// Delete both log kinds of a conversation from `since` on, in one transaction.
    pub fn purge_since(
        &self,
        conversation_id: &ConversationId,
        since: DateTime<Utc>,
    ) -> Result<usize> {
        self.with_conn(|conn| {
            let since = format_time(&since);
            let tx = conn.unchecked_transaction()?;
            let content = tx.execute(
                "DELETE FROM content_logs WHERE conversation_id = ?1 AND created_time >= ?2",
                params![conversation_id.as_str(), since],
            )?;
            let state = tx.execute(
                "DELETE FROM state_logs WHERE conversation_id = ?1 AND created_time >= ?2",
                params![conversation_id.as_str(), since],
            )?;
            tx.commit()?;
            debug!(
                conversation_id = conversation_id.as_str(),
                content, state, "purged audit logs"
            );
            Ok(content + state)
        })
    }
}

impl LogPurger for SqliteAuditLog {
    fn purge_logs_since(
        &self,
        conversation_id: &ConversationId,
        since: DateTime<Utc>,
    ) -> std::result::Result<usize, PurgeError> {
        self.purge_since(conversation_id, since)
            .map_err(|e| PurgeError(e.to_string()))
    }
}

fn parse_stored_time(raw: &str) -> Result<DateTime<Utc>> {
    parse_time(raw).map_err(|e| AuditLogError::Timestamp(format!("{raw}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rewind_core::{DialogEntry, Role, StateValue};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn seed(log: &SqliteAuditLog, conv: &ConversationId) {
        for (i, mid) in ["m1", "m2", "m3"].iter().enumerate() {
            let secs = i64::try_from(i).unwrap() * 10;
            let dialog = DialogEntry::new(Role::User, "a1", *mid, format!("msg {i}")).at(t(secs));
            let _ = log
                .record_content(&ContentLogEntry::from_dialog(conv, &dialog))
                .unwrap();
            let value = StateValue::text(format!("v{i}"), "agent")
                .for_message(*mid)
                .at(t(secs));
            let _ = log
                .record_state(&StateLogEntry::from_value(conv, "topic", &value))
                .unwrap();
        }
    }

    #[test]
    fn records_and_lists_in_time_order() {
        let log = SqliteAuditLog::in_memory().unwrap();
        let conv = ConversationId::from("c1");
        seed(&log, &conv);

        let content = log.content_logs(&conv).unwrap();
        assert_eq!(
            content.iter().map(|e| e.message_id.as_str()).collect::<Vec<_>>(),
            vec!["m1", "m2", "m3"]
        );
        assert_eq!(content[1].created_time, t(10));

        let state = log.state_logs(&conv).unwrap();
        assert_eq!(state.len(), 3);
        assert_eq!(state[2].data, "v2");
    }

    #[test]
    fn purge_removes_boundary_and_later() {
        let log = SqliteAuditLog::in_memory().unwrap();
        let conv = ConversationId::from("c1");
        seed(&log, &conv);

        let purged = log.purge_since(&conv, t(10)).unwrap();
        assert_eq!(purged, 4);
        let content = log.content_logs(&conv).unwrap();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0].message_id, "m1");
        assert_eq!(log.state_logs(&conv).unwrap().len(), 1);
    }

    #[test]
    fn purge_is_scoped_to_conversation() {
        let log = SqliteAuditLog::in_memory().unwrap();
        let a = ConversationId::from("a");
        let b = ConversationId::from("b");
        seed(&log, &a);
        seed(&log, &b);

        let _ = log.purge_logs_since(&a, t(0)).unwrap();
        assert!(log.content_logs(&a).unwrap().is_empty());
        assert_eq!(log.content_logs(&b).unwrap().len(), 3);
    }

    #[test]
    fn file_backed_log_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.db");
        let conv = ConversationId::from("c1");
        {
            let log = SqliteAuditLog::open(&path).unwrap();
            seed(&log, &conv);
        }
        let reopened = SqliteAuditLog::open(&path).unwrap();
        assert_eq!(reopened.content_logs(&conv).unwrap().len(), 3);
    }

    #[test]
    fn from_settings_opens_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = LoggingSettings::default();
        assert!(SqliteAuditLog::from_settings(&settings).unwrap().is_none());

        let path = dir.path().join("audit.db");
        settings.audit_db_path = Some(path.to_string_lossy().into_owned());
        assert!(SqliteAuditLog::from_settings(&settings).unwrap().is_some());
        assert!(path.exists());
    }
}
