//! Conversation repository: summaries with denormalized counters.

use rusqlite::{Connection, OptionalExtension, Row, params};

use rewind_core::{AgentId, ConversationId, ConversationSummary};

use super::{format_time, parsed_col, time_col};
use crate::errors::Result;

const COLUMNS: &str = "id, agent_id, user_id, title, status, dialog_count, created_time, updated_time, tags";

/// Conversation repository: stateless, every method takes `&Connection`.
pub struct ConversationRepo;

impl ConversationRepo {
    /// Get a summary by ID.
    pub fn get(conn: &Connection, id: &ConversationId) -> Result<Option<ConversationSummary>> {
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM conversations WHERE id = ?1"),
                params![id.as_str()],
                map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Insert or overwrite a summary.
    pub fn upsert(conn: &Connection, summary: &ConversationSummary) -> Result<()> {
        let tags = serde_json::to_string(&summary.tags)?;
        let _ = conn.execute(
            &format!(
                "INSERT INTO conversations ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE SET
                   agent_id = excluded.agent_id,
                   user_id = excluded.user_id,
                   title = excluded.title,
                   status = excluded.status,
                   dialog_count = excluded.dialog_count,
                   created_time = excluded.created_time,
                   updated_time = excluded.updated_time,
                   tags = excluded.tags"
            ),
            params![
                summary.id.as_str(),
                summary.agent_id.as_str(),
                summary.user_id,
                summary.title,
                summary.status.to_string(),
                i64::try_from(summary.dialog_count).unwrap_or(i64::MAX),
                format_time(&summary.created_time),
                format_time(&summary.updated_time),
                tags,
            ],
        )?;
        Ok(())
    }

    /// All summaries, most recently updated first.
    pub fn list(conn: &Connection) -> Result<Vec<ConversationSummary>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM conversations ORDER BY updated_time DESC, id ASC"
        ))?;
        let rows = stmt
            .query_map([], map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Delete a summary. Returns whether a row was removed.
    pub fn delete(conn: &Connection, id: &ConversationId) -> Result<bool> {
        let changed = conn.execute("DELETE FROM conversations WHERE id = ?1", params![id.as_str()])?;
        Ok(changed > 0)
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<ConversationSummary> {
    let tags: String = row.get(8)?;
    let tags = serde_json::from_str(&tags).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let dialog_count: i64 = row.get(5)?;
    Ok(ConversationSummary {
        id: ConversationId::from(row.get::<_, String>(0)?),
        agent_id: AgentId::from(row.get::<_, String>(1)?),
        user_id: row.get(2)?,
        title: row.get(3)?,
        status: parsed_col(row, 4)?,
        dialog_count: u64::try_from(dialog_count).unwrap_or(0),
        created_time: time_col(row, 6)?,
        updated_time: time_col(row, 7)?,
        tags,
    })
}
