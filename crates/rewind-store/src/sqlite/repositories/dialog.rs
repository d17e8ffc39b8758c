//! Dialog repository: the per-conversation timeline.
//!
//! Rows are ordered by `seq`, which is assigned densely from 0 on replace
//! and continues from the current maximum on append.

use rusqlite::{Connection, Row, params};

use rewind_core::{AgentId, ConversationId, DialogEntry};

use super::{format_time, json_col, parsed_col, time_col, to_i64};
use crate::errors::Result;

/// Dialog repository: stateless, every method takes `&Connection`.
pub struct DialogRepo;

impl DialogRepo {
    /// All entries of a conversation in timeline order.
    pub fn list(conn: &Connection, id: &ConversationId) -> Result<Vec<DialogEntry>> {
        let mut stmt = conn.prepare(
            "SELECT role, agent_id, message_id, sender_id, function_name, created_time,
                    content, rich_content, secondary_content, secondary_rich_content, payload
             FROM dialogs WHERE conversation_id = ?1 ORDER BY seq ASC",
        )?;
        let rows = stmt
            .query_map(params![id.as_str()], map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Replace the whole timeline.
    pub fn replace(conn: &Connection, id: &ConversationId, dialogs: &[DialogEntry]) -> Result<()> {
        let _ = conn.execute(
            "DELETE FROM dialogs WHERE conversation_id = ?1",
            params![id.as_str()],
        )?;
        Self::insert_from(conn, id, 0, dialogs)
    }

    /// Append entries after the current tail.
    pub fn append(conn: &Connection, id: &ConversationId, dialogs: &[DialogEntry]) -> Result<()> {
        let next: i64 = conn.query_row(
            "SELECT COALESCE(MAX(seq) + 1, 0) FROM dialogs WHERE conversation_id = ?1",
            params![id.as_str()],
            |row| row.get(0),
        )?;
        Self::insert_from(conn, id, next, dialogs)
    }

    /// Number of entries.
    pub fn count(conn: &Connection, id: &ConversationId) -> Result<i64> {
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM dialogs WHERE conversation_id = ?1",
            params![id.as_str()],
            |row| row.get(0),
        )?)
    }

    /// Delete the timeline.
    pub fn delete(conn: &Connection, id: &ConversationId) -> Result<usize> {
        Ok(conn.execute(
            "DELETE FROM dialogs WHERE conversation_id = ?1",
            params![id.as_str()],
        )?)
    }

    fn insert_from(
        conn: &Connection,
        id: &ConversationId,
        first_seq: i64,
        dialogs: &[DialogEntry],
    ) -> Result<()> {
        let mut stmt = conn.prepare_cached(
            "INSERT INTO dialogs (conversation_id, seq, role, agent_id, message_id, sender_id,
                function_name, created_time, content, rich_content, secondary_content,
                secondary_rich_content, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )?;
        for (offset, entry) in dialogs.iter().enumerate() {
            let payload = entry.payload.as_ref().map(serde_json::to_string).transpose()?;
            let _ = stmt.execute(params![
                id.as_str(),
                first_seq + to_i64(offset),
                entry.role.to_string(),
                entry.agent_id.as_str(),
                entry.message_id,
                entry.sender_id,
                entry.function_name,
                format_time(&entry.created_time),
                entry.content,
                entry.rich_content,
                entry.secondary_content,
                entry.secondary_rich_content,
                payload,
            ])?;
        }
        Ok(())
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<DialogEntry> {
    Ok(DialogEntry {
        role: parsed_col(row, 0)?,
        agent_id: AgentId::from(row.get::<_, String>(1)?),
        message_id: row.get(2)?,
        sender_id: row.get(3)?,
        function_name: row.get(4)?,
        created_time: time_col(row, 5)?,
        content: row.get(6)?,
        rich_content: row.get(7)?,
        secondary_content: row.get(8)?,
        secondary_rich_content: row.get(9)?,
        payload: json_col(row, 10)?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use rewind_core::Role;
    use serde_json::json;

    use super::*;
    use crate::sqlite::migrations::run_migrations;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        let _ = run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn append_continues_sequence() {
        let conn = setup();
        let id = ConversationId::from("c1");
        DialogRepo::append(&conn, &id, &[DialogEntry::new(Role::User, "a1", "m1", "q")]).unwrap();
        DialogRepo::append(
            &conn,
            &id,
            &[
                DialogEntry::new(Role::Assistant, "a1", "m1", "a"),
                DialogEntry::new(Role::User, "a1", "m2", "q2"),
            ],
        )
        .unwrap();

        let contents: Vec<_> = DialogRepo::list(&conn, &id)
            .unwrap()
            .into_iter()
            .map(|d| d.content)
            .collect();
        assert_eq!(contents, vec!["q", "a", "q2"]);
        assert_eq!(DialogRepo::count(&conn, &id).unwrap(), 3);
    }

    #[test]
    fn optional_fields_roundtrip() {
        let conn = setup();
        let id = ConversationId::from("c1");
        let entry = DialogEntry::new(Role::Function, "a1", "m1", "{}")
            .with_sender("bot-7")
            .with_function("lookup")
            .with_rich_content("**{}**")
            .with_secondary("{}", Some("_{}_".into()))
            .with_payload(json!({"hits": 3}));
        DialogRepo::replace(&conn, &id, std::slice::from_ref(&entry)).unwrap();
        assert_eq!(DialogRepo::list(&conn, &id).unwrap(), vec![entry]);
    }

    #[test]
    fn replace_and_delete_are_scoped() {
        let conn = setup();
        let a = ConversationId::from("a");
        let b = ConversationId::from("b");
        let entry = DialogEntry::new(Role::User, "a1", "m1", "q");
        DialogRepo::append(&conn, &a, &[entry.clone(), entry.clone()]).unwrap();
        DialogRepo::append(&conn, &b, std::slice::from_ref(&entry)).unwrap();

        DialogRepo::replace(&conn, &a, std::slice::from_ref(&entry)).unwrap();
        assert_eq!(DialogRepo::count(&conn, &a).unwrap(), 1);
        assert_eq!(DialogRepo::delete(&conn, &b).unwrap(), 1);
        assert_eq!(DialogRepo::count(&conn, &a).unwrap(), 1);
    }
}
