//! Breakpoint repository.

use rusqlite::{Connection, params};

use rewind_core::{Breakpoint, ConversationId};

use super::{format_time, time_col, to_i64};
use crate::errors::Result;

/// Breakpoint repository: stateless, every method takes `&Connection`.
pub struct BreakpointRepo;

impl BreakpointRepo {
    /// All breakpoints in append order.
    pub fn list(conn: &Connection, id: &ConversationId) -> Result<Vec<Breakpoint>> {
        let mut stmt = conn.prepare(
            "SELECT message_id, breakpoint, created_time, reason
             FROM breakpoints WHERE conversation_id = ?1 ORDER BY seq ASC",
        )?;
        let rows = stmt
            .query_map(params![id.as_str()], |row| {
                Ok(Breakpoint {
                    message_id: row.get(0)?,
                    breakpoint: time_col(row, 1)?,
                    created_time: time_col(row, 2)?,
                    reason: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Replace the list.
    pub fn replace(conn: &Connection, id: &ConversationId, breakpoints: &[Breakpoint]) -> Result<()> {
        let _ = Self::delete(conn, id)?;
        let mut stmt = conn.prepare_cached(
            "INSERT INTO breakpoints (conversation_id, seq, message_id, breakpoint, created_time, reason)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for (seq, bp) in breakpoints.iter().enumerate() {
            let _ = stmt.execute(params![
                id.as_str(),
                to_i64(seq),
                bp.message_id,
                format_time(&bp.breakpoint),
                format_time(&bp.created_time),
                bp.reason,
            ])?;
        }
        Ok(())
    }

    /// Delete every breakpoint of a conversation.
    pub fn delete(conn: &Connection, id: &ConversationId) -> Result<usize> {
        Ok(conn.execute(
            "DELETE FROM breakpoints WHERE conversation_id = ?1",
            params![id.as_str()],
        )?)
    }
}
