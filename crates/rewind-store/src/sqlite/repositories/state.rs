//! State repository: keys in `state_entries`, histories in `state_values`.

use std::collections::HashMap;

use rusqlite::{Connection, params};

use rewind_core::{ConversationId, DataType, StateEntry, StateScope, StateValue};

use super::{format_time, time_col, to_i64};
use crate::errors::Result;

/// State repository: stateless, every method takes `&Connection`.
pub struct StateRepo;

impl StateRepo {
    /// Load every key with its history, in stored key order.
    pub fn load(conn: &Connection, id: &ConversationId) -> Result<Vec<StateEntry>> {
        let mut stmt = conn.prepare(
            "SELECT key, versioning, readonly FROM state_entries
             WHERE conversation_id = ?1 ORDER BY position ASC",
        )?;
        let mut entries = stmt
            .query_map(params![id.as_str()], |row| {
                Ok(StateEntry {
                    key: row.get(0)?,
                    scope: StateScope::from_versioning(row.get(1)?),
                    readonly: row.get(2)?,
                    values: Vec::new(),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT key, data, data_type, source, message_id, active, active_rounds, update_time
             FROM state_values WHERE conversation_id = ?1 ORDER BY key ASC, seq ASC",
        )?;
        let values = stmt
            .query_map(params![id.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    StateValue {
                        data: row.get(1)?,
                        data_type: DataType::from(row.get::<_, String>(2)?),
                        source: row.get(3)?,
                        message_id: row.get(4)?,
                        active: row.get(5)?,
                        active_rounds: row.get(6)?,
                        update_time: time_col(row, 7)?,
                    },
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let index: HashMap<String, usize> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.key.clone(), i))
            .collect();
        for (key, value) in values {
            if let Some(&i) = index.get(&key) {
                entries[i].values.push(value);
            }
        }
        Ok(entries)
    }

    /// Replace the whole table for a conversation.
    pub fn replace(conn: &Connection, id: &ConversationId, entries: &[StateEntry]) -> Result<()> {
        let _ = Self::delete(conn, id)?;

        let mut insert_entry = conn.prepare_cached(
            "INSERT INTO state_entries (conversation_id, key, position, versioning, readonly)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        let mut insert_value = conn.prepare_cached(
            "INSERT INTO state_values (conversation_id, key, seq, data, data_type, source,
                message_id, active, active_rounds, update_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )?;
        for (position, entry) in entries.iter().enumerate() {
            let _ = insert_entry.execute(params![
                id.as_str(),
                entry.key,
                to_i64(position),
                entry.versioning(),
                entry.readonly,
            ])?;
            for (seq, value) in entry.values.iter().enumerate() {
                let _ = insert_value.execute(params![
                    id.as_str(),
                    entry.key,
                    to_i64(seq),
                    value.data,
                    value.data_type.to_string(),
                    value.source,
                    value.message_id,
                    value.active,
                    value.active_rounds,
                    format_time(&value.update_time),
                ])?;
            }
        }
        Ok(())
    }

    /// Delete every key (values cascade). Returns the number of keys removed.
    pub fn delete(conn: &Connection, id: &ConversationId) -> Result<usize> {
        // Values first; does not depend on the cascade being enabled.
        let _ = conn.execute(
            "DELETE FROM state_values WHERE conversation_id = ?1",
            params![id.as_str()],
        )?;
        Ok(conn.execute(
            "DELETE FROM state_entries WHERE conversation_id = ?1",
            params![id.as_str()],
        )?)
    }
}
