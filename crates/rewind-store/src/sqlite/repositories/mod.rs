//! Stateless repository structs, one per table group.
//!
//! Every method takes `&Connection` (usually a transaction) and executes
//! SQL; no repository holds state. Timestamps are written with
//! [`format_time`] so string order matches time order.

pub mod breakpoint;
pub mod conversation;
pub mod dialog;
pub mod state;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

use rewind_core::time::parse_time;

pub(crate) use rewind_core::time::format_time;

/// Read a timestamp column.
pub(crate) fn time_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_time(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read a text column through `FromStr`.
pub(crate) fn parsed_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into())
    })
}

/// Read an optional JSON text column.
pub(crate) fn json_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: serde::de::DeserializeOwned,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Encode a count or position for an INTEGER column.
pub(crate) fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
