//! Timestamp helpers.
//!
//! All engine timestamps are UTC with microsecond precision. Truncating at
//! creation time means a value survives a round trip through any backend
//! unchanged, and the fixed-width RFC 3339 text form sorts lexically in the
//! same order as the instants it encodes.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

/// Current instant, truncated to microseconds.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Drop any sub-microsecond part of `time`.
///
/// Every timestamp setter goes through this, so an instant compares the same
/// before and after a round trip through any backend.
pub fn normalize(time: DateTime<Utc>) -> DateTime<Utc> {
    time.trunc_subsecs(6)
}

/// Fixed-width RFC 3339 form (`2024-01-15T12:00:00.000000Z`).
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_time(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}
