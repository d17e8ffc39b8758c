//! Conversation state: keyed variables with a value history.
//!
//! Each [`StateEntry`] lives in one of two disjoint namespaces:
//!
//! - [`StateScope::Turn`]: turn-scoped facts. Every value remembers the
//!   message that wrote it, and a rewind strips values written at or after
//!   the rewind boundary.
//! - [`StateScope::Session`]: durable session settings (temperature,
//!   locale). Only the current value is meaningful and rewinds never touch it.
//!
//! On the wire the scope is the `versioning` boolean (`true` = turn-scoped),
//! which keeps stored snapshots compatible with older writers.
//!
//! Values are opaque: `data` is a string and `data_type` a tag saying how to
//! read it. The engine never interprets either; consumers call
//! [`StateValue::decode`] when they need a typed view.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::StateError;
use crate::time;

/// Namespace of a state key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StateScope {
    /// Versioned, turn-scoped; subject to truncation.
    Turn,
    /// Unversioned, session-scoped; exempt from truncation.
    Session,
}

impl StateScope {
    /// Whether the scope keeps a per-message value history.
    #[must_use]
    pub const fn versioning(self) -> bool {
        matches!(self, Self::Turn)
    }

    /// Map the stored `versioning` flag back to a scope.
    #[must_use]
    pub const fn from_versioning(versioning: bool) -> Self {
        if versioning { Self::Turn } else { Self::Session }
    }
}

impl fmt::Display for StateScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Turn => write!(f, "turn"),
            Self::Session => write!(f, "session"),
        }
    }
}

mod versioning_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::StateScope;

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub(super) fn serialize<S: Serializer>(scope: &StateScope, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bool(scope.versioning())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<StateScope, D::Error> {
        bool::deserialize(d).map(StateScope::from_versioning)
    }
}

/// Tag describing how to interpret [`StateValue::data`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DataType {
    /// Plain text.
    Text,
    /// Decimal number.
    Number,
    /// `true` / `false`.
    Boolean,
    /// JSON document.
    Json,
    /// Any tag this crate does not know; carried through untouched.
    Other(String),
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
            Self::Json => write!(f, "json"),
            Self::Other(tag) => f.write_str(tag),
        }
    }
}

impl From<String> for DataType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "text" | "string" => Self::Text,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "json" | "object" | "array" => Self::Json,
            _ => Self::Other(tag),
        }
    }
}

impl From<&str> for DataType {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_owned())
    }
}

impl From<DataType> for String {
    fn from(tag: DataType) -> Self {
        tag.to_string()
    }
}

/// Decoded view of a state value.
#[derive(Clone, Debug, PartialEq)]
pub enum TypedValue {
    /// Text value.
    Text(String),
    /// Numeric value.
    Number(f64),
    /// Boolean value.
    Boolean(bool),
    /// Structured JSON value.
    Json(Value),
    /// Value with an unrecognised tag, left undecoded.
    Raw {
        /// Original tag.
        data_type: String,
        /// Original data.
        data: String,
    },
}

/// One timestamped value of a state key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateValue {
    /// String-encoded payload.
    pub data: String,
    /// How to interpret `data`.
    pub data_type: DataType,
    /// Writer of the value (agent, user, system).
    pub source: String,
    /// Turn that produced the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Liveness flag. Persisted for compatibility; no behavior attached.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Remaining live rounds. Persisted for compatibility; no behavior attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_rounds: Option<i64>,
    /// Write instant; orders the history.
    pub update_time: DateTime<Utc>,
}

const fn default_active() -> bool {
    true
}

impl StateValue {
    /// A value written now by `source`.
    pub fn new(
        data: impl Into<String>,
        data_type: impl Into<DataType>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into(),
            data_type: data_type.into(),
            source: source.into(),
            message_id: None,
            active: true,
            active_rounds: None,
            update_time: time::now(),
        }
    }

    /// Shorthand for a text value.
    pub fn text(data: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(data, DataType::Text, source)
    }

    /// Tag the value with the turn that produced it.
    #[must_use]
    pub fn for_message(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// Override the write instant.
    #[must_use]
    pub fn at(mut self, update_time: DateTime<Utc>) -> Self {
        self.update_time = time::normalize(update_time);
        self
    }

    /// Decode `data` according to `data_type`.
    pub fn decode(&self) -> Result<TypedValue, StateError> {
        let decode_err = |message: String| StateError::Decode {
            data_type: self.data_type.to_string(),
            message,
        };
        match &self.data_type {
            DataType::Text => Ok(TypedValue::Text(self.data.clone())),
            DataType::Number => self
                .data
                .trim()
                .parse::<f64>()
                .map(TypedValue::Number)
                .map_err(|e| decode_err(e.to_string())),
            DataType::Boolean => match self.data.trim() {
                "true" => Ok(TypedValue::Boolean(true)),
                "false" => Ok(TypedValue::Boolean(false)),
                other => Err(decode_err(format!("expected true or false, got '{other}'"))),
            },
            DataType::Json => serde_json::from_str(&self.data)
                .map(TypedValue::Json)
                .map_err(|e| decode_err(e.to_string())),
            DataType::Other(tag) => Ok(TypedValue::Raw {
                data_type: tag.clone(),
                data: self.data.clone(),
            }),
        }
    }
}

/// Resolve the current value of a history.
///
/// The value with the greatest `update_time` wins; among equal times the
/// one appearing later in the list wins.
pub fn current_value(values: &[StateValue]) -> Option<&StateValue> {
    values.iter().fold(None, |best, v| match best {
        Some(b) if time::normalize(b.update_time) > time::normalize(v.update_time) => Some(b),
        _ => Some(v),
    })
}

/// A conversation-scoped variable and its history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateEntry {
    /// Key, unique within the conversation.
    pub key: String,
    /// Namespace; serialized as the `versioning` flag.
    #[serde(rename = "versioning", with = "versioning_flag")]
    pub scope: StateScope,
    /// Whether new values are rejected.
    #[serde(default)]
    pub readonly: bool,
    /// Values in write order.
    #[serde(default)]
    pub values: Vec<StateValue>,
}

impl StateEntry {
    /// Empty turn-scoped (versioned) entry.
    pub fn turn(key: impl Into<String>) -> Self {
        Self::with_scope(key, StateScope::Turn)
    }

    /// Empty session-scoped (unversioned) entry.
    pub fn session(key: impl Into<String>) -> Self {
        Self::with_scope(key, StateScope::Session)
    }

    fn with_scope(key: impl Into<String>, scope: StateScope) -> Self {
        Self {
            key: key.into(),
            scope,
            readonly: false,
            values: Vec::new(),
        }
    }

    /// Mark the entry readonly.
    #[must_use]
    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    /// Append a value (builder form).
    #[must_use]
    pub fn with_value(mut self, value: StateValue) -> Self {
        self.values.push(value);
        self
    }

    /// Whether the entry keeps a per-message history.
    pub fn versioning(&self) -> bool {
        self.scope.versioning()
    }

    /// Current value of the key.
    pub fn current(&self) -> Option<&StateValue> {
        current_value(&self.values)
    }
}

/// Caller-side builder for the next full state snapshot.
///
/// The store never merges; the conversation service loads the snapshot,
/// edits it here and submits the whole thing back.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateSnapshot {
    entries: Vec<StateEntry>,
}

impl StateSnapshot {
    /// Wrap a loaded snapshot.
    pub fn new(entries: Vec<StateEntry>) -> Self {
        Self { entries }
    }

    /// Look up an entry by key.
    pub fn get(&self, key: &str) -> Option<&StateEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Current value of `key`, if any.
    pub fn current(&self, key: &str) -> Option<&StateValue> {
        self.get(key).and_then(StateEntry::current)
    }

    /// Insert a brand-new entry or replace an existing one wholesale.
    pub fn upsert_entry(&mut self, entry: StateEntry) {
        match self.entries.iter_mut().find(|e| e.key == entry.key) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Record a new value for `key`, creating the entry in `scope` if needed.
    ///
    /// Session-scoped keys hold a single meaningful value, so the new value
    /// replaces the history instead of extending it.
    pub fn push_value(
        &mut self,
        key: &str,
        scope: StateScope,
        value: StateValue,
    ) -> Result<(), StateError> {
        let Some(entry) = self.entries.iter_mut().find(|e| e.key == key) else {
            self.entries.push(StateEntry {
                key: key.to_owned(),
                scope,
                readonly: false,
                values: vec![value],
            });
            return Ok(());
        };
        if entry.scope != scope {
            return Err(StateError::ScopeConflict {
                key: key.to_owned(),
                existing: entry.scope.to_string(),
            });
        }
        if entry.readonly {
            return Err(StateError::Readonly(key.to_owned()));
        }
        match scope {
            StateScope::Turn => entry.values.push(value),
            StateScope::Session => entry.values = vec![value],
        }
        Ok(())
    }

    /// Current value of every key that has one, ordered by key.
    pub fn current_values(&self) -> BTreeMap<&str, &StateValue> {
        self.entries
            .iter()
            .filter_map(|e| e.current().map(|v| (e.key.as_str(), v)))
            .collect()
    }

    /// Borrow the entries.
    pub fn entries(&self) -> &[StateEntry] {
        &self.entries
    }

    /// Hand the snapshot back for persistence.
    pub fn into_entries(self) -> Vec<StateEntry> {
        self.entries
    }
}

impl From<Vec<StateEntry>> for StateSnapshot {
    fn from(entries: Vec<StateEntry>) -> Self {
        Self::new(entries)
    }
}
