//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`: field names
//! are camelCase on disk and any missing field takes its compiled default,
//! so a settings file only needs the values it changes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "storage": { "backend": "sqlite", "sqlitePath": "/var/lib/rewind/rewind.db" },
///   "truncation": { "cleanLogsByDefault": true }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RewindSettings {
    /// Settings schema version.
    pub version: String,
    /// Persistence backend selection.
    pub storage: StorageSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
    /// Truncation defaults.
    pub truncation: TruncationSettings,
}

impl Default for RewindSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            storage: StorageSettings::default(),
            logging: LoggingSettings::default(),
            truncation: TruncationSettings::default(),
        }
    }
}

impl RewindSettings {
    /// Reject values no backend can work with.
    pub fn validate(&self) -> Result<()> {
        self.storage.validate()
    }
}

/// Which persistence backend holds conversations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local maps; nothing survives a restart.
    Memory,
    /// Relational tables in a `SQLite` file.
    #[default]
    Sqlite,
    /// One JSON document per conversation in a directory.
    Documents,
}

impl StorageBackend {
    /// Parse a backend name (case-insensitive).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "sqlite" => Some(Self::Sqlite),
            "documents" | "document" => Some(Self::Documents),
            _ => None,
        }
    }
}

/// Storage settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    /// Selected backend.
    pub backend: StorageBackend,
    /// Database file for the `sqlite` backend.
    pub sqlite_path: String,
    /// Directory for the `documents` backend.
    pub documents_dir: String,
    /// Connection pool size for the `sqlite` backend.
    pub pool_size: u32,
    /// `SQLite` busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
}

impl Default for StorageSettings {
    fn default() -> Self {
        let base = rewind_home();
        Self {
            backend: StorageBackend::default(),
            sqlite_path: base.join("rewind.db").to_string_lossy().into_owned(),
            documents_dir: base.join("conversations").to_string_lossy().into_owned(),
            pool_size: 16,
            busy_timeout_ms: 30_000,
        }
    }
}

impl StorageSettings {
    fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(SettingsError::InvalidValue(
                "storage.poolSize must be at least 1".into(),
            ));
        }
        match self.backend {
            StorageBackend::Sqlite if self.sqlite_path.is_empty() => Err(
                SettingsError::InvalidValue("storage.sqlitePath is empty".into()),
            ),
            StorageBackend::Documents if self.documents_dir.is_empty() => Err(
                SettingsError::InvalidValue("storage.documentsDir is empty".into()),
            ),
            _ => Ok(()),
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `tracing` filter directive (overridden by `RUST_LOG`).
    pub level: String,
    /// Database file for the content/state audit log; `None` disables it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_db_path: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            audit_db_path: None,
        }
    }
}

/// Truncation defaults applied by the orchestration layer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TruncationSettings {
    /// Purge audit logs past the boundary when the caller does not say.
    pub clean_logs_by_default: bool,
}

/// Root directory for rewind data (`~/.rewind`).
pub fn rewind_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".rewind")
}
