//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`RewindSettings::default()`]
//! 2. If `~/.rewind/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `REWIND_*` environment variable overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::{RewindSettings, StorageBackend, rewind_home};

/// Resolve the path to the settings file (`~/.rewind/settings.json`).
pub fn settings_path() -> PathBuf {
    rewind_home().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<RewindSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; a file with invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<RewindSettings> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<RewindSettings> {
    let defaults = serde_json::to_value(RewindSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `REWIND_*` environment variable overrides.
pub fn apply_env_overrides(settings: &mut RewindSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Invalid values are ignored with a warning and the file/default value
/// stays in place. Empty strings count as unset.
pub fn apply_overrides<F>(settings: &mut RewindSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    // ── Storage ─────────────────────────────────────────────────────
    if let Some(v) = read("REWIND_STORAGE_BACKEND") {
        match StorageBackend::parse(&v) {
            Some(backend) => settings.storage.backend = backend,
            None => warn!(key = "REWIND_STORAGE_BACKEND", value = %v, "unknown backend, ignoring"),
        }
    }
    if let Some(v) = read("REWIND_SQLITE_PATH") {
        settings.storage.sqlite_path = v;
    }
    if let Some(v) = read("REWIND_DOCUMENTS_DIR") {
        settings.storage.documents_dir = v;
    }
    if let Some(v) = read("REWIND_POOL_SIZE") {
        match parse_u32_range(&v, 1, 256) {
            Some(n) => settings.storage.pool_size = n,
            None => warn!(key = "REWIND_POOL_SIZE", value = %v, "invalid u32 env var, ignoring"),
        }
    }
    if let Some(v) = read("REWIND_BUSY_TIMEOUT_MS") {
        match parse_u32_range(&v, 0, 600_000) {
            Some(n) => settings.storage.busy_timeout_ms = n,
            None => {
                warn!(key = "REWIND_BUSY_TIMEOUT_MS", value = %v, "invalid u32 env var, ignoring");
            }
        }
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read("REWIND_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read("REWIND_AUDIT_DB") {
        settings.logging.audit_db_path = Some(v);
    }

    // ── Truncation ──────────────────────────────────────────────────
    if let Some(v) = read("REWIND_CLEAN_LOGS") {
        match parse_bool(&v) {
            Some(b) => settings.truncation.clean_logs_by_default = b,
            None => warn!(key = "REWIND_CLEAN_LOGS", value = %v, "invalid boolean env var, ignoring"),
        }
    }
}

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u32` within an inclusive range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}
