//! # rewind-settings
//!
//! Configuration with layered sources for the rewind engine.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`RewindSettings::default()`]
//! 2. **User file**: `~/.rewind/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `REWIND_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides, deep_merge, load_settings, load_settings_from_path,
    settings_path,
};
pub use types::*;

use std::sync::OnceLock;

static SETTINGS: OnceLock<RewindSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// The first call loads `~/.rewind/settings.json` with env overrides and
/// caches the result; a load failure falls back to compiled defaults.
pub fn get_settings() -> &'static RewindSettings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            RewindSettings::default()
        })
    })
}

/// Initialize the global settings with a specific value.
///
/// # Errors
///
/// Returns the provided settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: RewindSettings) -> std::result::Result<(), RewindSettings> {
    SETTINGS.set(settings)
}
