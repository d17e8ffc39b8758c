//! # rewind-logging
//!
//! Structured logging setup and the conversation audit log.
//!
//! - [`init_subscriber`] installs the global `tracing` subscriber (stderr).
//! - [`SqliteAuditLog`] keeps content/state audit records and implements
//!   [`rewind_core::LogPurger`] so rewinds can clean them up.

#![deny(unsafe_code)]

pub mod audit;
pub mod types;

pub use audit::{AuditLogError, SqliteAuditLog};
pub use types::{ContentLogEntry, StateLogEntry};

/// Initialize the global tracing subscriber with stderr output.
///
/// Call once at application startup; later calls are no-ops. `RUST_LOG`
/// takes precedence over `level` when set.
pub fn init_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    let _ = subscriber.try_init();
}

/// Initialize the global tracing subscriber with JSON lines on stderr.
pub fn init_json_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json();

    let _ = subscriber.try_init();
}
