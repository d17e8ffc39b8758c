//! `SQLite` backend.
//!
//! - **[`connection`]**: `r2d2` connection pool with WAL mode, foreign keys,
//!   and performance pragmas applied to every connection.
//! - **[`migrations`]**: Version-tracked schema evolution, embedded at
//!   compile time and run transactionally.
//! - **[`repositories`]**: Stateless repository structs; each method takes
//!   `&Connection` and executes SQL.
//! - **[`repository`]**: [`SqliteRepository`], the
//!   [`ConversationRepository`](crate::ConversationRepository) built from
//!   them.

pub mod connection;
pub mod migrations;
pub mod repositories;
pub mod repository;

pub use connection::{
    ConnectionConfig, ConnectionPool, PooledConnection, PragmaState, new_file, new_in_memory,
    verify_pragmas,
};
pub use migrations::{current_version, latest_version, run_migrations};
pub use repository::SqliteRepository;
