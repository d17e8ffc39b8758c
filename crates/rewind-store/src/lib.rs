//! # rewind-store
//!
//! Conversation timeline and state engine over pluggable storage.
//!
//! A conversation owns four parts: a summary with denormalized counters, an
//! append-only dialog timeline, a keyed state table with per-key history,
//! and a list of rollback breakpoints. This crate provides:
//!
//! - **[`ConversationRepository`]**: the storage seam. Backends supply only
//!   load/save primitives plus an atomic [`WriteBatch`] apply.
//! - **Components**: [`DialogTimeline`], [`StateStore`], [`BreakpointLog`]
//!   and [`TruncationEngine`], each written once against the repository.
//! - **[`ConversationStore`]**: facade tying the components and the
//!   conversation lifecycle together.
//! - **Backends**: [`MemoryRepository`], [`SqliteRepository`] and
//!   [`DocumentRepository`], selected from settings by [`open_repository`].
//!
//! All operations are synchronous. The engine assumes one writer per
//! conversation; [`ConversationLocks`] is available to enforce that.

#![deny(unsafe_code)]

pub mod breakpoints;
pub mod documents;
pub mod errors;
pub mod factory;
pub mod locks;
pub mod memory;
pub mod repository;
pub mod sqlite;
pub mod state;
pub mod store;
pub mod timeline;
pub mod truncate;

pub use breakpoints::BreakpointLog;
pub use documents::DocumentRepository;
pub use errors::{Result, StoreError};
pub use factory::open_repository;
pub use locks::ConversationLocks;
pub use memory::MemoryRepository;
pub use repository::{ConversationRepository, DialogWrite, WriteBatch};
pub use sqlite::{ConnectionConfig, SqliteRepository};
pub use state::StateStore;
pub use store::{ConversationStore, CreateConversationOptions};
pub use timeline::DialogTimeline;
pub use truncate::{TruncationEngine, TruncationPlan, plan_truncation};
