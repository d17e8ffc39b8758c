//! # rewind-core
//!
//! Domain vocabulary for the conversation timeline engine.
//!
//! Every storage backend and the engine itself speak these types:
//!
//! - **Branded IDs**: [`ConversationId`], [`AgentId`] as newtypes for type safety
//! - **Dialogs**: [`DialogEntry`] with [`Role`], ordered by insertion
//! - **State**: [`StateEntry`] / [`StateValue`] with turn- and session-scoped
//!   namespaces ([`StateScope`]) and lazily decoded payloads ([`TypedValue`])
//! - **Breakpoints**: [`Breakpoint`] rollback markers
//! - **Summaries**: [`ConversationSummary`] denormalized counters
//! - **Collaborators**: [`LogPurger`] for audit log cleanup after a rewind

#![deny(unsafe_code)]

pub mod breakpoint;
pub mod conversation;
pub mod dialog;
pub mod errors;
pub mod ids;
pub mod purge;
pub mod state;
pub mod time;

pub use breakpoint::Breakpoint;
pub use conversation::{ConversationStatus, ConversationSummary};
pub use dialog::{DialogContent, DialogEntry, Role};
pub use errors::{PurgeError, StateError};
pub use ids::{AgentId, ConversationId};
pub use purge::{LogPurger, NoopLogPurger};
pub use state::{
    DataType, StateEntry, StateScope, StateSnapshot, StateValue, TypedValue, current_value,
};
