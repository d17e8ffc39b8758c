//! Branded ID newtypes.
//!
//! Conversations and agents get distinct ID types wrapping a `String`, so a
//! conversation ID can never be passed where an agent ID is expected.
//! Freshly generated IDs are prefixed UUID v7 strings (time-ordered).
//!
//! Message IDs stay plain strings: they are caller-assigned, not unique per
//! dialog entry, and may legitimately be empty.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new random ID (prefixed UUID v7).
            #[must_use]
            pub fn new() -> Self {
                Self(format!(concat!($prefix, "_{}"), Uuid::now_v7()))
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Unique identifier for a conversation.
    ConversationId, "conv"
}

branded_id! {
    /// Identifier of the agent that produced or owns a dialog entry.
    AgentId, "agent"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_conversation_id_is_prefixed_v7() {
        let id = ConversationId::new();
        let raw = id.as_str().strip_prefix("conv_").unwrap();
        let parsed = Uuid::parse_str(raw).unwrap();
        assert_eq!(parsed.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = ConversationId::new();
        let b = ConversationId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn from_str_ref_and_display() {
        let id = AgentId::from("planner");
        assert_eq!(id.as_str(), "planner");
        assert_eq!(format!("{id}"), "planner");
    }

    #[test]
    fn serde_is_transparent() {
        let id = ConversationId::from("c-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"c-1\"");
        let back: ConversationId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
