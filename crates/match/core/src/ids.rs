//! Opaque identifiers issued by the match server.
//!
//! The client never interprets these values; it only compares them and echoes
//! them back in request paths.
use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a server-issued identifier as-is.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Raw identifier, as it appears on the wire.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

opaque_id!(
    /// Identifier of a match. Immutable for the lifetime of a match view.
    MatchId
);

opaque_id!(
    /// Identifier of a turn, unique within its match.
    TurnId
);

opaque_id!(
    /// Participant identifier (the server uses usernames).
    PlayerId
);
