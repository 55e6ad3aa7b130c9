//! Credentials threaded explicitly through every network call.
//!
//! The token is issued by the authentication service and treated as an opaque
//! string. Nothing in this crate reads it from global state.
use std::fmt;

use match_core::PlayerId;

/// Opaque bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Value for an `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Who is acting, and with which credential.
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub credential: Credential,
    /// The local player, used for the already-played guard.
    pub player: PlayerId,
}

impl AuthContext {
    pub fn new(credential: Credential, player: impl Into<PlayerId>) -> Self {
        Self {
            credential,
            player: player.into(),
        }
    }
}
