//! Client configuration loaded from the environment.
use std::env;

use match_sync::SyncConfig;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub sync: SyncConfig,
    /// Bearer token issued by the authentication service.
    pub token: Option<String>,
    /// Username of the local player.
    pub player: Option<String>,
    /// Log directory name. Defaults to a timestamp.
    pub session_id: Option<String>,
}

impl ClientConfig {
    /// Environment variables:
    /// - `MATCH_TOKEN` - Bearer token for the match server
    /// - `MATCH_PLAYER` - Local player's username
    /// - `MATCH_SESSION_ID` - Log session name (default: `session_<unix time>`)
    /// - everything read by [`SyncConfig::from_env`]
    pub fn from_env() -> Self {
        Self {
            sync: SyncConfig::from_env(),
            token: non_empty_var("MATCH_TOKEN"),
            player: non_empty_var("MATCH_PLAYER"),
            session_id: non_empty_var("MATCH_SESSION_ID"),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
