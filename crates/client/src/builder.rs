//! Client builder with dependency injection pattern.

use anyhow::{Context, Result};
use match_core::{MatchId, PlayerId};
use match_sync::{AuthContext, Credential, SyncEngine};

use crate::Client;
use crate::config::ClientConfig;

/// Builder for constructing a [`Client`] with proper validation.
///
/// The credential and the local player come from the authentication
/// service; this builder only checks that both were supplied.
#[derive(Default)]
pub struct ClientBuilder {
    config: Option<ClientConfig>,
    match_id: Option<MatchId>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Match to open first (required).
    pub fn match_id(mut self, match_id: impl Into<MatchId>) -> Self {
        self.match_id = Some(match_id.into());
        self
    }

    /// Opens the match view. Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No match id was given
    /// - `MATCH_TOKEN` or `MATCH_PLAYER` is missing from the config
    pub fn build(self) -> Result<Client> {
        let config = self.config.unwrap_or_else(ClientConfig::from_env);
        let match_id = self
            .match_id
            .context("Match id is required. Pass it as the first argument.")?;
        let token = config
            .token
            .context("MATCH_TOKEN is required to talk to the match server")?;
        let player = PlayerId::new(
            config
                .player
                .context("MATCH_PLAYER is required to identify the local player")?,
        );

        let engine = SyncEngine::builder()
            .config(config.sync)
            .http()
            .auth(AuthContext::new(Credential::new(token), player.clone()))
            .open(match_id)
            .context("opening match view")?;

        Ok(Client { engine, player })
    }
}
