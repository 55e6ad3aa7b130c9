//! Move submission with local preconditions.
//!
//! Both preconditions are evaluated against the caller's current view before
//! anything is sent, so a doomed submission never reaches the server.
//!
//! The engine worker uses [`TurnSubmitter::check`] and [`TurnSubmitter::send`]
//! separately so it can track in-flight moves between the two.
//! [`TurnSubmitter::submit`] is the standalone entry point for callers that
//! hold a view without running an engine.
use std::sync::Arc;

use match_core::{MatchId, MatchView, Move, PlayerId, TurnId};
use tracing::{info, warn};

use crate::api::MatchApi;
use crate::auth::AuthContext;
use crate::error::{SubmissionError, SyncError, ValidationError};

#[derive(Clone)]
pub struct TurnSubmitter {
    api: Arc<dyn MatchApi>,
}

impl TurnSubmitter {
    pub fn new(api: Arc<dyn MatchApi>) -> Self {
        Self { api }
    }

    /// Local preconditions for playing `turn_id` as `player`.
    ///
    /// The turn must be the view's current turn, which also rules out ended
    /// matches. If the turn's contents are known, `player` must not appear
    /// in it yet; a turn announced but not fetched is allowed through and
    /// left to the server to judge.
    pub fn check(
        view: &MatchView,
        turn_id: &TurnId,
        player: &PlayerId,
    ) -> Result<(), ValidationError> {
        if view.is_ended() || view.current_turn_id.as_ref() != Some(turn_id) {
            return Err(ValidationError::NoActiveTurn);
        }

        if view
            .turn(turn_id)
            .is_some_and(|turn| turn.has_moved(player))
        {
            return Err(ValidationError::AlreadySubmitted {
                turn: turn_id.clone(),
            });
        }

        Ok(())
    }

    /// Sends the move without re-checking preconditions.
    ///
    /// On success the response is the new authoritative view. Never retried.
    pub async fn send(
        &self,
        match_id: &MatchId,
        turn_id: &TurnId,
        choice: Move,
        auth: &AuthContext,
    ) -> Result<MatchView, SubmissionError> {
        info!(%match_id, %turn_id, %choice, "submitting move");

        self.api
            .play_turn(match_id, turn_id, choice, &auth.credential)
            .await
            .map_err(|e| {
                let error = SubmissionError::from(e);
                warn!(%match_id, %turn_id, "move rejected: {}", error);
                error
            })
    }

    /// Validates against `view`, then sends. No in-flight tracking: two
    /// concurrent calls with the same stale view both reach the server.
    pub async fn submit(
        &self,
        view: &MatchView,
        turn_id: &TurnId,
        choice: Move,
        auth: &AuthContext,
    ) -> Result<MatchView, SyncError> {
        Self::check(view, turn_id, &auth.player)?;
        Ok(self.send(&view.match_id, turn_id, choice, auth).await?)
    }
}
