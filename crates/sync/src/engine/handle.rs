//! Cloneable façade for driving the engine worker.
use match_core::{MatchId, MatchView, Move, TurnId};
use tokio::sync::{mpsc, oneshot, watch};

use super::state::SyncState;
use crate::error::{Result, SyncError};

/// Commands processed by the engine worker.
pub enum Command {
    /// Play `choice` in `turn_id`, or in the current turn when `None`.
    Submit {
        turn_id: Option<TurnId>,
        choice: Move,
        reply: oneshot::Sender<Result<MatchView>>,
    },
    /// Request a reconciliation fetch.
    Reload,
    /// Tear down the current match and open another.
    SwitchMatch { match_id: MatchId },
    /// Tear down and stop the worker.
    Shutdown,
}

#[derive(Clone)]
pub struct SyncHandle {
    command_tx: mpsc::Sender<Command>,
    state_rx: watch::Receiver<SyncState>,
}

impl SyncHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<Command>,
        state_rx: watch::Receiver<SyncState>,
    ) -> Self {
        Self {
            command_tx,
            state_rx,
        }
    }

    /// Plays `choice` in `turn_id` and returns the server's updated match.
    pub async fn submit(&self, turn_id: TurnId, choice: Move) -> Result<MatchView> {
        self.request_submit(Some(turn_id), choice).await
    }

    /// Plays `choice` in whatever turn is current when the worker receives
    /// the command.
    pub async fn submit_current(&self, choice: Move) -> Result<MatchView> {
        self.request_submit(None, choice).await
    }

    async fn request_submit(&self, turn_id: Option<TurnId>, choice: Move) -> Result<MatchView> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.send(Command::Submit {
            turn_id,
            choice,
            reply: reply_tx,
        })
        .await?;

        reply_rx.await.map_err(|_| SyncError::Closed)?
    }

    /// Re-fetch the match (user-driven retry after a failed load).
    pub async fn reload(&self) -> Result<()> {
        self.send(Command::Reload).await
    }

    pub async fn switch_match(&self, match_id: MatchId) -> Result<()> {
        self.send(Command::SwitchMatch { match_id }).await
    }

    /// Latest published state.
    pub fn state(&self) -> SyncState {
        self.state_rx.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state_rx.clone()
    }

    pub(crate) async fn send(&self, command: Command) -> Result<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| SyncError::Closed)
    }
}
