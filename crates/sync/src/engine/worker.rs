//! Engine worker that owns the match view.
//!
//! All state changes happen on this one task: event reduction, snapshot
//! application and teardown are serialized through its select loop, so no
//! two writers ever interleave on the view.
use std::collections::HashSet;
use std::sync::Arc;

use match_core::{Directive, EventReducer, MatchEvent, MatchId, MatchView, Move, TurnId};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::handle::Command;
use super::sequence::SnapshotSequencer;
use super::state::SyncState;
use crate::api::{ApiError, MatchApi};
use crate::auth::AuthContext;
use crate::error::{Result, SubmissionError, SyncError, ValidationError};
use crate::stream::{StreamConnection, StreamMessage};
use crate::submitter::TurnSubmitter;

/// Result of a background request, delivered back to the worker.
///
/// Each request carries the token of the session that started it. A request
/// still running at teardown resolves as [`Completion::Cancelled`]; one that
/// finished just before is recognised by its cancelled token.
enum Completion {
    Fetch {
        seq: u64,
        token: CancellationToken,
        result: std::result::Result<MatchView, ApiError>,
    },
    Submit {
        seq: u64,
        token: CancellationToken,
        turn_id: TurnId,
        result: std::result::Result<MatchView, SubmissionError>,
        reply: oneshot::Sender<Result<MatchView>>,
    },
    Cancelled,
}

pub struct SyncWorker {
    api: Arc<dyn MatchApi>,
    submitter: TurnSubmitter,
    stream: StreamConnection,
    auth: AuthContext,

    command_rx: mpsc::Receiver<Command>,
    stream_rx: Option<mpsc::Receiver<StreamMessage>>,
    state_tx: watch::Sender<SyncState>,
    state: SyncState,

    tasks: JoinSet<Completion>,
    session: CancellationToken,
    sequencer: SnapshotSequencer,
    fetch_in_flight: bool,
    refetch_pending: bool,
    submitting: HashSet<TurnId>,
    connected_once: bool,
}

impl SyncWorker {
    pub fn new(
        api: Arc<dyn MatchApi>,
        stream: StreamConnection,
        auth: AuthContext,
        match_id: MatchId,
        command_rx: mpsc::Receiver<Command>,
        state_tx: watch::Sender<SyncState>,
    ) -> Self {
        Self {
            submitter: TurnSubmitter::new(api.clone()),
            api,
            stream,
            auth,
            command_rx,
            stream_rx: None,
            state_tx,
            state: SyncState::for_match(match_id),
            tasks: JoinSet::new(),
            session: CancellationToken::new(),
            sequencer: SnapshotSequencer::new(),
            fetch_in_flight: false,
            refetch_pending: false,
            submitting: HashSet::new(),
            connected_once: false,
        }
    }

    /// Main worker loop. Returns after [`Command::Shutdown`] or once every
    /// handle is gone.
    pub async fn run(mut self) {
        self.start_session().await;

        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                message = next_message(&mut self.stream_rx) => match message {
                    Some(message) => self.handle_stream(message),
                    None => self.stream_rx = None,
                },
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    self.handle_joined(joined);
                }
            }
        }

        self.teardown().await;
        info!("sync worker stopped");
    }

    async fn start_session(&mut self) {
        let Some(match_id) = self.state.match_id.clone() else {
            return;
        };
        info!(%match_id, player = %self.auth.player, "opening match view");

        self.request_refetch();
        self.stream_rx = Some(
            self.stream
                .open(match_id, self.auth.credential.clone())
                .await,
        );
        self.publish();
    }

    /// Closes the stream and voids every outstanding request. The published
    /// state is left as it was; nothing lands in it afterwards.
    async fn teardown(&mut self) {
        self.session.cancel();
        self.session = CancellationToken::new();
        self.tasks.abort_all();

        self.stream.close().await;
        self.stream_rx = None;

        self.fetch_in_flight = false;
        self.refetch_pending = false;
        self.submitting.clear();
        self.connected_once = false;

        if let Some(match_id) = &self.state.match_id {
            debug!(%match_id, "match view torn down");
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Submit {
                turn_id,
                choice,
                reply,
            } => self.submit(turn_id, choice, reply),
            Command::Reload => self.request_refetch(),
            Command::SwitchMatch { match_id } => {
                self.teardown().await;
                self.state = SyncState::for_match(match_id);
                self.start_session().await;
            }
            Command::Shutdown => {}
        }
    }

    fn handle_stream(&mut self, message: StreamMessage) {
        match message {
            StreamMessage::Event(event) => self.handle_event(event),
            StreamMessage::State(connection) => {
                if connection.is_open() {
                    if self.connected_once {
                        info!("event stream reopened, reconciling");
                        self.request_refetch();
                    }
                    self.connected_once = true;
                    self.state.connection_error = None;
                }
                self.state.connection = connection;
                self.publish();
            }
            StreamMessage::Disconnected { reason, .. } => {
                self.state.connection_error = Some(SyncError::Connection(reason).to_string());
                self.publish();
            }
        }
    }

    fn handle_event(&mut self, event: MatchEvent) {
        self.state.last_event = Some(event.label().to_string());

        let directive = match self.state.view.take() {
            Some(view) => {
                let (view, directive) = EventReducer::reduce(view, &event);
                self.state.view = Some(view);
                directive
            }
            None => {
                debug!(kind = event.label(), "event before initial snapshot");
                Some(Directive::Refetch)
            }
        };

        if directive == Some(Directive::Refetch) {
            self.request_refetch();
        }
        self.publish();
    }

    /// Starts a fetch, or marks one as owed if a fetch is already running.
    /// At most one fetch is ever outstanding per session.
    fn request_refetch(&mut self) {
        if self.fetch_in_flight {
            self.refetch_pending = true;
            return;
        }
        let Some(match_id) = self.state.match_id.clone() else {
            return;
        };

        self.fetch_in_flight = true;
        self.state.loading = true;

        let seq = self.sequencer.issue();
        let token = self.session.clone();
        let api = self.api.clone();
        let credential = self.auth.credential.clone();
        debug!(%match_id, seq, "fetching match");

        self.tasks.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => Completion::Cancelled,
                result = api.fetch_match(&match_id, &credential) => {
                    Completion::Fetch { seq, token, result }
                }
            }
        });
    }

    fn submit(
        &mut self,
        turn_id: Option<TurnId>,
        choice: Move,
        reply: oneshot::Sender<Result<MatchView>>,
    ) {
        let turn_id = match self.prepare_submit(turn_id) {
            Ok(turn_id) => turn_id,
            Err(e) => {
                debug!("move refused locally: {}", e);
                self.state.last_error = Some(e.to_string());
                self.publish();
                let _ = reply.send(Err(e.into()));
                return;
            }
        };
        let Some(match_id) = self.state.match_id.clone() else {
            let _ = reply.send(Err(SyncError::Closed));
            return;
        };

        self.submitting.insert(turn_id.clone());

        let seq = self.sequencer.issue();
        let token = self.session.clone();
        let submitter = self.submitter.clone();
        let auth = self.auth.clone();

        // Dropping `reply` on cancellation reports `SyncError::Closed`.
        self.tasks.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => Completion::Cancelled,
                result = submitter.send(&match_id, &turn_id, choice, &auth) => {
                    Completion::Submit {
                        seq,
                        token,
                        turn_id,
                        result,
                        reply,
                    }
                }
            }
        });
    }

    fn prepare_submit(
        &self,
        turn_id: Option<TurnId>,
    ) -> std::result::Result<TurnId, ValidationError> {
        let view = self
            .state
            .view
            .as_ref()
            .ok_or(ValidationError::NoActiveTurn)?;
        let turn_id = match turn_id {
            Some(turn_id) => turn_id,
            None => view
                .current_turn_id
                .clone()
                .ok_or(ValidationError::NoActiveTurn)?,
        };

        TurnSubmitter::check(view, &turn_id, &self.auth.player)?;

        if self.submitting.contains(&turn_id) {
            return Err(ValidationError::AlreadySubmitted { turn: turn_id });
        }
        Ok(turn_id)
    }

    fn handle_joined(&mut self, joined: std::result::Result<Completion, JoinError>) {
        match joined {
            Ok(completion) => self.handle_completion(completion),
            Err(e) if e.is_cancelled() => debug!("request cancelled"),
            Err(e) => error!("request task failed: {}", e),
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Cancelled => debug!("request cancelled with its session"),
            Completion::Fetch { token, .. } | Completion::Submit { token, .. }
                if token.is_cancelled() =>
            {
                debug!("dropping completion from a torn-down session");
            }
            Completion::Fetch { seq, result, .. } => {
                self.fetch_in_flight = false;
                self.state.loading = false;

                match result {
                    Ok(view) => self.apply_snapshot(seq, view),
                    Err(e) => {
                        error!("failed to load match: {:?}", e);
                        self.state.last_error = Some(SyncError::Fetch(e).display_message());
                    }
                }

                if std::mem::take(&mut self.refetch_pending) {
                    self.request_refetch();
                }
                self.publish();
            }
            Completion::Submit {
                seq,
                turn_id,
                result,
                reply,
                ..
            } => {
                self.submitting.remove(&turn_id);

                let outcome = match result {
                    Ok(view) => {
                        self.apply_snapshot(seq, view.clone());
                        Ok(view)
                    }
                    Err(e) => {
                        self.state.last_error = Some(e.to_string());
                        Err(e.into())
                    }
                };
                self.publish();
                let _ = reply.send(outcome);
            }
        }
    }

    /// Replaces the view wholesale, unless a newer snapshot already landed.
    fn apply_snapshot(&mut self, seq: u64, view: MatchView) {
        if self.state.match_id.as_ref() != Some(&view.match_id) {
            warn!(match_id = %view.match_id, "discarding snapshot for another match");
            return;
        }
        if !self.sequencer.accept(seq) {
            debug!(seq, last = self.sequencer.last_applied(), "discarding stale snapshot");
            return;
        }

        for violation in view.check_invariants() {
            warn!(match_id = %view.match_id, "snapshot violates {:?}", violation);
        }
        if let Some(previous) = &self.state.view {
            if view.player1_wins < previous.player1_wins
                || view.player2_wins < previous.player2_wins
            {
                warn!(
                    match_id = %view.match_id,
                    "win tally went backwards ({}-{} -> {}-{}), applying server state",
                    previous.player1_wins,
                    previous.player2_wins,
                    view.player1_wins,
                    view.player2_wins
                );
            }
        }

        debug!(match_id = %view.match_id, seq, status = %view.status, "snapshot applied");
        self.state.view = Some(view);
        self.state.last_error = None;
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }
}

async fn next_message(rx: &mut Option<mpsc::Receiver<StreamMessage>>) -> Option<StreamMessage> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
