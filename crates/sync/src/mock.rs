//! In-memory match server for tests.
//!
//! [`MockMatchApi`] answers fetches from a stored snapshot, or parks them
//! until the test resolves them in a chosen order. [`MockTransport`] hands
//! out scripted subscriptions and tracks how many are live at once.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use match_core::{MatchId, MatchView, Move, MoveEntry, TurnId};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::api::{ApiError, EventSource, EventTransport, MatchApi};
use crate::auth::Credential;

type Reply = Result<MatchView, ApiError>;

pub struct MockMatchApi {
    snapshot: Mutex<Option<MatchView>>,
    gated: AtomicBool,
    parked: Mutex<VecDeque<oneshot::Sender<Reply>>>,
    play_replies: Mutex<VecDeque<Reply>>,
    play_delay: Mutex<Option<Duration>>,
    fetch_calls: AtomicUsize,
    play_calls: AtomicUsize,
}

impl MockMatchApi {
    pub fn new(snapshot: MatchView) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
            gated: AtomicBool::new(false),
            parked: Mutex::new(VecDeque::new()),
            play_replies: Mutex::new(VecDeque::new()),
            play_delay: Mutex::new(None),
            fetch_calls: AtomicUsize::new(0),
            play_calls: AtomicUsize::new(0),
        }
    }

    /// Park every fetch until [`resolve_fetch`](Self::resolve_fetch).
    pub fn gated(snapshot: MatchView) -> Self {
        let api = Self::new(snapshot);
        api.gated.store(true, Ordering::SeqCst);
        api
    }

    pub fn set_snapshot(&self, snapshot: MatchView) {
        *self.snapshot.lock().unwrap() = Some(snapshot);
    }

    /// Holds every `play_turn` for `delay` before answering.
    pub fn set_play_delay(&self, delay: Duration) {
        *self.play_delay.lock().unwrap() = Some(delay);
    }

    pub fn push_play_reply(&self, reply: Reply) {
        self.play_replies.lock().unwrap().push_back(reply);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn play_calls(&self) -> usize {
        self.play_calls.load(Ordering::SeqCst)
    }

    pub fn parked(&self) -> usize {
        self.parked.lock().unwrap().len()
    }

    /// Yields until at least `count` fetches are parked.
    pub async fn wait_parked(&self, count: usize) {
        while self.parked() < count {
            tokio::task::yield_now().await;
        }
    }

    /// Completes the parked fetch at `index` (0 = oldest still parked).
    pub fn resolve_fetch(&self, index: usize, reply: Reply) {
        let sender = self
            .parked
            .lock()
            .unwrap()
            .remove(index)
            .expect("no parked fetch at index");
        let _ = sender.send(reply);
    }
}

#[async_trait]
impl MatchApi for MockMatchApi {
    async fn fetch_match(&self, match_id: &MatchId, _: &Credential) -> Reply {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        if self.gated.load(Ordering::SeqCst) {
            let (tx, rx) = oneshot::channel();
            self.parked.lock().unwrap().push_back(tx);
            return rx
                .await
                .unwrap_or_else(|_| Err(ApiError::Transport("fetch dropped".into())));
        }

        self.snapshot
            .lock()
            .unwrap()
            .clone()
            .filter(|view| &view.match_id == match_id)
            .ok_or(ApiError::Status {
                status: 404,
                message: Some("Match not found".into()),
            })
    }

    /// Without a scripted reply, records the move into the stored snapshot
    /// and returns it. The credential token doubles as the player name.
    async fn play_turn(
        &self,
        _: &MatchId,
        turn_id: &TurnId,
        choice: Move,
        credential: &Credential,
    ) -> Reply {
        self.play_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.play_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(reply) = self.play_replies.lock().unwrap().pop_front() {
            return reply;
        }

        let mut guard = self.snapshot.lock().unwrap();
        let view = guard.as_mut().ok_or(ApiError::Status {
            status: 404,
            message: Some("Match not found".into()),
        })?;
        let turn = view
            .turns
            .iter_mut()
            .find(|turn| &turn.id == turn_id)
            .ok_or(ApiError::Status {
                status: 400,
                message: Some("Turn not found".into()),
            })?;
        turn.record_move(MoveEntry::new(credential.expose(), choice))
            .map_err(|e| ApiError::Status {
                status: 409,
                message: Some(e.to_string()),
            })?;
        Ok(view.clone())
    }
}

/// How a scripted subscription behaves.
pub enum Session {
    /// `subscribe` fails.
    Refuse,
    /// Delivers the frames, then stays open for [`MockTransport::push`].
    Open(Vec<String>),
    /// Delivers the frames, then fails.
    Fail(Vec<String>),
    /// Delivers the frames, then the server closes the stream.
    Close(Vec<String>),
}

#[derive(Default)]
pub struct MockTransport {
    scripts: Mutex<VecDeque<Session>>,
    current: Mutex<Option<mpsc::UnboundedSender<Result<String, ApiError>>>>,
    attempts: Mutex<Vec<Instant>>,
    live: Arc<AtomicUsize>,
    max_live: Arc<AtomicUsize>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(sessions: impl IntoIterator<Item = Session>) -> Self {
        let transport = Self::new();
        transport.scripts.lock().unwrap().extend(sessions);
        transport
    }

    /// Sends a frame on the most recent subscription.
    pub fn push(&self, frame: impl Into<String>) {
        if let Some(tx) = self.current.lock().unwrap().as_ref() {
            let _ = tx.send(Ok(frame.into()));
        }
    }

    /// Fails the most recent subscription.
    pub fn fail(&self) {
        if let Some(tx) = self.current.lock().unwrap().take() {
            let _ = tx.send(Err(ApiError::Transport("connection reset".into())));
        }
    }

    /// When each `subscribe` call happened.
    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventTransport for MockTransport {
    async fn subscribe(
        &self,
        _: &MatchId,
        _: &Credential,
    ) -> Result<Box<dyn EventSource>, ApiError> {
        self.attempts.lock().unwrap().push(Instant::now());

        let session = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Session::Open(Vec::new()));

        let (tx, rx) = mpsc::unbounded_channel();
        let (frames, tail) = match session {
            Session::Refuse => return Err(ApiError::Transport("connection refused".into())),
            Session::Open(frames) => (frames, None),
            Session::Fail(frames) => (
                frames,
                Some(Err(ApiError::Transport("connection reset".into()))),
            ),
            Session::Close(frames) => (frames, Some(Ok(()))),
        };

        for frame in frames {
            let _ = tx.send(Ok(frame));
        }
        match tail {
            None => *self.current.lock().unwrap() = Some(tx),
            Some(Err(error)) => {
                let _ = tx.send(Err(error));
            }
            Some(Ok(())) => drop(tx),
        }

        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);

        Ok(Box::new(MockSource {
            rx,
            live: self.live.clone(),
        }))
    }
}

struct MockSource {
    rx: mpsc::UnboundedReceiver<Result<String, ApiError>>,
    live: Arc<AtomicUsize>,
}

#[async_trait]
impl EventSource for MockSource {
    async fn next_frame(&mut self) -> Option<Result<String, ApiError>> {
        self.rx.recv().await
    }
}

impl Drop for MockSource {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Encodes an event frame the way the server does.
pub fn frame(kind: &str, payload: serde_json::Value) -> String {
    serde_json::json!({ "type": kind, "payload": payload }).to_string()
}
