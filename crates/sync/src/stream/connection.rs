use std::sync::Arc;
use std::time::Duration;

use match_core::{MatchEvent, MatchId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{ConnectionState, ConnectionStatus, StreamMessage};
use crate::api::{EventSource, EventTransport};
use crate::auth::Credential;
use crate::config::SyncConfig;

/// Owner of the (at most one) live subscription.
///
/// Opening always tears down the previous subscription first, whether it was
/// for the same match or another one, so two read loops never run side by
/// side.
pub struct StreamConnection {
    transport: Arc<dyn EventTransport>,
    reconnect_delay: Duration,
    buffer: usize,
    active: Option<StreamHandle>,
}

impl StreamConnection {
    pub fn new(transport: Arc<dyn EventTransport>, config: &SyncConfig) -> Self {
        Self {
            transport,
            reconnect_delay: config.reconnect_delay,
            buffer: config.event_buffer,
            active: None,
        }
    }

    /// Starts the read loop for `match_id` and returns its output channel.
    ///
    /// The channel ends when the connection is closed or reopened.
    pub async fn open(
        &mut self,
        match_id: MatchId,
        credential: Credential,
    ) -> mpsc::Receiver<StreamMessage> {
        self.close().await;

        let (tx, rx) = mpsc::channel(self.buffer);
        let reader = StreamReader {
            transport: self.transport.clone(),
            match_id: match_id.clone(),
            credential,
            reconnect_delay: self.reconnect_delay,
            tx,
        };

        info!(%match_id, "opening event stream");
        let task = tokio::spawn(reader.run());
        self.active = Some(StreamHandle { match_id, task });

        rx
    }

    /// Stops the read loop, dropping the live subscription and any pending
    /// reconnect timer. Safe to call any number of times.
    pub async fn close(&mut self) {
        if let Some(handle) = self.active.take() {
            handle.close().await;
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn match_id(&self) -> Option<&MatchId> {
        self.active.as_ref().map(StreamHandle::match_id)
    }
}

/// Scoped ownership of one read loop.
///
/// Dropping the handle aborts the loop; [`StreamHandle::close`] additionally
/// waits until the subscription has actually been released.
pub struct StreamHandle {
    match_id: MatchId,
    task: JoinHandle<()>,
}

impl StreamHandle {
    pub fn match_id(&self) -> &MatchId {
        &self.match_id
    }

    pub async fn close(mut self) {
        self.task.abort();
        let _ = (&mut self.task).await;
        debug!(match_id = %self.match_id, "event stream closed");
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Consumer dropped its receiver; the loop has nobody to report to.
struct ConsumerGone;

struct StreamReader {
    transport: Arc<dyn EventTransport>,
    match_id: MatchId,
    credential: Credential,
    reconnect_delay: Duration,
    tx: mpsc::Sender<StreamMessage>,
}

impl StreamReader {
    async fn run(self) {
        let _ = self.read_loop().await;
        debug!(match_id = %self.match_id, "stream consumer gone, stopping");
    }

    async fn read_loop(&self) -> Result<(), ConsumerGone> {
        let mut retry_count = 0u32;

        loop {
            self.state(ConnectionStatus::Connecting, retry_count).await?;

            let reason = match self.transport.subscribe(&self.match_id, &self.credential).await {
                Ok(source) => {
                    retry_count = 0;
                    self.state(ConnectionStatus::Open, retry_count).await?;
                    self.forward(source).await?
                }
                Err(e) => e.to_string(),
            };

            retry_count = retry_count.saturating_add(1);
            warn!(
                match_id = %self.match_id,
                retry_count,
                "event stream lost: {}; reconnecting in {:?}",
                reason,
                self.reconnect_delay
            );

            self.state(ConnectionStatus::Closed, retry_count).await?;
            self.send(StreamMessage::Disconnected {
                reason,
                retry_in: self.reconnect_delay,
            })
            .await?;

            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    /// Pumps frames until the subscription ends and returns why it ended.
    /// The source is dropped (closing the connection) before returning.
    async fn forward(&self, mut source: Box<dyn EventSource>) -> Result<String, ConsumerGone> {
        loop {
            match source.next_frame().await {
                Some(Ok(frame)) => match MatchEvent::decode(&frame) {
                    Ok(event) => {
                        debug!(match_id = %self.match_id, kind = event.label(), "event received");
                        self.send(StreamMessage::Event(event)).await?;
                    }
                    Err(e) => warn!(match_id = %self.match_id, "skipping undecodable frame: {}", e),
                },
                Some(Err(e)) => return Ok(e.to_string()),
                None => return Ok("stream closed by server".to_string()),
            }
        }
    }

    async fn state(&self, status: ConnectionStatus, retry_count: u32) -> Result<(), ConsumerGone> {
        self.send(StreamMessage::State(ConnectionState::new(status, retry_count)))
            .await
    }

    async fn send(&self, message: StreamMessage) -> Result<(), ConsumerGone> {
        self.tx.send(message).await.map_err(|_| ConsumerGone)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::time::Instant;

    use super::*;
    use crate::mock::{MockTransport, Session, frame};

    fn connection(transport: Arc<MockTransport>) -> StreamConnection {
        StreamConnection::new(transport, &SyncConfig::default())
    }

    fn credential() -> Credential {
        Credential::new("alice")
    }

    fn state(status: ConnectionStatus, retry_count: u32) -> Option<StreamMessage> {
        Some(StreamMessage::State(ConnectionState::new(status, retry_count)))
    }

    async fn next_state(rx: &mut mpsc::Receiver<StreamMessage>) -> ConnectionState {
        loop {
            match rx.recv().await.expect("stream ended") {
                StreamMessage::State(state) => return state,
                _ => continue,
            }
        }
    }

    async fn wait_open(rx: &mut mpsc::Receiver<StreamMessage>) {
        while !next_state(rx).await.is_open() {}
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_after_exactly_one_delay() {
        let transport = Arc::new(MockTransport::script([Session::Fail(vec![])]));
        let mut conn = connection(transport.clone());
        let mut rx = conn.open("m1".into(), credential()).await;

        assert_eq!(rx.recv().await, state(ConnectionStatus::Connecting, 0));
        assert_eq!(rx.recv().await, state(ConnectionStatus::Open, 0));
        assert_eq!(rx.recv().await, state(ConnectionStatus::Closed, 1));
        match rx.recv().await {
            Some(StreamMessage::Disconnected { retry_in, .. }) => {
                assert_eq!(retry_in, Duration::from_secs(5))
            }
            other => panic!("expected disconnect, got {other:?}"),
        }
        assert_eq!(rx.recv().await, state(ConnectionStatus::Connecting, 1));
        assert_eq!(rx.recv().await, state(ConnectionStatus::Open, 0));

        let attempts = transport.attempts();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[1] - attempts[0], Duration::from_secs(5));
        assert_eq!(transport.max_live(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_count_grows_until_open() {
        let transport = Arc::new(MockTransport::script([Session::Refuse, Session::Refuse]));
        let mut conn = connection(transport.clone());
        let mut rx = conn.open("m1".into(), credential()).await;

        let mut states = Vec::new();
        loop {
            let state = next_state(&mut rx).await;
            states.push(state);
            if state.is_open() {
                break;
            }
        }

        use ConnectionStatus::*;
        assert_eq!(
            states,
            vec![
                ConnectionState::new(Connecting, 0),
                ConnectionState::new(Closed, 1),
                ConnectionState::new(Connecting, 1),
                ConnectionState::new(Closed, 2),
                ConnectionState::new(Connecting, 2),
                ConnectionState::new(Open, 0),
            ]
        );
        assert_eq!(transport.attempts().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_events_in_order_and_skips_garbage() {
        let transport = Arc::new(MockTransport::script([Session::Open(vec![
            frame("NEW_TURN", json!({ "turnId": "t1" })),
            "not json".to_string(),
            frame("PLAYER_MOVED", json!({ "playerId": "bob" })),
            frame("TURN_ENDED", json!({ "turnId": "t1" })),
        ])]));
        let mut conn = connection(transport.clone());
        let mut rx = conn.open("m1".into(), credential()).await;
        wait_open(&mut rx).await;
        transport.push(frame("MATCH_ENDED", json!({})));

        let mut labels = Vec::new();
        while labels.len() < 4 {
            if let Some(StreamMessage::Event(event)) = rx.recv().await {
                labels.push(event.label().to_string());
            }
        }
        assert_eq!(labels, ["NEW_TURN", "PLAYER_MOVED", "TURN_ENDED", "MATCH_ENDED"]);
    }

    #[tokio::test(start_paused = true)]
    async fn close_cancels_pending_reconnect() {
        let transport = Arc::new(MockTransport::script([Session::Refuse]));
        let mut conn = connection(transport.clone());
        let mut rx = conn.open("m1".into(), credential()).await;

        while !matches!(rx.recv().await, Some(StreamMessage::Disconnected { .. })) {}
        conn.close().await;
        conn.close().await;
        assert!(!conn.is_active());

        let before = Instant::now();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(Instant::now() - before, Duration::from_secs(60));

        assert_eq!(transport.attempts().len(), 1);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn reopening_releases_previous_connection_first() {
        let transport = Arc::new(MockTransport::new());
        let mut conn = connection(transport.clone());

        let mut first = conn.open("m1".into(), credential()).await;
        wait_open(&mut first).await;
        assert_eq!(transport.live(), 1);

        let mut second = conn.open("m2".into(), credential()).await;
        assert_eq!(transport.live(), 0);
        wait_open(&mut second).await;

        assert_eq!(transport.live(), 1);
        assert_eq!(transport.max_live(), 1);
        assert_eq!(conn.match_id(), Some(&MatchId::new("m2")));
        assert_eq!(first.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn server_close_triggers_reconnect() {
        let transport = Arc::new(MockTransport::script([Session::Close(vec![frame(
            "NEW_TURN",
            json!({ "turnId": "t1" }),
        )])]));
        let mut conn = connection(transport.clone());
        let mut rx = conn.open("m1".into(), credential()).await;

        let mut saw_event = false;
        loop {
            match rx.recv().await.expect("stream ended") {
                StreamMessage::Event(_) => saw_event = true,
                StreamMessage::Disconnected { reason, .. } => {
                    assert_eq!(reason, "stream closed by server");
                    break;
                }
                StreamMessage::State(_) => {}
            }
        }
        assert!(saw_event);
        assert_eq!(transport.live(), 0);

        wait_open(&mut rx).await;
        assert_eq!(transport.attempts().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn live_subscription_failure_reconnects() {
        let transport = Arc::new(MockTransport::new());
        let mut conn = connection(transport.clone());
        let mut rx = conn.open("m1".into(), credential()).await;
        wait_open(&mut rx).await;

        transport.fail();
        loop {
            match rx.recv().await.expect("stream ended") {
                StreamMessage::Disconnected { reason, retry_in } => {
                    assert!(reason.contains("connection reset"), "{reason}");
                    assert_eq!(retry_in, Duration::from_secs(5));
                    break;
                }
                StreamMessage::Event(event) => panic!("unexpected event {event:?}"),
                StreamMessage::State(_) => {}
            }
        }
        assert_eq!(transport.live(), 0);

        wait_open(&mut rx).await;
        assert_eq!(transport.attempts().len(), 2);
        assert_eq!(transport.max_live(), 1);
    }
}
