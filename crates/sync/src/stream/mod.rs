//! Supervised server-push subscription for a single match.
//!
//! [`StreamConnection`] owns at most one live subscription. Its read loop
//! reports everything it observes through one channel of [`StreamMessage`]s:
//! decoded events in delivery order, interleaved with connection-state
//! changes, so the consumer never has to poll the transport.

mod connection;

pub use connection::{StreamConnection, StreamHandle};

use std::time::Duration;

use match_core::MatchEvent;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Open,
    Closed,
}

/// Connection bookkeeping exposed to the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    /// Failed attempts since the last successful open.
    pub retry_count: u32,
}

impl ConnectionState {
    pub fn new(status: ConnectionStatus, retry_count: u32) -> Self {
        Self {
            status,
            retry_count,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == ConnectionStatus::Open
    }
}

/// Output of a stream read loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamMessage {
    Event(MatchEvent),
    State(ConnectionState),
    /// The subscription was lost; a new attempt follows after `retry_in`.
    Disconnected { reason: String, retry_in: Duration },
}
