//! Adapters for the match server's external interfaces.
//!
//! The engine only talks to the server through [`MatchApi`] (request/response
//! calls) and [`EventTransport`] (the persistent server-push subscription).
//! [`HttpMatchApi`] implements both over HTTP; tests substitute in-memory
//! implementations.

pub mod http;
pub mod sse;

use async_trait::async_trait;
use match_core::{MatchId, MatchView, Move, TurnId};
use thiserror::Error;

use crate::auth::Credential;

pub use http::HttpMatchApi;
pub use sse::SseDecoder;

/// Failures of a single call to the match server.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to match server failed")]
    Network(#[from] reqwest::Error),

    /// Non-success status. `message` is the `{message}` field of the body
    /// when the server supplied one.
    #[error("match server responded with status {status}")]
    Status { status: u16, message: Option<String> },

    #[error("invalid response body from match server")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Transport(String),
}

/// Request/response calls against the server of record.
#[async_trait]
pub trait MatchApi: Send + Sync {
    /// `GET /matches/{id}`: the full authoritative match.
    async fn fetch_match(
        &self,
        match_id: &MatchId,
        credential: &Credential,
    ) -> Result<MatchView, ApiError>;

    /// `POST /matches/{id}/turns/{turnId}` with `{move}`: the updated match.
    async fn play_turn(
        &self,
        match_id: &MatchId,
        turn_id: &TurnId,
        choice: Move,
        credential: &Credential,
    ) -> Result<MatchView, ApiError>;
}

/// Opens the server-push subscription for one match.
#[async_trait]
pub trait EventTransport: Send + Sync {
    /// `GET /matches/{id}/subscribe`. The credential is supplied once, when
    /// the connection is established.
    async fn subscribe(
        &self,
        match_id: &MatchId,
        credential: &Credential,
    ) -> Result<Box<dyn EventSource>, ApiError>;
}

/// One live subscription. Dropping it closes the underlying connection.
#[async_trait]
pub trait EventSource: Send {
    /// Next raw event payload, in transport order.
    ///
    /// `None` means the server closed the stream.
    async fn next_frame(&mut self) -> Option<Result<String, ApiError>>;
}
