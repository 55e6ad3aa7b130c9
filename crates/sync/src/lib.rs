//! Live synchronization of one rock-paper-scissors match.
//!
//! The server is the sole authority on match state. This crate keeps a local
//! view of it current:
//!
//! - [`StreamConnection`] supervises the server-push subscription and
//!   reconnects after failures
//! - [`SyncEngine`] reduces pushed events, runs reconciliation fetches and
//!   owns the lifecycle of everything it started
//! - [`TurnSubmitter`] guards and sends moves
//!
//! Consumers interact through a [`SyncHandle`] and observe [`SyncState`].
//!
//! ```rust,ignore
//! let engine = SyncEngine::builder()
//!     .config(SyncConfig::from_env())
//!     .http()
//!     .auth(AuthContext::new(Credential::new(token), "alice"))
//!     .open("6651f0c2")?;
//!
//! let handle = engine.handle();
//! handle.submit_current(Move::Rock).await?;
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod stream;
pub mod submitter;

#[cfg(test)]
pub mod mock;

pub use api::{ApiError, EventSource, EventTransport, HttpMatchApi, MatchApi, SseDecoder};
pub use auth::{AuthContext, Credential};
pub use config::SyncConfig;
pub use engine::{SnapshotSequencer, SyncEngine, SyncEngineBuilder, SyncHandle, SyncState};
pub use error::{Result, SubmissionError, SyncError, ValidationError};
pub use stream::{ConnectionState, ConnectionStatus, StreamConnection, StreamHandle, StreamMessage};
pub use submitter::TurnSubmitter;
