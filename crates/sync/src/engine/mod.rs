//! Match view orchestrator.
//!
//! The engine owns a background [`SyncWorker`](worker::SyncWorker) and
//! exposes it through a builder-based API. [`SyncHandle`] is the cloneable
//! façade views use to submit moves and observe [`SyncState`].
//!
//! # Lifecycle
//!
//! 1. `open` spawns the worker, which fetches the match and opens the event
//!    stream concurrently
//! 2. Events are reduced in delivery order; reconciliation fetches are
//!    coalesced so at most one is outstanding
//! 3. Every authoritative snapshot (fetch or move response) replaces the view
//!    wholesale, unless a newer one already landed
//! 4. `switch_match`, `shutdown` or dropping the engine tears everything down;
//!    requests still in flight at that point never touch the state again

mod handle;
mod sequence;
mod state;
mod worker;

pub use handle::SyncHandle;
pub use sequence::SnapshotSequencer;
pub use state::SyncState;

use std::sync::Arc;

use match_core::MatchId;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::api::{EventTransport, HttpMatchApi, MatchApi};
use crate::auth::AuthContext;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::stream::StreamConnection;
use handle::Command;
use worker::SyncWorker;

/// A running match view.
///
/// Design: the engine owns the worker task; [`SyncHandle`] can be cloned
/// freely and outlive it (its calls then fail with [`SyncError::Closed`]).
pub struct SyncEngine {
    handle: SyncHandle,
    worker: Option<JoinHandle<()>>,
}

impl SyncEngine {
    pub fn builder() -> SyncEngineBuilder {
        SyncEngineBuilder::new()
    }

    pub fn handle(&self) -> SyncHandle {
        self.handle.clone()
    }

    /// Closes the stream, voids outstanding requests and waits for the
    /// worker to stop.
    pub async fn shutdown(mut self) -> Result<()> {
        let _ = self.handle.send(Command::Shutdown).await;

        if let Some(worker) = self.worker.take() {
            worker.await.map_err(|_| SyncError::Closed)?;
        }
        Ok(())
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

/// Builder for [`SyncEngine`].
pub struct SyncEngineBuilder {
    config: SyncConfig,
    api: Option<Arc<dyn MatchApi>>,
    transport: Option<Arc<dyn EventTransport>>,
    auth: Option<AuthContext>,
}

impl SyncEngineBuilder {
    fn new() -> Self {
        Self {
            config: SyncConfig::default(),
            api: None,
            transport: None,
            auth: None,
        }
    }

    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn api(mut self, api: Arc<dyn MatchApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn EventTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Uses one [`HttpMatchApi`] built from the current config for both the
    /// request/response calls and the event stream.
    pub fn http(self) -> Self {
        let http = Arc::new(HttpMatchApi::new(&self.config));
        self.api(http.clone()).transport(http)
    }

    pub fn auth(mut self, auth: AuthContext) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Spawns the worker for `match_id`. Must be called within a Tokio
    /// runtime.
    pub fn open(self, match_id: impl Into<MatchId>) -> Result<SyncEngine> {
        let api = self.api.ok_or(SyncError::MissingComponent("match api"))?;
        let transport = self
            .transport
            .ok_or(SyncError::MissingComponent("event transport"))?;
        let auth = self
            .auth
            .ok_or(SyncError::MissingComponent("auth context"))?;
        let match_id = match_id.into();

        let (command_tx, command_rx) = mpsc::channel(self.config.command_buffer);
        let (state_tx, state_rx) = watch::channel(SyncState::for_match(match_id.clone()));

        let stream = StreamConnection::new(transport, &self.config);
        let worker = SyncWorker::new(api, stream, auth, match_id, command_rx, state_tx);

        Ok(SyncEngine {
            handle: SyncHandle::new(command_tx, state_rx),
            worker: Some(tokio::spawn(worker.run())),
        })
    }
}
