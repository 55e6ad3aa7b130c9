//! Error taxonomy surfaced by the sync engine.
//!
//! Nothing here is fatal: every variant is a display-level condition and the
//! match view stays usable after it is reported.
use match_core::TurnId;
use thiserror::Error;

pub use crate::api::ApiError;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport failure on the event stream. Recovered by reconnecting.
    #[error("event stream connection failed: {0}")]
    Connection(String),

    /// Initial or reconciliation fetch failed. Retryable by reloading.
    #[error("failed to load match")]
    Fetch(#[source] ApiError),

    /// Local precondition failure; no network call was made.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The server refused or failed the move.
    #[error(transparent)]
    Submission(#[from] SubmissionError),

    /// The engine builder was not given a required collaborator.
    #[error("sync engine is missing its {0}")]
    MissingComponent(&'static str),

    /// The match view was closed before the operation completed.
    #[error("match view closed")]
    Closed,
}

impl SyncError {
    /// Text suitable for showing to the player.
    pub fn display_message(&self) -> String {
        match self {
            SyncError::Fetch(ApiError::Status {
                message: Some(message),
                ..
            }) => message.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no active turn")]
    NoActiveTurn,

    #[error("move already submitted for turn {turn}")]
    AlreadySubmitted { turn: TurnId },
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    /// Server-provided reason, shown verbatim.
    #[error("{0}")]
    Rejected(String),

    /// Non-success response without a readable reason.
    #[error("failed to play turn")]
    Failed,

    #[error("failed to play turn")]
    Transport(#[source] ApiError),
}

impl From<ApiError> for SubmissionError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Status {
                message: Some(message),
                ..
            } => SubmissionError::Rejected(message),
            ApiError::Status { message: None, .. } => SubmissionError::Failed,
            other => SubmissionError::Transport(other),
        }
    }
}
