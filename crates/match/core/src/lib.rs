//! Match model and event reducer for the rock-paper-scissors client.
//!
//! - [`view`] is the client's reconstruction of one match ([`MatchView`])
//! - [`turn`] and [`moves`] describe rounds and player choices
//! - [`event`] decodes server notifications into [`MatchEvent`]
//! - [`reducer`] folds events into a view and decides when the server must be
//!   asked for authoritative state
pub mod event;
pub mod ids;
pub mod moves;
pub mod reducer;
pub mod turn;
pub mod view;

pub use event::{DecodeError, EventKind, MatchEvent};
pub use ids::{MatchId, PlayerId, TurnId};
pub use moves::{Move, TurnWinner};
pub use reducer::{Directive, EventReducer};
pub use turn::{MAX_MOVES_PER_TURN, MoveEntry, Turn, TurnError};
pub use view::{InvariantViolation, MatchStatus, MatchView, Seat};
