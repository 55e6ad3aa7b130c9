//! Pure mapping from (view, event) to (view', directive).
//!
//! # Design Principles
//!
//! - **Stateless**: [`EventReducer`] holds no data and performs no I/O
//! - **Notification-only**: events never write score-bearing fields
//!   (`turns`, win tallies); when those may have changed the reducer asks for
//!   an authoritative re-fetch instead
//! - **Targeted updates**: only `status`, `current_turn_id` and player slots
//!   are touched, so a later wholesale replace cannot be partially undone
use tracing::{debug, trace};

use crate::event::MatchEvent;
use crate::view::{MatchStatus, MatchView, Seat};

/// Follow-up work requested by the reducer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Directive {
    /// Fetch the full match and replace the view with the result.
    Refetch,
}

pub struct EventReducer;

impl EventReducer {
    /// Applies one event.
    ///
    /// | Event               | State effect                               | Directive |
    /// |---------------------|--------------------------------------------|-----------|
    /// | `NEW_TURN`          | `in_progress`, `current_turn_id` = turn    | none*     |
    /// | `PLAYER_MOVED`      | none                                       | none      |
    /// | `TURN_ENDED`        | none                                       | refetch   |
    /// | `MATCH_ENDED`       | `ended`, `current_turn_id` cleared         | refetch   |
    /// | `PLAYER1/2_JOIN`    | player slot when the payload names one     | none      |
    /// | unrecognized        | none                                       | none      |
    ///
    /// \* a `NEW_TURN` without a turn id cannot name the current turn, so it
    /// requests a refetch. `NEW_TURN` after the match ended is ignored.
    pub fn reduce(mut view: MatchView, event: &MatchEvent) -> (MatchView, Option<Directive>) {
        let directive = match event {
            MatchEvent::NewTurn(payload) => {
                if view.is_ended() {
                    debug!(match_id = %view.match_id, "ignoring NEW_TURN after match end");
                    return (view, None);
                }
                view.status = MatchStatus::InProgress;
                match &payload.turn_id {
                    Some(turn_id) => {
                        view.current_turn_id = Some(turn_id.clone());
                        None
                    }
                    None => Some(Directive::Refetch),
                }
            }
            MatchEvent::PlayerMoved(payload) => {
                trace!(player = ?payload.player_id, "player moved");
                None
            }
            MatchEvent::TurnEnded(_) => Some(Directive::Refetch),
            MatchEvent::MatchEnded(_) => {
                view.status = MatchStatus::Ended;
                view.current_turn_id = None;
                Some(Directive::Refetch)
            }
            MatchEvent::PlayerJoined { seat, payload } => {
                if let Some(player) = &payload.player_id {
                    match seat {
                        Seat::One => view.player1 = Some(player.clone()),
                        Seat::Two => view.player2 = Some(player.clone()),
                    }
                }
                None
            }
            MatchEvent::Unrecognized { kind } => {
                debug!(kind = %kind, "ignoring unrecognized event");
                None
            }
        };

        (view, directive)
    }
}
