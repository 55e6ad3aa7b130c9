//! The client's reconstruction of a match.
//!
//! A [`MatchView`] is created from an authoritative fetch, adjusted in place by
//! the event reducer for notification-only effects, and replaced wholesale by
//! every later fetch or submission response.
use serde::{Deserialize, Deserializer, Serialize};

use crate::ids::{MatchId, PlayerId, TurnId};
use crate::turn::Turn;

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchStatus {
    /// Waiting for the second player to join.
    #[default]
    Waiting,
    InProgress,
    /// Terminal. No further turns are accepted.
    Ended,
}

/// Which participant slot a player occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
pub enum Seat {
    #[strum(serialize = "player 1")]
    One,
    #[strum(serialize = "player 2")]
    Two,
}

/// Snapshot of one match as seen by this client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchView {
    #[serde(alias = "_id")]
    pub match_id: MatchId,
    #[serde(alias = "user1", default, deserialize_with = "player_ref")]
    pub player1: Option<PlayerId>,
    #[serde(alias = "user2", default, deserialize_with = "player_ref")]
    pub player2: Option<PlayerId>,
    /// Chronological order.
    #[serde(default)]
    pub turns: Vec<Turn>,
    #[serde(default)]
    pub current_turn_id: Option<TurnId>,
    #[serde(default)]
    pub player1_wins: u32,
    #[serde(default)]
    pub player2_wins: u32,
    #[serde(default)]
    pub status: MatchStatus,
}

/// Participants arrive either as a bare identifier or as a populated user
/// document carrying a `username`.
#[derive(Deserialize)]
#[serde(untagged)]
enum PlayerRef {
    Id(PlayerId),
    Document { username: PlayerId },
}

fn player_ref<'de, D>(deserializer: D) -> Result<Option<PlayerId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<PlayerRef>::deserialize(deserializer)?.map(|player| match player {
            PlayerRef::Id(id) | PlayerRef::Document { username: id } => id,
        }),
    )
}

/// A violated data-model rule found by [`MatchView::check_invariants`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A player appears twice, or the turn holds too many moves.
    MalformedTurn(TurnId),
    DuplicateTurn(TurnId),
    /// `current_turn_id` names a turn missing from `turns`.
    UnknownCurrentTurn(TurnId),
    /// The match ended but still names a current turn.
    TurnOpenAfterEnd(TurnId),
}

impl MatchView {
    /// A freshly created match with no opponent and no turns.
    pub fn new(match_id: impl Into<MatchId>, player1: impl Into<PlayerId>) -> Self {
        Self {
            match_id: match_id.into(),
            player1: Some(player1.into()),
            player2: None,
            turns: Vec::new(),
            current_turn_id: None,
            player1_wins: 0,
            player2_wins: 0,
            status: MatchStatus::Waiting,
        }
    }

    /// Whether the match reached its terminal status.
    pub fn is_ended(&self) -> bool {
        self.status == MatchStatus::Ended
    }

    /// Looks up a known turn by id.
    pub fn turn(&self, id: &TurnId) -> Option<&Turn> {
        self.turns.iter().find(|turn| &turn.id == id)
    }

    /// The turn currently accepting moves, if it has been fetched.
    ///
    /// Returns `None` both when there is no active turn and when the active
    /// turn was announced by an event but its contents are not known yet.
    pub fn current_turn(&self) -> Option<&Turn> {
        self.current_turn_id.as_ref().and_then(|id| self.turn(id))
    }

    /// The seat `player` occupies, or `None` for a spectator.
    pub fn seat_of(&self, player: &PlayerId) -> Option<Seat> {
        if self.player1.as_ref() == Some(player) {
            Some(Seat::One)
        } else if self.player2.as_ref() == Some(player) {
            Some(Seat::Two)
        } else {
            None
        }
    }

    /// Who sits in `seat`, if anyone has joined it.
    pub fn player(&self, seat: Seat) -> Option<&PlayerId> {
        match seat {
            Seat::One => self.player1.as_ref(),
            Seat::Two => self.player2.as_ref(),
        }
    }

    /// Turns won by `seat`, as last reported by the server.
    pub fn wins(&self, seat: Seat) -> u32 {
        match seat {
            Seat::One => self.player1_wins,
            Seat::Two => self.player2_wins,
        }
    }

    /// Reports every data-model rule an authoritative snapshot breaks.
    ///
    /// A current turn that is not in `turns` is only legal transiently, after
    /// a `NEW_TURN` notification and before reconciliation, so it is reported
    /// here as well.
    pub fn check_invariants(&self) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();

        for (idx, turn) in self.turns.iter().enumerate() {
            if !turn.is_well_formed() {
                violations.push(InvariantViolation::MalformedTurn(turn.id.clone()));
            }
            if self.turns[..idx].iter().any(|earlier| earlier.id == turn.id) {
                violations.push(InvariantViolation::DuplicateTurn(turn.id.clone()));
            }
        }

        if let Some(current) = &self.current_turn_id {
            if self.is_ended() {
                violations.push(InvariantViolation::TurnOpenAfterEnd(current.clone()));
            } else if self.turn(current).is_none() {
                violations.push(InvariantViolation::UnknownCurrentTurn(current.clone()));
            }
        }

        violations
    }
}
