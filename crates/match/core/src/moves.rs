//! Player choices and turn outcomes.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::PlayerId;

/// A player's choice for one turn.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Move {
    Rock,
    Paper,
    Scissors,
}

/// Outcome of a completed turn as reported by the server.
///
/// The wire form is either a player identifier or the literal `"draw"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TurnWinner {
    Player(PlayerId),
    Draw,
}

const DRAW: &str = "draw";

impl TurnWinner {
    pub fn player(&self) -> Option<&PlayerId> {
        match self {
            TurnWinner::Player(player) => Some(player),
            TurnWinner::Draw => None,
        }
    }
}

impl From<String> for TurnWinner {
    fn from(value: String) -> Self {
        if value == DRAW {
            TurnWinner::Draw
        } else {
            TurnWinner::Player(PlayerId::from(value))
        }
    }
}

impl From<TurnWinner> for String {
    fn from(value: TurnWinner) -> Self {
        match value {
            TurnWinner::Player(player) => player.as_str().to_owned(),
            TurnWinner::Draw => DRAW.to_owned(),
        }
    }
}

impl fmt::Display for TurnWinner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnWinner::Player(player) => write!(f, "{player}"),
            TurnWinner::Draw => f.write_str(DRAW),
        }
    }
}
