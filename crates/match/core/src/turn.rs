//! A single round of a match.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{PlayerId, TurnId};
use crate::moves::{Move, TurnWinner};

/// Maximum number of moves a turn can hold (one per participant).
pub const MAX_MOVES_PER_TURN: usize = 2;

/// One player's recorded move.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveEntry {
    #[serde(alias = "user", alias = "player")]
    pub player_id: PlayerId,
    #[serde(rename = "move")]
    pub choice: Move,
}

impl MoveEntry {
    /// Entry for `player_id` playing `choice`.
    pub fn new(player_id: impl Into<PlayerId>, choice: Move) -> Self {
        Self {
            player_id: player_id.into(),
            choice,
        }
    }
}

/// Rejections produced by [`Turn::record_move`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    #[error("player {player} already moved in turn {turn}")]
    DuplicatePlayer { turn: TurnId, player: PlayerId },

    #[error("turn {turn} already holds the maximum number of moves")]
    Full { turn: TurnId },
}

/// One round: up to one move per participant and, once resolved, a winner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    #[serde(alias = "_id")]
    pub id: TurnId,
    #[serde(default)]
    pub moves: Vec<MoveEntry>,
    #[serde(default)]
    pub winner: Option<TurnWinner>,
}

impl Turn {
    /// An open turn with no moves yet.
    pub fn open(id: impl Into<TurnId>) -> Self {
        Self {
            id: id.into(),
            moves: Vec::new(),
            winner: None,
        }
    }

    /// The move `player` made in this turn, if any.
    pub fn move_of(&self, player: &PlayerId) -> Option<Move> {
        self.moves
            .iter()
            .find(|entry| &entry.player_id == player)
            .map(|entry| entry.choice)
    }

    /// Whether `player` already has an entry in this turn.
    pub fn has_moved(&self, player: &PlayerId) -> bool {
        self.move_of(player).is_some()
    }

    /// A turn is complete once the server has recorded its winner.
    pub fn is_complete(&self) -> bool {
        self.winner.is_some()
    }

    /// Records a move, refusing a second entry for the same player or a
    /// third entry overall. The turn is left untouched on error.
    pub fn record_move(&mut self, entry: MoveEntry) -> Result<(), TurnError> {
        if self.has_moved(&entry.player_id) {
            return Err(TurnError::DuplicatePlayer {
                turn: self.id.clone(),
                player: entry.player_id,
            });
        }
        if self.moves.len() >= MAX_MOVES_PER_TURN {
            return Err(TurnError::Full {
                turn: self.id.clone(),
            });
        }
        self.moves.push(entry);
        Ok(())
    }

    /// True when no player appears twice and the turn is within capacity.
    pub fn is_well_formed(&self) -> bool {
        if self.moves.len() > MAX_MOVES_PER_TURN {
            return false;
        }
        self.moves.iter().enumerate().all(|(idx, entry)| {
            self.moves[idx + 1..]
                .iter()
                .all(|other| other.player_id != entry.player_id)
        })
    }
}
