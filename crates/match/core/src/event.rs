//! Notifications pushed by the match server over the subscription stream.
//!
//! Frames arrive as `{ "type": ..., "payload": ... }`. Payloads are narrow
//! notifications, not entities, so every payload field is optional and the
//! reducer decides what (if anything) can be trusted from them.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::ids::{PlayerId, TurnId};
use crate::moves::TurnWinner;
use crate::view::Seat;

/// Wire names of the recognized event kinds.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    NewTurn,
    PlayerMoved,
    TurnEnded,
    MatchEnded,
    #[strum(serialize = "PLAYER1_JOIN")]
    Player1Join,
    #[strum(serialize = "PLAYER2_JOIN")]
    Player2Join,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTurnPayload {
    #[serde(default, alias = "turn", alias = "_id", alias = "id")]
    pub turn_id: Option<TurnId>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMovedPayload {
    #[serde(default, alias = "player", alias = "user")]
    pub player_id: Option<PlayerId>,
    #[serde(default, alias = "turn")]
    pub turn_id: Option<TurnId>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnEndedPayload {
    #[serde(default, alias = "turn")]
    pub turn_id: Option<TurnId>,
    #[serde(default)]
    pub winner: Option<TurnWinner>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEndedPayload {
    #[serde(default)]
    pub winner: Option<TurnWinner>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerJoinPayload {
    #[serde(default, alias = "user", alias = "username", alias = "player")]
    pub player_id: Option<PlayerId>,
}

/// A decoded server notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchEvent {
    NewTurn(NewTurnPayload),
    PlayerMoved(PlayerMovedPayload),
    TurnEnded(TurnEndedPayload),
    MatchEnded(MatchEndedPayload),
    PlayerJoined { seat: Seat, payload: PlayerJoinPayload },
    /// A type this client does not know. Carried through so the stream keeps
    /// strict delivery order; the reducer ignores it.
    Unrecognized { kind: String },
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("event frame is not valid JSON")]
    Json(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

impl MatchEvent {
    /// Decodes one `{type, payload}` frame.
    ///
    /// Unknown types decode successfully as [`MatchEvent::Unrecognized`]; a
    /// frame that is not an object with a `type` is an error.
    ///
    /// A recognized type always yields its event. A payload that does not
    /// fit is replaced by an empty one, so the event still reaches the
    /// reducer and any reconciliation it triggers still happens.
    pub fn decode(frame: &str) -> Result<Self, DecodeError> {
        let raw: RawFrame = serde_json::from_str(frame)?;

        let Ok(kind) = raw.kind.parse::<EventKind>() else {
            return Ok(MatchEvent::Unrecognized { kind: raw.kind });
        };

        let payload = match raw.payload {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };

        Ok(Self::from_payload(kind, payload).unwrap_or_else(|e| {
            warn!(%kind, "unreadable payload, decoding as empty: {}", e);
            Self::empty(kind)
        }))
    }

    fn empty(kind: EventKind) -> Self {
        match kind {
            EventKind::NewTurn => MatchEvent::NewTurn(NewTurnPayload::default()),
            EventKind::PlayerMoved => MatchEvent::PlayerMoved(PlayerMovedPayload::default()),
            EventKind::TurnEnded => MatchEvent::TurnEnded(TurnEndedPayload::default()),
            EventKind::MatchEnded => MatchEvent::MatchEnded(MatchEndedPayload::default()),
            EventKind::Player1Join => MatchEvent::PlayerJoined {
                seat: Seat::One,
                payload: PlayerJoinPayload::default(),
            },
            EventKind::Player2Join => MatchEvent::PlayerJoined {
                seat: Seat::Two,
                payload: PlayerJoinPayload::default(),
            },
        }
    }

    fn from_payload(kind: EventKind, payload: Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            EventKind::NewTurn => MatchEvent::NewTurn(serde_json::from_value(payload)?),
            EventKind::PlayerMoved => MatchEvent::PlayerMoved(serde_json::from_value(payload)?),
            EventKind::TurnEnded => MatchEvent::TurnEnded(serde_json::from_value(payload)?),
            EventKind::MatchEnded => MatchEvent::MatchEnded(serde_json::from_value(payload)?),
            EventKind::Player1Join => MatchEvent::PlayerJoined {
                seat: Seat::One,
                payload: serde_json::from_value(payload)?,
            },
            EventKind::Player2Join => MatchEvent::PlayerJoined {
                seat: Seat::Two,
                payload: serde_json::from_value(payload)?,
            },
        })
    }

    /// Wire name of this event, used for status display and logging.
    pub fn label(&self) -> &str {
        let kind = match self {
            MatchEvent::NewTurn(_) => EventKind::NewTurn,
            MatchEvent::PlayerMoved(_) => EventKind::PlayerMoved,
            MatchEvent::TurnEnded(_) => EventKind::TurnEnded,
            MatchEvent::MatchEnded(_) => EventKind::MatchEnded,
            MatchEvent::PlayerJoined { seat: Seat::One, .. } => EventKind::Player1Join,
            MatchEvent::PlayerJoined { seat: Seat::Two, .. } => EventKind::Player2Join,
            MatchEvent::Unrecognized { kind } => return kind,
        };
        kind.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_new_turn_with_turn_id() {
        let event = MatchEvent::decode(r#"{"type":"NEW_TURN","payload":{"turnId":"t3"}}"#).unwrap();
        assert_eq!(
            event,
            MatchEvent::NewTurn(NewTurnPayload {
                turn_id: Some("t3".into())
            })
        );
        assert_eq!(event.label(), "NEW_TURN");
    }

    #[test]
    fn missing_payload_is_empty() {
        let event = MatchEvent::decode(r#"{"type":"MATCH_ENDED"}"#).unwrap();
        assert_eq!(event, MatchEvent::MatchEnded(MatchEndedPayload::default()));

        let event = MatchEvent::decode(r#"{"type":"TURN_ENDED","payload":null}"#).unwrap();
        assert_eq!(event, MatchEvent::TurnEnded(TurnEndedPayload::default()));
    }

    #[test]
    fn join_events_map_to_seats() {
        let event =
            MatchEvent::decode(r#"{"type":"PLAYER2_JOIN","payload":{"user":"bob"}}"#).unwrap();
        assert_eq!(
            event,
            MatchEvent::PlayerJoined {
                seat: Seat::Two,
                payload: PlayerJoinPayload {
                    player_id: Some("bob".into())
                },
            }
        );
        assert_eq!(event.label(), "PLAYER2_JOIN");
    }

    #[test]
    fn unknown_type_is_carried_not_rejected() {
        let event = MatchEvent::decode(r#"{"type":"CHAT","payload":{"text":"gg"}}"#).unwrap();
        assert_eq!(
            event,
            MatchEvent::Unrecognized {
                kind: "CHAT".to_string()
            }
        );
        assert_eq!(event.label(), "CHAT");
    }

    #[test]
    fn rejects_non_frames() {
        assert!(matches!(
            MatchEvent::decode("not json"),
            Err(DecodeError::Json(_))
        ));
        assert!(matches!(
            MatchEvent::decode(r#"{"payload":{"turnId":"t1"}}"#),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn mistyped_payload_keeps_the_event_kind() {
        let event = MatchEvent::decode(r#"{"type":"TURN_ENDED","payload":{"turnId":7}}"#).unwrap();
        assert_eq!(event, MatchEvent::TurnEnded(TurnEndedPayload::default()));

        let event =
            MatchEvent::decode(r#"{"type":"MATCH_ENDED","payload":{"winner":{"username":"alice"}}}"#)
                .unwrap();
        assert_eq!(event, MatchEvent::MatchEnded(MatchEndedPayload::default()));

        let event = MatchEvent::decode(r#"{"type":"NEW_TURN","payload":"t1"}"#).unwrap();
        assert_eq!(event, MatchEvent::NewTurn(NewTurnPayload::default()));
    }
}
