use match_core::{MatchId, MatchView, TurnId};

use crate::stream::ConnectionState;

/// Everything a view needs to render one match.
///
/// Published by the engine worker after every change; readers always see a
/// complete snapshot, never a partially applied update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncState {
    pub match_id: Option<MatchId>,
    /// `None` until the first authoritative fetch lands.
    pub view: Option<MatchView>,
    pub connection: ConnectionState,
    /// Why the stream was last lost. Cleared once it reopens.
    pub connection_error: Option<String>,
    /// Wire name of the most recent event.
    pub last_event: Option<String>,
    /// Display-level message for the most recent failed operation.
    pub last_error: Option<String>,
    /// A fetch is outstanding.
    pub loading: bool,
}

impl SyncState {
    pub fn for_match(match_id: MatchId) -> Self {
        Self {
            match_id: Some(match_id),
            ..Self::default()
        }
    }

    pub fn current_turn_id(&self) -> Option<&TurnId> {
        self.view.as_ref()?.current_turn_id.as_ref()
    }

    pub fn is_ended(&self) -> bool {
        self.view.as_ref().is_some_and(MatchView::is_ended)
    }
}
