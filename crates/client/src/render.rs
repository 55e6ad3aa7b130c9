//! Plain-text rendering of the synchronized match state.
use std::fmt::Write;

use match_core::{MatchStatus, MatchView, Move, PlayerId, Seat};
use match_sync::{ConnectionStatus, SyncState};
use strum::IntoEnumIterator;

/// Renders `state` from `me`'s point of view.
pub fn render(state: &SyncState, me: &PlayerId) -> String {
    let mut out = String::new();

    let match_id = state
        .match_id
        .as_ref()
        .map(|id| id.as_str())
        .unwrap_or("-");
    let _ = writeln!(
        out,
        "match {} | {} | stream {}",
        match_id,
        state
            .view
            .as_ref()
            .map(|v| v.status.to_string())
            .unwrap_or_else(|| "loading".to_string()),
        connection_label(state)
    );

    match &state.view {
        Some(view) => {
            let _ = writeln!(out, "{}", score_line(view));
            let _ = writeln!(out, "{}", turn_line(view, me));
        }
        None if state.loading => out.push_str("loading match...\n"),
        None => out.push_str("match not loaded (type `reload` to retry)\n"),
    }

    if let Some(kind) = &state.last_event {
        let _ = writeln!(out, "last event: {}", kind);
    }
    if let Some(error) = &state.last_error {
        let _ = writeln!(out, "error: {}", error);
    }
    if let Some(error) = &state.connection_error {
        let _ = writeln!(out, "{}", error);
    }

    out
}

fn connection_label(state: &SyncState) -> String {
    match state.connection.status {
        ConnectionStatus::Open => "open".to_string(),
        ConnectionStatus::Connecting if state.connection.retry_count > 0 => {
            format!("reconnecting (attempt {})", state.connection.retry_count + 1)
        }
        status => status.to_string(),
    }
}

fn player_name(view: &MatchView, seat: Seat) -> &str {
    view.player(seat).map(PlayerId::as_str).unwrap_or("?")
}

pub fn score_line(view: &MatchView) -> String {
    format!(
        "{} {} - {} {}",
        player_name(view, Seat::One),
        view.wins(Seat::One),
        view.wins(Seat::Two),
        player_name(view, Seat::Two)
    )
}

/// What `me` should do next.
pub fn turn_line(view: &MatchView, me: &PlayerId) -> String {
    let opponent = match view.seat_of(me) {
        Some(Seat::One) => view.player(Seat::Two),
        Some(Seat::Two) => view.player(Seat::One),
        None => None,
    };

    match view.status {
        MatchStatus::Waiting => "waiting for an opponent to join".to_string(),
        MatchStatus::Ended => match view.wins(Seat::One).cmp(&view.wins(Seat::Two)) {
            std::cmp::Ordering::Equal => "match over: draw".to_string(),
            std::cmp::Ordering::Greater => winner_line(view, Seat::One, me),
            std::cmp::Ordering::Less => winner_line(view, Seat::Two, me),
        },
        MatchStatus::InProgress => {
            let Some(turn_id) = &view.current_turn_id else {
                return "waiting for the next turn".to_string();
            };
            let opponent = opponent.map(PlayerId::as_str).unwrap_or("opponent");
            match view.turn(turn_id).and_then(|turn| turn.move_of(me)) {
                Some(choice) => format!(
                    "turn {}: you played {}, waiting for {}",
                    turn_id, choice, opponent
                ),
                None => format!("turn {}: your move ({})", turn_id, move_list()),
            }
        }
    }
}

fn winner_line(view: &MatchView, seat: Seat, me: &PlayerId) -> String {
    match view.player(seat) {
        Some(winner) if winner == me => "match over: you won".to_string(),
        Some(winner) => format!("match over: {} won", winner),
        None => format!("match over: {} won", seat),
    }
}

fn move_list() -> String {
    Move::iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use match_core::{MoveEntry, Turn};
    use match_sync::ConnectionState;

    use super::*;

    fn view() -> MatchView {
        let mut view = MatchView::new("m1", "alice");
        view.player2 = Some("bob".into());
        view.status = MatchStatus::InProgress;
        view.turns.push(Turn::open("t1"));
        view.current_turn_id = Some("t1".into());
        view
    }

    #[test]
    fn prompts_for_move_until_played() {
        let me = PlayerId::new("alice");
        let mut view = view();
        assert_eq!(
            turn_line(&view, &me),
            "turn t1: your move (rock, paper, scissors)"
        );

        view.turns[0]
            .record_move(MoveEntry::new("alice", Move::Paper))
            .unwrap();
        assert_eq!(
            turn_line(&view, &me),
            "turn t1: you played paper, waiting for bob"
        );
    }

    #[test]
    fn announces_winner_from_each_side() {
        let mut view = view();
        view.status = MatchStatus::Ended;
        view.current_turn_id = None;
        view.player2_wins = 2;

        assert_eq!(turn_line(&view, &"bob".into()), "match over: you won");
        assert_eq!(turn_line(&view, &"alice".into()), "match over: bob won");
        assert_eq!(score_line(&view), "alice 0 - 2 bob");
    }

    #[test]
    fn renders_loading_and_reconnecting() {
        let mut state = SyncState::for_match("m1".into());
        state.loading = true;
        state.connection = ConnectionState::new(ConnectionStatus::Connecting, 2);

        let text = render(&state, &"alice".into());
        assert!(text.starts_with("match m1 | loading | stream reconnecting (attempt 3)"));
        assert!(text.contains("loading match..."));
    }

    #[test]
    fn renders_errors() {
        let mut state = SyncState::for_match("m1".into());
        state.view = Some(view());
        state.last_error = Some("Not your turn".into());

        let text = render(&state, &"alice".into());
        assert!(text.contains("alice 0 - 0 bob"));
        assert!(text.contains("error: Not your turn"));
    }
}
