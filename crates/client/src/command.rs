//! Line-based player input.
use std::str::FromStr;

use match_core::{MatchId, Move};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserCommand {
    Play(Move),
    Reload,
    Switch(MatchId),
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq)]
pub struct UnknownCommand(pub String);

impl FromStr for UserCommand {
    type Err = UnknownCommand;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(UnknownCommand(String::new()));
        };

        if let Ok(choice) = head.parse::<Move>() {
            return Ok(UserCommand::Play(choice));
        }

        match (head.to_ascii_lowercase().as_str(), words.next()) {
            ("r", None) => Ok(UserCommand::Play(Move::Rock)),
            ("p", None) => Ok(UserCommand::Play(Move::Paper)),
            ("s", None) => Ok(UserCommand::Play(Move::Scissors)),
            ("reload", None) => Ok(UserCommand::Reload),
            ("open" | "switch", Some(id)) => Ok(UserCommand::Switch(MatchId::new(id))),
            ("help" | "?", None) => Ok(UserCommand::Help),
            ("quit" | "exit" | "q", None) => Ok(UserCommand::Quit),
            _ => Err(UnknownCommand(line.trim().to_string())),
        }
    }
}

pub const HELP: &str = "\
commands:
  rock | paper | scissors (or r / p / s)  play the current turn
  reload                                  fetch the match again
  open <match id>                         switch to another match
  quit                                    leave";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_moves_and_shortcuts() {
        assert_eq!("Rock".parse::<UserCommand>(), Ok(UserCommand::Play(Move::Rock)));
        assert_eq!(" scissors ".parse::<UserCommand>(), Ok(UserCommand::Play(Move::Scissors)));
        assert_eq!("p".parse::<UserCommand>(), Ok(UserCommand::Play(Move::Paper)));
    }

    #[test]
    fn parses_control_commands() {
        assert_eq!("reload".parse::<UserCommand>(), Ok(UserCommand::Reload));
        assert_eq!("q".parse::<UserCommand>(), Ok(UserCommand::Quit));
        assert_eq!(
            "open 6651f0c2".parse::<UserCommand>(),
            Ok(UserCommand::Switch(MatchId::new("6651f0c2")))
        );
    }

    #[test]
    fn rejects_unknown_input() {
        assert_eq!(
            "lizard".parse::<UserCommand>(),
            Err(UnknownCommand("lizard".into()))
        );
        assert!("open".parse::<UserCommand>().is_err());
        assert!("".parse::<UserCommand>().is_err());
    }
}
