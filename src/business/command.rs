//! Terminal command parsing

use super::app_controller::UiEvent;
use crate::data::PersonalityInfo;

pub const HELP: &str = "\
  [s]          start recording (hold to talk)
  [e]          stop recording (release)
  [t <text>]   send a text message
  [p]          list personalities
  [p <n|key>]  choose a personality
  [c]          confirm personality
  [d <id>]     dismiss a notice
  [h]          help
  [q]          quit";

/// One line typed at the kiosk prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StartRecording,
    StopRecording,
    SendText(String),
    ListPersonalities,
    ChoosePersonality(String),
    Confirm,
    Dismiss(u64),
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        match (head.to_lowercase().as_str(), rest) {
            ("", _) => Self::Empty,
            ("s" | "start", "") => Self::StartRecording,
            ("e" | "end" | "stop", "") => Self::StopRecording,
            ("t" | "text", text) => Self::SendText(text.to_string()),
            ("p" | "personality", "") => Self::ListPersonalities,
            ("p" | "personality", choice) => Self::ChoosePersonality(choice.to_string()),
            ("c" | "confirm", "") => Self::Confirm,
            ("d" | "dismiss", id) => match id.parse() {
                Ok(id) => Self::Dismiss(id),
                Err(_) => Self::Unknown(line.to_string()),
            },
            ("h" | "help" | "?", "") => Self::Help,
            ("q" | "quit" | "exit", "") => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }

    /// Controller events for this command; empty for commands the prompt
    /// handles itself
    pub fn into_events(self, personalities: &[PersonalityInfo]) -> Vec<UiEvent> {
        match self {
            Self::StartRecording => vec![UiEvent::TalkPressed],
            Self::StopRecording => vec![UiEvent::TalkReleased],
            Self::SendText(text) => vec![UiEvent::TextInput(text), UiEvent::SendText],
            Self::ChoosePersonality(choice) => vec![UiEvent::PersonalityChanged(
                resolve_personality(&choice, personalities),
            )],
            Self::Confirm => vec![UiEvent::ConfirmPersonality],
            Self::Dismiss(id) => vec![UiEvent::DismissNotice(id)],
            Self::ListPersonalities | Self::Help | Self::Quit | Self::Empty | Self::Unknown(_) => {
                Vec::new()
            }
        }
    }
}

/// Match a 1-based list position or a key
pub fn resolve_personality(choice: &str, personalities: &[PersonalityInfo]) -> Option<String> {
    if let Ok(n) = choice.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|index| personalities.get(index))
            .map(|p| p.key.clone());
    }
    personalities
        .iter()
        .find(|p| p.key.eq_ignore_ascii_case(choice))
        .map(|p| p.key.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu() -> Vec<PersonalityInfo> {
        vec![
            PersonalityInfo {
                key: "classic".into(),
                name: "Classic Terry".into(),
                short_name: None,
            },
            PersonalityInfo {
                key: "pirate".into(),
                name: "Pirate Terry".into(),
                short_name: Some("Pirate".into()),
            },
        ]
    }

    #[test]
    fn parses_prompt_lines() {
        assert_eq!(Command::parse("  s "), Command::StartRecording);
        assert_eq!(Command::parse("E"), Command::StopRecording);
        assert_eq!(
            Command::parse("t  A pint of   bitter "),
            Command::SendText("A pint of   bitter".into())
        );
        assert_eq!(Command::parse("p"), Command::ListPersonalities);
        assert_eq!(Command::parse("p 2"), Command::ChoosePersonality("2".into()));
        assert_eq!(Command::parse("d 1700000000123"), Command::Dismiss(1_700_000_000_123));
        assert_eq!(Command::parse("d soon"), Command::Unknown("d soon".into()));
        assert_eq!(Command::parse(""), Command::Empty);
        assert_eq!(Command::parse("q"), Command::Quit);
        assert_eq!(Command::parse("s now"), Command::Unknown("s now".into()));
    }

    #[test]
    fn personality_by_position_or_key() {
        let menu = menu();
        assert_eq!(resolve_personality("1", &menu).as_deref(), Some("classic"));
        assert_eq!(resolve_personality("PIRATE", &menu).as_deref(), Some("pirate"));
        assert_eq!(resolve_personality("0", &menu), None);
        assert_eq!(resolve_personality("3", &menu), None);
        assert_eq!(resolve_personality("wizard", &menu), None);
    }

    #[test]
    fn text_command_fills_input_then_sends() {
        assert_eq!(
            Command::parse("t hi").into_events(&[]),
            vec![UiEvent::TextInput("hi".into()), UiEvent::SendText]
        );
        assert_eq!(
            Command::parse("p 2").into_events(&menu()),
            vec![UiEvent::PersonalityChanged(Some("pirate".into()))]
        );
        assert!(Command::parse("h").into_events(&[]).is_empty());
    }
}
