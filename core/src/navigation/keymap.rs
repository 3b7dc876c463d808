use serde::{Deserialize, Serialize};

use crate::tracks::Label;

/// Keys the review surface reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Tab,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Digit(u8),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
}

/// Effect of a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    NextTrack,
    PrevTrack,
    UnselectTrack,
    PrevDay,
    NextDay,
    PrevFlaggedDay,
    NextFlaggedDay,
    PrevFrame,
    NextFrame,
    PrevFlaggedFrame,
    NextFlaggedFrame,
    AssignLabel(Label),
}

/// Maps a key press to a command. Digit keys assign labels only while a
/// track is selected.
pub fn dispatch(key: Key, modifiers: Modifiers, track_selected: bool) -> Option<Command> {
    let command = match (key, modifiers.shift) {
        (Key::Tab, false) => Command::NextTrack,
        (Key::Tab, true) => Command::PrevTrack,
        (Key::Escape, false) => Command::UnselectTrack,
        (Key::Up, false) => Command::PrevDay,
        (Key::Down, false) => Command::NextDay,
        (Key::Up, true) => Command::PrevFlaggedDay,
        (Key::Down, true) => Command::NextFlaggedDay,
        (Key::Left, false) => Command::PrevFrame,
        (Key::Right, false) => Command::NextFrame,
        (Key::Left, true) => Command::PrevFlaggedFrame,
        (Key::Right, true) => Command::NextFlaggedFrame,
        (Key::Digit(digit), false) if track_selected => {
            Command::AssignLabel(Label::from_digit(digit)?)
        }
        _ => return None,
    };
    Some(command)
}

/// Parses key names such as `down`, `shift+left` or `3`.
pub fn parse_key(name: &str) -> Option<(Key, Modifiers)> {
    let name = name.trim().to_ascii_lowercase();
    let (shift, base) = match name.strip_prefix("shift+") {
        Some(rest) => (true, rest),
        None => (false, name.as_str()),
    };
    let key = match base {
        "tab" => Key::Tab,
        "esc" | "escape" => Key::Escape,
        "up" => Key::Up,
        "down" => Key::Down,
        "left" => Key::Left,
        "right" => Key::Right,
        digit if digit.len() == 1 => Key::Digit(digit.parse().ok()?),
        _ => return None,
    };
    Some((key, Modifiers { shift }))
}
