//! Keyboard chords and what they do in a card editor.

use std::fmt;
use std::str::FromStr;

use crate::autoformat::InputEvent;
use crate::editing::{Movement, Unit};
use crate::model::node::FlagMark;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Tab,
    Escape,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    /// Cmd on macOS, the Windows/Super key elsewhere
    pub meta: bool,
}

/// A key together with the modifiers held while pressing it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub key: Key,
    pub modifiers: Modifiers,
}

/// What a chord asks the session to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyCommand {
    ToggleMark(FlagMark),
    Input(InputEvent),
    Move(Movement),
    Extend(Movement),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyParseError {
    #[error("empty key chord")]
    Empty,
    #[error("unknown key: {0}")]
    UnknownKey(String),
    #[error("unknown modifier: {0}")]
    UnknownModifier(String),
}

impl KeyChord {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::default(),
        }
    }

    pub fn ctrl(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers {
                ctrl: true,
                ..Modifiers::default()
            },
        }
    }

    pub fn shift(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers {
                shift: true,
                ..Modifiers::default()
            },
        }
    }

    /// Ctrl or Cmd; shortcuts treat them the same
    pub fn has_command(&self) -> bool {
        self.modifiers.ctrl || self.modifiers.meta
    }

    /// Resolve the chord to an editor command. Chords the editor does not
    /// bind return `None` so the host can use them.
    pub fn command(&self) -> Option<KeyCommand> {
        let Modifiers { shift, alt, .. } = self.modifiers;
        let command = self.has_command();

        let step = |unit: Unit, reverse: bool| {
            let movement = Movement { unit, reverse };
            if shift {
                KeyCommand::Extend(movement)
            } else {
                KeyCommand::Move(movement)
            }
        };
        let horizontal = if alt { Unit::Word } else { Unit::Character };

        Some(match self.key {
            Key::Char(c) if command => match c.to_ascii_lowercase() {
                'b' => KeyCommand::ToggleMark(FlagMark::Bold),
                'i' => KeyCommand::ToggleMark(FlagMark::Italic),
                'u' => KeyCommand::ToggleMark(FlagMark::Underline),
                _ => return None,
            },
            Key::Char(c) if !alt => KeyCommand::Input(InputEvent::InsertText(c.to_string())),
            Key::Char(_) => return None,
            Key::Enter if command => KeyCommand::Input(InputEvent::InsertSoftBreak),
            Key::Enter => KeyCommand::Input(InputEvent::InsertBreak { shift }),
            Key::Backspace => KeyCommand::Input(InputEvent::DeleteBackward),
            Key::Delete => KeyCommand::Input(InputEvent::DeleteForward),
            Key::Left => step(horizontal, true),
            Key::Right => step(horizontal, false),
            Key::Up => step(Unit::Line, true),
            Key::Down => step(Unit::Line, false),
            Key::Tab | Key::Escape => return None,
        })
    }
}

impl From<Key> for KeyChord {
    fn from(key: Key) -> Self {
        Self::new(key)
    }
}

impl FromStr for Key {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(Key::Char(c));
        }
        Ok(match s.to_ascii_lowercase().as_str() {
            "enter" | "return" => Key::Enter,
            "backspace" => Key::Backspace,
            "delete" | "del" => Key::Delete,
            "left" => Key::Left,
            "right" => Key::Right,
            "up" => Key::Up,
            "down" => Key::Down,
            "tab" => Key::Tab,
            "esc" | "escape" => Key::Escape,
            "space" => Key::Char(' '),
            "plus" => Key::Char('+'),
            "" => return Err(KeyParseError::Empty),
            _ => return Err(KeyParseError::UnknownKey(s.to_string())),
        })
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(' ') => f.write_str("space"),
            Key::Char('+') => f.write_str("plus"),
            Key::Char(c) => write!(f, "{c}"),
            Key::Enter => f.write_str("enter"),
            Key::Backspace => f.write_str("backspace"),
            Key::Delete => f.write_str("delete"),
            Key::Left => f.write_str("left"),
            Key::Right => f.write_str("right"),
            Key::Up => f.write_str("up"),
            Key::Down => f.write_str("down"),
            Key::Tab => f.write_str("tab"),
            Key::Escape => f.write_str("esc"),
        }
    }
}

/// Parses chords written like `ctrl+b`, `cmd+enter` or `shift+left`.
impl FromStr for KeyChord {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(KeyParseError::Empty);
        }
        let mut parts: Vec<&str> = s.split('+').collect();
        let key: Key = parts.pop().unwrap_or_default().parse()?;

        let mut modifiers = Modifiers::default();
        for part in parts {
            match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers.ctrl = true,
                "shift" => modifiers.shift = true,
                "alt" | "option" => modifiers.alt = true,
                "cmd" | "meta" | "super" => modifiers.meta = true,
                other => return Err(KeyParseError::UnknownModifier(other.to_string())),
            }
        }
        Ok(Self { key, modifiers })
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Modifiers { ctrl, shift, alt, meta } = self.modifiers;
        for (held, name) in [(ctrl, "ctrl"), (alt, "alt"), (meta, "cmd"), (shift, "shift")] {
            if held {
                write!(f, "{name}+")?;
            }
        }
        write!(f, "{}", self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("ctrl+b", KeyCommand::ToggleMark(FlagMark::Bold))]
    #[case("cmd+i", KeyCommand::ToggleMark(FlagMark::Italic))]
    #[case("ctrl+U", KeyCommand::ToggleMark(FlagMark::Underline))]
    #[case("cmd+enter", KeyCommand::Input(InputEvent::InsertSoftBreak))]
    #[case("enter", KeyCommand::Input(InputEvent::InsertBreak { shift: false }))]
    #[case("shift+enter", KeyCommand::Input(InputEvent::InsertBreak { shift: true }))]
    #[case("backspace", KeyCommand::Input(InputEvent::DeleteBackward))]
    #[case("delete", KeyCommand::Input(InputEvent::DeleteForward))]
    #[case("a", KeyCommand::Input(InputEvent::InsertText("a".into())))]
    #[case("space", KeyCommand::Input(InputEvent::InsertText(" ".into())))]
    #[case("left", KeyCommand::Move(Movement::backward(Unit::Character)))]
    #[case("alt+right", KeyCommand::Move(Movement::forward(Unit::Word)))]
    #[case("shift+down", KeyCommand::Extend(Movement::forward(Unit::Line)))]
    fn test_chord_commands(#[case] chord: &str, #[case] expected: KeyCommand) {
        let chord: KeyChord = chord.parse().unwrap();
        assert_eq!(chord.command(), Some(expected));
    }

    #[rstest]
    #[case("ctrl+z")]
    #[case("esc")]
    #[case("tab")]
    #[case("alt+x")]
    fn test_unbound_chords(#[case] chord: &str) {
        let chord: KeyChord = chord.parse().unwrap();
        assert_eq!(chord.command(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<KeyChord>(), Err(KeyParseError::Empty));
        assert_eq!(
            "hyper+b".parse::<KeyChord>(),
            Err(KeyParseError::UnknownModifier("hyper".into()))
        );
        assert_eq!(
            "ctrl+pageup".parse::<KeyChord>(),
            Err(KeyParseError::UnknownKey("pageup".into()))
        );
        assert_eq!("ctrl+".parse::<KeyChord>(), Err(KeyParseError::Empty));
    }

    #[test]
    fn test_display_parses_back() {
        for text in ["ctrl+b", "cmd+shift+enter", "plus", "alt+left", "space"] {
            let chord: KeyChord = text.parse().unwrap();
            assert_eq!(chord.to_string().parse::<KeyChord>().unwrap(), chord);
        }
        assert_eq!(KeyChord::ctrl(Key::Char('b')).to_string(), "ctrl+b");
    }
}
