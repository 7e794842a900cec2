//! Hotkey parsing and representation
//!
//! Parses strings like "Ctrl+Shift+N" or "ArrowLeft" into structured bindings.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Keyboard modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub cmd: bool, // macOS Command key
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        cmd: false,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        alt: false,
        shift: false,
        cmd: false,
    };

    pub const SHIFT: Self = Self {
        ctrl: false,
        alt: false,
        shift: true,
        cmd: false,
    };

    pub fn any(&self) -> bool {
        self.ctrl || self.alt || self.shift || self.cmd
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl");
        }
        if self.alt {
            parts.push("Alt");
        }
        if self.shift {
            parts.push("Shift");
        }
        if self.cmd {
            parts.push("Cmd");
        }
        write!(f, "{}", parts.join("+"))
    }
}

/// Keys the carousel can bind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Letter or digit, stored uppercase
    Char(char),
    Escape,
    Enter,
    Space,
    Tab,
    Home,
    End,
    PageUp,
    PageDown,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
}

impl Key {
    /// Parse a key name, case-insensitive. Accepts the DOM names
    /// ("ArrowLeft", "Escape") and the short forms ("Left", "Esc").
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return c.is_ascii_alphanumeric().then(|| Self::Char(c.to_ascii_uppercase()));
        }

        match s.to_lowercase().as_str() {
            "escape" | "esc" => Some(Self::Escape),
            "enter" | "return" => Some(Self::Enter),
            "space" => Some(Self::Space),
            "tab" => Some(Self::Tab),
            "home" => Some(Self::Home),
            "end" => Some(Self::End),
            "pageup" | "pgup" => Some(Self::PageUp),
            "pagedown" | "pgdn" => Some(Self::PageDown),
            "arrowup" | "up" => Some(Self::ArrowUp),
            "arrowdown" | "down" => Some(Self::ArrowDown),
            "arrowleft" | "left" => Some(Self::ArrowLeft),
            "arrowright" | "right" => Some(Self::ArrowRight),
            _ => None,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Char(c) => c.to_string(),
            Self::Escape => "Escape".to_string(),
            Self::Enter => "Enter".to_string(),
            Self::Space => "Space".to_string(),
            Self::Tab => "Tab".to_string(),
            Self::Home => "Home".to_string(),
            Self::End => "End".to_string(),
            Self::PageUp => "PageUp".to_string(),
            Self::PageDown => "PageDown".to_string(),
            Self::ArrowUp => "ArrowUp".to_string(),
            Self::ArrowDown => "ArrowDown".to_string(),
            Self::ArrowLeft => "ArrowLeft".to_string(),
            Self::ArrowRight => "ArrowRight".to_string(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Key press delivered by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::NONE)
    }
}

/// A complete hotkey (modifiers + key)
///
/// Serializes to/from a string like "Ctrl+D"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hotkey {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl Hotkey {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// Parse a hotkey string like "Ctrl+Shift+D" or "ArrowLeft"
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        let mut modifiers = Modifiers::default();
        let mut parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let key = Key::parse(parts.pop()?)?;
        for part in parts {
            match part.to_lowercase().as_str() {
                "ctrl" | "control" => modifiers.ctrl = true,
                "alt" | "opt" | "option" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                "cmd" | "command" | "meta" | "super" => modifiers.cmd = true,
                _ => return None,
            }
        }
        Some(Self { key, modifiers })
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.key == event.key && self.modifiers == event.modifiers
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.any() {
            write!(f, "{}+{}", self.modifiers, self.key)
        } else {
            write!(f, "{}", self.key)
        }
    }
}

impl Serialize for Hotkey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Hotkey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Hotkey::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid hotkey: '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        assert_eq!(Hotkey::parse("ArrowLeft"), Some(Hotkey::new(Key::ArrowLeft, Modifiers::NONE)));
        assert_eq!(Hotkey::parse("left"), Some(Hotkey::new(Key::ArrowLeft, Modifiers::NONE)));
        assert_eq!(Hotkey::parse("Esc"), Some(Hotkey::new(Key::Escape, Modifiers::NONE)));
        assert_eq!(Hotkey::parse("d"), Some(Hotkey::new(Key::Char('D'), Modifiers::NONE)));
    }

    #[test]
    fn test_parse_modifiers() {
        let hk = Hotkey::parse("Ctrl+Shift+D").unwrap();
        assert_eq!(hk.key, Key::Char('D'));
        assert!(hk.modifiers.ctrl);
        assert!(hk.modifiers.shift);
        assert!(!hk.modifiers.alt);
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(Hotkey::parse(""), None);
        assert_eq!(Hotkey::parse("Hyper+X"), None);
        assert_eq!(Hotkey::parse("Ctrl+"), None);
        assert_eq!(Hotkey::parse("F13"), None);
    }

    #[test]
    fn test_display_roundtrip() {
        for text in ["Ctrl+D", "ArrowRight", "Shift+Enter"] {
            assert_eq!(Hotkey::parse(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn test_matches_exact_modifiers() {
        let hk = Hotkey::parse("D").unwrap();
        assert!(hk.matches(&KeyEvent::plain(Key::Char('D'))));
        assert!(!hk.matches(&KeyEvent::new(Key::Char('D'), Modifiers::CTRL)));
    }
}
