//! Keyboard bindings for the preview modal.
//!
//! Bindings are loaded from TOML in the `[[commands]]` format; the defaults
//! live in `data/keys_carousel.toml` and are embedded at compile time.

use std::path::Path;

use log::warn;
use serde::Deserialize;

use crate::error::CarouselError;

mod hotkey;

pub use hotkey::{Hotkey, Key, KeyEvent, Modifiers};

const DEFAULT_KEYS: &str = include_str!("../../data/keys_carousel.toml");

/// Command a key can trigger while the modal is open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CarouselCommand {
    Prev,
    Next,
    Close,
    Download,
    TogglePreload,
    LoadPreview,
}

impl CarouselCommand {
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "carousel.prev" => Some(Self::Prev),
            "carousel.next" => Some(Self::Next),
            "carousel.close" => Some(Self::Close),
            "carousel.download" => Some(Self::Download),
            "carousel.toggle_preload" => Some(Self::TogglePreload),
            "carousel.load_preview" => Some(Self::LoadPreview),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Prev => "carousel.prev",
            Self::Next => "carousel.next",
            Self::Close => "carousel.close",
            Self::Download => "carousel.download",
            Self::TogglePreload => "carousel.toggle_preload",
            Self::LoadPreview => "carousel.load_preview",
        }
    }
}

/// Raw command definition as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
struct CommandToml {
    id: String,
    #[serde(default)]
    hotkey: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CommandsFile {
    #[serde(default)]
    commands: Vec<CommandToml>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyMap {
    bindings: Vec<(Hotkey, CarouselCommand)>,
}

impl KeyMap {
    /// Parse bindings. Unknown command ids and malformed hotkeys are skipped
    /// with a warning; only invalid TOML is an error.
    pub fn from_toml(text: &str) -> Result<Self, CarouselError> {
        let file: CommandsFile = toml::from_str(text)?;
        let mut bindings = Vec::new();
        for command in file.commands {
            let Some(cmd) = CarouselCommand::from_id(&command.id) else {
                warn!("[KeyMap] Unknown command '{}'", command.id);
                continue;
            };
            for text in &command.hotkey {
                match Hotkey::parse(text) {
                    Some(hotkey) => bindings.push((hotkey, cmd)),
                    None => warn!("[KeyMap] Invalid hotkey '{}' for {}", text, command.id),
                }
            }
        }
        Ok(Self { bindings })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CarouselError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| CarouselError::ReadFile {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::from_toml(&text)
    }

    pub fn command_for(&self, event: &KeyEvent) -> Option<CarouselCommand> {
        self.bindings.iter().find(|(hotkey, _)| hotkey.matches(event)).map(|(_, cmd)| *cmd)
    }

    pub fn hotkeys_for(&self, command: CarouselCommand) -> impl Iterator<Item = &Hotkey> {
        self.bindings.iter().filter(move |(_, cmd)| *cmd == command).map(|(hotkey, _)| hotkey)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        match Self::from_toml(DEFAULT_KEYS) {
            Ok(map) => map,
            Err(err) => {
                log::error!("[KeyMap] Embedded key bindings are invalid: {}", err);
                Self { bindings: Vec::new() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings() {
        let map = KeyMap::default();
        assert_eq!(map.len(), 6);
        assert_eq!(map.command_for(&KeyEvent::plain(Key::ArrowLeft)), Some(CarouselCommand::Prev));
        assert_eq!(map.command_for(&KeyEvent::plain(Key::ArrowRight)), Some(CarouselCommand::Next));
        assert_eq!(map.command_for(&KeyEvent::plain(Key::Escape)), Some(CarouselCommand::Close));
        assert_eq!(map.command_for(&KeyEvent::plain(Key::Char('D'))), Some(CarouselCommand::Download));
        assert_eq!(map.command_for(&KeyEvent::plain(Key::Char('P'))), Some(CarouselCommand::TogglePreload));
        assert_eq!(map.command_for(&KeyEvent::plain(Key::Enter)), Some(CarouselCommand::LoadPreview));
        assert_eq!(map.command_for(&KeyEvent::plain(Key::Char('X'))), None);
        assert_eq!(map.command_for(&KeyEvent::new(Key::ArrowLeft, Modifiers::SHIFT)), None);
    }

    #[test]
    fn test_custom_bindings_skip_invalid() {
        let map = KeyMap::from_toml(
            r#"
[[commands]]
id = "carousel.next"
hotkey = ["Space", "PageDown", "Bogus+Key"]

[[commands]]
id = "carousel.unknown"
hotkey = ["N"]
"#,
        )
        .unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.command_for(&KeyEvent::plain(Key::Space)), Some(CarouselCommand::Next));
        assert_eq!(map.hotkeys_for(CarouselCommand::Next).count(), 2);
        assert_eq!(map.command_for(&KeyEvent::plain(Key::ArrowLeft)), None);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(KeyMap::from_toml("[[commands]\nid=").is_err());
    }

    #[test]
    fn test_command_ids_roundtrip() {
        for cmd in [
            CarouselCommand::Prev,
            CarouselCommand::Next,
            CarouselCommand::Close,
            CarouselCommand::Download,
            CarouselCommand::TogglePreload,
            CarouselCommand::LoadPreview,
        ] {
            assert_eq!(CarouselCommand::from_id(cmd.id()), Some(cmd));
        }
    }
}
