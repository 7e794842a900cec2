use crate::render::LOAD_PREVIEW_ACTION;

pub const ACTION_PREV: &str = "prev";
pub const ACTION_NEXT: &str = "next";
pub const ACTION_CLOSE: &str = "close";
pub const ACTION_DOWNLOAD: &str = "download";
pub const ACTION_TOGGLE_PRELOAD: &str = "toggle-preload";
pub const ACTION_SELECT: &str = "select";

/// Activation of an element carrying `data-action`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    LoadPreview(usize),
    Prev,
    Next,
    Close,
    Download,
    TogglePreload,
    /// Thumbnail click
    Select(usize),
}

impl Action {
    /// Map the `data-action` / `data-index` attribute pair back to an action
    pub fn from_attributes(action: &str, index: Option<usize>) -> Option<Self> {
        match (action, index) {
            (LOAD_PREVIEW_ACTION, Some(index)) => Some(Action::LoadPreview(index)),
            (ACTION_SELECT, Some(index)) => Some(Action::Select(index)),
            (ACTION_PREV, _) => Some(Action::Prev),
            (ACTION_NEXT, _) => Some(Action::Next),
            (ACTION_CLOSE, _) => Some(Action::Close),
            (ACTION_DOWNLOAD, _) => Some(Action::Download),
            (ACTION_TOGGLE_PRELOAD, _) => Some(Action::TogglePreload),
            _ => None,
        }
    }
}
