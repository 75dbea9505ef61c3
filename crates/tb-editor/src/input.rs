//! Input abstraction layer.
//!
//! Hosts translate their native pointer/keyboard events into these types
//! before handing them to the `ToolSystem`.

use serde::{Deserialize, Serialize};

/// Pointer button, numbered like DOM `MouseEvent.button`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    /// 0: usually left.
    Primary,
    /// 1: wheel click.
    Middle,
    /// 2: usually right.
    Secondary,
}

impl MouseButton {
    /// Map a DOM-style button number. Back/forward buttons (3, 4) and
    /// anything else have no meaning to the tools and map to `None`.
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(Self::Primary),
            1 => Some(Self::Middle),
            2 => Some(Self::Secondary),
            _ => None,
        }
    }

}

/// Keyboard modifier state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Ctrl on most platforms, ⌘ on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// A key press or release. `key` is the DOM `KeyboardEvent.key` value
/// (`"r"`, `"Escape"`, `"Delete"`, …).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: String,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_modifiers(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
        }
    }

    /// Lower-cased key, used for keybind lookup.
    pub fn normalized(&self) -> String {
        self.key.to_lowercase()
    }

    pub fn is(&self, key: &str) -> bool {
        self.key.eq_ignore_ascii_case(key)
    }
}
