//! Keyboard and input types.
//!
//! Platform-agnostic definitions for what reaches the composer. `KeyEvent`
//! carries a keydown; `InputType` names the editing a host performs when a
//! keydown is not intercepted (the browser's default action).

use smol_str::SmolStr;

/// Semantic input types from input events.
///
/// Based on the W3C Input Events specification, reduced to the operations a
/// single-paragraph message composer performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputType {
    /// Insert typed text, replacing the selection.
    InsertText(String),
    /// Insert a line break (`<br>`, Enter).
    InsertLineBreak,
    /// Delete backward (Backspace).
    DeleteContentBackward,
    /// Delete forward (Delete key).
    DeleteContentForward,
}

impl InputType {
    /// Whether this input type is a deletion operation.
    pub fn is_deletion(&self) -> bool {
        matches!(
            self,
            Self::DeleteContentBackward | Self::DeleteContentForward
        )
    }

    /// Whether this input type inserts content.
    pub fn is_insertion(&self) -> bool {
        matches!(self, Self::InsertText(_) | Self::InsertLineBreak)
    }
}

/// Key values for keyboard input.
///
/// Platform-specific code converts from native key events to this enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A character key.
    Character(SmolStr),

    /// Unknown/unidentified key.
    Unidentified,

    // === Whitespace / editing ===
    Backspace,
    Delete,
    Enter,
    Tab,
    Escape,

    // === Navigation ===
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Home,
    End,
    PageUp,
    PageDown,
}

impl Key {
    /// Create a character key.
    pub fn character(s: impl Into<SmolStr>) -> Self {
        Self::Character(s.into())
    }

    /// The typed character, for single-character keys.
    pub fn as_char(&self) -> Option<char> {
        let Self::Character(s) = self else {
            return None;
        };
        let mut chars = s.chars();
        let ch = chars.next()?;
        chars.next().is_none().then_some(ch)
    }

    /// Check if this is a navigation key.
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            Self::ArrowLeft
                | Self::ArrowRight
                | Self::ArrowUp
                | Self::ArrowDown
                | Self::Home
                | Self::End
                | Self::PageUp
                | Self::PageDown
        )
    }
}

/// Modifier key state for a key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        ctrl: false,
        alt: false,
        shift: true,
        meta: false,
    };

    pub const META: Self = Self {
        ctrl: false,
        alt: false,
        shift: false,
        meta: true,
    };

    pub const CTRL_SHIFT: Self = Self {
        ctrl: true,
        alt: false,
        shift: true,
        meta: false,
    };

    /// Get the primary modifier for the platform (Cmd on Mac, Ctrl elsewhere).
    pub fn primary(is_mac: bool) -> Self {
        if is_mac { Self::META } else { Self::CTRL }
    }

    /// Ctrl or Cmd held.
    pub fn has_primary(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// A keydown as the composer sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
    /// Auto-repeat from a held key.
    pub repeat: bool,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self::with_modifiers(key, Modifiers::NONE)
    }

    pub fn with_modifiers(key: Key, modifiers: Modifiers) -> Self {
        Self {
            key,
            modifiers,
            repeat: false,
        }
    }

    pub fn character(ch: char) -> Self {
        Self::new(Key::character(ch.to_string()))
    }

    pub fn ctrl(ch: char) -> Self {
        Self::with_modifiers(Key::character(ch.to_string()), Modifiers::CTRL)
    }

    pub fn repeated(mut self) -> Self {
        self.repeat = true;
        self
    }

    /// The default editing action a platform performs for this key when the
    /// composer does not intercept it.
    pub fn default_input(&self) -> Option<InputType> {
        if self.modifiers.has_primary() || self.modifiers.alt {
            return None;
        }
        match &self.key {
            Key::Character(s) => Some(InputType::InsertText(s.to_string())),
            Key::Enter => Some(InputType::InsertLineBreak),
            Key::Backspace => Some(InputType::DeleteContentBackward),
            Key::Delete => Some(InputType::DeleteContentForward),
            _ => None,
        }
    }
}

/// Key combination that sends the message instead of editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendKeyCombo {
    /// Enter sends, Shift+Enter breaks the line.
    #[default]
    Enter,
    /// Ctrl/Cmd+Enter sends, Enter breaks the line.
    CtrlEnter,
}

impl SendKeyCombo {
    pub fn is_send(self, event: &KeyEvent) -> bool {
        if event.key != Key::Enter {
            return false;
        }
        match self {
            Self::Enter => !event.modifiers.shift,
            Self::CtrlEnter => event.modifiers.has_primary(),
        }
    }
}

/// Result of handling a keydown event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeydownResult {
    /// Event was handled, prevent default.
    Handled,
    /// Event was not a keybinding, let platform handle it.
    NotHandled,
    /// The configured send combination; the host sends the message.
    Send,
    /// Ctrl/Cmd+K; the host opens its link-insertion control.
    OpenLinkControl,
}

impl KeydownResult {
    /// Whether the platform's default action must be suppressed.
    pub fn prevents_default(&self) -> bool {
        matches!(self, Self::Handled | Self::OpenLinkControl)
    }
}
