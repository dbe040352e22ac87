//! Normalized pointer and keyboard events
//!
//! Backends map their native button, axis and key codes onto these types.
//! Native codes with no counterpart here are dropped by the backend.

use crate::unit::Point;
use bitflags::bitflags;
use std::time::Duration;

// ============================================================================
// Pointer Events
// ============================================================================

/// Kind of pointer event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerKind {
    Press,
    Release,
    Move,
    /// The gesture was taken over by the system; discard pointer state
    Cancel,
}

/// Device that produced a pointer event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerSource {
    Mouse,
    Touch,
}

bitflags! {
    /// Set of pressed pointer buttons
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Buttons: u8 {
        /// Left mouse button, or the touching finger
        const PRIMARY = 1 << 0;
        /// Right mouse button
        const SECONDARY = 1 << 1;
        /// Middle mouse button
        const TERTIARY = 1 << 2;
    }
}

/// Identifies a pointer (the mouse, or one touch contact)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PointerId(pub u64);

/// Pointer event in device pixels
#[derive(Clone, Debug, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub source: PointerSource,
    /// Position in window coordinates
    pub position: Point,
    /// Buttons held after this event
    pub buttons: Buttons,
    /// Scroll distance in pixels. Positive values scroll right and down.
    pub scroll: Point,
    pub pointer_id: PointerId,
    /// Native event timestamp
    pub time: Duration,
}

impl PointerEvent {
    /// True for move events that only carry a scroll delta
    pub fn is_scroll(&self) -> bool {
        self.kind == PointerKind::Move && !self.scroll.is_zero()
    }
}

// ============================================================================
// Keyboard Events
// ============================================================================

/// Key press/release state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyState {
    Pressed,
    Released,
}

bitflags! {
    /// Modifier keys held during a key event
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const CTRL = 1 << 1;
        const ALT = 1 << 2;
        /// Command on macOS, the Windows/Super key elsewhere
        const META = 1 << 3;
    }
}

impl Modifiers {
    /// The platform's shortcut modifier (Command on macOS, Ctrl elsewhere)
    pub fn shortcut() -> Self {
        if cfg!(target_os = "macos") {
            Modifiers::META
        } else {
            Modifiers::CTRL
        }
    }
}

/// Key names.
///
/// Printable keys are reported as [`Key::Char`] with the uppercase
/// character; text produced by the key arrives separately as a
/// [`Event::TextEdit`](crate::Event::TextEdit).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Space,
    Enter,
    Escape,
    Backspace,
    Tab,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    Left,
    Right,
    Up,
    Down,
    Shift,
    Ctrl,
    Alt,
    Meta,
    /// Function key `F1`..`F24`
    F(u8),
}

impl Key {
    /// Printable name of the key, as shown in shortcut hints
    pub fn name(&self) -> String {
        match self {
            Key::Char(c) => c.to_string(),
            Key::F(n) => format!("F{n}"),
            Key::Space => "Space".into(),
            Key::Enter => "⏎".into(),
            Key::Escape => "⎋".into(),
            Key::Backspace => "⌫".into(),
            Key::Tab => "Tab".into(),
            Key::Delete => "⌦".into(),
            Key::Insert => "Insert".into(),
            Key::Home => "⇱".into(),
            Key::End => "⇲".into(),
            Key::PageUp => "⇞".into(),
            Key::PageDown => "⇟".into(),
            Key::Left => "←".into(),
            Key::Right => "→".into(),
            Key::Up => "↑".into(),
            Key::Down => "↓".into(),
            Key::Shift => "Shift".into(),
            Key::Ctrl => "Ctrl".into(),
            Key::Alt => "Alt".into(),
            Key::Meta => "Meta".into(),
        }
    }
}

/// Keyboard event
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub state: KeyState,
    pub modifiers: Modifiers,
}
