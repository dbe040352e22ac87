//! Desktop input conversion (winit -> tessera_platform)
//!
//! Native codes without a counterpart in `tessera_platform` convert to
//! `None` and are dropped by the event loop.

use std::time::Duration;
use tessera_platform::scroll::Axis;
use tessera_platform::{Buttons, Callbacks, EventSource, Key, KeyState, Modifiers, PointerKind};
use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, TouchPhase};
use winit::keyboard::{Key as WinitKey, ModifiersState, NamedKey};

/// Convert winit mouse button to a button flag
pub fn convert_mouse_button(button: WinitMouseButton) -> Option<Buttons> {
    match button {
        WinitMouseButton::Left => Some(Buttons::PRIMARY),
        WinitMouseButton::Right => Some(Buttons::SECONDARY),
        WinitMouseButton::Middle => Some(Buttons::TERTIARY),
        WinitMouseButton::Back | WinitMouseButton::Forward | WinitMouseButton::Other(_) => None,
    }
}

/// Convert winit element state to KeyState
pub fn convert_key_state(state: ElementState) -> KeyState {
    match state {
        ElementState::Pressed => KeyState::Pressed,
        ElementState::Released => KeyState::Released,
    }
}

/// Convert winit modifiers to Modifiers
pub fn convert_modifiers(modifiers: ModifiersState) -> Modifiers {
    let mut out = Modifiers::empty();
    out.set(Modifiers::SHIFT, modifiers.shift_key());
    out.set(Modifiers::CTRL, modifiers.control_key());
    out.set(Modifiers::ALT, modifiers.alt_key());
    out.set(Modifiers::META, modifiers.super_key());
    out
}

/// Convert winit key to Key
pub fn convert_key(key: &WinitKey) -> Option<Key> {
    let key = match key {
        WinitKey::Named(named) => match named {
            // Special keys
            NamedKey::Space => Key::Space,
            NamedKey::Enter => Key::Enter,
            NamedKey::Escape => Key::Escape,
            NamedKey::Backspace => Key::Backspace,
            NamedKey::Tab => Key::Tab,
            NamedKey::Delete => Key::Delete,
            NamedKey::Insert => Key::Insert,
            NamedKey::Home => Key::Home,
            NamedKey::End => Key::End,
            NamedKey::PageUp => Key::PageUp,
            NamedKey::PageDown => Key::PageDown,

            // Arrow keys
            NamedKey::ArrowLeft => Key::Left,
            NamedKey::ArrowRight => Key::Right,
            NamedKey::ArrowUp => Key::Up,
            NamedKey::ArrowDown => Key::Down,

            // Modifier keys
            NamedKey::Shift => Key::Shift,
            NamedKey::Control => Key::Ctrl,
            NamedKey::Alt => Key::Alt,
            NamedKey::Super => Key::Meta,

            // Function keys
            NamedKey::F1 => Key::F(1),
            NamedKey::F2 => Key::F(2),
            NamedKey::F3 => Key::F(3),
            NamedKey::F4 => Key::F(4),
            NamedKey::F5 => Key::F(5),
            NamedKey::F6 => Key::F(6),
            NamedKey::F7 => Key::F(7),
            NamedKey::F8 => Key::F(8),
            NamedKey::F9 => Key::F(9),
            NamedKey::F10 => Key::F(10),
            NamedKey::F11 => Key::F(11),
            NamedKey::F12 => Key::F(12),

            _ => return None,
        },
        WinitKey::Character(c) => {
            let mut chars = c.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) if ch == ' ' => Key::Space,
                (Some(ch), None) => Key::Char(ch.to_uppercase().next().unwrap_or(ch)),
                // Dead-key compositions and multi-char sequences arrive as text.
                _ => return None,
            }
        }
        _ => return None,
    };
    Some(key)
}

/// Convert winit touch phase to a pointer kind
pub fn convert_touch_phase(phase: TouchPhase) -> PointerKind {
    match phase {
        TouchPhase::Started => PointerKind::Press,
        TouchPhase::Moved => PointerKind::Move,
        TouchPhase::Ended => PointerKind::Release,
        TouchPhase::Cancelled => PointerKind::Cancel,
    }
}

/// Text to deliver for a key event.
///
/// Only presses carry text, with control characters removed. While an input
/// method is active its commits deliver the text instead.
pub fn key_text(text: Option<&str>, state: ElementState, ime_active: bool) -> Option<String> {
    if ime_active || state != ElementState::Pressed {
        return None;
    }
    let text: String = text?.chars().filter(|c| !c.is_control()).collect();
    (!text.is_empty()).then_some(text)
}

/// Feed one wheel event into the source's scroll accumulator.
///
/// winit reports positive deltas when content should move down (scrolling
/// up); the normalized scroll is positive when scrolling down, so both
/// kinds of delta are negated. Line deltas count wheel notches; pixel deltas
/// come from trackpads and end their gesture with `TouchPhase::Ended`.
pub fn apply_wheel<C: Callbacks>(
    source: &mut EventSource<C>,
    delta: MouseScrollDelta,
    phase: TouchPhase,
    time: Duration,
) {
    match delta {
        MouseScrollDelta::LineDelta(x, y) => {
            if x != 0.0 {
                source.axis_notches(time, Axis::Horizontal, -x);
            }
            if y != 0.0 {
                source.axis_notches(time, Axis::Vertical, -y);
            }
        }
        MouseScrollDelta::PixelDelta(pos) => {
            if pos.x != 0.0 {
                source.axis(time, Axis::Horizontal, -pos.x as f32);
            }
            if pos.y != 0.0 {
                source.axis(time, Axis::Vertical, -pos.y as f32);
            }
        }
    }
    if phase == TouchPhase::Ended {
        source.axis_stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_buttons_dropped() {
        assert_eq!(
            convert_mouse_button(WinitMouseButton::Left),
            Some(Buttons::PRIMARY)
        );
        assert_eq!(convert_mouse_button(WinitMouseButton::Other(9)), None);
        assert_eq!(convert_mouse_button(WinitMouseButton::Back), None);
    }

    #[test]
    fn test_key_conversion() {
        assert_eq!(
            convert_key(&WinitKey::Named(NamedKey::ArrowLeft)),
            Some(Key::Left)
        );
        assert_eq!(convert_key(&WinitKey::Named(NamedKey::F11)), Some(Key::F(11)));
        assert_eq!(
            convert_key(&WinitKey::Character("a".into())),
            Some(Key::Char('A'))
        );
        assert_eq!(convert_key(&WinitKey::Character("ab".into())), None);
        assert_eq!(convert_key(&WinitKey::Named(NamedKey::MediaPlay)), None);
    }

    #[test]
    fn test_modifiers() {
        let mods = convert_modifiers(ModifiersState::SHIFT | ModifiersState::SUPER);
        assert_eq!(mods, Modifiers::SHIFT | Modifiers::META);
    }

    #[test]
    fn test_key_text() {
        assert_eq!(
            key_text(Some("a"), ElementState::Pressed, false),
            Some("a".to_string())
        );
        assert_eq!(key_text(Some("a"), ElementState::Released, false), None);
        assert_eq!(key_text(Some("\u{8}"), ElementState::Pressed, false), None);
        // Commits from the input method carry the text instead.
        assert_eq!(key_text(Some("a"), ElementState::Pressed, true), None);
    }

    #[test]
    fn test_touch_phase() {
        assert_eq!(convert_touch_phase(TouchPhase::Started), PointerKind::Press);
        assert_eq!(convert_touch_phase(TouchPhase::Cancelled), PointerKind::Cancel);
    }
}
