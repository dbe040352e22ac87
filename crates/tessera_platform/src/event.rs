//! Normalized window events

use crate::error::PlatformError;
use crate::input::{KeyEvent, PointerEvent};
use crate::unit::{Config, Insets, Size};
use std::sync::Arc;

/// Coarse visibility state of a window
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Not visible; no frames are delivered
    #[default]
    Paused,
    /// Visible and eligible to draw
    Running,
}

/// Request to draw a frame
#[derive(Clone, Debug, PartialEq)]
pub struct FrameEvent {
    /// Drawable size in device pixels
    pub size: Size,
    /// Unit configuration for this frame
    pub config: Config,
    /// Areas covered by system UI, on platforms that report them
    pub insets: Option<Insets>,
    /// The frame answers a native repaint (expose, configure) rather than
    /// an animation tick
    pub sync: bool,
}

/// Platform events, in native delivery order.
///
/// `Destroy` is always the last event of a window and is delivered at most
/// once.
#[derive(Clone, Debug)]
pub enum Event {
    /// Time to draw
    Frame(FrameEvent),
    /// Mouse or touch input
    Pointer(PointerEvent),
    /// Key press or release
    Key(KeyEvent),
    /// Committed text from the keyboard or an input method
    TextEdit(String),
    /// Keyboard focus gained or lost
    Focus(bool),
    /// Visibility changed
    Stage(Stage),
    /// The window is gone; `Some` carries the failure that killed it
    Destroy(Option<Arc<PlatformError>>),
}

impl Event {
    pub fn is_destroy(&self) -> bool {
        matches!(self, Event::Destroy(_))
    }

    pub fn as_frame(&self) -> Option<&FrameEvent> {
        match self {
            Event::Frame(frame) => Some(frame),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_default_paused() {
        assert_eq!(Stage::default(), Stage::Paused);
        assert!(Stage::Paused < Stage::Running);
    }

    #[test]
    fn test_destroy_detection() {
        assert!(Event::Destroy(None).is_destroy());
        assert!(!Event::Focus(true).is_destroy());
    }
}
