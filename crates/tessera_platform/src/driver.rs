//! Window options, the driver contract and the application callbacks

use crate::context::GpuContext;
use crate::error::Result;
use crate::event::Event;
use crate::unit::Value;
use std::sync::Arc;

/// Window creation options
#[derive(Clone, Debug, PartialEq)]
pub struct WindowOptions {
    /// Initial width
    pub width: Value,
    /// Initial height
    pub height: Value,
    /// Window title
    pub title: String,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            width: Value::dp(800.0),
            height: Value::dp(600.0),
            title: "Tessera".to_string(),
        }
    }
}

impl WindowOptions {
    /// Create window options with a title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the window title
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the initial window size
    pub fn size(mut self, width: Value, height: Value) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// Capabilities a backend exposes to the application.
///
/// Methods may be called from any thread. Calls after the window is
/// destroyed are ignored.
pub trait Driver: Send + Sync {
    /// Enable or disable continuous frames.
    ///
    /// While animating, the window delivers a [`Event::Frame`] per display
    /// refresh. Toggling on and off again before the loop runs yields at most
    /// one extra frame.
    fn set_animating(&self, animating: bool);

    /// Show or hide the on-screen keyboard or input method
    fn show_text_input(&self, show: bool);

    /// Create a GPU context for this window.
    ///
    /// Fails with [`PlatformError::ResourceUnavailable`](crate::PlatformError)
    /// when no usable device exists.
    fn new_context(&self) -> Result<Box<dyn GpuContext>>;

    /// Ask the window to close. A [`Event::Destroy`] follows.
    fn close(&self);
}

/// The application side of a window
pub trait Callbacks {
    /// Called once, before any event, with the window's driver
    fn set_driver(&mut self, driver: Arc<dyn Driver>);

    /// Deliver one event, in native order, on the event loop thread
    fn event(&mut self, event: Event);
}
