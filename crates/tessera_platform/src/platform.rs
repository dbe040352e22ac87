//! Platform trait and abstraction

use crate::config::PlatformConfig;
use crate::driver::{Callbacks, WindowOptions};
use crate::error::Result;

/// Platform abstraction trait
///
/// This trait is implemented by each platform backend (desktop, headless)
/// to provide a unified interface for creating windows and running event loops.
pub trait Platform: Send + Sync {
    /// The event loop type for this platform
    type EventLoop: EventLoop;

    /// Create a new platform instance
    fn new(config: PlatformConfig) -> Result<Self>
    where
        Self: Sized;

    /// Create the event loop for one window
    ///
    /// Fails with [`PlatformError::MultipleWindows`](crate::PlatformError)
    /// when the backend supports a single window and one is alive.
    fn create_event_loop(&self, options: WindowOptions) -> Result<Self::EventLoop>;

    /// Get the platform name
    ///
    /// Returns a string like "desktop" or "headless".
    fn name(&self) -> &'static str;
}

/// A window's native event loop
pub trait EventLoop {
    /// Run until the window is destroyed.
    ///
    /// The callbacks receive the driver, then events in native order, ending
    /// with exactly one [`Event::Destroy`](crate::Event::Destroy).
    fn run<C: Callbacks + 'static>(self, callbacks: C) -> Result<()>;
}
