//! Tessera Desktop Platform
//!
//! Windowing, input and GPU surfaces for macOS, Windows, and Linux using
//! winit and wgpu.
//!
//! This crate implements the `tessera_platform` traits for desktop platforms.
//! One window is supported per process; creating a second event loop while
//! the first is alive fails with `PlatformError::MultipleWindows`.
//!
//! # Example
//!
//! ```ignore
//! use tessera_platform::prelude::*;
//! use tessera_platform_desktop::{DesktopPlatform, WgpuContext, WgpuTarget};
//!
//! fn main() -> Result<()> {
//!     let platform = DesktopPlatform::new(PlatformConfig::default())?;
//!     let event_loop = platform.create_event_loop(WindowOptions::new("demo"))?;
//!     event_loop.run(MyApp::default())
//! }
//! ```

pub mod event_loop;
pub mod gpu;
pub mod input;
pub mod window;

pub use event_loop::DesktopEventLoop;
pub use gpu::{create_context, WgpuBackend, WgpuContext, WgpuOffscreen, WgpuTarget};
pub use window::{DesktopDriver, DesktopWindow, UserEvent};

use tessera_platform::{Platform, PlatformConfig, Result, WindowOptions};

/// Desktop platform implementation
///
/// Provides windowing and input for macOS, Windows, and Linux.
pub struct DesktopPlatform {
    config: PlatformConfig,
}

impl Platform for DesktopPlatform {
    type EventLoop = DesktopEventLoop;

    fn new(config: PlatformConfig) -> Result<Self> {
        Ok(Self { config })
    }

    fn create_event_loop(&self, options: WindowOptions) -> Result<Self::EventLoop> {
        DesktopEventLoop::new(options, self.config.clone())
    }

    fn name(&self) -> &'static str {
        "desktop"
    }
}

impl DesktopPlatform {
    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }
}
