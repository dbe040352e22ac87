//! Tessera Platform Integration Layer
//!
//! This crate provides the platform-neutral half of Tessera's windowing:
//! normalized window events, animation scheduling and the GPU context
//! lifecycle. Backend crates translate native callbacks into calls on
//! [`EventSource`] and implement [`ContextBackend`] for their surface API.
//!
//! # Architecture
//!
//! - [`Platform`] / [`EventLoop`] - create and run a window
//! - [`Driver`] - what the application may ask of a window, from any thread
//! - [`Callbacks`] - the application, receiving [`Event`]s in native order
//! - [`GpuContext`] - surface binding and presentation for one window
//!
//! # Platform Implementations
//!
//! - `tessera_platform_desktop` - Desktop platforms (macOS, Windows, Linux) using winit and wgpu
//! - `tessera_platform_headless` - In-process message queue and software framebuffer
//!
//! # Example
//!
//! ```ignore
//! use tessera_platform::prelude::*;
//! use tessera_platform_desktop::DesktopPlatform;
//!
//! struct App {
//!     driver: Option<Arc<dyn Driver>>,
//!     ctx: Option<Box<dyn GpuContext>>,
//! }
//!
//! impl Callbacks for App {
//!     fn set_driver(&mut self, driver: Arc<dyn Driver>) {
//!         self.driver = Some(driver);
//!     }
//!
//!     fn event(&mut self, event: Event) {
//!         match event {
//!             Event::Frame(_) => {
//!                 let ctx = self.ctx.get_or_insert_with(|| {
//!                     self.driver.as_ref().unwrap().new_context().unwrap()
//!                 });
//!                 ctx.make_current().unwrap();
//!                 // Render frame
//!                 ctx.present().unwrap();
//!             }
//!             Event::Destroy(_) => self.ctx = None,
//!             _ => {}
//!         }
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let platform = DesktopPlatform::new(PlatformConfig::default())?;
//!     let event_loop = platform.create_event_loop(WindowOptions::new("demo"))?;
//!     event_loop.run(App { driver: None, ctx: None })
//! }
//! ```

pub mod animation;
pub mod config;
pub mod context;
pub mod driver;
mod error;
pub mod event;
pub mod fling;
pub mod input;
mod platform;
pub mod registry;
pub mod scroll;
pub mod source;
pub mod srgb;
pub mod unit;

// Re-export all public types
pub use animation::{AnimationScheduler, Notifier, Wake};
pub use config::{FlingConfig, PlatformConfig, ScrollConfig, VsyncPolicy};
pub use context::{
    with_version_fallback, ApiVersion, ContextBackend, ContextState, GpuContext, PresentError,
    SurfaceContext,
};
pub use driver::{Callbacks, Driver, WindowOptions};
pub use error::{PlatformError, Result};
pub use event::{Event, FrameEvent, Stage};
pub use input::{
    Buttons, Key, KeyEvent, KeyState, Modifiers, PointerEvent, PointerId, PointerKind,
    PointerSource,
};
pub use platform::{EventLoop, Platform};
pub use registry::{SingleWindowGuard, WindowKey, WindowRegistry};
pub use scroll::Axis;
pub use source::EventSource;
pub use srgb::{ColorCorrection, OffscreenFormat};
pub use unit::{Config, Insets, Point, Size, Unit, Value};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::PlatformConfig;
    pub use crate::context::{ContextState, GpuContext};
    pub use crate::driver::{Callbacks, Driver, WindowOptions};
    pub use crate::error::{PlatformError, Result};
    pub use crate::event::{Event, FrameEvent, Stage};
    pub use crate::input::{Key, KeyEvent, KeyState, Modifiers, PointerEvent, PointerKind};
    pub use crate::platform::{EventLoop, Platform};
    pub use crate::srgb::ColorCorrection;
    pub use crate::unit::{Config, Point, Size, Value};
    pub use std::sync::Arc;
}
