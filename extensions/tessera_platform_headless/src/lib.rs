//! Tessera Headless Platform
//!
//! A window without a display server: native messages come from an
//! in-process queue fed through [`HeadlessHandle`], and GPU contexts render
//! into a CPU framebuffer. Used by tests, CI and offscreen tools.
//!
//! # Example
//!
//! ```ignore
//! use tessera_platform::prelude::*;
//! use tessera_platform_headless::{HeadlessPlatform, NativeMessage};
//!
//! let platform = HeadlessPlatform::new(PlatformConfig::default())?;
//! let event_loop = platform.create_event_loop(WindowOptions::new("test"))?;
//! let handle = event_loop.handle();
//! handle.configure(640, 480);
//! event_loop.run(app)?;
//! ```

pub mod event_loop;
pub mod handle;
pub mod input;
pub mod software;

pub use event_loop::{HeadlessDriver, HeadlessEventLoop};
pub use handle::{HeadlessHandle, NativeMessage, Posted};
pub use software::{
    create_context, Framebuffer, NativeSurface, SoftwareBackend, SoftwareContext, SoftwareFaults,
    SoftwareOffscreen, SoftwareOptions, SoftwareStats, SoftwareTarget, SoftwareWindow,
    StatsSnapshot,
};

use tessera_platform::{Platform, PlatformConfig, Result, WindowOptions};

/// Headless platform implementation
pub struct HeadlessPlatform {
    config: PlatformConfig,
    software: SoftwareOptions,
}

impl Platform for HeadlessPlatform {
    type EventLoop = HeadlessEventLoop;

    fn new(config: PlatformConfig) -> Result<Self> {
        Ok(Self {
            config,
            software: SoftwareOptions::default(),
        })
    }

    fn create_event_loop(&self, options: WindowOptions) -> Result<Self::EventLoop> {
        Ok(HeadlessEventLoop::new(
            options,
            self.config.clone(),
            self.software.clone(),
        ))
    }

    fn name(&self) -> &'static str {
        "headless"
    }
}

impl HeadlessPlatform {
    /// Set the capabilities of the simulated GPU
    pub fn with_software(mut self, software: SoftwareOptions) -> Self {
        self.software = software;
        self
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }
}
