//! Desktop window and driver implementation using winit

use crate::gpu;
use std::sync::{Arc, Mutex};
use tessera_platform::{
    AnimationScheduler, Config, Driver, GpuContext, PlatformError, Result, VsyncPolicy,
    WindowOptions,
};
use winit::dpi::PhysicalSize;
use winit::event_loop::{ActiveEventLoop, EventLoopProxy};
use winit::window::{Window as WinitWindow, WindowAttributes};

/// Messages posted to the event loop from other threads
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserEvent {
    /// The animation scheduler wants a frame
    Wake,
    /// Show or hide the input method
    ShowTextInput(bool),
    /// Close the window
    Close,
}

/// Desktop window wrapping a winit window
pub struct DesktopWindow {
    window: Arc<WinitWindow>,
}

impl DesktopWindow {
    /// Create a new desktop window
    pub fn new(event_loop: &ActiveEventLoop, options: &WindowOptions) -> Result<Self> {
        // Option sizes may be in dp; resolve them against the primary
        // monitor's scale since the window does not exist yet.
        let scale = event_loop
            .primary_monitor()
            .map(|m| m.scale_factor())
            .unwrap_or(1.0) as f32;
        let cfg = Config::new(scale, 1.0, std::time::Instant::now());
        let width = cfg.px(options.width).max(1) as u32;
        let height = cfg.px(options.height).max(1) as u32;

        let attrs = WindowAttributes::default()
            .with_title(&options.title)
            .with_inner_size(PhysicalSize::new(width, height));

        let window = event_loop
            .create_window(attrs)
            .map_err(|e| PlatformError::WindowCreation(e.to_string()))?;
        tracing::info!(width, height, title = %options.title, "window created");

        Ok(Self {
            window: Arc::new(window),
        })
    }

    /// Get the underlying winit window
    pub fn winit_window(&self) -> &WinitWindow {
        &self.window
    }

    /// Get an Arc to the winit window
    pub fn winit_window_arc(&self) -> Arc<WinitWindow> {
        Arc::clone(&self.window)
    }

    pub fn size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    pub fn scale_factor(&self) -> f32 {
        self.window.scale_factor() as f32
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }
}

/// [`Driver`] of a desktop window.
///
/// Calls from other threads reach the UI thread through the event loop
/// proxy.
pub struct DesktopDriver {
    window: Arc<WinitWindow>,
    proxy: Mutex<EventLoopProxy<UserEvent>>,
    scheduler: Arc<AnimationScheduler>,
    vsync: VsyncPolicy,
}

impl DesktopDriver {
    pub fn new(
        window: Arc<WinitWindow>,
        proxy: EventLoopProxy<UserEvent>,
        scheduler: Arc<AnimationScheduler>,
        vsync: VsyncPolicy,
    ) -> Self {
        Self {
            window,
            proxy: Mutex::new(proxy),
            scheduler,
            vsync,
        }
    }

    fn post(&self, event: UserEvent) {
        let proxy = self.proxy.lock().unwrap_or_else(|e| e.into_inner());
        if proxy.send_event(event).is_err() {
            tracing::trace!(?event, "event loop closed, dropping message");
        }
    }
}

impl Driver for DesktopDriver {
    fn set_animating(&self, animating: bool) {
        self.scheduler.set_animating(animating);
    }

    fn show_text_input(&self, show: bool) {
        self.post(UserEvent::ShowTextInput(show));
    }

    fn new_context(&self) -> Result<Box<dyn GpuContext>> {
        let ctx = gpu::create_context(Arc::clone(&self.window), self.vsync)?;
        Ok(Box::new(ctx))
    }

    fn close(&self) {
        self.post(UserEvent::Close);
    }
}
