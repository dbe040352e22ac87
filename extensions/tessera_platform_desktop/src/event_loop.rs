//! Desktop event loop implementation using winit

use crate::input;
use crate::window::{DesktopDriver, DesktopWindow, UserEvent};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tessera_platform::{
    AnimationScheduler, Callbacks, EventLoop, EventSource, KeyEvent, PlatformConfig,
    PlatformError, PointerId, Point, Result, SingleWindowGuard, Stage, WindowOptions,
    WindowRegistry,
};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, Ime, WindowEvent as WinitWindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop as WinitEventLoop, EventLoopProxy};
use winit::keyboard::ModifiersState;
use winit::window::WindowId;

/// The desktop backend drives a single window per process
static WINDOW_SLOT: AtomicBool = AtomicBool::new(false);

/// Desktop event loop wrapping winit's event loop
pub struct DesktopEventLoop {
    event_loop: WinitEventLoop<UserEvent>,
    options: WindowOptions,
    config: PlatformConfig,
    _guard: SingleWindowGuard,
}

impl DesktopEventLoop {
    /// Create a new desktop event loop.
    ///
    /// Fails with [`PlatformError::MultipleWindows`] while another desktop
    /// event loop is alive.
    pub fn new(options: WindowOptions, config: PlatformConfig) -> Result<Self> {
        let guard = SingleWindowGuard::acquire(&WINDOW_SLOT)?;
        let event_loop = WinitEventLoop::<UserEvent>::with_user_event()
            .build()
            .map_err(|e| PlatformError::EventLoop(e.to_string()))?;

        Ok(Self {
            event_loop,
            options,
            config,
            _guard: guard,
        })
    }
}

impl EventLoop for DesktopEventLoop {
    fn run<C: Callbacks + 'static>(self, callbacks: C) -> Result<()> {
        let proxy = self.event_loop.create_proxy();
        let mut app = DesktopApp::new(self.options, self.config, proxy, callbacks);
        self.event_loop
            .run_app(&mut app)
            .map_err(|e| PlatformError::EventLoop(e.to_string()))?;
        match app.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Internal winit application handler
struct DesktopApp<C: Callbacks> {
    options: WindowOptions,
    config: PlatformConfig,
    proxy: EventLoopProxy<UserEvent>,
    /// Callbacks waiting for the window to exist
    pending: Option<C>,
    source: Option<EventSource<C>>,
    windows: WindowRegistry<WindowId, DesktopWindow>,
    window_id: Option<WindowId>,
    modifiers: ModifiersState,
    /// An input method is composing; its commits carry the text
    ime_active: bool,
    start: Instant,
    error: Option<PlatformError>,
}

impl<C: Callbacks> DesktopApp<C> {
    fn new(
        options: WindowOptions,
        config: PlatformConfig,
        proxy: EventLoopProxy<UserEvent>,
        callbacks: C,
    ) -> Self {
        Self {
            options,
            config,
            proxy,
            pending: Some(callbacks),
            source: None,
            windows: WindowRegistry::new(),
            window_id: None,
            modifiers: ModifiersState::empty(),
            ime_active: false,
            start: Instant::now(),
            error: None,
        }
    }

    fn window(&self) -> Option<&DesktopWindow> {
        self.window_id.as_ref().and_then(|id| self.windows.get(id))
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let Some(callbacks) = self.pending.take() else {
            return Ok(());
        };
        let window = DesktopWindow::new(event_loop, &self.options)?;

        let wake_proxy = Mutex::new(self.proxy.clone());
        let scheduler = Arc::new(AnimationScheduler::new(move || {
            let proxy = wake_proxy.lock().unwrap_or_else(|e| e.into_inner());
            // Fails only once the loop has exited.
            let _ = proxy.send_event(UserEvent::Wake);
        }));
        let driver = Arc::new(DesktopDriver::new(
            window.winit_window_arc(),
            self.proxy.clone(),
            Arc::clone(&scheduler),
            self.config.vsync,
        ));

        let mut source = EventSource::new(callbacks, driver, scheduler, self.config.clone());
        let (width, height) = window.size();
        source.set_scale(window.scale_factor());
        source.configure(width, height);
        source.set_stage(Stage::Running);
        window.request_redraw();

        let id = window.winit_window().id();
        self.windows.insert(id, window);
        self.window_id = Some(id);
        self.source = Some(source);
        Ok(())
    }

    /// Deliver `Destroy`, then drop the native window
    fn teardown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(source) = self.source.as_mut() {
            source.finish();
        }
        if let Some(id) = self.window_id.take() {
            self.windows.remove(&id);
            tracing::info!("window closed");
        }
        event_loop.exit();
    }

    fn redraw_if_needed(&self) {
        if let (Some(source), Some(window)) = (&self.source, self.window()) {
            if source.needs_dispatch() {
                window.request_redraw();
            }
        }
    }
}

impl<C: Callbacks> ApplicationHandler<UserEvent> for DesktopApp<C> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.source.is_none() {
            if let Err(e) = self.create_window(event_loop) {
                tracing::error!("Failed to create window: {}", e);
                self.error = Some(e);
                event_loop.exit();
            }
            return;
        }
        if let Some(source) = self.source.as_mut() {
            source.set_stage(Stage::Running);
        }
        self.redraw_if_needed();
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(source) = self.source.as_mut() {
            source.set_stage(Stage::Paused);
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: UserEvent) {
        match event {
            UserEvent::Wake => self.redraw_if_needed(),
            UserEvent::ShowTextInput(show) => {
                if let Some(window) = self.window() {
                    window.winit_window().set_ime_allowed(show);
                }
                if !show {
                    self.ime_active = false;
                }
            }
            UserEvent::Close => {
                if let Some(source) = self.source.as_mut() {
                    source.close();
                }
                self.teardown(event_loop);
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WinitWindowEvent,
    ) {
        if self.window_id != Some(window_id) {
            tracing::trace!(?window_id, "event for unknown window");
            return;
        }
        if matches!(
            event,
            WinitWindowEvent::CloseRequested | WinitWindowEvent::Destroyed
        ) {
            self.teardown(event_loop);
            return;
        }

        let time = self.start.elapsed();
        let modifiers = self.modifiers;
        let Some(source) = self.source.as_mut() else {
            return;
        };

        match event {
            WinitWindowEvent::Resized(size) => {
                source.configure(size.width, size.height);
            }

            WinitWindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                source.set_scale(scale_factor as f32);
            }

            WinitWindowEvent::Occluded(occluded) => {
                source.set_stage(if occluded {
                    Stage::Paused
                } else {
                    Stage::Running
                });
            }

            WinitWindowEvent::Focused(focused) => {
                source.set_focus(focused);
            }

            WinitWindowEvent::RedrawRequested => {
                source.dispatch(Instant::now());
            }

            WinitWindowEvent::ModifiersChanged(mods) => {
                self.modifiers = mods.state();
            }

            WinitWindowEvent::KeyboardInput { event, .. } => {
                match input::convert_key(&event.logical_key) {
                    Some(key) => source.key(KeyEvent {
                        key,
                        state: input::convert_key_state(event.state),
                        modifiers: input::convert_modifiers(modifiers),
                    }),
                    None => tracing::trace!(key = ?event.logical_key, "unmapped key"),
                }
                if let Some(text) =
                    input::key_text(event.text.as_deref(), event.state, self.ime_active)
                {
                    source.text(text);
                }
            }

            WinitWindowEvent::Ime(Ime::Enabled) => self.ime_active = true,
            WinitWindowEvent::Ime(Ime::Disabled) => self.ime_active = false,
            WinitWindowEvent::Ime(Ime::Commit(text)) => {
                source.text(text);
            }

            WinitWindowEvent::CursorMoved { position, .. } => {
                source.pointer_motion(Point::new(position.x as f32, position.y as f32), time);
            }

            WinitWindowEvent::MouseInput { state, button, .. } => {
                match input::convert_mouse_button(button) {
                    Some(button) => {
                        source.pointer_button(button, state == ElementState::Pressed, time)
                    }
                    None => tracing::trace!(?button, "unmapped mouse button"),
                }
            }

            WinitWindowEvent::MouseWheel { delta, phase, .. } => {
                input::apply_wheel(source, delta, phase, time);
                // winit delivers one wheel event per native frame.
                source.pointer_frame(Instant::now());
            }

            WinitWindowEvent::Touch(touch) => {
                source.touch(
                    input::convert_touch_phase(touch.phase),
                    PointerId(touch.id),
                    Point::new(touch.location.x as f32, touch.location.y as f32),
                    time,
                );
            }

            _ => {}
        }

        if self.source.as_ref().is_some_and(|s| s.is_dead()) {
            self.teardown(event_loop);
        } else {
            self.redraw_if_needed();
        }
    }
}
