//! Headless event loop
//!
//! Drains the native message queue, translates each message into an
//! [`EventSource`] call, then dispatches at most one frame. With nothing to
//! do the loop blocks in the [`Notifier`](tessera_platform::Notifier); while
//! animating it wakes once per frame interval.

use crate::handle::{HeadlessHandle, NativeMessage, Posted, Shared};
use crate::input;
use crate::software::{self, SoftwareOptions};
use std::sync::Arc;
use std::time::Instant;
use tessera_platform::{
    AnimationScheduler, Callbacks, Config, Driver, EventLoop, EventSource, GpuContext,
    PlatformConfig, PlatformError, PointerId, Point, Result, Stage, VsyncPolicy, WindowOptions,
};

/// [`Driver`] of a headless window
pub struct HeadlessDriver {
    shared: Arc<Shared>,
    scheduler: Arc<AnimationScheduler>,
    software: SoftwareOptions,
    vsync: VsyncPolicy,
}

impl Driver for HeadlessDriver {
    fn set_animating(&self, animating: bool) {
        self.scheduler.set_animating(animating);
    }

    fn show_text_input(&self, show: bool) {
        tracing::debug!(show, "text input requested");
        self.shared.set_text_input(show);
    }

    fn new_context(&self) -> Result<Box<dyn GpuContext>> {
        let ctx = software::create_context(
            self.software.clone(),
            self.shared.window.clone(),
            self.vsync,
        )?;
        Ok(Box::new(ctx))
    }

    fn close(&self) {
        HeadlessHandle::new(Arc::clone(&self.shared)).close();
    }
}

/// Event loop of one headless window
pub struct HeadlessEventLoop {
    shared: Arc<Shared>,
    options: WindowOptions,
    config: PlatformConfig,
    software: SoftwareOptions,
    scale: f32,
}

impl HeadlessEventLoop {
    pub fn new(options: WindowOptions, config: PlatformConfig, software: SoftwareOptions) -> Self {
        Self {
            shared: Arc::new(Shared::new()),
            options,
            config,
            software,
            scale: 1.0,
        }
    }

    /// Set the initial output scale
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// A handle posting native messages to this window
    pub fn handle(&self) -> HeadlessHandle {
        HeadlessHandle::new(Arc::clone(&self.shared))
    }

    /// Map the window at its initial size
    fn map<C: Callbacks>(&self, source: &mut EventSource<C>) {
        let cfg = Config::new(self.scale, self.config.font_scale, Instant::now());
        let width = cfg.px(self.options.width).max(0) as u32;
        let height = cfg.px(self.options.height).max(0) as u32;
        self.shared.window.update_surface(|s| {
            s.id += 1;
            s.width = width;
            s.height = height;
            s.visible = true;
        });
        tracing::info!(width, height, title = %self.options.title, "headless window created");

        source.set_scale(self.scale);
        source.configure(width, height);
        source.set_stage(Stage::Running);
    }

    fn handle_message<C: Callbacks>(&self, source: &mut EventSource<C>, posted: Posted) {
        let Posted { time, message } = posted;
        match message {
            NativeMessage::Configure { width, height } => {
                self.shared.window.update_surface(|s| {
                    s.width = width;
                    s.height = height;
                });
                source.configure(width, height);
            }
            NativeMessage::Scale(scale) => source.set_scale(scale),
            NativeMessage::Insets(insets) => source.set_insets(insets),
            NativeMessage::Visibility(visible) => {
                self.shared.window.update_surface(|s| {
                    if visible && !s.visible {
                        // Mapping again creates a new surface object.
                        s.id += 1;
                    }
                    s.visible = visible;
                });
                source.set_stage(if visible {
                    Stage::Running
                } else {
                    Stage::Paused
                });
            }
            NativeMessage::Focus(focused) => source.set_focus(focused),
            NativeMessage::Expose => source.request_redraw(),
            NativeMessage::PointerMotion { x, y } => source.pointer_motion(Point::new(x, y), time),
            NativeMessage::PointerButton { code, pressed } => match input::convert_button(code) {
                Some(button) => source.pointer_button(button, pressed, time),
                None => tracing::trace!(code, "unknown pointer button"),
            },
            NativeMessage::PointerCancel => source.pointer_cancel(),
            NativeMessage::Touch { kind, id, x, y } => {
                source.touch(kind, PointerId(id), Point::new(x, y), time)
            }
            NativeMessage::Axis { axis, value } => source.axis(time, axis, value),
            NativeMessage::AxisDiscrete { axis, steps } => source.axis_discrete(axis, steps),
            NativeMessage::AxisNotches { axis, notches } => {
                source.axis_notches(time, axis, notches)
            }
            NativeMessage::AxisStop => source.axis_stop(),
            NativeMessage::PointerFrame => source.pointer_frame(Instant::now()),
            NativeMessage::Key(event) => source.key(event),
            NativeMessage::Text(text) => source.text(text),
            NativeMessage::Close => source.close(),
            NativeMessage::Disconnect(reason) => {
                source.kill(PlatformError::ResourceUnavailable(format!(
                    "display connection lost: {}",
                    reason
                )));
            }
        }
    }
}

impl EventLoop for HeadlessEventLoop {
    fn run<C: Callbacks + 'static>(self, callbacks: C) -> Result<()> {
        let waker = Arc::clone(&self.shared);
        let scheduler = Arc::new(AnimationScheduler::new(move || waker.notifier.notify()));
        let driver = Arc::new(HeadlessDriver {
            shared: Arc::clone(&self.shared),
            scheduler: Arc::clone(&scheduler),
            software: self.software.clone(),
            vsync: self.config.vsync,
        });

        let mut source = EventSource::new(callbacks, driver, scheduler, self.config.clone());
        self.map(&mut source);

        let interval = self.config.frame_interval();
        let mut last_frame: Option<Instant> = None;
        loop {
            for posted in self.shared.drain() {
                self.handle_message(&mut source, posted);
                if source.is_dead() {
                    break;
                }
            }
            if source.is_dead() {
                break;
            }

            if source.needs_dispatch() {
                let now = Instant::now();
                if let Some(due) = last_frame.map(|t| t + interval).filter(|due| *due > now) {
                    self.shared.notifier.wait_timeout(due - now);
                    continue;
                }
                if source.dispatch(now) {
                    last_frame = Some(now);
                }
                continue;
            }

            if self.shared.is_empty() {
                self.shared.notifier.wait();
            }
        }

        source.finish();
        self.shared.window.update_surface(|s| s.visible = false);
        tracing::info!("headless window closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tessera_platform::{Event, Size, Value};

    struct Closer {
        driver: Option<Arc<dyn Driver>>,
        events: Rc<RefCell<Vec<Event>>>,
    }

    impl Callbacks for Closer {
        fn set_driver(&mut self, driver: Arc<dyn Driver>) {
            self.driver = Some(driver);
        }

        fn event(&mut self, event: Event) {
            if event.as_frame().is_some() {
                if let Some(driver) = &self.driver {
                    driver.close();
                }
            }
            self.events.borrow_mut().push(event);
        }
    }

    #[test]
    fn test_initial_size_resolves_dp() {
        let options = WindowOptions::default().size(Value::dp(10.0), Value::dp(5.0));
        let event_loop =
            HeadlessEventLoop::new(options, PlatformConfig::default(), SoftwareOptions::default())
                .with_scale(1.5);
        let events = Rc::new(RefCell::new(Vec::new()));
        event_loop
            .run(Closer {
                driver: None,
                events: Rc::clone(&events),
            })
            .unwrap();

        let events = events.borrow();
        let frame = events.iter().find_map(|e| e.as_frame()).unwrap();
        assert_eq!(frame.size, Size::new(15, 8));
        assert_eq!(frame.config.px_per_dp, 1.5);
        assert!(events.last().unwrap().is_destroy());
    }
}
