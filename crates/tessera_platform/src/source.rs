//! Backend-independent event source
//!
//! Backends translate native callbacks into calls on [`EventSource`], in the
//! order the native system delivers them. The source keeps the window state
//! needed to normalize them (size, scale, stage, pressed buttons, the scroll
//! accumulator) and decides when a frame is due.
//!
//! Frames are synthesized, never queued: any number of resizes, exposes and
//! wakeups between two [`EventSource::dispatch`] calls produce one
//! [`Event::Frame`].

use crate::animation::AnimationScheduler;
use crate::config::PlatformConfig;
use crate::driver::{Callbacks, Driver};
use crate::error::PlatformError;
use crate::event::{Event, FrameEvent, Stage};
use crate::input::{Buttons, KeyEvent, KeyState, PointerEvent, PointerId, PointerKind, PointerSource};
use crate::scroll::{Axis, ScrollState};
use crate::unit::{Config, Insets, Point, Size};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Normalized event stream of one window
pub struct EventSource<C: Callbacks> {
    callbacks: C,
    scheduler: Arc<AnimationScheduler>,
    config: PlatformConfig,

    size: Size,
    scale: f32,
    insets: Option<Insets>,
    stage: Stage,

    buttons: Buttons,
    last_pos: Point,
    scroll: ScrollState,

    sync_pending: bool,
    dead: bool,
    pending_err: Option<PlatformError>,
    destroyed: bool,
}

impl<C: Callbacks> EventSource<C> {
    /// Create the source and hand the driver to the application
    pub fn new(
        mut callbacks: C,
        driver: Arc<dyn Driver>,
        scheduler: Arc<AnimationScheduler>,
        config: PlatformConfig,
    ) -> Self {
        callbacks.set_driver(driver);
        let scroll = ScrollState::new(config.scroll, config.fling);
        Self {
            callbacks,
            scheduler,
            config,
            size: Size::default(),
            scale: 1.0,
            insets: None,
            stage: Stage::Paused,
            buttons: Buttons::empty(),
            last_pos: Point::ZERO,
            scroll,
            sync_pending: false,
            dead: false,
            pending_err: None,
            destroyed: false,
        }
    }

    pub fn scheduler(&self) -> &Arc<AnimationScheduler> {
        &self.scheduler
    }

    pub fn callbacks(&self) -> &C {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut C {
        &mut self.callbacks
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The window is closing; no further frames are delivered
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// `Destroy` was delivered
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Continuous frames are wanted, by the application or a fling
    pub fn is_animating(&self) -> bool {
        self.scheduler.is_animating() || self.scroll.fling_active()
    }

    /// Whether a `dispatch` now would have anything to do
    pub fn needs_dispatch(&self) -> bool {
        !self.destroyed && (self.sync_pending || self.scheduler.is_pending())
    }

    /// Unit configuration at `now`
    pub fn unit_config(&self, now: Instant) -> Config {
        Config::new(self.scale, self.config.font_scale, now)
    }

    /// Deliver an event unless the window is closing. `Destroy` goes
    /// straight to the callbacks from [`EventSource::finish`].
    fn emit(&mut self, event: Event) {
        if self.dead || self.destroyed {
            tracing::trace!(?event, "dropping event of closing window");
            return;
        }
        self.callbacks.event(event);
    }

    fn emit_pointer(&mut self, kind: PointerKind, source: PointerSource, id: PointerId, time: Duration) {
        let event = PointerEvent {
            kind,
            source,
            position: self.last_pos,
            buttons: self.buttons,
            scroll: Point::ZERO,
            pointer_id: id,
            time,
        };
        self.emit(Event::Pointer(event));
    }

    // ------------------------------------------------------------------------
    // Window state
    // ------------------------------------------------------------------------

    /// The drawable size changed (or was confirmed), in device pixels
    pub fn configure(&mut self, width: u32, height: u32) {
        self.size = Size::new(width, height);
        self.sync_pending = true;
    }

    /// The window's display scale changed
    pub fn set_scale(&mut self, scale: f32) {
        if scale != self.scale {
            self.scale = scale;
            self.sync_pending = true;
        }
    }

    pub fn set_insets(&mut self, insets: Option<Insets>) {
        if insets != self.insets {
            self.insets = insets;
            self.sync_pending = true;
        }
    }

    pub fn set_stage(&mut self, stage: Stage) {
        if stage == self.stage {
            return;
        }
        self.stage = stage;
        self.emit(Event::Stage(stage));
        if stage == Stage::Running {
            self.sync_pending = true;
        }
    }

    pub fn set_focus(&mut self, focused: bool) {
        if !focused {
            self.buttons = Buttons::empty();
        }
        self.emit(Event::Focus(focused));
    }

    /// The native system asked for a repaint
    pub fn request_redraw(&mut self) {
        self.sync_pending = true;
    }

    // ------------------------------------------------------------------------
    // Pointer
    // ------------------------------------------------------------------------

    pub fn pointer_motion(&mut self, position: Point, time: Duration) {
        self.flush_scroll(Instant::now());
        self.scroll.reset_fling();
        self.last_pos = position;
        self.emit_pointer(PointerKind::Move, PointerSource::Mouse, PointerId(0), time);
    }

    pub fn pointer_button(&mut self, button: Buttons, pressed: bool, time: Duration) {
        self.flush_scroll(Instant::now());
        self.scroll.reset_fling();
        let kind = if pressed {
            self.buttons |= button;
            PointerKind::Press
        } else {
            self.buttons &= !button;
            PointerKind::Release
        };
        self.emit_pointer(kind, PointerSource::Mouse, PointerId(0), time);
    }

    /// The system took over the pointer (grab, gesture recognizer)
    pub fn pointer_cancel(&mut self) {
        self.scroll.reset_fling();
        self.buttons = Buttons::empty();
        self.emit_pointer(PointerKind::Cancel, PointerSource::Mouse, PointerId(0), Duration::ZERO);
    }

    pub fn touch(&mut self, kind: PointerKind, id: PointerId, position: Point, time: Duration) {
        self.scroll.reset_fling();
        let buttons = match kind {
            PointerKind::Press | PointerKind::Move => Buttons::PRIMARY,
            PointerKind::Release | PointerKind::Cancel => Buttons::empty(),
        };
        let event = PointerEvent {
            kind,
            source: PointerSource::Touch,
            position,
            buttons,
            scroll: Point::ZERO,
            pointer_id: id,
            time,
        };
        self.emit(Event::Pointer(event));
    }

    /// Continuous scroll distance in pixels
    pub fn axis(&mut self, time: Duration, axis: Axis, value: f32) {
        self.scroll.axis(time, axis, value);
    }

    /// Discrete step count accompanying the current frame's axis values
    pub fn axis_discrete(&mut self, axis: Axis, steps: i32) {
        self.scroll.axis_discrete(axis, steps);
    }

    /// Scroll by wheel notches, for sources without pixel distances
    pub fn axis_notches(&mut self, time: Duration, axis: Axis, notches: f32) {
        self.scroll.axis_notches(time, axis, notches);
    }

    /// The continuous scroll gesture ended
    pub fn axis_stop(&mut self) {
        self.scroll.axis_stop();
    }

    /// End of a group of pointer events
    pub fn pointer_frame(&mut self, now: Instant) {
        self.flush_scroll(now);
        let cfg = self.unit_config(now);
        if self.scroll.start_fling(&cfg, now) {
            self.scheduler.wake();
        }
    }

    fn flush_scroll(&mut self, now: Instant) {
        let Some((scroll, time)) = self.scroll.flush(now) else {
            return;
        };
        let event = PointerEvent {
            kind: PointerKind::Move,
            source: PointerSource::Mouse,
            position: self.last_pos,
            buttons: self.buttons,
            scroll,
            pointer_id: PointerId(0),
            time,
        };
        self.emit(Event::Pointer(event));
    }

    // ------------------------------------------------------------------------
    // Keyboard
    // ------------------------------------------------------------------------

    pub fn key(&mut self, event: KeyEvent) {
        if event.state == KeyState::Pressed {
            self.scroll.reset_fling();
        }
        self.emit(Event::Key(event));
    }

    pub fn text(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        self.emit(Event::TextEdit(text));
    }

    // ------------------------------------------------------------------------
    // Frames and teardown
    // ------------------------------------------------------------------------

    /// Deliver a frame if one is due.
    ///
    /// A frame is due when a native repaint is pending or the scheduler was
    /// woken, and the window is running, non-empty and alive. Returns true if
    /// a frame was delivered.
    pub fn dispatch(&mut self, now: Instant) -> bool {
        if self.destroyed {
            return false;
        }
        self.flush_scroll(now);
        let woke = self.scheduler.take_wake();
        let sync = std::mem::take(&mut self.sync_pending);
        if self.dead || !(sync || woke) {
            return false;
        }
        if self.stage != Stage::Running || self.size.is_empty() {
            return false;
        }
        let frame = FrameEvent {
            size: self.size,
            config: self.unit_config(now),
            insets: self.insets,
            sync,
        };
        self.emit(Event::Frame(frame));
        if self.is_animating() {
            self.scheduler.wake();
        }
        true
    }

    /// Mark the window dead after an unrecoverable failure.
    ///
    /// The first error is kept and delivered with `Destroy`.
    pub fn kill(&mut self, err: PlatformError) {
        tracing::error!(error = %err, "window killed");
        if self.pending_err.is_none() {
            self.pending_err = Some(err);
        }
        self.dead = true;
    }

    /// Stop delivering frames; `finish` follows
    pub fn close(&mut self) {
        self.dead = true;
    }

    /// Deliver `Destroy`. Only the first call has an effect.
    pub fn finish(&mut self) {
        if self.destroyed {
            return;
        }
        self.dead = true;
        let err = self.pending_err.take().map(Arc::new);
        self.callbacks.event(Event::Destroy(err));
        self.destroyed = true;
    }
}
