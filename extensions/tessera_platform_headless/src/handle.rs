//! Native message queue of a headless window
//!
//! [`HeadlessHandle`] plays the role of the display server: it posts the
//! messages a compositor would send, from any thread, and wakes the event
//! loop blocked in its [`Notifier`].

use crate::software::{SoftwareFaults, SoftwareStats, SoftwareWindow};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tessera_platform::{Axis, Insets, KeyEvent, Notifier, PointerKind};

/// A message from the simulated display server
#[derive(Clone, Debug, PartialEq)]
pub enum NativeMessage {
    /// The surface was configured to a pixel size
    Configure { width: u32, height: u32 },
    /// The output scale changed
    Scale(f32),
    Insets(Option<Insets>),
    /// The window was mapped or unmapped
    Visibility(bool),
    Focus(bool),
    /// The compositor asked for a repaint
    Expose,
    PointerMotion { x: f32, y: f32 },
    /// Button press or release, as a Linux input event code
    PointerButton { code: u32, pressed: bool },
    PointerCancel,
    Touch {
        kind: PointerKind,
        id: u64,
        x: f32,
        y: f32,
    },
    Axis { axis: Axis, value: f32 },
    AxisDiscrete { axis: Axis, steps: i32 },
    /// Wheel notches, for sources without pixel distances
    AxisNotches { axis: Axis, notches: f32 },
    AxisStop,
    /// End of a group of pointer messages
    PointerFrame,
    Key(KeyEvent),
    Text(String),
    /// The user or the application closed the window
    Close,
    /// The display connection failed
    Disconnect(String),
}

/// A message with its native timestamp
#[derive(Clone, Debug, PartialEq)]
pub struct Posted {
    pub time: Duration,
    pub message: NativeMessage,
}

/// State shared between the event loop and its handles
#[derive(Debug)]
pub(crate) struct Shared {
    queue: Mutex<VecDeque<Posted>>,
    pub(crate) notifier: Notifier,
    start: Instant,
    text_input: AtomicBool,
    pub(crate) window: SoftwareWindow,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            notifier: Notifier::new(),
            start: Instant::now(),
            text_input: AtomicBool::new(false),
            window: SoftwareWindow::default(),
        }
    }

    pub(crate) fn push(&self, posted: Posted) {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(posted);
        self.notifier.notify();
    }

    pub(crate) fn drain(&self) -> Vec<Posted> {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub(crate) fn set_text_input(&self, show: bool) {
        self.text_input.store(show, Ordering::Release);
    }
}

/// Posts native messages to a headless window.
///
/// Cloneable and usable from any thread.
#[derive(Clone, Debug)]
pub struct HeadlessHandle {
    shared: Arc<Shared>,
}

impl HeadlessHandle {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Post a message stamped with the time since the loop was created
    pub fn post(&self, message: NativeMessage) {
        let time = self.shared.elapsed();
        self.post_at(time, message);
    }

    /// Post a message with an explicit native timestamp
    pub fn post_at(&self, time: Duration, message: NativeMessage) {
        self.shared.push(Posted { time, message });
    }

    pub fn configure(&self, width: u32, height: u32) {
        self.post(NativeMessage::Configure { width, height });
    }

    pub fn close(&self) {
        self.post(NativeMessage::Close);
    }

    /// Whether the application asked for the input method
    pub fn text_input_shown(&self) -> bool {
        self.shared.text_input.load(Ordering::Acquire)
    }

    /// Counters of the window's software GPU contexts
    pub fn stats(&self) -> &Arc<SoftwareStats> {
        &self.shared.window.stats
    }

    /// Failure injection for the window's software GPU contexts
    pub fn faults(&self) -> &Arc<SoftwareFaults> {
        &self.shared.window.faults
    }
}
