//! Animation scheduling and cross-thread wakeups
//!
//! While a window is animating, its event loop must be interrupted once per
//! frame without the application asking again. The request usually comes
//! from another thread (a timer, an input reactor) while the redraw runs on
//! the UI thread, so the scheduler only keeps a single "redraw due" flag and
//! forwards the first request to a backend [`Wake`] primitive. Further
//! requests are coalesced until the loop drains the flag with
//! [`AnimationScheduler::take_wake`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Interrupts a blocked event loop.
///
/// Implementations must never block and may be called from any thread.
pub trait Wake: Send + Sync {
    fn wake(&self);
}

impl<F> Wake for F
where
    F: Fn() + Send + Sync,
{
    fn wake(&self) {
        self()
    }
}

/// Level-triggered redraw scheduler
pub struct AnimationScheduler {
    animating: AtomicBool,
    pending: AtomicBool,
    waker: Box<dyn Wake>,
}

impl AnimationScheduler {
    pub fn new(waker: impl Wake + 'static) -> Self {
        Self {
            animating: AtomicBool::new(false),
            pending: AtomicBool::new(false),
            waker: Box::new(waker),
        }
    }

    /// Enable or disable continuous redraws.
    ///
    /// Enabling arms one wake immediately.
    pub fn set_animating(&self, animating: bool) {
        self.animating.store(animating, Ordering::Release);
        if animating {
            self.wake();
        }
    }

    pub fn is_animating(&self) -> bool {
        self.animating.load(Ordering::Acquire)
    }

    /// Request a redraw. No-op while a request is already outstanding.
    pub fn wake(&self) {
        if !self.pending.swap(true, Ordering::AcqRel) {
            self.waker.wake();
        }
    }

    /// Drain the outstanding request, if any.
    ///
    /// Called by the event loop before it decides whether to draw; the next
    /// `wake` after this reaches the backend primitive again.
    pub fn take_wake(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Whether a request is outstanding, without draining it
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for AnimationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationScheduler")
            .field("animating", &self.is_animating())
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// Single-slot notification primitive for loops that block on a condition
/// variable.
///
/// `notify` never blocks; `wait` returns once at least one notification was
/// posted since the previous `wait` and clears them all.
#[derive(Debug, Default)]
pub struct Notifier {
    signaled: Mutex<bool>,
    cond: Condvar,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self) {
        let mut signaled = self.signaled.lock().unwrap_or_else(|e| e.into_inner());
        *signaled = true;
        self.cond.notify_one();
    }

    /// Block until notified, draining all pending notifications
    pub fn wait(&self) {
        let mut signaled = self.signaled.lock().unwrap_or_else(|e| e.into_inner());
        while !*signaled {
            signaled = self.cond.wait(signaled).unwrap_or_else(|e| e.into_inner());
        }
        *signaled = false;
    }

    /// Block until notified or until `timeout` elapses.
    ///
    /// Returns true if a notification was drained.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let signaled = self.signaled.lock().unwrap_or_else(|e| e.into_inner());
        let (mut signaled, _) = self
            .cond
            .wait_timeout_while(signaled, timeout, |s| !*s)
            .unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *signaled, false)
    }
}
