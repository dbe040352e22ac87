//! Scroll unification
//!
//! Native scroll input arrives as axis values grouped into pointer frames.
//! Wheels report discrete notches, trackpads report continuous distances.
//! [`ScrollState`] accumulates one frame, scales discrete frames into the
//! continuous unit and feeds continuous frames to the fling extrapolators.

use crate::config::{FlingConfig, ScrollConfig};
use crate::fling::{Extrapolation, FlingAnimation};
use crate::unit::{Config, Point};
use std::time::{Duration, Instant};

/// Scroll axis
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Default)]
struct Fling {
    x: Extrapolation,
    y: Extrapolation,
    anim: FlingAnimation,
    /// The continuous gesture stopped; start a fling on the next flush
    start: bool,
    /// Unit direction of the fling
    dir: Point,
}

/// Accumulated scroll for the current pointer frame, plus fling state
#[derive(Debug)]
pub struct ScrollState {
    config: ScrollConfig,
    fling_config: FlingConfig,
    time: Duration,
    steps: (i32, i32),
    dist: Point,
    fling: Fling,
}

impl ScrollState {
    pub fn new(config: ScrollConfig, fling_config: FlingConfig) -> Self {
        Self {
            config,
            fling_config,
            time: Duration::ZERO,
            steps: (0, 0),
            dist: Point::ZERO,
            fling: Fling::default(),
        }
    }

    /// Continuous axis motion in pixels
    pub fn axis(&mut self, t: Duration, axis: Axis, value: f32) {
        self.reset_fling();
        if self.dist.is_zero() {
            self.time = t;
        }
        match axis {
            Axis::Horizontal => self.dist.x += value,
            Axis::Vertical => self.dist.y += value,
        }
    }

    /// Mark the current frame as coming from a notched wheel
    pub fn axis_discrete(&mut self, axis: Axis, steps: i32) {
        self.reset_fling();
        match axis {
            Axis::Horizontal => self.steps.0 += steps,
            Axis::Vertical => self.steps.1 += steps,
        }
    }

    /// Wheel motion from a source that only counts notches
    pub fn axis_notches(&mut self, t: Duration, axis: Axis, notches: f32) {
        self.axis(t, axis, notches * self.config.notch_px);
        // Fractional notches (high resolution wheels) still count as discrete.
        let steps = notches.round() as i32;
        let steps = if steps == 0 && notches != 0.0 {
            notches.signum() as i32
        } else {
            steps
        };
        self.axis_discrete(axis, steps);
    }

    /// The continuous gesture ended (finger lifted)
    pub fn axis_stop(&mut self) {
        self.fling.start = true;
    }

    /// Take the accumulated scroll, including any fling distance due at
    /// `now`.
    ///
    /// Returns the unified delta and the native time of the frame, or `None`
    /// when there is nothing to report.
    pub fn flush(&mut self, now: Instant) -> Option<(Point, Duration)> {
        let mut fling = Point::ZERO;
        if self.fling.anim.active() {
            let dist = self.fling.anim.tick(now);
            fling = self.fling.dir.scale(dist);
        }
        let mut dist = self.dist;
        if self.steps.0 != 0 {
            dist.x *= self.config.discrete_scale;
        }
        if self.steps.1 != 0 {
            dist.y *= self.config.discrete_scale;
        }
        let total = dist + fling;
        let time = self.time;
        if self.steps == (0, 0) && !self.dist.is_zero() {
            // Only continuous frames describe finger velocity.
            self.fling.x.sample_delta(time, -self.dist.x);
            self.fling.y.sample_delta(time, -self.dist.y);
        }
        self.dist = Point::ZERO;
        self.steps = (0, 0);
        if total.is_zero() {
            return None;
        }
        Some((total, time))
    }

    /// Start a pending fling. Returns true if an animation started and the
    /// event loop needs waking.
    pub fn start_fling(&mut self, cfg: &Config, now: Instant) -> bool {
        if !self.fling.start {
            return false;
        }
        self.fling.start = false;
        let est_x = self.fling.x.estimate();
        let est_y = self.fling.y.estimate();
        self.fling.x = Extrapolation::default();
        self.fling.y = Extrapolation::default();
        let speed = est_x.velocity.hypot(est_y.velocity);
        if !self
            .fling
            .anim
            .start(cfg, &self.fling_config, now, speed)
        {
            return false;
        }
        // Samples are negated distances, so velocity points against the
        // scroll direction.
        let inv = 1.0 / speed;
        self.fling.dir = Point::new(-est_x.velocity * inv, -est_y.velocity * inv);
        tracing::trace!(speed, "fling started");
        true
    }

    /// Stop any fling in progress, or pending start
    pub fn reset_fling(&mut self) {
        self.fling.start = false;
        self.fling.anim.stop();
    }

    pub fn fling_active(&self) -> bool {
        self.fling.anim.active()
    }
}

impl Default for ScrollState {
    fn default() -> Self {
        Self::new(ScrollConfig::default(), FlingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_discrete_and_continuous_share_units() {
        let now = Instant::now();
        let config = ScrollConfig::default();

        // Three wheel notches.
        let mut wheel = ScrollState::default();
        wheel.axis_notches(ms(0), Axis::Vertical, 3.0);
        let (discrete, _) = wheel.flush(now).unwrap();

        // The same travel reported by a trackpad.
        let mut pad = ScrollState::default();
        let raw = 3.0 * config.notch_px * config.discrete_scale;
        pad.axis(ms(0), Axis::Vertical, raw);
        let (continuous, _) = pad.flush(now).unwrap();

        assert_eq!(discrete.y, 300.0);
        assert_eq!(discrete, continuous);
    }

    #[test]
    fn test_native_discrete_frame() {
        // Compositor-style: axis value plus a separate discrete step count.
        let mut s = ScrollState::default();
        s.axis(ms(4), Axis::Horizontal, -10.0);
        s.axis_discrete(Axis::Horizontal, -1);
        let (d, t) = s.flush(Instant::now()).unwrap();
        assert_eq!(d, Point::new(-100.0, 0.0));
        assert_eq!(t, ms(4));
    }

    #[test]
    fn test_notch_steps_keep_sign_and_count() {
        let mut s = ScrollState::default();
        s.axis_notches(ms(0), Axis::Vertical, -3.0);
        assert_eq!(s.steps.1, -3);
        let (d, _) = s.flush(Instant::now()).unwrap();
        assert_eq!(d.y, -300.0);

        s.axis_notches(ms(1), Axis::Horizontal, -0.25);
        assert_eq!(s.steps.0, -1);
        s.axis_notches(ms(1), Axis::Vertical, 0.25);
        assert_eq!(s.steps.1, 1);
    }

    #[test]
    fn test_empty_flush() {
        let mut s = ScrollState::default();
        assert!(s.flush(Instant::now()).is_none());
    }

    #[test]
    fn test_fling_after_continuous_gesture() {
        let now = Instant::now();
        let cfg = Config::new(1.0, 1.0, now);
        let mut s = ScrollState::default();
        for i in 0..6 {
            s.axis(ms(i * 10), Axis::Vertical, 20.0);
            s.flush(now).unwrap();
        }
        s.axis_stop();
        assert!(s.start_fling(&cfg, now));
        assert!(s.fling_active());

        let (d, _) = s.flush(now + ms(16)).unwrap();
        // Continues in the direction of the gesture.
        assert!(d.y > 0.0);
        assert_eq!(d.x, 0.0);
    }

    #[test]
    fn test_wheel_does_not_fling() {
        let now = Instant::now();
        let cfg = Config::new(1.0, 1.0, now);
        let mut s = ScrollState::default();
        for i in 0..6 {
            s.axis_notches(ms(i * 10), Axis::Vertical, 1.0);
            s.flush(now);
        }
        s.axis_stop();
        assert!(!s.start_fling(&cfg, now));
    }

    #[test]
    fn test_new_input_stops_fling() {
        let now = Instant::now();
        let cfg = Config::new(1.0, 1.0, now);
        let mut s = ScrollState::default();
        for i in 0..6 {
            s.axis(ms(i * 10), Axis::Vertical, 20.0);
            s.flush(now);
        }
        s.axis_stop();
        assert!(s.start_fling(&cfg, now));
        s.axis(ms(100), Axis::Vertical, 1.0);
        assert!(!s.fling_active());
    }
}
