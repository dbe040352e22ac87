//! Units, geometry and the per-frame unit configuration
//!
//! Layout code measures in density-independent pixels (`dp`) and
//! scale-independent pixels (`sp`, dp further scaled by the user's font
//! preference). A [`Config`] snapshot converts both to device pixels.

use std::time::Instant;

/// Measurement unit of a [`Value`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Unit {
    /// Device pixels
    Px,
    /// Density-independent pixels
    Dp,
    /// Scale-independent pixels
    Sp,
}

/// A length in some [`Unit`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Value {
    pub v: f32,
    pub unit: Unit,
}

impl Value {
    pub const fn px(v: f32) -> Self {
        Self { v, unit: Unit::Px }
    }

    pub const fn dp(v: f32) -> Self {
        Self { v, unit: Unit::Dp }
    }

    pub const fn sp(v: f32) -> Self {
        Self { v, unit: Unit::Sp }
    }
}

/// Point in window coordinates (device pixels)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    pub fn scale(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s)
    }
}

impl std::ops::Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

/// Size in device pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero (minimized or not yet configured)
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Window insets in device pixels (system bars, display cutouts)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Insets {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

/// Immutable unit configuration for one frame.
///
/// A new value is built for every frame from the window's current scale;
/// it is never updated in place.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    /// Device pixels per dp
    pub px_per_dp: f32,
    /// Device pixels per sp
    pub px_per_sp: f32,
    /// Frame time
    pub now: Instant,
}

impl Config {
    /// Build a configuration from a window scale factor and a font scale
    pub fn new(scale: f32, font_scale: f32, now: Instant) -> Self {
        Self {
            px_per_dp: scale,
            px_per_sp: scale * font_scale,
            now,
        }
    }

    /// Convert a value to whole device pixels, rounding to nearest
    pub fn px(&self, v: Value) -> i32 {
        let r = match v.unit {
            Unit::Px => v.v,
            Unit::Dp => self.px_per_dp * v.v,
            Unit::Sp => self.px_per_sp * v.v,
        };
        r.round() as i32
    }

    /// Convert a value to fractional device pixels
    pub fn px_f32(&self, v: Value) -> f32 {
        match v.unit {
            Unit::Px => v.v,
            Unit::Dp => self.px_per_dp * v.v,
            Unit::Sp => self.px_per_sp * v.v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_px_conversion() {
        let cfg = Config::new(2.0, 1.5, Instant::now());
        assert_eq!(cfg.px(Value::px(10.0)), 10);
        assert_eq!(cfg.px(Value::dp(10.0)), 20);
        assert_eq!(cfg.px(Value::sp(10.0)), 30);
    }

    #[test]
    fn test_px_rounds_to_nearest() {
        let cfg = Config::new(1.25, 1.0, Instant::now());
        assert_eq!(cfg.px(Value::dp(3.0)), 4);
        assert_eq!(cfg.px(Value::dp(1.0)), 1);
        assert_eq!(cfg.px(Value::dp(-3.0)), -4);
    }

    #[test]
    fn test_size_empty() {
        assert!(Size::new(0, 10).is_empty());
        assert!(!Size::new(1, 1).is_empty());
    }
}
