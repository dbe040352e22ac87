//! Platform tunables
//!
//! All fields have working defaults; a TOML file only needs the values it
//! overrides:
//!
//! ```toml
//! vsync = "always"
//!
//! [scroll]
//! discrete_scale = 12.0
//!
//! [fling]
//! decay = 5.0
//! ```

use crate::error::{PlatformError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Scroll unification constants
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Pixels reported per wheel notch by sources that only count notches
    pub notch_px: f32,
    /// Multiplier applied to a frame that contained discrete notches.
    ///
    /// Tuned against the Wayland step of 10 px per notch, which scrolls too
    /// little compared to trackpad deltas. Validate against the target
    /// platform's notch granularity.
    pub discrete_scale: f32,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            notch_px: 10.0,
            discrete_scale: 10.0,
        }
    }
}

/// Fling (inertial scroll) constants
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FlingConfig {
    /// Slowest release velocity that starts a fling, in dp per second
    pub min_velocity: f32,
    /// Release velocities are clamped to this, in dp per second
    pub max_velocity: f32,
    /// Exponential decay rate, per second
    pub decay: f32,
    /// The fling stops below this velocity, in px per second
    pub threshold_velocity: f32,
}

impl Default for FlingConfig {
    fn default() -> Self {
        Self {
            min_velocity: 50.0,
            max_velocity: 8000.0,
            decay: 4.0,
            threshold_velocity: 10.0,
        }
    }
}

/// Presentation interval policy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VsyncPolicy {
    /// Block in present only when the platform has no compositor-driven
    /// frame pacing
    #[default]
    Auto,
    /// Always block in present
    Always,
    /// Never block in present
    Never,
}

impl VsyncPolicy {
    /// Resolve against the backend's pacing capability
    pub fn resolve(self, backend_needs_vsync: bool) -> bool {
        match self {
            VsyncPolicy::Auto => backend_needs_vsync,
            VsyncPolicy::Always => true,
            VsyncPolicy::Never => false,
        }
    }
}

/// Platform configuration shared by all backends
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub scroll: ScrollConfig,
    pub fling: FlingConfig,
    pub vsync: VsyncPolicy,
    /// Font scale applied on top of the display scale for sp units
    pub font_scale: f32,
    /// Animation frame interval for backends without a display clock
    pub frame_interval_ms: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            scroll: ScrollConfig::default(),
            fling: FlingConfig::default(),
            vsync: VsyncPolicy::default(),
            font_scale: 1.0,
            frame_interval_ms: 16,
        }
    }
}

impl PlatformConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: PlatformConfig =
            toml::from_str(s).map_err(|e| PlatformError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| PlatformError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    fn validate(&self) -> Result<()> {
        if !positive(self.scroll.notch_px) || !positive(self.scroll.discrete_scale) {
            return Err(PlatformError::Config(
                "scroll constants must be positive".to_string(),
            ));
        }
        if !positive(self.fling.decay) {
            return Err(PlatformError::Config("fling decay must be positive".to_string()));
        }
        if !positive(self.fling.threshold_velocity) {
            return Err(PlatformError::Config(
                "fling threshold_velocity must be positive".to_string(),
            ));
        }
        let (min, max) = (self.fling.min_velocity, self.fling.max_velocity);
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(PlatformError::Config(
                "fling min_velocity exceeds max_velocity".to_string(),
            ));
        }
        if !positive(self.font_scale) {
            return Err(PlatformError::Config("font_scale must be positive".to_string()));
        }
        Ok(())
    }
}

/// Finite and greater than zero
fn positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_default() {
        let config = PlatformConfig::from_toml_str("").unwrap();
        assert_eq!(config, PlatformConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = PlatformConfig::from_toml_str(
            r#"
            vsync = "never"

            [scroll]
            discrete_scale = 12.0
            "#,
        )
        .unwrap();
        assert_eq!(config.vsync, VsyncPolicy::Never);
        assert_eq!(config.scroll.discrete_scale, 12.0);
        assert_eq!(config.scroll.notch_px, 10.0);
        assert_eq!(config.fling, FlingConfig::default());
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = PlatformConfig::from_toml_str("[fling]\ndecay = 0.0\n").unwrap_err();
        assert!(matches!(err, PlatformError::Config(_)));
        assert!(PlatformConfig::from_toml_str("vsync = 3").is_err());
    }

    #[test]
    fn test_rejects_threshold_velocity() {
        for value in ["0.0", "-5.0", "nan", "inf"] {
            let text = format!("[fling]\nthreshold_velocity = {}\n", value);
            let err = PlatformConfig::from_toml_str(&text).unwrap_err();
            assert!(matches!(err, PlatformError::Config(_)), "{}", value);
        }
        let config = PlatformConfig::from_toml_str("[fling]\nthreshold_velocity = 2.5\n").unwrap();
        assert_eq!(config.fling.threshold_velocity, 2.5);
    }

    #[test]
    fn test_vsync_resolution() {
        assert!(VsyncPolicy::Auto.resolve(true));
        assert!(!VsyncPolicy::Auto.resolve(false));
        assert!(VsyncPolicy::Always.resolve(false));
        assert!(!VsyncPolicy::Never.resolve(true));
    }
}
