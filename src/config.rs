//! Timing and geometry parameters for the capture gate.
//!
//! The defaults are the values the gate ships with; [`GateConfig::validate`]
//! guards embedders that load their own values.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Time after stream start during which detector output is ignored, so the
/// camera's exposure and focus can settle.
pub const WARM_UP_TIME: Duration = Duration::from_millis(2000);

/// Continuous alignment needed before the capture fires.
pub const REQUIRED_DURATION: Duration = Duration::from_millis(1500);

/// Maximum vertical distance between the eyes (normalized).
pub const MAX_EYE_DIFF_Y: f32 = 0.12;

/// Maximum horizontal distance between the eye midpoint and the nose tip.
pub const MAX_NOSE_OFFSET: f32 = 0.12;

/// Maximum horizontal distance of the box center from the frame center.
pub const MAX_CENTER_OFFSET_X: f32 = 0.2;

/// Maximum vertical distance of the box center from the frame center.
/// Wider than horizontal because cameras tend to frame faces high.
pub const MAX_CENTER_OFFSET_Y: f32 = 0.25;

/// Guide oval radii as fractions of the shorter frame side.
pub const GUIDE_RADIUS_X_RATIO: f32 = 0.22;
pub const GUIDE_RADIUS_Y_RATIO: f32 = 0.33;

/// Thresholds for deciding that a face looks straight at the camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrontalThresholds {
    pub eye_diff_y: f32,
    pub nose_offset: f32,
}

impl Default for FrontalThresholds {
    fn default() -> Self {
        Self {
            eye_diff_y: MAX_EYE_DIFF_Y,
            nose_offset: MAX_NOSE_OFFSET,
        }
    }
}

/// Thresholds for deciding that a face sits in the middle of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CenteringThresholds {
    pub x: f32,
    pub y: f32,
}

impl Default for CenteringThresholds {
    fn default() -> Self {
        Self {
            x: MAX_CENTER_OFFSET_X,
            y: MAX_CENTER_OFFSET_Y,
        }
    }
}

/// Size of the guide oval relative to `min(width, height)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuideRatios {
    pub horizontal: f32,
    pub vertical: f32,
}

impl Default for GuideRatios {
    fn default() -> Self {
        Self {
            horizontal: GUIDE_RADIUS_X_RATIO,
            vertical: GUIDE_RADIUS_Y_RATIO,
        }
    }
}

/// Everything the frame gate needs to know.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    pub warm_up: Duration,
    pub required_hold: Duration,
    pub frontal: FrontalThresholds,
    pub centering: CenteringThresholds,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            warm_up: WARM_UP_TIME,
            required_hold: REQUIRED_DURATION,
            frontal: FrontalThresholds::default(),
            centering: CenteringThresholds::default(),
        }
    }
}

impl GateConfig {
    /// Reject configurations the gate cannot honor.
    ///
    /// A zero hold would capture on the very first aligned frame, and
    /// thresholds must be positive finite numbers for the strict
    /// comparisons to mean anything.
    pub fn validate(&self) -> Result<()> {
        if self.required_hold.is_zero() {
            return Err(Error::InvalidConfig(
                "required hold duration must be non-zero".to_string(),
            ));
        }

        let thresholds = [
            ("frontal.eye_diff_y", self.frontal.eye_diff_y),
            ("frontal.nose_offset", self.frontal.nose_offset),
            ("centering.x", self.centering.x),
            ("centering.y", self.centering.y),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{} must be a positive finite number, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

impl GuideRatios {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("horizontal", self.horizontal), ("vertical", self.vertical)] {
            if !value.is_finite() || value <= 0.0 || value > 0.5 {
                return Err(Error::InvalidConfig(format!(
                    "guide ratio {} must be in (0, 0.5], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
