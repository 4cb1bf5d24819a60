//! Per-frame pose checks: is the face frontal, is it centered.

use crate::config::{CenteringThresholds, FrontalThresholds};
use crate::types::{FaceObservation, Point};

/// Measurements within this distance of a threshold count as lying on it.
///
/// Normalized coordinates pick up rounding error (`0.7 - 0.5` is not exactly
/// `0.2` in f32), and a value on the threshold must fail the check.
pub const BOUNDARY_EPSILON: f32 = 1e-6;

const FRAME_CENTER: Point = Point::new(0.5, 0.5);

/// Raw geometry behind an [`AlignmentVerdict`], all in normalized units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PoseMeasurements {
    /// Vertical distance between the two eyes (head roll).
    pub eye_diff_y: f32,
    /// Horizontal distance between the eye midpoint and the nose tip (head yaw).
    pub nose_offset: f32,
    /// Horizontal distance of the box center from the frame center.
    pub center_offset_x: f32,
    /// Vertical distance of the box center from the frame center.
    pub center_offset_y: f32,
}

impl PoseMeasurements {
    pub fn measure(observation: &FaceObservation) -> Self {
        let [first, second] = observation.eyes;
        let eye_mid = observation.eye_midpoint();
        Self {
            eye_diff_y: (first.y - second.y).abs(),
            nose_offset: (eye_mid.x - observation.nose.x).abs(),
            center_offset_x: (observation.box_center.x - FRAME_CENTER.x).abs(),
            center_offset_y: (observation.box_center.y - FRAME_CENTER.y).abs(),
        }
    }
}

/// Outcome of the pose checks for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentVerdict {
    pub is_frontal: bool,
    pub is_centered: bool,
    pub measurements: PoseMeasurements,
}

impl AlignmentVerdict {
    /// Judge an observation against the thresholds.
    pub fn assess(
        observation: &FaceObservation,
        frontal: &FrontalThresholds,
        centering: &CenteringThresholds,
    ) -> Self {
        let m = PoseMeasurements::measure(observation);
        let is_frontal = strictly_within(m.eye_diff_y, frontal.eye_diff_y)
            && strictly_within(m.nose_offset, frontal.nose_offset);
        let is_centered = strictly_within(m.center_offset_x, centering.x)
            && strictly_within(m.center_offset_y, centering.y);

        Self {
            is_frontal,
            is_centered,
            measurements: m,
        }
    }

    pub fn is_aligned(&self) -> bool {
        self.is_frontal && self.is_centered
    }
}

/// `value < limit`, with values on the limit (up to rounding) rejected.
fn strictly_within(value: f32, limit: f32) -> bool {
    value < limit - BOUNDARY_EPSILON
}
