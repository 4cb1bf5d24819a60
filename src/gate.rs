//! The frame gate: warm-up, continuous-hold timing and the one-shot capture.
//!
//! A single timestamp marks when the current run of aligned frames began.
//! Progress is measured against that timestamp, which keeps the gate
//! independent of frame rate and tolerant of dropped frames. Any frame that
//! is not aligned clears it, so an interrupted hold starts again from zero.

use std::time::Duration;

use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use crate::alignment::AlignmentVerdict;
use crate::config::GateConfig;
use crate::error::Result;
use crate::types::FaceObservation;

/// What the overlay should show for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RenderInstruction {
    /// Stream just started; detector output is not trusted yet.
    WarmingUp,
    /// No usable face, or the face is not aligned. Progress is zero.
    Idle,
    /// Face aligned and holding; `progress` is in `[0, 1]`.
    Aligning { progress: f32 },
    /// Hold satisfied. Emitted once per capture attempt.
    CaptureNow,
}

impl RenderInstruction {
    pub fn progress(&self) -> f32 {
        match self {
            RenderInstruction::Aligning { progress } => *progress,
            RenderInstruction::CaptureNow => 1.0,
            RenderInstruction::WarmingUp | RenderInstruction::Idle => 0.0,
        }
    }

    pub fn is_warming_up(&self) -> bool {
        matches!(self, RenderInstruction::WarmingUp)
    }

    pub fn is_aligning(&self) -> bool {
        matches!(self, RenderInstruction::Aligning { .. })
    }
}

/// Mutable state carried from frame to frame during one capture attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatingState {
    pub stream_start: Duration,
    /// Set while the face has been aligned on every frame since this instant.
    pub alignment_start: Option<Duration>,
    pub has_captured: bool,
}

impl GatingState {
    pub fn new(now: Duration) -> Self {
        Self {
            stream_start: now,
            alignment_start: None,
            has_captured: false,
        }
    }

    /// Start a fresh attempt at `now`.
    pub fn reset(&mut self, now: Duration) {
        *self = Self::new(now);
    }
}

/// Maps `(now, observation)` to a [`RenderInstruction`], updating
/// [`GatingState`] on the way.
#[derive(Debug, Clone)]
pub struct FrameGate {
    state: GatingState,
    config: GateConfig,
}

impl FrameGate {
    /// Create a gate with the default timings, stream starting at `now`.
    pub fn new(now: Duration) -> Self {
        Self {
            state: GatingState::new(now),
            config: GateConfig::default(),
        }
    }

    /// Create a gate with custom timings and thresholds.
    pub fn with_config(now: Duration, config: GateConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: GatingState::new(now),
            config,
        })
    }

    pub fn state(&self) -> &GatingState {
        &self.state
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn has_captured(&self) -> bool {
        self.state.has_captured
    }

    /// Evaluate one frame.
    ///
    /// Returns `None` once the capture has fired; callers are expected to
    /// stop feeding frames at that point, and further calls change nothing
    /// until [`FrameGate::reset`].
    pub fn evaluate(
        &mut self,
        now: Duration,
        observation: Option<&FaceObservation>,
    ) -> Option<RenderInstruction> {
        if self.state.has_captured {
            return None;
        }

        let since_start = now.saturating_sub(self.state.stream_start);
        if since_start < self.config.warm_up {
            return Some(RenderInstruction::WarmingUp);
        }

        let Some(observation) = observation else {
            self.lose_alignment("no face");
            return Some(RenderInstruction::Idle);
        };

        let verdict =
            AlignmentVerdict::assess(observation, &self.config.frontal, &self.config.centering);
        trace!(
            "pose: eye_diff_y={:.4} nose_offset={:.4} center=({:.4}, {:.4}) frontal={} centered={}",
            verdict.measurements.eye_diff_y,
            verdict.measurements.nose_offset,
            verdict.measurements.center_offset_x,
            verdict.measurements.center_offset_y,
            verdict.is_frontal,
            verdict.is_centered,
        );

        if !verdict.is_aligned() {
            self.lose_alignment(if verdict.is_frontal {
                "face off center"
            } else {
                "face not frontal"
            });
            return Some(RenderInstruction::Idle);
        }

        let held = match self.state.alignment_start {
            Some(start) => now.saturating_sub(start),
            None => {
                debug!("alignment acquired at {:?}", now);
                self.state.alignment_start = Some(now);
                Duration::ZERO
            }
        };

        if held >= self.config.required_hold {
            self.state.has_captured = true;
            self.state.alignment_start = None;
            info!("alignment held for {:?}, capturing", held);
            return Some(RenderInstruction::CaptureNow);
        }

        let progress = (held.as_secs_f64() / self.config.required_hold.as_secs_f64()).min(1.0);
        Some(RenderInstruction::Aligning {
            progress: progress as f32,
        })
    }

    /// Fraction of the required hold accumulated so far, as of `now`.
    pub fn progress_at(&self, now: Duration) -> f32 {
        if self.state.has_captured {
            return 1.0;
        }
        match self.state.alignment_start {
            Some(start) => {
                let held = now.saturating_sub(start).as_secs_f64();
                (held / self.config.required_hold.as_secs_f64()).min(1.0) as f32
            }
            None => 0.0,
        }
    }

    /// Begin a new attempt: clears the capture flag and the hold, and
    /// restarts the warm-up from `now`.
    pub fn reset(&mut self, now: Duration) {
        self.state.reset(now);
    }

    fn lose_alignment(&mut self, reason: &str) {
        if self.state.alignment_start.take().is_some() {
            debug!("alignment lost: {}", reason);
        }
    }
}
