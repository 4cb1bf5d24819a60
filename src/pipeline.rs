//! Capture lifecycle: start, per-frame ticks, capture, reset and stop.
//!
//! [`CapturePipeline`] owns every collaborator of one capture session: the
//! detector, the drawing surface, the clock and the gate. Each tick runs the
//! whole frame to completion (detect, evaluate, paint) before returning, so
//! the gate is never touched by two frames at once.

use std::fmt;

use image::RgbaImage;
use log::{debug, info, warn};

use crate::clock::Clock;
use crate::config::GateConfig;
use crate::detector::FaceDetector;
use crate::error::{Error, Result};
use crate::gate::{FrameGate, RenderInstruction};
use crate::render::{CapturedImage, ProgressRenderer, Surface};
use crate::types::{Detection, FaceObservation};

/// Where the pipeline is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Created, waiting for the video stream.
    Pending,
    /// Consuming frames.
    Running,
    /// Capture fired; frozen until reset.
    Captured,
    /// Torn down; frames are never consumed again.
    Stopped,
}

/// Message shown to the user alongside the video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Loading,
    GetReady,
    Restarting,
    Captured,
    CameraError(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Loading => write!(f, "Starting camera..."),
            Status::GetReady => write!(f, "Get ready..."),
            Status::Restarting => write!(f, "Restarting..."),
            Status::Captured => write!(f, "Identity captured!"),
            Status::CameraError(reason) => write!(f, "Camera error: {}", reason),
        }
    }
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    /// The frame was not consumed (not running, or a late result).
    Skipped,
    /// The frame was evaluated and the overlay painted.
    Rendered(RenderInstruction),
    /// The capture fired on this frame. `artifact` is false if the still
    /// image could not be produced.
    Captured { artifact: bool },
}

pub struct CapturePipeline<D, S, C>
where
    D: FaceDetector,
    S: Surface,
    C: Clock,
{
    detector: D,
    surface: S,
    clock: C,
    gate: FrameGate,
    renderer: ProgressRenderer,
    phase: Phase,
    status: Status,
    last_instruction: Option<RenderInstruction>,
    captured: Option<CapturedImage>,
}

impl<D, S, C> CapturePipeline<D, S, C>
where
    D: FaceDetector,
    S: Surface,
    C: Clock,
{
    /// Create a pipeline with the default gate timings and overlay.
    pub fn new(detector: D, surface: S, clock: C) -> Self {
        let gate = FrameGate::new(clock.now());
        Self::assemble(detector, surface, clock, gate, ProgressRenderer::new())
    }

    pub fn with_config(
        detector: D,
        surface: S,
        clock: C,
        config: GateConfig,
        renderer: ProgressRenderer,
    ) -> Result<Self> {
        let gate = FrameGate::with_config(clock.now(), config)?;
        Ok(Self::assemble(detector, surface, clock, gate, renderer))
    }

    fn assemble(
        detector: D,
        surface: S,
        clock: C,
        gate: FrameGate,
        renderer: ProgressRenderer,
    ) -> Self {
        Self {
            detector,
            surface,
            clock,
            gate,
            renderer,
            phase: Phase::Pending,
            status: Status::Loading,
            last_instruction: None,
            captured: None,
        }
    }

    /// The video stream is live: start the warm-up now.
    pub fn start(&mut self) -> Result<()> {
        if self.phase == Phase::Stopped {
            return Err(Error::PipelineStopped);
        }
        let now = self.clock.now();
        self.gate.reset(now);
        self.captured = None;
        self.last_instruction = None;
        self.phase = Phase::Running;
        self.status = Status::GetReady;
        info!("capture stream started at {:?}", now);
        Ok(())
    }

    /// Run one frame: detect, evaluate, paint.
    ///
    /// Detector errors are logged and the frame counts as having no face.
    pub fn tick(&mut self, frame: &RgbaImage) -> Tick {
        if self.phase != Phase::Running {
            return Tick::Skipped;
        }
        let result = self.detector.detect(frame);
        self.deliver(frame, result)
    }

    /// Hand in a detector result for `frame`.
    ///
    /// This is the entry point for detectors that answer asynchronously.
    /// A result that arrives after the capture fired, or after the pipeline
    /// stopped, is dropped without touching any state.
    pub fn deliver(&mut self, frame: &RgbaImage, result: Result<Vec<Detection>>) -> Tick {
        if self.phase != Phase::Running {
            debug!("discarding detector result in phase {:?}", self.phase);
            return Tick::Skipped;
        }

        let observation = match result {
            Ok(detections) => FaceObservation::select(&detections),
            Err(e) => {
                warn!("face detection failed: {}", e);
                None
            }
        };

        let (width, height) = frame.dimensions();
        self.surface.resize(width, height);
        self.surface.draw_frame(frame);

        let now = self.clock.now();
        let Some(instruction) = self.gate.evaluate(now, observation.as_ref()) else {
            return Tick::Skipped;
        };
        self.last_instruction = Some(instruction);

        if instruction == RenderInstruction::CaptureNow {
            self.captured = self.renderer.capture(&self.surface);
            self.phase = Phase::Captured;
            self.status = Status::Captured;
            let artifact = self.captured.is_some();
            if artifact {
                info!("captured {}x{} still", width, height);
            }
            return Tick::Captured { artifact };
        }

        self.renderer.paint(&mut self.surface, &instruction);
        Tick::Rendered(instruction)
    }

    /// Start a new attempt: drop the captured image, restart the warm-up
    /// and resume consuming frames.
    pub fn reset(&mut self) -> Result<()> {
        if self.phase == Phase::Stopped {
            return Err(Error::PipelineStopped);
        }
        let now = self.clock.now();
        self.gate.reset(now);
        self.captured = None;
        self.last_instruction = None;
        self.phase = Phase::Running;
        self.status = Status::Restarting;
        info!("capture reset at {:?}", now);
        Ok(())
    }

    /// Stop consuming frames and release the detector. The captured image,
    /// if any, stays available.
    pub fn stop(&mut self) {
        if self.phase == Phase::Stopped {
            return;
        }
        self.phase = Phase::Stopped;
        self.detector.close();
        info!("capture pipeline stopped");
    }

    /// The video source failed; nothing more will arrive.
    pub fn report_camera_error(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("camera error: {}", reason);
        self.stop();
        self.status = Status::CameraError(reason);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn last_instruction(&self) -> Option<RenderInstruction> {
        self.last_instruction
    }

    pub fn gate(&self) -> &FrameGate {
        &self.gate
    }

    pub fn captured_image(&self) -> Option<&CapturedImage> {
        self.captured.as_ref()
    }

    pub fn take_captured_image(&mut self) -> Option<CapturedImage> {
        self.captured.take()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }
}

impl<D, S, C> Drop for CapturePipeline<D, S, C>
where
    D: FaceDetector,
    S: Surface,
    C: Clock,
{
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::detector::{ScriptedDetector, ScriptedFrame};
    use crate::raster::RasterSurface;
    use crate::types::{BoundingBox, Point};
    use std::time::Duration;

    fn face() -> Detection {
        Detection::new(
            0.9,
            BoundingBox::from_center(Point::new(0.5, 0.5), 0.3, 0.4),
            vec![
                Point::new(0.45, 0.45),
                Point::new(0.55, 0.45),
                Point::new(0.5, 0.52),
            ],
        )
    }

    fn pipeline(
        script: Vec<ScriptedFrame>,
    ) -> (
        CapturePipeline<ScriptedDetector, RasterSurface, ManualClock>,
        ManualClock,
    ) {
        let clock = ManualClock::new();
        let pipeline = CapturePipeline::new(
            ScriptedDetector::new(script),
            RasterSurface::new(1, 1),
            clock.clone(),
        );
        (pipeline, clock)
    }

    #[test]
    fn pending_pipeline_skips_frames() {
        let (mut pipeline, _clock) = pipeline(vec![ScriptedFrame::single(face())]);
        let frame = RgbaImage::new(32, 24);
        assert_eq!(*pipeline.status(), Status::Loading);
        assert_eq!(pipeline.tick(&frame), Tick::Skipped);
        assert_eq!(pipeline.detector().submitted(), 0);
    }

    #[test]
    fn surface_follows_frame_size() {
        let (mut pipeline, _clock) = pipeline(vec![]);
        pipeline.start().unwrap();
        pipeline.tick(&RgbaImage::new(32, 24));
        assert_eq!(pipeline.surface().dimensions(), (32, 24));
    }

    #[test]
    fn detector_failure_counts_as_no_face() {
        let (mut pipeline, clock) = pipeline(vec![
            ScriptedFrame::single(face()),
            ScriptedFrame::Failure("inference crashed".to_string()),
            ScriptedFrame::single(face()),
        ]);
        let frame = RgbaImage::new(32, 24);
        pipeline.start().unwrap();

        clock.set(Duration::from_millis(2000));
        assert!(matches!(pipeline.tick(&frame), Tick::Rendered(RenderInstruction::Aligning { .. })));
        clock.set(Duration::from_millis(2500));
        assert_eq!(pipeline.tick(&frame), Tick::Rendered(RenderInstruction::Idle));
        clock.set(Duration::from_millis(3000));
        assert_eq!(
            pipeline.tick(&frame),
            Tick::Rendered(RenderInstruction::Aligning { progress: 0.0 })
        );
        assert!(pipeline.is_running());
    }

    #[test]
    fn late_result_is_discarded() {
        let (mut pipeline, clock) = pipeline(vec![]);
        let frame = RgbaImage::new(32, 24);
        pipeline.start().unwrap();

        clock.set(Duration::from_millis(2000));
        pipeline.deliver(&frame, Ok(vec![face()]));
        clock.set(Duration::from_millis(3500));
        assert_eq!(
            pipeline.deliver(&frame, Ok(vec![face()])),
            Tick::Captured { artifact: true }
        );

        let state = *pipeline.gate().state();
        clock.set(Duration::from_millis(3516));
        assert_eq!(pipeline.deliver(&frame, Ok(vec![face()])), Tick::Skipped);
        assert_eq!(pipeline.deliver(&frame, Err(Error::Detector("late".into()))), Tick::Skipped);
        assert_eq!(*pipeline.gate().state(), state);
        assert_eq!(pipeline.last_instruction(), Some(RenderInstruction::CaptureNow));
    }

    #[test]
    fn failed_snapshot_still_freezes() {
        let clock = ManualClock::new();
        let mut pipeline = CapturePipeline::new(
            ScriptedDetector::new([ScriptedFrame::single(face()), ScriptedFrame::single(face())]),
            RasterSurface::new(0, 0),
            clock.clone(),
        );
        // Zero-sized video leaves nothing to encode.
        let frame = RgbaImage::new(0, 0);
        pipeline.start().unwrap();

        clock.set(Duration::from_millis(2000));
        pipeline.tick(&frame);
        clock.set(Duration::from_millis(3500));
        assert_eq!(pipeline.tick(&frame), Tick::Captured { artifact: false });
        assert!(pipeline.captured_image().is_none());
        assert!(pipeline.gate().has_captured());
        assert_eq!(pipeline.phase(), Phase::Captured);

        pipeline.reset().unwrap();
        assert!(pipeline.is_running());
    }

    #[test]
    fn stop_keeps_capture_and_closes_detector() {
        let (mut pipeline, clock) = pipeline(vec![
            ScriptedFrame::single(face()),
            ScriptedFrame::single(face()),
        ]);
        let frame = RgbaImage::new(32, 24);
        pipeline.start().unwrap();
        clock.set(Duration::from_millis(2000));
        pipeline.tick(&frame);
        clock.set(Duration::from_millis(3500));
        pipeline.tick(&frame);
        assert!(pipeline.captured_image().is_some());

        pipeline.stop();
        pipeline.stop();
        assert!(pipeline.detector().is_closed());
        assert!(pipeline.captured_image().is_some());
        assert_eq!(pipeline.tick(&frame), Tick::Skipped);
        assert!(matches!(pipeline.reset(), Err(Error::PipelineStopped)));
        assert!(matches!(pipeline.start(), Err(Error::PipelineStopped)));
    }

    #[test]
    fn camera_error_stops_pipeline() {
        let (mut pipeline, _clock) = pipeline(vec![]);
        pipeline.report_camera_error("permission denied");
        assert_eq!(pipeline.phase(), Phase::Stopped);
        assert_eq!(
            pipeline.status().to_string(),
            "Camera error: permission denied"
        );
    }

    #[test]
    fn status_messages() {
        assert_eq!(Status::GetReady.to_string(), "Get ready...");
        assert_eq!(Status::Captured.to_string(), "Identity captured!");
    }
}
