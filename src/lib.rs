//! # face-gate
//!
//! Hands-free face capture: decide *when* a camera frame is good enough to
//! keep, and show the user how close they are.
//!
//! This crate provides:
//! - **Frame gate**: a per-frame state machine over face detector output
//!   with a warm-up period, a continuous-hold timer and a one-shot capture
//! - **Progress overlay**: a guide oval with a progress arc, drawn through
//!   the [`Surface`] trait, plus a software [`RasterSurface`]
//! - **Capture pipeline**: start / tick / reset / stop lifecycle around a
//!   pluggable [`FaceDetector`]
//!
//! ## Gate Overview
//!
//! 1. For the first 2 s after the stream starts, detector output is ignored
//! 2. Each later frame is judged frontal (eyes level, nose between the
//!    eyes) and centered (box center near the frame center)
//! 3. The first aligned frame starts a hold timer; any other frame clears it
//! 4. After 1.5 s of continuous alignment the capture fires, exactly once
//!    until the next reset
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use face_gate::{
//!     BoundingBox, CapturePipeline, Detection, ManualClock, Point, RasterSurface,
//!     ScriptedDetector, ScriptedFrame, Tick,
//! };
//! use image::RgbaImage;
//!
//! let face = Detection::new(
//!     0.9,
//!     BoundingBox::new(0.35, 0.3, 0.3, 0.4),
//!     vec![Point::new(0.45, 0.45), Point::new(0.55, 0.45), Point::new(0.5, 0.52)],
//! );
//! let detector = ScriptedDetector::new(vec![ScriptedFrame::single(face); 400]);
//! let clock = ManualClock::new();
//! let mut pipeline = CapturePipeline::new(detector, RasterSurface::new(1, 1), clock.clone());
//! pipeline.start().unwrap();
//!
//! let frame = RgbaImage::new(64, 48);
//! let mut captured = false;
//! while !captured {
//!     clock.advance(Duration::from_millis(16));
//!     captured = matches!(pipeline.tick(&frame), Tick::Captured { .. });
//! }
//! assert!(pipeline.captured_image().is_some());
//! ```
//!
//! ## Custom Surfaces
//!
//! Implement [`Surface`] to draw the overlay somewhere else, e.g. a GPU
//! texture or a browser canvas. The gate never touches the surface, so it
//! can be tested without one.

pub mod alignment;
pub mod clock;
pub mod config;
pub mod detector;
mod error;
pub mod gate;
pub mod pipeline;
pub mod raster;
pub mod render;
pub mod trace;
mod types;

pub use alignment::{AlignmentVerdict, PoseMeasurements};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{
    CenteringThresholds, FrontalThresholds, GateConfig, GuideRatios, REQUIRED_DURATION,
    WARM_UP_TIME,
};
pub use detector::{FaceDetector, ScriptedDetector, ScriptedFrame};
pub use error::{Error, Result};
pub use gate::{FrameGate, GatingState, RenderInstruction};
pub use pipeline::{CapturePipeline, Phase, Status, Tick};
pub use raster::RasterSurface;
pub use render::{CapturedImage, Color, Dash, Oval, OverlayStyle, ProgressRenderer, Stroke, Surface};
pub use trace::{DetectionTrace, TraceEntry};
pub use types::{BoundingBox, Detection, FaceObservation, Point, LEFT_EYE, NOSE_TIP, RIGHT_EYE};
