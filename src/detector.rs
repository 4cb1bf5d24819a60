//! The face detector seam.
//!
//! The pipeline only needs one operation from a detector: take a frame and
//! eventually report the faces in it. Anything from an ML runtime to a
//! recorded trace can sit behind [`FaceDetector`].

use std::collections::VecDeque;

use image::RgbaImage;

use crate::error::{Error, Result};
use crate::types::Detection;

pub trait FaceDetector {
    /// Detect faces in a frame. Coordinates in the result are normalized
    /// to the frame size.
    fn detect(&mut self, frame: &RgbaImage) -> Result<Vec<Detection>>;

    /// Release whatever the detector holds. Called once when the pipeline
    /// stops.
    fn close(&mut self) {}
}

impl<D: FaceDetector + ?Sized> FaceDetector for Box<D> {
    fn detect(&mut self, frame: &RgbaImage) -> Result<Vec<Detection>> {
        (**self).detect(frame)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// One scripted detector response.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedFrame {
    Faces(Vec<Detection>),
    Failure(String),
}

impl ScriptedFrame {
    pub fn empty() -> Self {
        ScriptedFrame::Faces(Vec::new())
    }

    pub fn single(detection: Detection) -> Self {
        ScriptedFrame::Faces(vec![detection])
    }
}

/// Replays a fixed sequence of responses, one per submitted frame, and
/// reports no faces once the script runs out. Frame contents are ignored.
#[derive(Debug, Default)]
pub struct ScriptedDetector {
    script: VecDeque<ScriptedFrame>,
    submitted: usize,
    closed: bool,
}

impl ScriptedDetector {
    pub fn new<I>(script: I) -> Self
    where
        I: IntoIterator<Item = ScriptedFrame>,
    {
        Self {
            script: script.into_iter().collect(),
            submitted: 0,
            closed: false,
        }
    }

    /// Append more responses to the end of the script.
    pub fn push(&mut self, frame: ScriptedFrame) {
        self.script.push_back(frame);
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    /// Number of frames submitted so far.
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl FaceDetector for ScriptedDetector {
    fn detect(&mut self, _frame: &RgbaImage) -> Result<Vec<Detection>> {
        if self.closed {
            return Err(Error::Detector("detector is closed".to_string()));
        }
        self.submitted += 1;
        match self.script.pop_front() {
            Some(ScriptedFrame::Faces(faces)) => Ok(faces),
            Some(ScriptedFrame::Failure(message)) => Err(Error::Detector(message)),
            None => Ok(Vec::new()),
        }
    }

    fn close(&mut self) {
        self.closed = true;
        self.script.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, Point};

    fn face() -> Detection {
        Detection::new(
            0.9,
            BoundingBox::new(0.35, 0.3, 0.3, 0.4),
            vec![
                Point::new(0.45, 0.45),
                Point::new(0.55, 0.45),
                Point::new(0.5, 0.52),
            ],
        )
    }

    #[test]
    fn plays_script_in_order() {
        let frame = RgbaImage::new(4, 4);
        let mut detector = ScriptedDetector::new([
            ScriptedFrame::single(face()),
            ScriptedFrame::Failure("model not ready".to_string()),
            ScriptedFrame::empty(),
        ]);

        assert_eq!(detector.detect(&frame).unwrap(), vec![face()]);
        assert!(matches!(detector.detect(&frame), Err(Error::Detector(_))));
        assert!(detector.detect(&frame).unwrap().is_empty());
        assert!(detector.detect(&frame).unwrap().is_empty());
        assert_eq!(detector.submitted(), 4);
        assert_eq!(detector.remaining(), 0);
    }

    #[test]
    fn closed_detector_refuses_frames() {
        let frame = RgbaImage::new(4, 4);
        let mut detector: Box<dyn FaceDetector> =
            Box::new(ScriptedDetector::new([ScriptedFrame::single(face())]));
        detector.close();
        assert!(detector.detect(&frame).is_err());
    }
}
