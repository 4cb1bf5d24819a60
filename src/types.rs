use serde::{Deserialize, Serialize};

/// Landmark index of the right eye in a detector's landmark list.
pub const RIGHT_EYE: usize = 0;
/// Landmark index of the left eye.
pub const LEFT_EYE: usize = 1;
/// Landmark index of the nose tip.
pub const NOSE_TIP: usize = 2;

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn midpoint(&self, other: &Point) -> Point {
        (*self + *other) * 0.5
    }

    pub fn dot(&self, other: &Point) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn distance(&self, other: &Point) -> f32 {
        let delta = *self - *other;
        delta.dot(&delta).sqrt()
    }
}

impl std::ops::Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::Mul<f32> for Point {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

/// A bounding box defined by top-left corner, width, and height.
///
/// Detector output uses normalized coordinates, so a box covering the
/// whole frame is `(0, 0, 1, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a box of the given size around a center point.
    pub fn from_center(center: Point, width: f32, height: f32) -> Self {
        Self::new(
            center.x - width * 0.5,
            center.y - height * 0.5,
            width,
            height,
        )
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }
}

/// One face as reported by the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Detector confidence; higher is better.
    pub score: f32,
    pub bounding_box: BoundingBox,
    /// Keypoints in detector order: right eye, left eye, nose tip, then
    /// any further points the model reports.
    pub landmarks: Vec<Point>,
}

impl Detection {
    pub fn new(score: f32, bounding_box: BoundingBox, landmarks: Vec<Point>) -> Self {
        Self {
            score,
            bounding_box,
            landmarks,
        }
    }
}

/// The per-frame measurement the gate works on.
///
/// Only exists when the detector reported a face with both eyes and the
/// nose tip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceObservation {
    pub box_center: Point,
    pub eyes: [Point; 2],
    pub nose: Point,
}

impl FaceObservation {
    pub const fn new(box_center: Point, eyes: [Point; 2], nose: Point) -> Self {
        Self {
            box_center,
            eyes,
            nose,
        }
    }

    /// Extract an observation from a single detection.
    ///
    /// Returns `None` if the eye or nose keypoints are missing.
    pub fn from_detection(detection: &Detection) -> Option<Self> {
        let landmarks = &detection.landmarks;
        if landmarks.len() <= NOSE_TIP {
            return None;
        }
        Some(Self {
            box_center: detection.bounding_box.center(),
            eyes: [landmarks[RIGHT_EYE], landmarks[LEFT_EYE]],
            nose: landmarks[NOSE_TIP],
        })
    }

    /// Pick the highest-scoring detection of a frame and extract it.
    ///
    /// Ties keep the earlier detection. A malformed best detection yields
    /// `None` rather than falling back to a weaker one.
    pub fn select(detections: &[Detection]) -> Option<Self> {
        let best = detections.iter().reduce(|best, candidate| {
            if candidate.score.total_cmp(&best.score).is_gt() {
                candidate
            } else {
                best
            }
        })?;
        Self::from_detection(best)
    }

    pub fn eye_midpoint(&self) -> Point {
        self.eyes[0].midpoint(&self.eyes[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(score: f32, center: Point, landmarks: Vec<Point>) -> Detection {
        Detection::new(score, BoundingBox::from_center(center, 0.3, 0.4), landmarks)
    }

    fn keypoints() -> Vec<Point> {
        vec![
            Point::new(0.45, 0.45),
            Point::new(0.55, 0.45),
            Point::new(0.5, 0.52),
        ]
    }

    #[test]
    fn point_arithmetic() {
        let a = Point::new(3.0, 4.0);
        let b = Point::new(1.0, 2.0);
        assert_eq!(a - b, Point::new(2.0, 2.0));
        assert_eq!(a + b * 2.0, Point::new(5.0, 8.0));
        assert_eq!(a.dot(&b), 11.0);
        assert_eq!(a.distance(&Point::default()), 5.0);
    }

    #[test]
    fn bounding_box_center() {
        let bbox = BoundingBox::new(0.2, 0.1, 0.4, 0.6);
        let center = bbox.center();
        assert!((center.x - 0.4).abs() < 1e-6);
        assert!((center.y - 0.4).abs() < 1e-6);

        let back = BoundingBox::from_center(center, 0.4, 0.6);
        assert!((back.x - 0.2).abs() < 1e-6);
        assert!((back.y - 0.1).abs() < 1e-6);
    }

    #[test]
    fn observation_uses_first_three_landmarks() {
        let mut points = keypoints();
        points.push(Point::new(0.5, 0.7));
        points.push(Point::new(0.3, 0.5));
        let det = detection(0.9, Point::new(0.5, 0.5), points);

        let obs = FaceObservation::from_detection(&det).unwrap();
        assert_eq!(obs.eyes[0], Point::new(0.45, 0.45));
        assert_eq!(obs.eyes[1], Point::new(0.55, 0.45));
        assert_eq!(obs.nose, Point::new(0.5, 0.52));
        assert!((obs.box_center.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn missing_landmarks_is_no_observation() {
        let det = detection(0.9, Point::new(0.5, 0.5), keypoints()[..2].to_vec());
        assert!(FaceObservation::from_detection(&det).is_none());
        assert!(FaceObservation::select(&[det]).is_none());
    }

    #[test]
    fn select_prefers_highest_score() {
        let weak = detection(0.6, Point::new(0.2, 0.2), keypoints());
        let strong = detection(0.95, Point::new(0.5, 0.5), keypoints());
        let obs = FaceObservation::select(&[weak, strong]).unwrap();
        assert!((obs.box_center.x - 0.5).abs() < 1e-6);

        assert!(FaceObservation::select(&[]).is_none());
    }

    #[test]
    fn eye_midpoint() {
        let obs = FaceObservation::new(
            Point::new(0.5, 0.5),
            [Point::new(0.4, 0.4), Point::new(0.6, 0.5)],
            Point::new(0.5, 0.55),
        );
        let mid = obs.eye_midpoint();
        assert!((mid.x - 0.5).abs() < 1e-6);
        assert!((mid.y - 0.45).abs() < 1e-6);
    }
}
