//! Guide oval and hold-progress overlay.
//!
//! Drawing goes through the [`Surface`] trait so the overlay logic can be
//! exercised without a real canvas. [`crate::raster::RasterSurface`] is the
//! software implementation.

use std::f32::consts::{PI, TAU};

use image::RgbaImage;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::GuideRatios;
use crate::error::Result;
use crate::gate::RenderInstruction;
use crate::types::Point;

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Same color with an opacity given as a fraction.
    pub fn with_opacity(self, opacity: f32) -> Self {
        Self {
            a: (opacity.clamp(0.0, 1.0) * 255.0).round() as u8,
            ..self
        }
    }

    pub fn opacity(&self) -> f32 {
        self.a as f32 / 255.0
    }
}

/// An axis-aligned ellipse in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Oval {
    pub center: Point,
    pub radius_x: f32,
    pub radius_y: f32,
}

impl Oval {
    pub const fn new(center: Point, radius_x: f32, radius_y: f32) -> Self {
        Self {
            center,
            radius_x,
            radius_y,
        }
    }

    /// The portrait face outline centered in a `width` x `height` frame.
    pub fn guide(width: u32, height: u32, ratios: &GuideRatios) -> Self {
        let min_dim = width.min(height) as f32;
        Self {
            center: Point::new(width as f32 * 0.5, height as f32 * 0.5),
            radius_x: min_dim * ratios.horizontal,
            radius_y: min_dim * ratios.vertical,
        }
    }

    /// Ramanujan's approximation of the ellipse perimeter.
    pub fn perimeter(&self) -> f32 {
        let a = self.radius_y;
        let b = self.radius_x;
        PI * (3.0 * (a + b) - ((3.0 * a + b) * (a + 3.0 * b)).sqrt())
    }

    /// Point on the outline at `angle` radians, measured clockwise (in
    /// screen space, y pointing down) from the top of the oval.
    pub fn point_at(&self, angle: f32) -> Point {
        self.center + Point::new(self.radius_x * angle.sin(), -self.radius_y * angle.cos())
    }

    /// Whether a pixel-space point lies inside the oval (boundary included).
    pub fn contains(&self, p: Point) -> bool {
        if self.radius_x <= 0.0 || self.radius_y <= 0.0 {
            return false;
        }
        let nx = (p.x - self.center.x) / self.radius_x;
        let ny = (p.y - self.center.y) / self.radius_y;
        nx * nx + ny * ny <= 1.0
    }

    /// Outline as a closed polyline, starting at the top and running
    /// clockwise. The first point is repeated at the end.
    pub fn outline(&self, segments: usize) -> Vec<Point> {
        let segments = segments.max(3);
        (0..=segments)
            .map(|i| self.point_at(i as f32 / segments as f32 * TAU))
            .collect()
    }
}

/// Line parameters for outline strokes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub width: f32,
    pub color: Color,
    /// Round off the open ends of a partial stroke. A closed outline has
    /// no ends, so this only affects dashed strokes.
    pub round_cap: bool,
}

/// Alternating drawn/skipped lengths along a stroke, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dash {
    pub on: f32,
    pub off: f32,
}

impl Dash {
    /// Whether the point `distance` pixels along the path is drawn.
    pub fn is_on(&self, distance: f32) -> bool {
        let period = self.on + self.off;
        if period <= 0.0 {
            return true;
        }
        distance.rem_euclid(period) < self.on
    }
}

/// The still image produced when the capture fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub width: u32,
    pub height: u32,
    /// JPEG-encoded pixels.
    pub bytes: Vec<u8>,
}

/// An immediate-mode drawing target for the overlay.
pub trait Surface {
    /// Current size in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Match the surface size to the incoming video.
    fn resize(&mut self, width: u32, height: u32);

    /// Paint a video frame over the whole surface.
    fn draw_frame(&mut self, frame: &RgbaImage);

    /// Blend `color` over everything outside `oval`.
    fn fill_outside(&mut self, oval: &Oval, color: Color);

    fn stroke_oval(&mut self, oval: &Oval, stroke: &Stroke);

    /// Stroke the outline from the top, clockwise, following `dash`.
    fn stroke_dashed_oval(&mut self, oval: &Oval, stroke: &Stroke, dash: Dash);

    /// Encode the current contents as a still image.
    fn snapshot(&self) -> Result<CapturedImage>;
}

/// Colors and line widths of the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayStyle {
    /// Mask color outside the oval while no hold is in progress.
    pub idle_mask: Color,
    /// Mask color outside the oval while the face is holding.
    pub aligning_mask: Color,
    /// Guide outline while the camera warms up.
    pub warm_up_outline: Stroke,
    /// Guide outline once detections are being evaluated.
    pub active_outline: Stroke,
    pub progress: Stroke,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            idle_mask: Color::rgb(0, 0, 0).with_opacity(0.85),
            aligning_mask: Color::rgb(0, 0, 0).with_opacity(0.7),
            warm_up_outline: Stroke {
                width: 4.0,
                color: Color::rgb(100, 100, 100).with_opacity(0.5),
                round_cap: false,
            },
            active_outline: Stroke {
                width: 4.0,
                color: Color::rgb(255, 255, 255).with_opacity(0.3),
                round_cap: false,
            },
            progress: Stroke {
                width: 6.0,
                color: Color::rgb(0, 255, 0),
                round_cap: true,
            },
        }
    }
}

/// Paints render instructions onto a [`Surface`].
#[derive(Debug, Clone, Default)]
pub struct ProgressRenderer {
    ratios: GuideRatios,
    style: OverlayStyle,
}

impl ProgressRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_style(ratios: GuideRatios, style: OverlayStyle) -> Result<Self> {
        ratios.validate()?;
        Ok(Self { ratios, style })
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    pub fn guide_oval(&self, width: u32, height: u32) -> Oval {
        Oval::guide(width, height, &self.ratios)
    }

    /// Dash pattern that makes the visible arc `progress` of the perimeter.
    pub fn progress_dash(oval: &Oval, progress: f32) -> Dash {
        let perimeter = oval.perimeter();
        Dash {
            on: perimeter * progress.clamp(0.0, 1.0),
            off: perimeter,
        }
    }

    /// Draw the mask, guide outline and, while holding, the progress arc.
    ///
    /// `CaptureNow` draws nothing: the frame underneath is what gets
    /// captured.
    pub fn paint<S: Surface>(&self, surface: &mut S, instruction: &RenderInstruction) {
        if matches!(instruction, RenderInstruction::CaptureNow) {
            return;
        }

        let (width, height) = surface.dimensions();
        let oval = self.guide_oval(width, height);

        let mask = if instruction.is_aligning() {
            self.style.aligning_mask
        } else {
            self.style.idle_mask
        };
        surface.fill_outside(&oval, mask);

        let outline = if instruction.is_warming_up() {
            &self.style.warm_up_outline
        } else {
            &self.style.active_outline
        };
        surface.stroke_oval(&oval, outline);

        if let RenderInstruction::Aligning { progress } = *instruction {
            if progress > 0.0 {
                let dash = Self::progress_dash(&oval, progress);
                surface.stroke_dashed_oval(&oval, &self.style.progress, dash);
            }
        }
    }

    /// Grab the surface contents as the capture artifact.
    ///
    /// Failures are logged and yield `None`; the caller decides whether to
    /// retry.
    pub fn capture<S: Surface>(&self, surface: &S) -> Option<CapturedImage> {
        match surface.snapshot() {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("capture snapshot failed: {}", e);
                None
            }
        }
    }
}
