//! Software [`Surface`] on an RGBA pixel buffer.
//!
//! Strokes are rasterized segment by segment along a fine polyline of the
//! oval outline, which is plenty for the handful of shapes the overlay draws
//! per frame. Joins are round. Ends are flat unless the stroke asks for
//! round caps.

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, DynamicImage, Rgba, RgbaImage};

use crate::error::{Error, Result};
use crate::render::{CapturedImage, Color, Dash, Oval, Stroke, Surface};
use crate::types::Point;

/// JPEG quality of captured stills.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Length of one outline segment, in pixels.
const SEGMENT_STEP: f32 = 0.5;

/// How far, as a fraction of its length, a segment reaches into its
/// neighbours.
const JOIN_OVERLAP: f32 = 0.25;

pub struct RasterSurface {
    canvas: RgbaImage,
    jpeg_quality: u8,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255])),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn into_canvas(self) -> RgbaImage {
        self.canvas
    }

    fn blend_pixel(&mut self, x: i64, y: i64, color: Color) {
        if x < 0 || y < 0 || x >= self.canvas.width() as i64 || y >= self.canvas.height() as i64 {
            return;
        }
        let pixel = self.canvas.get_pixel_mut(x as u32, y as u32);
        *pixel = blend(*pixel, color);
    }

    /// Walk the outline from the top, clockwise, calling `visible` with the
    /// distance travelled so far to decide which segments to draw.
    ///
    /// Each run of visible segments is drawn with flat ends, or with a disc
    /// on each end when the stroke has round caps. Coverage is collected into
    /// a mask first so overlapping segments don't blend a pixel twice.
    fn stroke_path<F>(&mut self, oval: &Oval, stroke: &Stroke, visible: F)
    where
        F: Fn(f32) -> bool,
    {
        let (width, height) = (self.canvas.width(), self.canvas.height());
        if width == 0 || height == 0 {
            return;
        }

        let segments = ((oval.perimeter() / SEGMENT_STEP).ceil() as usize).max(16);
        let outline = oval.outline(segments);
        let radius = stroke.width * 0.5;
        let mut coverage = vec![false; (width * height) as usize];

        // Split the outline into runs of consecutive visible segments.
        let mut runs: Vec<Vec<Point>> = Vec::new();
        let mut in_run = false;
        let mut travelled = 0.0f32;
        for pair in outline.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            if visible(travelled) {
                if in_run {
                    if let Some(run) = runs.last_mut() {
                        run.push(end);
                    }
                } else {
                    runs.push(vec![start, end]);
                }
                in_run = true;
            } else {
                in_run = false;
            }
            travelled += start.distance(&end);
        }
        let closed = runs.len() == 1 && runs[0].len() == outline.len();

        for run in &runs {
            let last_segment = run.len() - 2;
            for (index, pair) in run.windows(2).enumerate() {
                let (start, end) = (pair[0], pair[1]);
                let along = end - start;
                // Inner ends overlap their neighbours to close the joins.
                let start = if index == 0 && !closed {
                    start
                } else {
                    start - along * JOIN_OVERLAP
                };
                let end = if index == last_segment && !closed {
                    end
                } else {
                    end + along * JOIN_OVERLAP
                };
                mark_segment(&mut coverage, width, height, start, end, radius);
            }

            if stroke.round_cap && !closed {
                if let (Some(&first), Some(&last)) = (run.first(), run.last()) {
                    mark_disc(&mut coverage, width, height, first, radius);
                    mark_disc(&mut coverage, width, height, last, radius);
                }
            }
        }

        for (index, covered) in coverage.into_iter().enumerate() {
            if covered {
                let x = (index as u32 % width) as i64;
                let y = (index as u32 / width) as i64;
                self.blend_pixel(x, y, stroke.color);
            }
        }
    }
}

impl Surface for RasterSurface {
    fn dimensions(&self) -> (u32, u32) {
        self.canvas.dimensions()
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.canvas.dimensions() != (width, height) {
            self.canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
        }
    }

    fn draw_frame(&mut self, frame: &RgbaImage) {
        if frame.dimensions() == self.canvas.dimensions() {
            self.canvas.copy_from_slice(frame.as_raw());
        } else {
            let (width, height) = self.canvas.dimensions();
            let scaled = imageops::resize(frame, width, height, imageops::FilterType::Triangle);
            self.canvas = scaled;
        }
    }

    fn fill_outside(&mut self, oval: &Oval, color: Color) {
        for (x, y, pixel) in self.canvas.enumerate_pixels_mut() {
            if !oval.contains(pixel_center(x, y)) {
                *pixel = blend(*pixel, color);
            }
        }
    }

    fn stroke_oval(&mut self, oval: &Oval, stroke: &Stroke) {
        self.stroke_path(oval, stroke, |_| true);
    }

    fn stroke_dashed_oval(&mut self, oval: &Oval, stroke: &Stroke, dash: Dash) {
        if dash.on <= 0.0 {
            return;
        }
        self.stroke_path(oval, stroke, |travelled| dash.is_on(travelled));
    }

    fn snapshot(&self) -> Result<CapturedImage> {
        let (width, height) = self.canvas.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::EmptySurface);
        }

        // JPEG has no alpha channel.
        let rgb = DynamicImage::ImageRgba8(self.canvas.clone()).to_rgb8();
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, self.jpeg_quality).encode_image(&rgb)?;

        Ok(CapturedImage {
            width,
            height,
            bytes,
        })
    }
}

fn mark_disc(coverage: &mut [bool], width: u32, height: u32, center: Point, radius: f32) {
    let r2 = radius * radius;
    let min_x = (center.x - radius).floor().max(0.0) as u32;
    let min_y = (center.y - radius).floor().max(0.0) as u32;
    let max_x = ((center.x + radius).ceil().max(0.0) as u32).min(width - 1);
    let max_y = ((center.y + radius).ceil().max(0.0) as u32).min(height - 1);

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let offset = pixel_center(x, y) - center;
            if offset.dot(&offset) <= r2 {
                coverage[(y * width + x) as usize] = true;
            }
        }
    }
}

/// Mark pixels within `radius` of the segment from `a` to `b`, cut off
/// square at both ends.
fn mark_segment(coverage: &mut [bool], width: u32, height: u32, a: Point, b: Point, radius: f32) {
    let along = b - a;
    let length2 = along.dot(&along);
    if length2 <= f32::EPSILON {
        return;
    }

    let r2 = radius * radius;
    let min_x = (a.x.min(b.x) - radius).floor().max(0.0) as u32;
    let min_y = (a.y.min(b.y) - radius).floor().max(0.0) as u32;
    let max_x = ((a.x.max(b.x) + radius).ceil().max(0.0) as u32).min(width - 1);
    let max_y = ((a.y.max(b.y) + radius).ceil().max(0.0) as u32).min(height - 1);

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let rel = pixel_center(x, y) - a;
            let t = rel.dot(&along) / length2;
            if !(0.0..=1.0).contains(&t) {
                continue;
            }
            let offset = rel - along * t;
            if offset.dot(&offset) <= r2 {
                coverage[(y * width + x) as usize] = true;
            }
        }
    }
}

fn pixel_center(x: u32, y: u32) -> Point {
    Point::new(x as f32 + 0.5, y as f32 + 0.5)
}

/// Source-over compositing of `color` onto an opaque pixel.
fn blend(dst: Rgba<u8>, color: Color) -> Rgba<u8> {
    let alpha = color.opacity();
    let mix = |d: u8, s: u8| -> u8 { (s as f32 * alpha + d as f32 * (1.0 - alpha)).round() as u8 };
    Rgba([
        mix(dst[0], color.r),
        mix(dst[1], color.g),
        mix(dst[2], color.b),
        dst[3],
    ])
}
