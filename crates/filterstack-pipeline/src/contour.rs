//! Contour extraction and overlay drawing.
//!
//! [`extract_contours`] traces the outer borders of the foreground
//! regions of a processed image with Suzuki-Abe border following
//! (`imageproc::contours::find_contours`). [`draw_overlay`] strokes those
//! borders onto a copy of the source image with `tiny-skia`.

use image::{GrayImage, Rgb};
use imageproc::contours::{BorderType, Contour};
use serde::{Deserialize, Serialize};
use tiny_skia::{FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::color;
use crate::types::{Image, Point, Polyline};

/// Color and width of overlay strokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    /// Stroke color as `[r, g, b]`.
    pub color: [u8; 3],
    /// Stroke width in pixels.
    pub thickness: u32,
}

impl OverlayStyle {
    /// Default stroke color: pure blue.
    pub const DEFAULT_COLOR: [u8; 3] = [0, 0, 255];

    /// Default stroke width in pixels.
    pub const DEFAULT_THICKNESS: u32 = 3;
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            color: Self::DEFAULT_COLOR,
            thickness: Self::DEFAULT_THICKNESS,
        }
    }
}

/// Trace the outermost borders of the foreground of `image`.
///
/// Any nonzero pixel counts as foreground (multi-channel images are
/// reduced to luma first). Only outer borders without a parent are kept,
/// so holes and regions nested inside holes are ignored. Straight
/// horizontal, vertical, and diagonal runs are compressed to their end
/// points.
///
/// A region covering the whole image has no boundary inside the image
/// and yields no contour.
#[must_use = "returns the extracted contours"]
pub fn extract_contours(image: &Image) -> Vec<Polyline> {
    let gray = color::to_gray(image);
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return Vec::new();
    }

    // The tracer only starts outer borders right of a background pixel,
    // so regions touching the left or full width of the image need a
    // background frame around them.
    let mut padded = GrayImage::new(w + 2, h + 2);
    image::imageops::replace(&mut padded, &gray, 1, 1);

    let contours: Vec<Contour<u32>> = imageproc::contours::find_contours(&padded);
    contours
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| {
            c.points
                .into_iter()
                .map(|p| Point::new(p.x - 1, p.y - 1))
                .collect::<Vec<_>>()
        })
        .filter(|points| !points.is_empty() && !is_image_frame(points, w, h))
        .map(|points| Polyline::new(compress_runs(points)))
        .collect()
}

/// Whether a closed border runs only along the edge of a `w` x `h` image
/// and touches all four sides.
fn is_image_frame(points: &[Point], w: u32, h: u32) -> bool {
    let on_edge = |p: &Point| p.x == 0 || p.y == 0 || p.x == w - 1 || p.y == h - 1;
    let xs = || points.iter().map(|p| p.x);
    let ys = || points.iter().map(|p| p.y);
    points.iter().all(on_edge)
        && xs().min() == Some(0)
        && ys().min() == Some(0)
        && xs().max() == Some(w - 1)
        && ys().max() == Some(h - 1)
}

/// Keep only the vertices of a closed border where the step direction
/// changes.
fn compress_runs(mut points: Vec<Point>) -> Vec<Point> {
    points.dedup();
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    let n = points.len();
    if n < 3 {
        return points;
    }

    let step = |a: Point, b: Point| (i64::from(b.x) - i64::from(a.x), i64::from(b.y) - i64::from(a.y));
    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let here = points[i];
            let next = points[(i + 1) % n];
            step(prev, here) != step(here, next)
        })
        .map(|i| points[i])
        .collect()
}

/// Stroke `contours` as closed polylines onto an RGB copy of `base`.
///
/// Strokes are drawn without anti-aliasing so every touched pixel takes
/// exactly `style.color`. A single-point contour becomes a dot of
/// diameter `style.thickness`.
#[must_use = "returns the overlay image"]
pub fn draw_overlay(base: &Image, contours: &[Polyline], style: &OverlayStyle) -> Image {
    let mut canvas = color::to_rgb(base);
    if contours.is_empty() {
        return Image::from_rgb(canvas);
    }
    let (w, h) = canvas.dimensions();
    let Some(mut pixmap) = Pixmap::new(w, h) else {
        return Image::from_rgb(canvas);
    };

    let [r, g, b] = style.color;
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, 255);
    paint.anti_alias = false;

    #[allow(clippy::cast_precision_loss)]
    let width = style.thickness.max(1) as f32;
    let stroke = Stroke {
        width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };

    #[allow(clippy::cast_precision_loss)]
    let centre = |p: &Point| (p.x as f32 + 0.5, p.y as f32 + 0.5);

    for contour in contours {
        match contour.points() {
            [] => {}
            [only] => {
                let (x, y) = centre(only);
                if let Some(dot) = PathBuilder::from_circle(x, y, width / 2.0) {
                    pixmap.fill_path(&dot, &paint, FillRule::Winding, Transform::identity(), None);
                }
            }
            [first, rest @ ..] => {
                let mut pb = PathBuilder::new();
                let (x, y) = centre(first);
                pb.move_to(x, y);
                for p in rest {
                    let (x, y) = centre(p);
                    pb.line_to(x, y);
                }
                pb.close();
                if let Some(path) = pb.finish() {
                    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
                }
            }
        }
    }

    // Paint is opaque and unsmoothed, so any covered pixel is fully the
    // stroke color.
    for (pixel, rgba) in canvas.pixels_mut().zip(pixmap.data().chunks_exact(4)) {
        if rgba[3] != 0 {
            *pixel = Rgb(style.color);
        }
    }
    Image::from_rgb(canvas)
}
