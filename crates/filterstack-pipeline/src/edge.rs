//! Edge and intensity transforms: Canny edges, Laplacian response, and
//! inversion.
//!
//! Canny here differs from [`imageproc::edges::canny`]: there is no
//! built-in Gaussian pre-blur, gradient magnitude is the L1 norm
//! `|gx| + |gy|`, and swapped thresholds are reordered instead of
//! rejected. The hysteresis pass checks all eight neighbours and
//! bounds-checks every coordinate.

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel;

/// Low hysteresis threshold used by the Canny filter stage.
pub const CANNY_LOW: f32 = 100.0;

/// `tan(22.5°)`, boundary between horizontal and diagonal gradients.
const TAN_22_5: f32 = 0.414_213_57;
/// `tan(67.5°)`, boundary between diagonal and vertical gradients.
const TAN_67_5: f32 = 2.414_213_6;

/// Invert every pixel (bitwise NOT).
#[must_use = "returns the inverted image"]
pub fn invert(gray: &GrayImage) -> GrayImage {
    let mut out = gray.clone();
    image::imageops::invert(&mut out);
    out
}

/// Absolute 4-neighbour Laplacian, saturated to 8 bits.
///
/// Out-of-image neighbours are mirrored without repeating the edge
/// pixel (`-1` reads `1`, `w` reads `w - 2`).
#[must_use = "returns the Laplacian response"]
pub fn laplacian(gray: &GrayImage) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray.clone();
    }
    let at = |x: u32, y: u32| i32::from(gray.get_pixel(x, y).0[0]);
    let before = |i: u32, len: u32| if i == 0 { 1_u32.min(len - 1) } else { i - 1 };
    let after = |i: u32, len: u32| if i + 1 == len { i.saturating_sub(1) } else { i + 1 };
    GrayImage::from_fn(w, h, |x, y| {
        let sum = at(before(x, w), y)
            + at(after(x, w), y)
            + at(x, before(y, h))
            + at(x, after(y, h))
            - 4 * at(x, y);
        Luma([u8::try_from(sum.unsigned_abs().min(255)).unwrap_or(u8::MAX)])
    })
}

/// Detect edges with the Canny algorithm.
///
/// Returns a binary image: 255 for edge pixels, 0 for background.
/// Pixels whose gradient magnitude exceeds `high_threshold` seed edges;
/// pixels above `low_threshold` extend them when 8-connected to a seed.
#[must_use = "returns the binary edge map"]
pub fn canny(gray: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let (low, high) = if low_threshold > high_threshold {
        (high_threshold, low_threshold)
    } else {
        (low_threshold, high_threshold)
    };
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray.clone();
    }

    let gx: Image<Luma<i16>> = filter_clamped(gray, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(gray, kernel::SOBEL_VERTICAL_3X3);

    let magnitude = |x: i64, y: i64| -> f32 {
        if x < 0 || y < 0 || x >= i64::from(w) || y >= i64::from(h) {
            return 0.0;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (x, y) = (x as u32, y as u32);
        f32::from(gx.get_pixel(x, y).0[0].unsigned_abs())
            + f32::from(gy.get_pixel(x, y).0[0].unsigned_abs())
    };

    // 0 = background, 1 = weak candidate, 2 = strong edge.
    let mut class = vec![0u8; (w as usize) * (h as usize)];
    let mut stack = Vec::new();
    for y in 0..h {
        for x in 0..w {
            let (xi, yi) = (i64::from(x), i64::from(y));
            let m = magnitude(xi, yi);
            if m <= low {
                continue;
            }
            let dx = f32::from(gx.get_pixel(x, y).0[0]);
            let dy = f32::from(gy.get_pixel(x, y).0[0]);
            let (ax, ay) = (dx.abs(), dy.abs());

            let is_peak = if ay < ax * TAN_22_5 {
                m > magnitude(xi - 1, yi) && m >= magnitude(xi + 1, yi)
            } else if ay > ax * TAN_67_5 {
                m > magnitude(xi, yi - 1) && m >= magnitude(xi, yi + 1)
            } else {
                let s = if (dx < 0.0) == (dy < 0.0) { 1 } else { -1 };
                m > magnitude(xi - s, yi - 1) && m > magnitude(xi + s, yi + 1)
            };
            if !is_peak {
                continue;
            }

            let idx = (y as usize) * (w as usize) + x as usize;
            if m > high {
                class[idx] = 2;
                stack.push((x, y));
            } else {
                class[idx] = 1;
            }
        }
    }

    hysteresis(&mut class, &mut stack, w, h);

    let mut out = GrayImage::new(w, h);
    for (pixel, c) in out.pixels_mut().zip(&class) {
        if *c == 2 {
            *pixel = Luma([255]);
        }
    }
    out
}

/// Promote weak candidates reachable from strong edges.
fn hysteresis(class: &mut [u8], stack: &mut Vec<(u32, u32)>, w: u32, h: u32) {
    while let Some((x, y)) = stack.pop() {
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let (nx, ny) = (i64::from(x) + dx, i64::from(y) + dy);
                if nx < 0 || ny < 0 || nx >= i64::from(w) || ny >= i64::from(h) {
                    continue;
                }
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let (nx, ny) = (nx as u32, ny as u32);
                let idx = (ny as usize) * (w as usize) + nx as usize;
                if class[idx] == 1 {
                    class[idx] = 2;
                    stack.push((nx, ny));
                }
            }
        }
    }
}
