//! Thresholding transforms: fixed, adaptive Gaussian, hue window, and
//! LAB lightness.
//!
//! Every function returns a binary mask: 255 where the condition holds,
//! 0 elsewhere.

use image::Luma;
use imageproc::contrast::{self, ThresholdType};
use imageproc::map;

use crate::types::{GrayImage, RgbImage};

/// Maximum value written for pixels that pass a threshold.
pub const MAX_VALUE: u8 = 255;

/// Offset subtracted from the local mean in [`adaptive_gaussian`].
pub const ADAPTIVE_OFFSET: i32 = 2;

/// Half-width of the hue window used by [`hue_window`].
pub const HUE_HALF_WIDTH: i32 = 35;

/// Binary threshold: `src > threshold` becomes 255, everything else 0.
///
/// A threshold above 255 leaves nothing set.
#[must_use = "returns the binary mask"]
pub fn binary(gray: &GrayImage, threshold: u32) -> GrayImage {
    match u8::try_from(threshold) {
        Ok(t) => contrast::threshold(gray, t, ThresholdType::Binary),
        Err(_) => GrayImage::new(gray.width(), gray.height()),
    }
}

/// Adaptive threshold against a Gaussian-weighted local mean.
///
/// The mean is taken over a `block_size` x `block_size` neighbourhood
/// (replicated border), rounded to 8 bits, and a pixel passes when
/// `src > mean - ADAPTIVE_OFFSET`. `block_size` must be odd; even
/// values are widened by one.
#[must_use = "returns the binary mask"]
pub fn adaptive_gaussian(gray: &GrayImage, block_size: u32) -> GrayImage {
    let block_size = block_size.max(3) | 1;
    let mean = gaussian_mean(gray, block_size);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let src = i32::from(gray.get_pixel(x, y).0[0]);
        let local = i32::from(mean.get_pixel(x, y).0[0]);
        mask_value(src > local - ADAPTIVE_OFFSET)
    })
}

/// Hue window over an 8-bit HSV image.
///
/// A pixel passes when its hue lies in `[center - 35, center + 35]`;
/// saturation and value are unrestricted. The window does not wrap
/// around the hue circle, so centers near either end cover a narrower
/// arc and centers above `180 + 35` match nothing.
#[must_use = "returns the binary mask"]
pub fn hue_window(hsv: &RgbImage, center: u32) -> GrayImage {
    let center = i32::try_from(center).unwrap_or(i32::MAX);
    let lower = center.saturating_sub(HUE_HALF_WIDTH);
    let upper = center.saturating_add(HUE_HALF_WIDTH);
    map::map_pixels(hsv, |p| mask_value((lower..=upper).contains(&i32::from(p.0[0]))))
}

/// Binary threshold on the lightness channel of an 8-bit LAB image.
#[must_use = "returns the binary mask"]
pub fn lab_lightness(lab: &RgbImage, threshold: u32) -> GrayImage {
    binary(&map::into_red_channel(lab), threshold)
}

const fn mask_value(pass: bool) -> Luma<u8> {
    if pass { Luma([MAX_VALUE]) } else { Luma([0]) }
}

/// Sampled Gaussian kernel of odd length `size`, normalized to sum 1.
///
/// Sigma follows the usual rule for a kernel derived from its size:
/// `0.3 * ((size - 1) / 2 - 1) + 0.8`.
#[allow(clippy::cast_precision_loss)]
fn gaussian_kernel(size: u32) -> Vec<f32> {
    let radius = (size / 2) as f32;
    let sigma = 0.3f32.mul_add(radius - 1.0, 0.8);
    let denom = 2.0 * sigma * sigma;
    let weights: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - radius;
            (-(d * d) / denom).exp()
        })
        .collect();
    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Separable Gaussian smoothing with a replicated border, rounded to 8 bits.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn gaussian_mean(gray: &GrayImage, size: u32) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray.clone();
    }
    let kernel = gaussian_kernel(size);
    let radius = (size / 2) as i64;
    let clamp = |v: i64, len: u32| v.clamp(0, i64::from(len) - 1) as u32;

    let mut rows = vec![0.0f32; (w as usize) * (h as usize)];
    for y in 0..h {
        for x in 0..w {
            let acc: f32 = kernel
                .iter()
                .enumerate()
                .map(|(i, weight)| {
                    let sx = clamp(i64::from(x) + i as i64 - radius, w);
                    weight * f32::from(gray.get_pixel(sx, y).0[0])
                })
                .sum();
            rows[(y * w + x) as usize] = acc;
        }
    }

    GrayImage::from_fn(w, h, |x, y| {
        let acc: f32 = kernel
            .iter()
            .enumerate()
            .map(|(i, weight)| {
                let sy = clamp(i64::from(y) + i as i64 - radius, h);
                weight * rows[(sy * w + x) as usize]
            })
            .sum();
        Luma([crate::color::saturate_u8(acc)])
    })
}
