//! Color-space adapter: RGB, grayscale, HSV and LAB conversions.
//!
//! Every filter stage receives an RGB image and converts it into the
//! space its operation needs. The conversions use the usual 8-bit
//! conventions so that filter parameters keep the meaning they have in
//! common vision toolkits:
//!
//! - Gray: BT.601 luma in 14-bit fixed point.
//! - HSV: hue halved into `[0, 180)`, saturation and value in `[0, 255]`.
//! - LAB: D65 white, lightness scaled by `255 / 100`, `a`/`b` offset by 128.

use image::{Luma, Rgb};

use crate::types::{ColorSpace, GrayImage, Image, RgbImage};

/// D65 reference white, X component.
const WHITE_X: f32 = 0.950_456;
/// D65 reference white, Z component.
const WHITE_Z: f32 = 1.088_754;
/// CIE threshold between the cube-root and linear segments.
const LAB_EPSILON: f32 = 0.008_856;

/// BT.601 luma of one RGB triple.
#[must_use]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = 4899 * u32::from(r) + 9617 * u32::from(g) + 1868 * u32::from(b) + 8192;
    // The weights sum to 1 << 14, so the shifted value is at most 255.
    u8::try_from(y >> 14).unwrap_or(u8::MAX)
}

/// Convert an RGB buffer to grayscale.
#[must_use = "returns the grayscale image"]
pub fn rgb_to_gray(rgb: &RgbImage) -> GrayImage {
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let Rgb([r, g, b]) = *rgb.get_pixel(x, y);
        Luma([luma(r, g, b)])
    })
}

/// Expand a grayscale buffer to RGB by replicating the channel.
#[must_use = "returns the expanded RGB image"]
pub fn gray_to_rgb(gray: &GrayImage) -> RgbImage {
    RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y).0[0];
        Rgb([v, v, v])
    })
}

/// The RGB form of any image.
#[must_use = "returns the RGB image"]
pub fn to_rgb(image: &Image) -> RgbImage {
    if let Some(gray) = image.as_gray() {
        return gray_to_rgb(gray);
    }
    let Some(triples) = image.as_triples() else {
        return RgbImage::new(image.width(), image.height());
    };
    match image.color_space() {
        ColorSpace::Hsv => map_triples(triples, hsv_to_rgb),
        ColorSpace::Lab => map_triples(triples, lab_to_rgb),
        ColorSpace::Rgb | ColorSpace::Gray => triples.clone(),
    }
}

/// The grayscale form of any image.
#[must_use = "returns the grayscale image"]
pub fn to_gray(image: &Image) -> GrayImage {
    match (image.as_gray(), image.color_space()) {
        (Some(gray), _) => gray.clone(),
        (None, ColorSpace::Rgb) => image
            .as_triples()
            .map_or_else(|| GrayImage::new(image.width(), image.height()), rgb_to_gray),
        (None, _) => rgb_to_gray(&to_rgb(image)),
    }
}

/// Convert an image into `target`, routing through RGB when needed.
///
/// Returns a clone when the image is already in `target`.
#[must_use = "returns the converted image"]
pub fn convert(image: &Image, target: ColorSpace) -> Image {
    if image.color_space() == target {
        return image.clone();
    }
    match target {
        ColorSpace::Gray => Image::from_gray(to_gray(image)),
        ColorSpace::Rgb => Image::from_rgb(to_rgb(image)),
        ColorSpace::Hsv => Image::from_triples(target, hsv_triples(image)),
        ColorSpace::Lab => Image::from_triples(target, lab_triples(image)),
    }
}

/// The 8-bit HSV triples of any image.
#[must_use = "returns the HSV buffer"]
pub fn hsv_triples(image: &Image) -> RgbImage {
    match (image.color_space(), image.as_triples()) {
        (ColorSpace::Hsv, Some(hsv)) => hsv.clone(),
        _ => map_triples(&to_rgb(image), rgb_to_hsv),
    }
}

/// The 8-bit LAB triples of any image.
#[must_use = "returns the LAB buffer"]
pub fn lab_triples(image: &Image) -> RgbImage {
    match (image.color_space(), image.as_triples()) {
        (ColorSpace::Lab, Some(lab)) => lab.clone(),
        _ => map_triples(&to_rgb(image), rgb_to_lab),
    }
}

fn map_triples(src: &RgbImage, f: fn([u8; 3]) -> [u8; 3]) -> RgbImage {
    RgbImage::from_fn(src.width(), src.height(), |x, y| Rgb(f(src.get_pixel(x, y).0)))
}

/// Round and saturate a float channel value to `u8`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn saturate_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// RGB to 8-bit HSV (`H` in `[0, 180)`).
#[must_use]
pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
    let v = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let diff = v - min;

    let s = if v > 0.0 { 255.0 * diff / v } else { 0.0 };

    let h = if diff <= 0.0 {
        0.0
    } else if (v - rf).abs() < f32::EPSILON {
        60.0 * (gf - bf) / diff
    } else if (v - gf).abs() < f32::EPSILON {
        120.0 + 60.0 * (bf - rf) / diff
    } else {
        240.0 + 60.0 * (rf - gf) / diff
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    // Halve into one byte; 359.x degrees rounds up to 180, which is 0.
    let h8 = saturate_u8(h / 2.0);
    let h8 = if h8 >= 180 { h8 - 180 } else { h8 };
    [h8, saturate_u8(s), saturate_u8(v)]
}

/// 8-bit HSV back to RGB.
#[must_use]
pub fn hsv_to_rgb([h, s, v]: [u8; 3]) -> [u8; 3] {
    let s = f32::from(s) / 255.0;
    let v = f32::from(v);
    if s <= 0.0 {
        let c = saturate_u8(v);
        return [c, c, c];
    }

    let sector = (f32::from(h) * 2.0 / 60.0) % 6.0;
    let f = sector - sector.floor();
    let p = v * (1.0 - s);
    let q = v * s.mul_add(-f, 1.0);
    let t = v * s.mul_add(f - 1.0, 1.0);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (r, g, b) = match sector.floor() as u8 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    [saturate_u8(r), saturate_u8(g), saturate_u8(b)]
}

fn srgb_to_linear(c: u8) -> f32 {
    let c = f32::from(c) / 255.0;
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> u8 {
    let c = c.clamp(0.0, 1.0);
    let encoded = if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055f32.mul_add(c.powf(1.0 / 2.4), -0.055)
    };
    saturate_u8(encoded * 255.0)
}

fn lab_f(t: f32) -> f32 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        7.787f32.mul_add(t, 16.0 / 116.0)
    }
}

fn lab_f_inv(t: f32) -> f32 {
    let cube = t * t * t;
    if cube > LAB_EPSILON {
        cube
    } else {
        (t - 16.0 / 116.0) / 7.787
    }
}

/// RGB to 8-bit LAB.
#[must_use]
pub fn rgb_to_lab([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (r, g, b) = (srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b));

    let x = 0.180_423f32.mul_add(b, 0.412_453f32.mul_add(r, 0.357_580 * g)) / WHITE_X;
    let y = 0.072_169f32.mul_add(b, 0.212_671f32.mul_add(r, 0.715_160 * g));
    let z = 0.950_227f32.mul_add(b, 0.019_334f32.mul_add(r, 0.119_193 * g)) / WHITE_Z;

    let (fx, fy, fz) = (lab_f(x), lab_f(y), lab_f(z));
    let l = if y > LAB_EPSILON {
        116.0f32.mul_add(fy, -16.0)
    } else {
        903.3 * y
    };
    let a = 500.0 * (fx - fy);
    let bb = 200.0 * (fy - fz);

    [
        saturate_u8(l * 255.0 / 100.0),
        saturate_u8(a + 128.0),
        saturate_u8(bb + 128.0),
    ]
}

/// 8-bit LAB back to RGB.
#[must_use]
pub fn lab_to_rgb([l, a, b]: [u8; 3]) -> [u8; 3] {
    let l = f32::from(l) * 100.0 / 255.0;
    let a = f32::from(a) - 128.0;
    let b = f32::from(b) - 128.0;

    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;

    let x = lab_f_inv(fx) * WHITE_X;
    let y = lab_f_inv(fy);
    let z = lab_f_inv(fz) * WHITE_Z;

    let r = (-0.498_535f32).mul_add(z, 3.240_479f32.mul_add(x, -1.537_150 * y));
    let g = 0.041_556f32.mul_add(z, (-0.969_256f32).mul_add(x, 1.875_991 * y));
    let bl = 1.057_311f32.mul_add(z, 0.055_648f32.mul_add(x, -0.204_043 * y));

    [linear_to_srgb(r), linear_to_srgb(g), linear_to_srgb(bl)]
}
