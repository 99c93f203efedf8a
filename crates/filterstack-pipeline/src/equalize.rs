//! Contrast-limited adaptive histogram equalization (CLAHE).
//!
//! The image is split into a fixed grid of tiles. Each tile gets its own
//! equalization lookup table built from a clipped histogram, and every
//! output pixel bilinearly blends the tables of the four nearest tile
//! centres. When the image size is not a multiple of the grid, tiles are
//! sized for the image reflected (without repeating the edge pixel) up
//! to the next multiple.

use image::Luma;

use crate::types::GrayImage;

/// Histogram clip limit, relative to a uniform histogram.
pub const CLIP_LIMIT: f32 = 2.0;

/// Number of tiles along each axis.
pub const TILE_GRID: u32 = 8;

const BINS: usize = 256;

/// Equalize `image` with [`CLIP_LIMIT`] and a [`TILE_GRID`] x [`TILE_GRID`] grid.
#[must_use = "returns the equalized image"]
pub fn clahe(image: &GrayImage) -> GrayImage {
    clahe_with(image, CLIP_LIMIT, TILE_GRID, TILE_GRID)
}

/// CLAHE with an explicit clip limit and grid.
#[must_use = "returns the equalized image"]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_possible_wrap
)]
pub fn clahe_with(image: &GrayImage, clip_limit: f32, tiles_x: u32, tiles_y: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 || tiles_x == 0 || tiles_y == 0 {
        return image.clone();
    }

    let tile_w = w.div_ceil(tiles_x);
    let tile_h = h.div_ceil(tiles_y);
    let tile_area = tile_w * tile_h;

    let clip = if clip_limit > 0.0 {
        ((clip_limit * tile_area as f32 / BINS as f32) as u32).max(1)
    } else {
        0
    };
    let lut_scale = (BINS - 1) as f32 / tile_area as f32;

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let mut hist = [0u32; BINS];
            for y in ty * tile_h..(ty + 1) * tile_h {
                let sy = reflect_101(y, h);
                for x in tx * tile_w..(tx + 1) * tile_w {
                    let sx = reflect_101(x, w);
                    hist[usize::from(image.get_pixel(sx, sy).0[0])] += 1;
                }
            }
            if clip > 0 {
                clip_histogram(&mut hist, clip);
            }
            luts.push(build_lut(&hist, lut_scale));
        }
    }

    let inv_tw = 1.0 / tile_w as f32;
    let inv_th = 1.0 / tile_h as f32;
    let lut_at = |tx: u32, ty: u32, v: u8| -> f32 {
        f32::from(luts[(ty * tiles_x + tx) as usize][usize::from(v)])
    };
    let neighbours = |pos: u32, inv: f32, tiles: u32| -> (u32, u32, f32) {
        let f = (pos as f32).mul_add(inv, -0.5);
        let lo = f.floor();
        let frac = f - lo;
        let lo = lo as i64;
        let first = lo.max(0) as u32;
        let second = (lo + 1).min(i64::from(tiles) - 1) as u32;
        (first, second, frac)
    };

    GrayImage::from_fn(w, h, |x, y| {
        let v = image.get_pixel(x, y).0[0];
        let (tx1, tx2, xa) = neighbours(x, inv_tw, tiles_x);
        let (ty1, ty2, ya) = neighbours(y, inv_th, tiles_y);
        let top = lut_at(tx1, ty1, v).mul_add(1.0 - xa, lut_at(tx2, ty1, v) * xa);
        let bottom = lut_at(tx1, ty2, v).mul_add(1.0 - xa, lut_at(tx2, ty2, v) * xa);
        Luma([crate::color::saturate_u8(top.mul_add(1.0 - ya, bottom * ya))])
    })
}

/// Clip every bin at `clip` and spread the excess over the histogram.
fn clip_histogram(hist: &mut [u32; BINS], clip: u32) {
    let mut clipped = 0;
    for bin in hist.iter_mut() {
        if *bin > clip {
            clipped += *bin - clip;
            *bin = clip;
        }
    }

    let batch = clipped / BINS as u32;
    let mut residual = clipped - batch * BINS as u32;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (BINS as u32 / residual).max(1) as usize;
        for bin in hist.iter_mut().step_by(step) {
            if residual == 0 {
                break;
            }
            *bin += 1;
            residual -= 1;
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn build_lut(hist: &[u32; BINS], scale: f32) -> [u8; BINS] {
    let mut lut = [0u8; BINS];
    let mut sum = 0u32;
    for (entry, count) in lut.iter_mut().zip(hist) {
        sum += count;
        *entry = crate::color::saturate_u8(sum as f32 * scale);
    }
    lut
}

/// Reflect an index beyond `len - 1` back into range without repeating
/// the edge (`..., 2, 1, 0, 1, 2, ...` at the far end as well).
fn reflect_101(i: u32, len: u32) -> u32 {
    if len <= 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let m = i % period;
    if m < len { m } else { period - m }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflect_without_edge_repeat() {
        assert_eq!(reflect_101(3, 5), 3);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
        assert_eq!(reflect_101(7, 1), 0);
    }

    #[test]
    fn clipping_preserves_total_count() {
        let mut hist = [0u32; BINS];
        hist[10] = 1000;
        hist[200] = 24;
        clip_histogram(&mut hist, 40);
        assert_eq!(hist.iter().sum::<u32>(), 1024);
        assert!(hist[10] <= 40 + 4);
    }

    #[test]
    fn clipped_excess_is_spread_over_evenly_spaced_bins() {
        let mut hist = [0u32; BINS];
        hist[0] = 100;
        hist[5] = 10;
        clip_histogram(&mut hist, 4);
        // 102 excess counts: batch 0, one extra on every second bin from 0.
        assert_eq!(hist[0], 5);
        assert_eq!(hist[1], 0);
        assert_eq!(hist[2], 1);
        assert_eq!(hist[5], 4);
        assert_eq!(hist[202], 1);
        assert_eq!(hist[204], 0);
        assert_eq!(hist.iter().sum::<u32>(), 110);
    }

    #[test]
    fn single_tile_lut_is_contrast_limited() {
        let img = GrayImage::from_fn(4, 4, |x, _| if x < 2 { Luma([0]) } else { Luma([255]) });

        // Unclipped: 8 of 16 pixels at or below 0 maps 0 to 127.5.
        let plain = clahe_with(&img, 0.0, 1, 1);
        assert_eq!(plain.get_pixel(0, 0).0[0], 128);
        assert_eq!(plain.get_pixel(3, 3).0[0], 255);

        // Clip at 1 count per bin: bin 0 keeps 1 plus 1 redistributed.
        let limited = clahe_with(&img, CLIP_LIMIT, 1, 1);
        assert_eq!(limited.get_pixel(0, 0).0[0], 32);
        assert_eq!(limited.get_pixel(3, 3).0[0], 255);
    }

    #[test]
    fn pixels_between_tile_centres_blend_both_tables() {
        let img = GrayImage::from_fn(4, 1, |x, _| Luma([[100, 100, 100, 200][x as usize]]));
        let out = clahe_with(&img, 0.0, 2, 1);
        // Left table maps 100 to 255, right table maps it to 128.
        assert_eq!(out.as_raw(), &vec![255, 255, 192, 255]);
    }

    #[test]
    fn output_dimensions_match_input() {
        let img = GrayImage::from_fn(37, 21, |x, y| Luma([u8::try_from((x * 7 + y * 3) % 256).unwrap_or(0)]));
        let out = clahe(&img);
        assert_eq!(out.dimensions(), (37, 21));
    }

    #[test]
    fn uniform_image_stays_uniform() {
        let img = GrayImage::from_pixel(40, 24, Luma([90]));
        let out = clahe(&img);
        let first = out.get_pixel(0, 0).0[0];
        assert!(out.pixels().all(|p| p.0[0] == first));
    }

    #[test]
    fn brighter_pixel_stays_brighter_in_same_tile() {
        let img = GrayImage::from_fn(32, 32, |x, _| if x < 16 { Luma([60]) } else { Luma([180]) });
        let out = clahe(&img);
        assert!(out.get_pixel(17, 5).0[0] > out.get_pixel(14, 5).0[0]);
    }

    #[test]
    fn tiny_image_is_handled() {
        let img = GrayImage::from_pixel(1, 1, Luma([77]));
        assert_eq!(clahe(&img).dimensions(), (1, 1));
    }
}
