//! Grayscale morphology with a square all-ones structuring element.
//!
//! Erosion and dilation are separable for a square element, so each one
//! runs as a horizontal pass followed by a vertical pass of a running
//! min/max. Pixels outside the image never contribute, which matches
//! padding with the identity of the operation (255 for erosion, 0 for
//! dilation).

use image::Luma;

use crate::types::GrayImage;

#[derive(Debug, Clone, Copy)]
enum Extremum {
    Min,
    Max,
}

impl Extremum {
    fn pick(self, window: impl Iterator<Item = u8>) -> u8 {
        match self {
            Self::Min => window.min().unwrap_or(u8::MAX),
            Self::Max => window.max().unwrap_or(u8::MIN),
        }
    }
}

/// Square window pass: horizontal then vertical.
fn square_filter(image: &GrayImage, size: u32, op: Extremum) -> GrayImage {
    let radius = size / 2;
    let (w, h) = image.dimensions();
    if radius == 0 || w == 0 || h == 0 {
        return image.clone();
    }

    let horizontal = GrayImage::from_fn(w, h, |x, y| {
        let lo = x.saturating_sub(radius);
        let hi = x.saturating_add(radius).min(w - 1);
        Luma([op.pick((lo..=hi).map(|sx| image.get_pixel(sx, y).0[0]))])
    });

    GrayImage::from_fn(w, h, |x, y| {
        let lo = y.saturating_sub(radius);
        let hi = y.saturating_add(radius).min(h - 1);
        Luma([op.pick((lo..=hi).map(|sy| horizontal.get_pixel(x, sy).0[0]))])
    })
}

/// Erode with a `size` x `size` element (local minimum).
#[must_use = "returns the eroded image"]
pub fn erode(image: &GrayImage, size: u32) -> GrayImage {
    square_filter(image, size, Extremum::Min)
}

/// Dilate with a `size` x `size` element (local maximum).
#[must_use = "returns the dilated image"]
pub fn dilate(image: &GrayImage, size: u32) -> GrayImage {
    square_filter(image, size, Extremum::Max)
}

/// Opening: erosion followed by dilation.
#[must_use = "returns the opened image"]
pub fn open(image: &GrayImage, size: u32) -> GrayImage {
    dilate(&erode(image, size), size)
}

/// Closing: dilation followed by erosion.
#[must_use = "returns the closed image"]
pub fn close(image: &GrayImage, size: u32) -> GrayImage {
    erode(&dilate(image, size), size)
}

/// White top-hat: the image minus its opening.
#[must_use = "returns the top-hat image"]
pub fn top_hat(image: &GrayImage, size: u32) -> GrayImage {
    let opened = open(image, size);
    subtract(image, &opened)
}

/// Black top-hat: the closing minus the image.
#[must_use = "returns the black-hat image"]
pub fn black_hat(image: &GrayImage, size: u32) -> GrayImage {
    let closed = close(image, size);
    subtract(&closed, image)
}

fn subtract(a: &GrayImage, b: &GrayImage) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y).0[0].saturating_sub(b.get_pixel(x, y).0[0])])
    })
}
