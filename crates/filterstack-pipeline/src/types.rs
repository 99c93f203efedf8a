//! Shared types for the filterstack pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// single-channel raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can reference
/// three-channel raster data without depending on `image` directly.
pub use image::RgbImage;

/// Color space tag carried by every [`Image`].
///
/// HSV and LAB use the 8-bit conventions of the transform library:
/// hue is halved into `[0, 180)`, LAB lightness is scaled to
/// `[0, 255]`, and the `a`/`b` axes are offset by 128.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    /// Red, green, blue.
    Rgb,
    /// Single-channel luminance.
    Gray,
    /// Hue, saturation, value.
    Hsv,
    /// CIE L*a*b* (D65).
    Lab,
}

impl ColorSpace {
    /// Number of interleaved 8-bit channels per pixel.
    #[must_use]
    pub const fn channels(self) -> u8 {
        match self {
            Self::Gray => 1,
            Self::Rgb | Self::Hsv | Self::Lab => 3,
        }
    }
}

impl std::fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Rgb => "RGB",
            Self::Gray => "Gray",
            Self::Hsv => "HSV",
            Self::Lab => "LAB",
        };
        f.write_str(name)
    }
}

/// Backing storage of an [`Image`].
///
/// Three-channel spaces (RGB, HSV, LAB) all live in an `RgbImage`; the
/// buffer is only a container of `u8` triples and the [`ColorSpace`]
/// tag decides what the triples mean.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Pixels {
    One(GrayImage),
    Three(RgbImage),
}

/// An 8-bit raster image tagged with its color space.
///
/// Images are values: every pipeline operation returns a new image and
/// none of them mutates its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    color_space: ColorSpace,
    pixels: Pixels,
}

impl Image {
    /// Build an image from raw interleaved pixel data.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidImage`] if `data.len()` is not
    /// `width * height * channels`.
    pub fn from_raw(
        width: u32,
        height: u32,
        color_space: ColorSpace,
        data: Vec<u8>,
    ) -> Result<Self, PipelineError> {
        let len = data.len();
        let pixels = if color_space.channels() == 1 {
            GrayImage::from_raw(width, height, data).map(Pixels::One)
        } else {
            RgbImage::from_raw(width, height, data).map(Pixels::Three)
        };
        pixels
            .map(|pixels| Self {
                color_space,
                pixels,
            })
            .ok_or_else(|| {
                PipelineError::InvalidImage(format!(
                    "{len} bytes do not form a {width}x{height} {color_space} image",
                ))
            })
    }

    /// An all-black RGB image, used as the placeholder source.
    #[must_use]
    pub fn blank(dimensions: Dimensions) -> Self {
        Self::from_rgb(RgbImage::new(dimensions.width, dimensions.height))
    }

    /// Wrap an RGB buffer.
    #[must_use]
    pub const fn from_rgb(rgb: RgbImage) -> Self {
        Self {
            color_space: ColorSpace::Rgb,
            pixels: Pixels::Three(rgb),
        }
    }

    /// Wrap a grayscale buffer.
    #[must_use]
    pub const fn from_gray(gray: GrayImage) -> Self {
        Self {
            color_space: ColorSpace::Gray,
            pixels: Pixels::One(gray),
        }
    }

    /// Wrap a three-channel buffer holding HSV or LAB triples.
    pub(crate) const fn from_triples(color_space: ColorSpace, triples: RgbImage) -> Self {
        Self {
            color_space,
            pixels: Pixels::Three(triples),
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        match &self.pixels {
            Pixels::One(img) => img.width(),
            Pixels::Three(img) => img.width(),
        }
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        match &self.pixels {
            Pixels::One(img) => img.height(),
            Pixels::Three(img) => img.height(),
        }
    }

    /// Width and height together.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width(),
            height: self.height(),
        }
    }

    /// The color space of the pixel data.
    #[must_use]
    pub const fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    /// Number of channels per pixel (1 or 3).
    #[must_use]
    pub const fn channels(&self) -> u8 {
        self.color_space.channels()
    }

    /// Raw interleaved pixel bytes, row-major.
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        match &self.pixels {
            Pixels::One(img) => img.as_raw(),
            Pixels::Three(img) => img.as_raw(),
        }
    }

    /// The single-channel buffer, if this image has one channel.
    #[must_use]
    pub const fn as_gray(&self) -> Option<&GrayImage> {
        match &self.pixels {
            Pixels::One(img) => Some(img),
            Pixels::Three(_) => None,
        }
    }

    /// The three-channel buffer, if this image has three channels.
    ///
    /// The triples are only RGB when [`color_space`](Self::color_space)
    /// is [`ColorSpace::Rgb`].
    #[must_use]
    pub const fn as_triples(&self) -> Option<&RgbImage> {
        match &self.pixels {
            Pixels::Three(img) => Some(img),
            Pixels::One(_) => None,
        }
    }
}

/// A pixel position on a contour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Column (pixels from left edge).
    pub x: u32,
    /// Row (pixels from top edge).
    pub y: u32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// A closed sequence of contour vertices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the polyline and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Errors that can occur while loading, processing, or encoding images.
///
/// Out-of-range parameters and unknown stage ids are not errors: the
/// chain normalizes or ignores them.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Raw pixel data did not match the declared shape.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// Failed to encode an output image.
    #[error("failed to encode image: {0}")]
    ImageEncode(#[source] image::ImageError),

    /// A filter name did not match any known filter kind.
    #[error("unknown filter: {0}")]
    UnknownFilter(String),
}
