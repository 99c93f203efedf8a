//! Filter kinds, parameter bounds, and configured filter stages.
//!
//! Each [`FilterKind`] owns a single integer parameter `k`. The parameter
//! is always odd and lies within the kind's [`ParameterBounds`]; raw
//! values from a slider or command line are normalized by
//! [`ParameterBounds::normalize`] rather than rejected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{ColorSpace, Image, PipelineError};

/// Every supported filter operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterKind {
    /// Binary threshold at `k`.
    Threshold,
    /// Adaptive threshold against a Gaussian local mean, block size `k`.
    GaussianThreshold,
    /// Hue window `[k - 35, k + 35]` in HSV.
    Hsv,
    /// Binary threshold of LAB lightness at `k`.
    Lab,
    /// Grayscale erosion, `k` x `k` element.
    Erosion,
    /// Grayscale dilation, `k` x `k` element.
    Dilation,
    /// Erosion then dilation.
    Opening,
    /// Dilation then erosion.
    Closing,
    /// Image minus its opening.
    TopHat,
    /// Closing minus the image.
    BlackHat,
    /// CLAHE; `k` is stored but not used.
    HistogramEqualization,
    /// Bitwise complement; `k` is stored but not used.
    Invert,
    /// Canny edges with low threshold 100 and high threshold `k`.
    CannyEdges,
    /// Absolute Laplacian; `k` is stored but not used.
    Laplacian,
}

impl FilterKind {
    /// All kinds, in the order a picker would list them.
    pub const ALL: [Self; 14] = [
        Self::Threshold,
        Self::GaussianThreshold,
        Self::Hsv,
        Self::Lab,
        Self::Erosion,
        Self::Dilation,
        Self::Opening,
        Self::Closing,
        Self::TopHat,
        Self::BlackHat,
        Self::HistogramEqualization,
        Self::Invert,
        Self::CannyEdges,
        Self::Laplacian,
    ];

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Threshold => "Threshold",
            Self::GaussianThreshold => "Gaussian Threshold",
            Self::Hsv => "HSV",
            Self::Lab => "LAB",
            Self::Erosion => "Erosion",
            Self::Dilation => "Dilation",
            Self::Opening => "Opening",
            Self::Closing => "Closing",
            Self::TopHat => "Top Hat",
            Self::BlackHat => "Black Hat",
            Self::HistogramEqualization => "Histogram Equalization",
            Self::Invert => "Invert",
            Self::CannyEdges => "Canny Edges",
            Self::Laplacian => "Laplacian",
        }
    }

    /// Machine name, as accepted by [`FromStr`] and used by serde.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Threshold => "threshold",
            Self::GaussianThreshold => "gaussian-threshold",
            Self::Hsv => "hsv",
            Self::Lab => "lab",
            Self::Erosion => "erosion",
            Self::Dilation => "dilation",
            Self::Opening => "opening",
            Self::Closing => "closing",
            Self::TopHat => "top-hat",
            Self::BlackHat => "black-hat",
            Self::HistogramEqualization => "histogram-equalization",
            Self::Invert => "invert",
            Self::CannyEdges => "canny-edges",
            Self::Laplacian => "laplacian",
        }
    }

    /// Inclusive range of the raw parameter.
    #[must_use]
    pub const fn bounds(self) -> ParameterBounds {
        match self {
            Self::GaussianThreshold => ParameterBounds::new(31, 255),
            Self::Hsv => ParameterBounds::new(30, 255),
            Self::Erosion
            | Self::Dilation
            | Self::Opening
            | Self::Closing
            | Self::TopHat
            | Self::BlackHat => ParameterBounds::new(3, 101),
            Self::Threshold
            | Self::Lab
            | Self::HistogramEqualization
            | Self::Invert
            | Self::CannyEdges
            | Self::Laplacian => ParameterBounds::new(3, 255),
        }
    }

    /// Parameter value of a freshly added stage: the smallest odd value
    /// within bounds.
    #[must_use]
    pub const fn default_k(self) -> u32 {
        self.bounds().lowest()
    }

    /// Color space the operation reads.
    #[must_use]
    pub const fn input_space(self) -> ColorSpace {
        match self {
            Self::Hsv => ColorSpace::Hsv,
            Self::Lab => ColorSpace::Lab,
            _ => ColorSpace::Gray,
        }
    }

    /// Whether the operation reads `k` at all.
    #[must_use]
    pub const fn uses_parameter(self) -> bool {
        !matches!(
            self,
            Self::HistogramEqualization | Self::Invert | Self::Laplacian
        )
    }

    /// Run this operation on `input` with parameter `k`.
    ///
    /// `input` is converted to [`input_space`](Self::input_space) first.
    /// The result is always a single-channel [`ColorSpace::Gray`] image.
    #[must_use = "returns the filtered image"]
    #[allow(clippy::cast_precision_loss)]
    pub fn apply(self, input: &Image, k: u32) -> Image {
        use crate::{color, edge, equalize, morphology, threshold};

        let gray = || color::to_gray(input);
        let output = match self {
            Self::Threshold => threshold::binary(&gray(), k),
            Self::GaussianThreshold => threshold::adaptive_gaussian(&gray(), k),
            Self::Hsv => threshold::hue_window(&color::hsv_triples(input), k),
            Self::Lab => threshold::lab_lightness(&color::lab_triples(input), k),
            Self::Erosion => morphology::erode(&gray(), k),
            Self::Dilation => morphology::dilate(&gray(), k),
            Self::Opening => morphology::open(&gray(), k),
            Self::Closing => morphology::close(&gray(), k),
            Self::TopHat => morphology::top_hat(&gray(), k),
            Self::BlackHat => morphology::black_hat(&gray(), k),
            Self::HistogramEqualization => equalize::clahe(&gray()),
            Self::Invert => edge::invert(&gray()),
            Self::CannyEdges => edge::canny(&gray(), edge::CANNY_LOW, k as f32),
            Self::Laplacian => edge::laplacian(&gray()),
        };
        Image::from_gray(output)
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FilterKind {
    type Err = PipelineError;

    /// Parse a machine name (`"top-hat"`) or label (`"Top Hat"`),
    /// ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace([' ', '_'], "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .or(match wanted.as_str() {
                "canny" => Some(Self::CannyEdges),
                _ => None,
            })
            .ok_or_else(|| PipelineError::UnknownFilter(s.to_string()))
    }
}

/// Inclusive `[min, max]` range of a filter parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterBounds {
    /// Smallest raw value.
    pub min: u32,
    /// Largest raw value.
    pub max: u32,
}

impl ParameterBounds {
    /// Create bounds; `min` must not exceed `max` and the range must
    /// contain at least one odd value.
    #[must_use]
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Smallest odd value within bounds.
    #[must_use]
    pub const fn lowest(self) -> u32 {
        self.min | 1
    }

    /// Largest odd value within bounds.
    #[must_use]
    pub const fn highest(self) -> u32 {
        if self.max % 2 == 1 { self.max } else { self.max - 1 }
    }

    /// Whether `k` is odd and inside the bounds.
    #[must_use]
    pub const fn accepts(self, k: u32) -> bool {
        k % 2 == 1 && k >= self.min && k <= self.max
    }

    /// Map any raw value to a valid parameter.
    ///
    /// Even values are first bumped to the next odd value, then the
    /// result is clamped to the odd values inside the bounds.
    #[must_use]
    pub fn normalize(self, raw: i64) -> u32 {
        let odd = if raw.rem_euclid(2) == 0 {
            raw.saturating_add(1)
        } else {
            raw
        };
        let clamped = odd.clamp(i64::from(self.lowest()), i64::from(self.highest()));
        u32::try_from(clamped).unwrap_or_else(|_| self.lowest())
    }
}

/// Stable identity of a stage within its chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterId(u64);

impl FilterId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One configured step of a filter chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterStage {
    id: FilterId,
    kind: FilterKind,
    k: u32,
}

impl FilterStage {
    pub(crate) const fn new(id: FilterId, kind: FilterKind) -> Self {
        Self {
            id,
            kind,
            k: kind.default_k(),
        }
    }

    /// Stable id, unique within the owning chain.
    #[must_use]
    pub const fn id(&self) -> FilterId {
        self.id
    }

    /// The operation this stage performs.
    #[must_use]
    pub const fn kind(&self) -> FilterKind {
        self.kind
    }

    /// Current parameter value (always odd and within bounds).
    #[must_use]
    pub const fn k(&self) -> u32 {
        self.k
    }

    /// Normalize and store a raw parameter value; returns the stored value.
    pub(crate) fn set_k(&mut self, raw: i64) -> u32 {
        self.k = self.kind.bounds().normalize(raw);
        self.k
    }

    /// Run this stage on `input`.
    #[must_use = "returns the filtered image"]
    pub fn apply(&self, input: &Image) -> Image {
        self.kind.apply(input, self.k)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Rgb;

    use super::*;
    use crate::types::{GrayImage, RgbImage};

    #[test]
    fn every_default_is_accepted() {
        for kind in FilterKind::ALL {
            assert!(
                kind.bounds().accepts(kind.default_k()),
                "{kind}: default {} outside {:?}",
                kind.default_k(),
                kind.bounds(),
            );
        }
    }

    #[test]
    fn defaults_follow_lower_bound() {
        assert_eq!(FilterKind::Threshold.default_k(), 3);
        assert_eq!(FilterKind::Hsv.default_k(), 31);
        assert_eq!(FilterKind::GaussianThreshold.default_k(), 31);
        assert_eq!(FilterKind::Erosion.default_k(), 3);
    }

    #[test]
    fn normalize_even_rounds_up() {
        let b = FilterKind::Threshold.bounds();
        assert_eq!(b.normalize(36), 37);
        assert_eq!(b.normalize(127), 127);
    }

    #[test]
    fn normalize_clamps_to_odd_bounds() {
        let hsv = FilterKind::Hsv.bounds();
        assert_eq!(hsv.normalize(-1000), 31);
        assert_eq!(hsv.normalize(30), 31);
        assert_eq!(hsv.normalize(i64::MAX), 255);
        assert_eq!(hsv.normalize(256), 255);

        let morph = FilterKind::Opening.bounds();
        assert_eq!(morph.normalize(100), 101);
        assert_eq!(morph.normalize(102), 101);
        assert_eq!(morph.normalize(0), 3);
    }

    #[test]
    fn normalize_is_always_valid() {
        for kind in FilterKind::ALL {
            let bounds = kind.bounds();
            for raw in [-7, -2, 0, 1, 2, 29, 30, 31, 100, 101, 254, 255, 256, 10_000] {
                let k = bounds.normalize(raw);
                assert!(bounds.accepts(k), "{kind}: {raw} -> {k}");
            }
        }
    }

    #[test]
    fn names_parse_back() {
        for kind in FilterKind::ALL {
            assert_eq!(kind.name().parse::<FilterKind>().unwrap(), kind);
            assert_eq!(kind.label().parse::<FilterKind>().unwrap(), kind);
        }
        assert_eq!("Canny".parse::<FilterKind>().unwrap(), FilterKind::CannyEdges);
    }

    #[test]
    fn unknown_name_is_an_error() {
        let err = "sharpen".parse::<FilterKind>().unwrap_err();
        assert!(matches!(err, PipelineError::UnknownFilter(ref s) if s == "sharpen"));
    }

    #[test]
    fn serde_uses_machine_names() {
        let json = serde_json::to_string(&FilterKind::TopHat).unwrap();
        assert_eq!(json, "\"top-hat\"");
        let back: FilterKind = serde_json::from_str("\"gaussian-threshold\"").unwrap();
        assert_eq!(back, FilterKind::GaussianThreshold);
    }

    #[test]
    fn apply_always_returns_gray_of_same_size() {
        let input = Image::from_rgb(RgbImage::from_fn(12, 9, |x, y| {
            Rgb([u8::try_from(x * 20).unwrap(), u8::try_from(y * 25).unwrap(), 90])
        }));
        for kind in FilterKind::ALL {
            let out = kind.apply(&input, kind.default_k());
            assert_eq!(out.color_space(), ColorSpace::Gray, "{kind}");
            assert_eq!(out.dimensions(), input.dimensions(), "{kind}");
        }
    }

    #[test]
    fn hsv_stage_selects_green() {
        // Green has hue 60; red has hue 0.
        let input = Image::from_rgb(RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 { Rgb([0, 255, 0]) } else { Rgb([255, 0, 0]) }
        }));
        let out = FilterKind::Hsv.apply(&input, 61);
        assert_eq!(out.as_raw(), &[255, 0]);
    }

    #[test]
    fn lab_stage_thresholds_lightness() {
        let input = Image::from_rgb(RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 { Rgb([20, 20, 20]) } else { Rgb([240, 240, 240]) }
        }));
        let out = FilterKind::Lab.apply(&input, 127);
        assert_eq!(out.as_raw(), &[0, 255]);
    }

    #[test]
    fn unused_parameter_does_not_change_output() {
        let input = Image::from_gray(GrayImage::from_fn(16, 16, |x, y| {
            image::Luma([u8::try_from((x * 13 + y * 7) % 256).unwrap()])
        }));
        for kind in [
            FilterKind::HistogramEqualization,
            FilterKind::Invert,
            FilterKind::Laplacian,
        ] {
            assert!(!kind.uses_parameter());
            assert_eq!(kind.apply(&input, 3), kind.apply(&input, 201), "{kind}");
        }
    }

    #[test]
    fn stage_set_k_normalizes() {
        let mut stage = FilterStage::new(FilterId::new(0), FilterKind::Hsv);
        assert_eq!(stage.k(), 31);
        assert_eq!(stage.set_k(36), 37);
        assert_eq!(stage.k(), 37);
    }

    #[test]
    fn filter_id_display() {
        assert_eq!(FilterId::new(4).to_string(), "#4");
    }
}
