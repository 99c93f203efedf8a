//! Run diagnostics: per-stage timing and pixel counts.
//!
//! Every call to [`run_with_diagnostics`](crate::run_with_diagnostics)
//! collects a [`RunDiagnostics`] alongside the pipeline result. Timing
//! goes through the [`Clock`] trait so this crate never reads the system
//! clock itself; front ends supply an implementation backed by
//! `std::time::Instant`.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::filter::{FilterId, FilterKind};
use crate::types::{GrayImage, Polyline};

/// Source of timestamps for diagnostics.
pub trait Clock {
    /// Opaque timestamp.
    type Instant;

    /// The current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// A clock that never advances; every measured duration is zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullClock;

impl Clock for NullClock {
    type Instant = ();

    fn now(&self) -> Self::Instant {}

    fn elapsed(&self, _since: &Self::Instant) -> Duration {
        Duration::ZERO
    }
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    /// One entry per filter stage, in chain order.
    pub stages: Vec<StageDiagnostics>,
    /// Contour extraction and overlay drawing; `None` when contours
    /// were disabled for the run.
    pub contours: Option<ContourDiagnostics>,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across the run.
    pub summary: RunSummary,
}

/// Diagnostics for one filter stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Id of the stage within its chain.
    pub id: FilterId,
    /// The operation that ran.
    pub kind: FilterKind,
    /// Parameter value used.
    pub k: u32,
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Nonzero pixels in the stage output.
    pub foreground_pixels: u64,
}

/// Diagnostics for the contour overlay step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourDiagnostics {
    /// Wall-clock duration of extraction plus drawing (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Number of contours found.
    pub contour_count: usize,
    /// Total vertices across all contours.
    pub total_point_count: usize,
    /// Largest vertex count of any single contour.
    pub max_contour_points: usize,
    /// Mean vertices per contour.
    pub mean_contour_points: f64,
}

impl ContourDiagnostics {
    pub(crate) fn new(duration: Duration, contours: &[Polyline]) -> Self {
        let total: usize = contours.iter().map(Polyline::len).sum();
        let max = contours.iter().map(Polyline::len).max().unwrap_or(0);
        #[allow(clippy::cast_precision_loss)]
        let mean = if contours.is_empty() {
            0.0
        } else {
            total as f64 / contours.len() as f64
        };
        Self {
            duration,
            contour_count: contours.len(),
            total_point_count: total,
            max_contour_points: max,
            mean_contour_points: mean,
        }
    }
}

/// High-level summary of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Whether the run used the black placeholder instead of a loaded image.
    pub placeholder: bool,
    /// Nonzero pixels in the processed image.
    pub foreground_pixels: u64,
}

impl RunDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Filter Chain Report\n{}", "=".repeat(60)));
        let source = if self.summary.placeholder {
            " [placeholder]"
        } else {
            ""
        };
        lines.push(format!(
            "Image: {}x{} ({} pixels){source}",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<6} {:<24} {:>5} {:>10} {:>8}  {}",
            "Id", "Stage", "k", "Duration", "% Total", "Foreground"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let pct = |d: Duration| {
            if total_ms > 0.0 {
                duration_ms(d) / total_ms * 100.0
            } else {
                0.0
            }
        };

        if self.stages.is_empty() {
            lines.push("(empty chain: grayscale passthrough)".to_string());
        }
        for stage in &self.stages {
            lines.push(format!(
                "{:<6} {:<24} {:>5} {:>8.3}ms {:>7.1}%  {}",
                stage.id.to_string(),
                stage.kind.label(),
                stage.k,
                duration_ms(stage.duration),
                pct(stage.duration),
                fraction(stage.foreground_pixels, self.summary.pixel_count),
            ));
        }

        lines.push(String::new());
        match &self.contours {
            Some(c) => lines.push(format!(
                "Contours: {} ({} pts, max={} mean={:.1}) in {:.3}ms",
                c.contour_count,
                c.total_point_count,
                c.max_contour_points,
                c.mean_contour_points,
                duration_ms(c.duration),
            )),
            None => lines.push("Contours: disabled".to_string()),
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// `"n (p%)"` of a pixel count against the image total.
fn fraction(count: u64, total: u64) -> String {
    #[allow(clippy::cast_precision_loss)]
    let pct = if total > 0 {
        count as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    format!("{count} ({pct:.1}%)")
}

/// Count nonzero pixels in a grayscale image.
pub(crate) fn count_foreground(image: &GrayImage) -> u64 {
    image
        .pixels()
        .map(|p| u64::from(u8::from(p.0[0] != 0)))
        .sum()
}
