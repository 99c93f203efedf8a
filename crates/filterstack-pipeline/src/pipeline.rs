//! The pipeline controller: run a filter chain over a source image and
//! derive the contour overlay.
//!
//! [`process`] and [`run`] are pure functions of their inputs. [`Session`]
//! wraps them with the mutable state an interactive front end needs: the
//! current source (or the lack of one), the chain, and the contour
//! toggle. Nothing is cached between runs; every call recomputes the
//! whole result.

use serde::{Deserialize, Serialize};

use crate::chain::FilterChain;
use crate::color;
use crate::contour::{self, OverlayStyle};
use crate::diagnostics::{
    self, Clock, ContourDiagnostics, NullClock, RunDiagnostics, RunSummary, StageDiagnostics,
};
use crate::filter::{FilterId, FilterKind, FilterStage};
use crate::types::{Dimensions, Image, PipelineError, Polyline};

/// Settings for a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Whether runs extract and draw contours.
    pub contours_enabled: bool,

    /// Stroke style of the contour overlay.
    pub overlay: OverlayStyle,

    /// Size of the black image used while no source is loaded.
    pub placeholder: Dimensions,
}

impl PipelineConfig {
    /// Default placeholder size.
    pub const DEFAULT_PLACEHOLDER: Dimensions = Dimensions {
        width: 700,
        height: 700,
    };
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            contours_enabled: false,
            overlay: OverlayStyle::default(),
            placeholder: Self::DEFAULT_PLACEHOLDER,
        }
    }
}

/// Where the source of a run came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A real image supplied by the caller.
    Loaded,
    /// The black placeholder, because no source was available.
    Placeholder,
}

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResult {
    /// Single-channel output of the last stage (or the grayscale source
    /// for an empty chain).
    pub processed: Image,

    /// The source as given when contours are disabled; otherwise an RGB
    /// copy of it with the contours drawn.
    pub overlay: Image,

    /// Contours drawn on the overlay; empty when contours are disabled.
    pub contours: Vec<Polyline>,

    /// Whether the run used a real source or the placeholder.
    pub source: SourceKind,
}

/// Run every stage of `chain` over `source`.
///
/// An empty chain yields the grayscale conversion of `source`. Otherwise
/// each stage's single-channel output is expanded back to RGB and fed to
/// the next stage; the last stage's output is returned as is.
#[must_use = "returns the processed image"]
pub fn process(source: &Image, chain: &FilterChain) -> Image {
    apply_chain(source, chain, &NullClock).0
}

/// Process `source` and build the overlay.
///
/// When `contours_enabled` is false the overlay is an unchanged copy of
/// `source`, in its own color space.
#[must_use = "returns the pipeline result"]
pub fn run(
    source: &Image,
    chain: &FilterChain,
    contours_enabled: bool,
    style: &OverlayStyle,
) -> PipelineResult {
    run_with_diagnostics(source, chain, contours_enabled, style, &NullClock).0
}

/// Like [`run`], also timing each stage with `clock`.
#[must_use = "returns the pipeline result and diagnostics"]
pub fn run_with_diagnostics<C: Clock>(
    source: &Image,
    chain: &FilterChain,
    contours_enabled: bool,
    style: &OverlayStyle,
    clock: &C,
) -> (PipelineResult, RunDiagnostics) {
    execute(
        source,
        SourceKind::Loaded,
        chain,
        contours_enabled,
        style,
        clock,
    )
}

fn apply_chain<C: Clock>(
    source: &Image,
    chain: &FilterChain,
    clock: &C,
) -> (Image, Vec<StageDiagnostics>) {
    let mut stats = Vec::with_capacity(chain.len());
    let Some((last, init)) = chain.stages().split_last() else {
        return (Image::from_gray(color::to_gray(source)), stats);
    };

    let mut input = source.clone();
    for stage in init {
        let output = timed_stage(stage, &input, clock, &mut stats);
        input = Image::from_rgb(color::to_rgb(&output));
    }
    let processed = timed_stage(last, &input, clock, &mut stats);
    (processed, stats)
}

fn timed_stage<C: Clock>(
    stage: &FilterStage,
    input: &Image,
    clock: &C,
    stats: &mut Vec<StageDiagnostics>,
) -> Image {
    let start = clock.now();
    let output = stage.apply(input);
    let duration = clock.elapsed(&start);
    let foreground_pixels = output.as_gray().map_or(0, diagnostics::count_foreground);

    tracing::debug!(
        id = %stage.id(),
        kind = %stage.kind(),
        k = stage.k(),
        ?duration,
        foreground_pixels,
        "applied filter stage"
    );
    stats.push(StageDiagnostics {
        id: stage.id(),
        kind: stage.kind(),
        k: stage.k(),
        duration,
        foreground_pixels,
    });
    output
}

fn execute<C: Clock>(
    source: &Image,
    source_kind: SourceKind,
    chain: &FilterChain,
    contours_enabled: bool,
    style: &OverlayStyle,
    clock: &C,
) -> (PipelineResult, RunDiagnostics) {
    let start = clock.now();
    let (processed, stages) = apply_chain(source, chain, clock);

    let (overlay, contours, contour_stats) = if contours_enabled {
        let contour_start = clock.now();
        let contours = contour::extract_contours(&processed);
        let overlay = contour::draw_overlay(source, &contours, style);
        let stats = ContourDiagnostics::new(clock.elapsed(&contour_start), &contours);
        (overlay, contours, Some(stats))
    } else {
        (source.clone(), Vec::new(), None)
    };

    let total_duration = clock.elapsed(&start);
    let dimensions = source.dimensions();
    let foreground_pixels = processed.as_gray().map_or(0, diagnostics::count_foreground);

    tracing::info!(
        stages = chain.len(),
        contours = contour_stats.as_ref().map(|c| c.contour_count),
        width = dimensions.width,
        height = dimensions.height,
        ?source_kind,
        ?total_duration,
        "pipeline run complete"
    );

    let diagnostics = RunDiagnostics {
        stages,
        contours: contour_stats,
        total_duration,
        summary: RunSummary {
            image_width: dimensions.width,
            image_height: dimensions.height,
            pixel_count: u64::from(dimensions.width) * u64::from(dimensions.height),
            placeholder: source_kind == SourceKind::Placeholder,
            foreground_pixels,
        },
    };
    let result = PipelineResult {
        processed,
        overlay,
        contours,
        source: source_kind,
    };
    (result, diagnostics)
}

/// Interactive pipeline state: a source image, a chain, and settings.
///
/// Every method is synchronous. Edits never trigger a run; call
/// [`run`](Self::run) after editing to get the new result.
#[derive(Debug, Clone, Default)]
pub struct Session {
    config: PipelineConfig,
    chain: FilterChain,
    source: Option<Image>,
}

impl Session {
    /// A session with no source and an empty chain.
    #[must_use]
    pub const fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            chain: FilterChain::new(),
            source: None,
        }
    }

    /// Decode `bytes` and make the result the current source.
    ///
    /// # Errors
    ///
    /// Returns the decode error from [`codec::decode`](crate::codec::decode).
    /// The previous source, if any, stays in place.
    pub fn load(&mut self, bytes: &[u8]) -> Result<(), PipelineError> {
        let image = crate::codec::decode(bytes)?;
        tracing::info!(
            width = image.width(),
            height = image.height(),
            bytes = bytes.len(),
            "loaded source image"
        );
        self.source = Some(image);
        Ok(())
    }

    /// Replace the current source.
    pub fn set_source(&mut self, image: Image) {
        self.source = Some(image);
    }

    /// Drop the current source; runs fall back to the placeholder.
    pub fn clear_source(&mut self) {
        self.source = None;
    }

    /// The current source, if one is loaded.
    #[must_use]
    pub const fn source(&self) -> Option<&Image> {
        self.source.as_ref()
    }

    /// Append a stage; see [`FilterChain::add_filter`].
    pub fn add_filter(&mut self, kind: FilterKind) -> FilterId {
        self.chain.add_filter(kind)
    }

    /// Remove a stage; see [`FilterChain::remove_filter`].
    pub fn remove_filter(&mut self, id: FilterId) -> Option<FilterStage> {
        self.chain.remove_filter(id)
    }

    /// Update a stage parameter; see [`FilterChain::set_parameter`].
    pub fn set_parameter(&mut self, id: FilterId, raw: i64) -> Option<u32> {
        self.chain.set_parameter(id, raw)
    }

    /// Enable or disable the contour overlay for later runs.
    pub fn toggle_contours(&mut self, enabled: bool) {
        self.config.contours_enabled = enabled;
    }

    /// The current chain.
    #[must_use]
    pub const fn chain(&self) -> &FilterChain {
        &self.chain
    }

    /// The current settings.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the chain over the current source (or the placeholder).
    #[must_use = "returns the pipeline result"]
    pub fn run(&self) -> PipelineResult {
        self.run_with_diagnostics(&NullClock).0
    }

    /// Like [`run`](Self::run), also timing each stage with `clock`.
    #[must_use = "returns the pipeline result and diagnostics"]
    pub fn run_with_diagnostics<C: Clock>(&self, clock: &C) -> (PipelineResult, RunDiagnostics) {
        let placeholder;
        let (source, kind) = if let Some(image) = &self.source {
            (image, SourceKind::Loaded)
        } else {
            tracing::warn!(
                width = self.config.placeholder.width,
                height = self.config.placeholder.height,
                "no source image, using placeholder"
            );
            placeholder = Image::blank(self.config.placeholder);
            (&placeholder, SourceKind::Placeholder)
        };
        execute(
            source,
            kind,
            &self.chain,
            self.config.contours_enabled,
            &self.config.overlay,
            clock,
        )
    }
}
