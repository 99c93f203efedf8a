//! filterstack-pipeline: dynamic image filter chain and contour overlay
//! engine (sans-IO).
//!
//! A [`FilterChain`] is an ordered list of single-parameter filter
//! stages. [`process`] runs the chain over a source image; [`run`] also
//! traces the outer contours of the result and draws them on a copy of
//! the source:
//!
//! source -> stage 1 -> stage 2 -> ... -> processed -> contours -> overlay
//!
//! Each stage reads the color space it needs (grayscale, HSV, or LAB),
//! writes a single-channel image, and that image is expanded back to RGB
//! before the next stage.
//!
//! This crate has **no I/O dependencies**: images come in and go out as
//! in-memory byte slices via [`codec`]. File access, argument parsing,
//! and logging setup live in `filterstack-cli`.

pub mod chain;
pub mod codec;
pub mod color;
pub mod contour;
pub mod diagnostics;
pub mod edge;
pub mod equalize;
pub mod filter;
pub mod morphology;
pub mod pipeline;
pub mod threshold;
pub mod types;

pub use chain::{ChainSpec, FilterChain, StageSpec};
pub use contour::{OverlayStyle, draw_overlay, extract_contours};
pub use diagnostics::{Clock, RunDiagnostics};
pub use filter::{FilterId, FilterKind, FilterStage, ParameterBounds};
pub use pipeline::{
    PipelineConfig, PipelineResult, Session, SourceKind, process, run, run_with_diagnostics,
};
pub use types::{ColorSpace, Dimensions, Image, PipelineError, Point, Polyline};
