//! filterstack: run an image filter chain from the command line.
//!
//! Loads an image, builds a filter chain from `--filter` flags and/or a
//! JSON chain description, runs it, and writes the processed image and
//! the contour overlay. Per-stage diagnostics are printed as a report or
//! as JSON.
//!
//! # Usage
//!
//! ```text
//! filterstack photo.png --filter threshold=127 --filter erosion=5 \
//!     --contours --processed out.png --overlay overlay.png
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Parser;
use filterstack_pipeline::diagnostics::Clock;
use filterstack_pipeline::{
    ChainSpec, FilterKind, Image, OverlayStyle, PipelineConfig, Session, StageSpec, codec,
};
use tracing_subscriber::EnvFilter;

/// Run a chain of single-parameter image filters and draw the outer
/// contours of the result on the source image.
#[derive(Parser)]
#[command(name = "filterstack", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP). Without it a black
    /// placeholder is processed.
    input: Option<PathBuf>,

    /// Append a filter stage, as `KIND` or `KIND=K` (e.g. `threshold=127`).
    /// May be repeated; stages run in the order given.
    #[arg(long = "filter", value_name = "KIND[=K]", value_parser = parse_stage)]
    filters: Vec<StageSpec>,

    /// Chain description as JSON, e.g. `[{"kind":"threshold","k":127}]`.
    /// Its stages run before any `--filter` stages.
    #[arg(long)]
    chain_json: Option<String>,

    /// Extract contours and draw them on the overlay.
    #[arg(long)]
    contours: bool,

    /// Contour stroke width in pixels.
    #[arg(long, default_value_t = OverlayStyle::DEFAULT_THICKNESS)]
    contour_thickness: u32,

    /// Contour stroke color as `R,G,B`.
    #[arg(long, value_name = "R,G,B", value_parser = parse_color)]
    contour_color: Option<[u8; 3]>,

    /// Write the processed (single-channel) image as PNG.
    #[arg(long)]
    processed: Option<PathBuf>,

    /// Write the overlay image as PNG.
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Print diagnostics as JSON on stdout instead of a report on stderr.
    #[arg(long)]
    json: bool,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, `--contours`, `--contour-thickness`, and
    /// `--contour-color` are ignored. The JSON must be a valid
    /// `PipelineConfig` serialization; missing fields take defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// List the available filters with their parameter ranges and exit.
    #[arg(long)]
    list_filters: bool,
}

/// Parse `KIND` or `KIND=K`.
fn parse_stage(s: &str) -> Result<StageSpec, String> {
    let (name, k) = match s.split_once('=') {
        Some((name, k)) => {
            let k = k
                .trim()
                .parse::<i64>()
                .map_err(|e| format!("invalid parameter {k:?}: {e}"))?;
            (name, Some(k))
        }
        None => (s, None),
    };
    let kind = name.parse::<FilterKind>().map_err(|e| e.to_string())?;
    Ok(StageSpec { kind, k })
}

/// Parse `R,G,B` with each component in `0..=255`.
fn parse_color(s: &str) -> Result<[u8; 3], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [r, g, b] = parts[..] else {
        return Err(format!("expected R,G,B, got {s:?}"));
    };
    let component = |c: &str| {
        c.parse::<u8>()
            .map_err(|e| format!("invalid color component {c:?}: {e}"))
    };
    Ok([component(r)?, component(g)?, component(b)?])
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual overlay flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    let defaults = PipelineConfig::default();
    Ok(PipelineConfig {
        contours_enabled: cli.contours,
        overlay: OverlayStyle {
            color: cli.contour_color.unwrap_or(defaults.overlay.color),
            thickness: cli.contour_thickness,
        },
        ..defaults
    })
}

/// Collect the chain stages: `--chain-json` first, then `--filter`.
fn chain_from_cli(cli: &Cli) -> Result<Vec<StageSpec>, String> {
    let mut stages = match cli.chain_json {
        Some(ref json) => {
            let spec: ChainSpec =
                serde_json::from_str(json).map_err(|e| format!("Error parsing --chain-json: {e}"))?;
            spec.0
        }
        None => Vec::new(),
    };
    stages.extend(cli.filters.iter().copied());
    Ok(stages)
}

fn list_filters() {
    println!("{:<24} {:<26} {:>9} {:>7}", "Name", "Label", "Range", "Default");
    for kind in FilterKind::ALL {
        let bounds = kind.bounds();
        let range = format!("{}..={}", bounds.min, bounds.max);
        let note = if kind.uses_parameter() { "" } else { "  (k unused)" };
        println!(
            "{:<24} {:<26} {range:>9} {:>7}{note}",
            kind.name(),
            kind.label(),
            kind.default_k(),
        );
    }
}

/// `RUST_LOG` directives when given and valid, `info` otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn write_png(path: &Path, image: &Image, what: &str) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = codec::encode(image)?;
    std::fs::write(path, &bytes)
        .map_err(|e| format!("Error writing {what} image to {}: {e}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "wrote {what} image");
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    if cli.list_filters {
        list_filters();
        return Ok(());
    }

    let config = config_from_cli(&cli)?;
    let stages = chain_from_cli(&cli)?;

    let mut session = Session::new(config);
    if let Some(ref path) = cli.input {
        let bytes = std::fs::read(path)
            .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
        if let Err(e) = session.load(&bytes) {
            tracing::warn!(path = %path.display(), error = %e, "could not load input image");
        }
    }

    for stage in &stages {
        let id = session.add_filter(stage.kind);
        if let Some(k) = stage.k
            && let Some(stored) = session.set_parameter(id, k)
            && i64::from(stored) != k
        {
            tracing::info!(kind = %stage.kind, requested = k, k = stored, "normalized filter parameter");
        }
    }

    let (result, diagnostics) = session.run_with_diagnostics(&StdClock);

    if let Some(ref path) = cli.processed {
        write_png(path, &result.processed, "processed")?;
    }
    if let Some(ref path) = cli.overlay {
        write_png(path, &result.overlay, "overlay")?;
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&diagnostics)?);
    } else {
        eprintln!("{}", diagnostics.report());
    }

    Ok(())
}

/// [`Clock`] backed by `std::time::Instant`.
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}
