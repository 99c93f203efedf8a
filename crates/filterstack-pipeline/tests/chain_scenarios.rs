//! Integration tests: drive the public API the way a front end would.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use filterstack_pipeline::types::{GrayImage, RgbImage};
use filterstack_pipeline::{
    FilterChain, FilterKind, Image, OverlayStyle, PipelineConfig, Session, SourceKind, codec,
    color, process, run,
};
use image::{Luma, Rgb};

/// 10x10 two-tone image: black with a white 4x4 square at `[3, 7)`.
fn two_tone_square() -> Image {
    Image::from_rgb(RgbImage::from_fn(10, 10, |x, y| {
        if (3..7).contains(&x) && (3..7).contains(&y) {
            Rgb([255, 255, 255])
        } else {
            Rgb([0, 0, 0])
        }
    }))
}

fn gradient(width: u32, height: u32) -> Image {
    Image::from_rgb(RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            u8::try_from((x * 255) / width.max(1)).unwrap(),
            u8::try_from((y * 255) / height.max(1)).unwrap(),
            u8::try_from(((x + y) * 7) % 256).unwrap(),
        ])
    }))
}

#[test]
fn every_parameter_is_normalized_into_bounds() {
    let probes = (-300_i64..=300).chain([i64::MIN, i64::MIN + 1, i64::MAX - 1, i64::MAX]);
    for kind in FilterKind::ALL {
        let bounds = kind.bounds();
        let mut chain = FilterChain::new();
        let id = chain.add_filter(kind);
        for v in probes.clone() {
            let k = chain.set_parameter(id, v).expect("stage exists");
            assert_eq!(k % 2, 1, "{kind}: {v} -> {k} is even");
            assert!(
                (bounds.min..=bounds.max).contains(&k),
                "{kind}: {v} -> {k} outside {bounds:?}"
            );
            let bumped = if v % 2 == 0 { v + 1 } else { v };
            if (i64::from(bounds.min)..=i64::from(bounds.max)).contains(&bumped) {
                assert_eq!(i64::from(k), bumped, "{kind}: {v}");
            }
        }
    }
}

#[test]
fn add_then_remove_is_identity() {
    let mut chain = FilterChain::new();
    let a = chain.add_filter(FilterKind::GaussianThreshold);
    chain.set_parameter(a, 63);
    chain.add_filter(FilterKind::Closing);
    let before = chain.to_spec();

    for kind in FilterKind::ALL {
        let id = chain.add_filter(kind);
        chain.remove_filter(id);
        assert_eq!(chain.to_spec(), before, "{kind}");
    }
}

#[test]
fn removing_missing_id_keeps_length_and_order() {
    let mut chain = FilterChain::new();
    let gone = chain.add_filter(FilterKind::Invert);
    chain.add_filter(FilterKind::Lab);
    chain.add_filter(FilterKind::Erosion);
    chain.remove_filter(gone);
    let before = chain.to_spec();

    assert!(chain.remove_filter(gone).is_none());
    assert_eq!(chain.len(), 2);
    assert_eq!(chain.to_spec(), before);
}

#[test]
fn interior_removal_preserves_relative_order() {
    let mut chain = FilterChain::new();
    let a = chain.add_filter(FilterKind::Threshold);
    let b = chain.add_filter(FilterKind::Hsv);
    let c = chain.add_filter(FilterKind::Laplacian);
    chain.remove_filter(b);
    let ids: Vec<_> = chain.stages().iter().map(|s| s.id()).collect();
    assert_eq!(ids, vec![a, c]);
}

#[test]
fn empty_chain_is_grayscale_conversion() {
    for source in [gradient(13, 7), two_tone_square(), Image::from_gray(GrayImage::new(3, 3))] {
        let processed = process(&source, &FilterChain::new());
        assert_eq!(processed.as_gray().unwrap(), &color::to_gray(&source));
    }
}

#[test]
fn threshold_127_on_two_tone_square() {
    let mut chain = FilterChain::new();
    let id = chain.add_filter(FilterKind::Threshold);
    assert_eq!(chain.set_parameter(id, 127), Some(127));

    let processed = process(&two_tone_square(), &chain);
    let gray = processed.as_gray().unwrap();
    assert!(gray.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    let white: Vec<(u32, u32)> = gray
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] == 255)
        .map(|(x, y, _)| (x, y))
        .collect();
    assert_eq!(white.len(), 16);
    assert!(white.iter().all(|&(x, y)| (3..7).contains(&x) && (3..7).contains(&y)));
}

#[test]
fn uniform_gray_with_contours_leaves_source_untouched() {
    let source = Image::from_rgb(RgbImage::from_pixel(32, 24, Rgb([128, 128, 128])));
    let result = run(&source, &FilterChain::new(), true, &OverlayStyle::default());
    assert!(result.contours.is_empty());
    assert_eq!(result.overlay, source);
}

#[test]
fn hsv_parameter_rounds_up_to_odd() {
    let mut chain = FilterChain::new();
    let id = chain.add_filter(FilterKind::Hsv);
    assert_eq!(chain.set_parameter(id, 36), Some(37));
    assert_eq!(chain.get(id).unwrap().k(), 37);
}

#[test]
fn every_kind_produces_single_channel_output_of_source_size() {
    let source = gradient(24, 17);
    for kind in FilterKind::ALL {
        let mut chain = FilterChain::new();
        chain.add_filter(kind);
        let processed = process(&source, &chain);
        assert_eq!(processed.channels(), 1, "{kind}");
        assert_eq!(processed.dimensions(), source.dimensions(), "{kind}");
    }
}

#[test]
fn processing_is_deterministic_and_pure() {
    let source = gradient(20, 20);
    let mut chain = FilterChain::new();
    chain.add_filter(FilterKind::HistogramEqualization);
    chain.add_filter(FilterKind::CannyEdges);
    chain.add_filter(FilterKind::Dilation);
    let first = run(&source, &chain, true, &OverlayStyle::default());
    let second = run(&source, &chain, true, &OverlayStyle::default());
    assert_eq!(first, second);
    assert_eq!(source, gradient(20, 20));
}

#[test]
fn session_round_trip_through_png() {
    let png = codec::encode(&two_tone_square()).unwrap();

    let mut session = Session::new(PipelineConfig {
        contours_enabled: true,
        ..PipelineConfig::default()
    });
    session.load(&png).unwrap();
    let id = session.add_filter(FilterKind::Threshold);
    session.set_parameter(id, 127);

    let result = session.run();
    assert_eq!(result.source, SourceKind::Loaded);
    assert_eq!(result.contours.len(), 1);
    assert_eq!(result.contours[0].len(), 4);

    let overlay = codec::decode(&codec::encode(&result.overlay).unwrap()).unwrap();
    assert_eq!(overlay, result.overlay);
    let blue = overlay
        .as_triples()
        .unwrap()
        .pixels()
        .filter(|p| p.0 == OverlayStyle::DEFAULT_COLOR)
        .count();
    assert!(blue > 0);
}

#[test]
fn session_placeholder_then_corrupt_load() {
    let mut session = Session::new(PipelineConfig::default());
    let result = session.run();
    assert_eq!(result.source, SourceKind::Placeholder);
    assert_eq!((result.processed.width(), result.processed.height()), (700, 700));

    assert!(session.load(&[0x89, b'P', b'N', b'G', 0, 0]).is_err());
    assert!(session.source().is_none());
    assert_eq!(session.run().source, SourceKind::Placeholder);

    let gray = Image::from_gray(GrayImage::from_pixel(5, 5, Luma([40])));
    session.set_source(gray.clone());
    assert!(session.load(b"").is_err());
    assert_eq!(session.source(), Some(&gray));
}
