#[allow(dead_code)]
mod common;

use std::sync::Arc;

use common::ReusingSource;
use helios_core::detection::{
    EdgeDetectionConfig, EdgeRange, MagnitudeDetectionConfig, MagnitudeEdgeDetector,
    SunEdgeDetector,
};
use helios_core::frame::{FrameGeometry, PixelLayout, RawDecoder};
use helios_core::pipeline::NoOpReporter;
use helios_core::scan::{CancellationToken, FrameScanner, ScanConfig};

const WIDTH: usize = 32;
const HEIGHT: usize = 8;

/// Mono16 frame of alternating `mean * (1 +- k)` pixels: mean `mean`,
/// standard deviation `k * mean`.
fn contrast_frame(mean: f64, k: f64) -> Vec<u8> {
    (0..WIDTH * HEIGHT)
        .flat_map(|i| {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            let v = (mean * (1.0 + sign * k)).round() as u16;
            v.to_le_bytes()
        })
        .collect()
}

fn scan_source() -> ReusingSource {
    let geometry = FrameGeometry {
        width: WIDTH,
        height: HEIGHT,
        layout: PixelLayout::Mono16 {
            little_endian: true,
        },
    };
    let frames = (0..100)
        .map(|i| {
            let k = if (20..=60).contains(&i) { 0.5 } else { 0.1 };
            contrast_frame(1000.0, k)
        })
        .collect();
    ReusingSource::new(geometry, frames)
}

#[test]
fn test_contrast_detector_finds_sun_frames() {
    let mut source = scan_source();
    let scanner = FrameScanner::new(&ScanConfig::default()).unwrap();
    let detector = SunEdgeDetector::new(EdgeDetectionConfig::default(), Arc::new(RawDecoder));

    let detection = detector
        .detect(
            &mut source,
            &scanner,
            &CancellationToken::new(),
            Arc::new(NoOpReporter),
        )
        .unwrap();

    assert_eq!(detection.range, Some(EdgeRange { start: 20, end: 60 }));
    assert_eq!(detection.stats.len(), 100);
    assert_eq!(detection.failures, 0);
    let sun = detection.stats[40].as_ref().unwrap()[0];
    common::assert_close(sun.mean, 1000.0, 1e-9);
    common::assert_close(sun.stddev, 500.0, 1e-9);
}

#[test]
fn test_contrast_detector_without_sun() {
    let geometry = FrameGeometry::mono8(WIDTH, HEIGHT);
    let frames = vec![vec![100u8; geometry.frame_byte_size()]; 10];
    let mut source = ReusingSource::new(geometry, frames);
    let scanner = FrameScanner::new(&ScanConfig::default()).unwrap();
    let detector = SunEdgeDetector::new(EdgeDetectionConfig::default(), Arc::new(RawDecoder));

    let detection = detector
        .detect(
            &mut source,
            &scanner,
            &CancellationToken::new(),
            Arc::new(NoOpReporter),
        )
        .unwrap();
    assert_eq!(detection.range, None);
}

#[test]
fn test_magnitude_detector_finds_bright_first_rows() {
    let geometry = FrameGeometry::mono8(WIDTH, HEIGHT);
    let frames = (0..100)
        .map(|i| {
            let mut frame = vec![0u8; geometry.frame_byte_size()];
            if (30..=70).contains(&i) {
                frame[..WIDTH].fill(200);
            }
            frame
        })
        .collect();
    let mut source = ReusingSource::new(geometry, frames);
    let scanner = FrameScanner::new(&ScanConfig::default()).unwrap();
    let detector =
        MagnitudeEdgeDetector::new(MagnitudeDetectionConfig::default(), Arc::new(RawDecoder));

    let detection = detector
        .detect(
            &mut source,
            &scanner,
            &CancellationToken::new(),
            Arc::new(NoOpReporter),
        )
        .unwrap();

    assert_eq!(detection.range, Some(EdgeRange { start: 30, end: 70 }));
    assert_eq!(detection.scores[0], Some(0.0));
}
