//! Integration tests for the detection pipeline.
//!
//! These tests drive the public API end to end against real files:
//! - Identical, differing and corrupt frame pairs
//! - Reduced-fidelity and DC-only decoding
//! - The file-size pre-screen
//! - Cascades and batch runs

use frame_motion::core::batch::BatchRunner;
use frame_motion::core::loader::{DecodeLimits, FrameSource, ImageLoader};
use frame_motion::core::params::{DecodeMode, MotionParameters};
use frame_motion::core::pipeline::{Cascade, Decision, MotionDetector};
use frame_motion::core::prescreen::{estimate_change, estimate_header_size};
use frame_motion::core::FrameShape;
use frame_motion::error::ErrorKind;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageBuffer, Rgb, RgbImage};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const RED: Rgb<u8> = Rgb([255, 0, 0]);
const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

fn save_jpeg(path: &Path, image: &RgbImage) {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, 90)
        .encode_image(image)
        .unwrap();
    fs::write(path, bytes).unwrap();
}

fn solid_jpeg(dir: &TempDir, name: &str, width: u32, height: u32, color: Rgb<u8>) -> PathBuf {
    let path = dir.path().join(name);
    save_jpeg(&path, &ImageBuffer::from_pixel(width, height, color));
    path
}

/// Deterministic noise, so the JPEG is large enough for the size heuristic
fn noisy_jpeg(dir: &TempDir, name: &str) -> PathBuf {
    let mut state: u32 = 0x2545_f491;
    let image = ImageBuffer::from_fn(640, 480, |_, _| {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let [r, g, b, _] = state.to_le_bytes();
        Rgb([r, g, b])
    });
    let path = dir.path().join(name);
    save_jpeg(&path, &image);
    path
}

fn params() -> MotionParameters {
    MotionParameters::default()
}

#[test]
fn identical_frames_report_no_motion() {
    let dir = TempDir::new().unwrap();
    let a = solid_jpeg(&dir, "a.jpg", 640, 480, RED);
    let b = dir.path().join("b.jpg");
    fs::copy(&a, &b).unwrap();

    let result = MotionDetector::default().run(&a, &b, &params());

    assert_eq!(result.decision, Decision::NoMotion);
    assert_eq!(result.motion_percent, Some(0.0));
    assert_eq!(result.exit_code(), 0);
}

#[test]
fn same_path_twice_is_zero_percent() {
    let dir = TempDir::new().unwrap();
    let a = noisy_jpeg(&dir, "a.jpg");

    let result = MotionDetector::default().run(&a, &a, &params());
    assert_eq!(result.motion_percent, Some(0.0));
}

#[test]
fn red_versus_blue_is_full_motion() {
    let dir = TempDir::new().unwrap();
    let red = solid_jpeg(&dir, "red.jpg", 640, 480, RED);
    let blue = solid_jpeg(&dir, "blue.jpg", 640, 480, BLUE);

    let result = MotionDetector::default().run(&red, &blue, &params());

    assert_eq!(result.decision, Decision::Motion);
    let percent = result.motion_percent.unwrap();
    assert!(percent > 99.0, "got {}", percent);
    assert_eq!(result.diagnostics.pixels_sampled, 640 * 480);
    assert_eq!(result.exit_code(), 1);
}

#[test]
fn comparison_is_symmetric() {
    let dir = TempDir::new().unwrap();
    let a = noisy_jpeg(&dir, "a.jpg");
    let b = solid_jpeg(&dir, "b.jpg", 640, 480, RED);
    let detector = MotionDetector::default();

    let forward = detector.run(&a, &b, &params());
    let backward = detector.run(&b, &a, &params());

    assert_eq!(forward.motion_percent, backward.motion_percent);
    assert_eq!(forward.decision, backward.decision);
}

#[test]
fn quarter_mode_compares_reduced_grid() {
    let dir = TempDir::new().unwrap();
    let red = solid_jpeg(&dir, "red.jpg", 640, 480, RED);
    let blue = solid_jpeg(&dir, "blue.jpg", 640, 480, BLUE);

    let params = MotionParameters::builder()
        .decode_mode(DecodeMode::Quarter)
        .build();
    let result = MotionDetector::default().run(&red, &blue, &params);

    assert_eq!(result.decision, Decision::Motion);
    assert_eq!(
        result.diagnostics.compared_shape,
        Some(FrameShape::new(160, 120, 3))
    );
    assert_eq!(result.diagnostics.pixels_sampled, 160 * 120);
}

#[test]
fn loader_scales_each_mode() {
    let dir = TempDir::new().unwrap();
    let path = solid_jpeg(&dir, "frame.jpg", 640, 480, RED);
    let loader = ImageLoader::new();

    for (mode, width, height) in [
        (DecodeMode::Full, 640, 480),
        (DecodeMode::Half, 320, 240),
        (DecodeMode::Quarter, 160, 120),
        (DecodeMode::Eighth, 80, 60),
        (DecodeMode::DcOnly, 80, 60),
    ] {
        let frame = loader.load(&path, mode, true).unwrap();
        assert_eq!(frame.image.width(), width, "{}", mode);
        assert_eq!(frame.image.height(), height, "{}", mode);
        assert_eq!(frame.mode_used, mode);
    }
}

#[test]
fn dc_mode_rounds_partial_blocks_up() {
    let dir = TempDir::new().unwrap();
    let path = solid_jpeg(&dir, "odd.jpg", 100, 50, RED);

    let frame = ImageLoader::new()
        .load(&path, DecodeMode::DcOnly, true)
        .unwrap();

    assert_eq!(frame.image.width(), 13);
    assert_eq!(frame.image.height(), 7);
}

#[test]
fn dc_mode_detects_motion() {
    let dir = TempDir::new().unwrap();
    let red = solid_jpeg(&dir, "red.jpg", 640, 480, RED);
    let blue = solid_jpeg(&dir, "blue.jpg", 640, 480, BLUE);

    let params = MotionParameters::builder()
        .decode_mode(DecodeMode::DcOnly)
        .strict_dc(true)
        .build();
    let result = MotionDetector::default().run(&red, &blue, &params);

    assert_eq!(result.decision, Decision::Motion);
    assert!(!result.diagnostics.dc_fallback);
    assert_eq!(
        result.diagnostics.compared_shape,
        Some(FrameShape::new(80, 60, 3))
    );
}

#[test]
fn dc_mode_falls_back_for_png_unless_strict() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.png");
    let b = dir.path().join("b.png");
    RgbImage::from_pixel(32, 32, RED).save(&a).unwrap();
    RgbImage::from_pixel(32, 32, RED).save(&b).unwrap();
    let detector = MotionDetector::default();

    let lenient = MotionParameters::builder()
        .decode_mode(DecodeMode::DcOnly)
        .build();
    let result = detector.run(&a, &b, &lenient);
    assert_eq!(result.decision, Decision::NoMotion);
    assert!(result.diagnostics.dc_fallback);
    assert_eq!(result.diagnostics.mode_used, Some(DecodeMode::Full));

    let strict = MotionParameters::builder()
        .decode_mode(DecodeMode::DcOnly)
        .strict_dc(true)
        .build();
    let result = detector.run(&a, &b, &strict);
    assert_eq!(result.decision, Decision::Error);
    assert_eq!(result.error_kind, Some(ErrorKind::DcIncompatible));
}

#[test]
fn corrupt_file_is_a_format_error() {
    let dir = TempDir::new().unwrap();
    let good = solid_jpeg(&dir, "good.jpg", 64, 64, RED);
    let corrupt = dir.path().join("corrupt.jpg");
    fs::write(&corrupt, b"this is not a valid image file").unwrap();

    let result = MotionDetector::default().run(&good, &corrupt, &params());

    assert_eq!(result.decision, Decision::Error);
    assert_eq!(result.error_kind, Some(ErrorKind::Format));
    assert!(result.motion_percent.is_none());
    assert!(result.error_message.is_some());
    assert_eq!(result.exit_code(), 2);
}

#[test]
fn truncated_jpeg_is_a_format_error() {
    let dir = TempDir::new().unwrap();
    let a = noisy_jpeg(&dir, "a.jpg");
    let bytes = fs::read(&a).unwrap();
    let truncated = dir.path().join("truncated.jpg");
    fs::write(&truncated, &bytes[..bytes.len() / 2]).unwrap();

    let loaded = ImageLoader::new().load(&truncated, DecodeMode::Full, false);
    assert!(loaded.is_err());

    let detector = MotionDetector::default();
    let result = detector.run(&a, &truncated, &params());
    assert_eq!(result.decision, Decision::Error);
    assert_eq!(result.error_kind, Some(ErrorKind::Format));
    assert!(result.motion_percent.is_none());

    // DC decode fails, and so does the full-decode retry
    let dc = MotionParameters::builder()
        .decode_mode(DecodeMode::DcOnly)
        .build();
    let result = detector.run(&a, &truncated, &dc);
    assert_eq!(result.decision, Decision::Error);
    assert_eq!(result.error_kind, Some(ErrorKind::Format));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let good = solid_jpeg(&dir, "good.jpg", 64, 64, RED);

    let result = MotionDetector::default().run(&good, &dir.path().join("gone.jpg"), &params());

    assert_eq!(result.decision, Decision::Error);
    assert_eq!(result.error_kind, Some(ErrorKind::Io));
}

#[test]
fn different_dimensions_are_rejected() {
    let dir = TempDir::new().unwrap();
    let small = solid_jpeg(&dir, "small.jpg", 320, 240, RED);
    let large = solid_jpeg(&dir, "large.jpg", 640, 480, RED);

    let result = MotionDetector::default().run(&small, &large, &params());

    assert_eq!(result.decision, Decision::Error);
    assert_eq!(result.error_kind, Some(ErrorKind::DimensionMismatch));
}

#[test]
fn oversized_images_are_refused() {
    let dir = TempDir::new().unwrap();
    let a = solid_jpeg(&dir, "a.jpg", 640, 480, RED);
    let b = solid_jpeg(&dir, "b.jpg", 640, 480, RED);

    let detector = MotionDetector::builder()
        .limits(DecodeLimits::default().with_limit(DecodeMode::Full, 1000))
        .build();
    let result = detector.run(&a, &b, &params());

    assert_eq!(result.decision, Decision::Error);
    assert_eq!(result.error_kind, Some(ErrorKind::ImageTooLarge));
}

#[test]
fn stride_reduces_sampled_pixels() {
    let dir = TempDir::new().unwrap();
    let red = solid_jpeg(&dir, "red.jpg", 640, 480, RED);
    let blue = solid_jpeg(&dir, "blue.jpg", 640, 480, BLUE);
    let detector = MotionDetector::default();

    for (stride, expected) in [(1u64, 640u64 * 480), (2, 320 * 240), (3, 214 * 160)] {
        let params = MotionParameters::builder()
            .spatial_stride(stride as i64)
            .build();
        let result = detector.run(&red, &blue, &params);
        assert_eq!(result.diagnostics.pixels_sampled, expected, "stride {}", stride);
    }
}

#[test]
fn higher_pixel_threshold_never_increases_motion() {
    let dir = TempDir::new().unwrap();
    let a = noisy_jpeg(&dir, "a.jpg");
    let b = solid_jpeg(&dir, "b.jpg", 640, 480, Rgb([128, 128, 128]));
    let detector = MotionDetector::default();

    let mut previous = f64::MAX;
    for threshold in [0i64, 10, 25, 60, 120, 255] {
        let params = MotionParameters::builder()
            .pixel_threshold(threshold)
            .build();
        let percent = detector.run(&a, &b, &params).motion_percent.unwrap();
        assert!(percent <= previous, "threshold {}", threshold);
        previous = percent;
    }
    assert_eq!(previous, 0.0);
}

#[test]
fn appended_comment_stays_below_size_threshold() {
    let dir = TempDir::new().unwrap();
    let a = noisy_jpeg(&dir, "a.jpg");
    let b = dir.path().join("b.jpg");
    fs::copy(&a, &b).unwrap();
    let mut file = fs::OpenOptions::new().append(true).open(&b).unwrap();
    file.write_all(&[b'#'; 50]).unwrap();
    drop(file);

    let sizes = estimate_change(&a, &b).unwrap();
    assert!(sizes.percent > 0.0);
    assert!(sizes.percent < 5.0);

    let result = MotionDetector::default().run(&a, &b, &MotionParameters::file_size(5.0));
    assert_eq!(result.decision, Decision::NoMotion);
    assert!(result.diagnostics.size_comparison.is_some());
    assert!(result.diagnostics.compared_shape.is_none());
}

#[test]
fn header_estimate_never_exceeds_half_the_file() {
    for name in ["a.jpg", "a.png", "a.bmp", "a.gif", "noext"] {
        for size in [0u64, 1, 2, 100, 1_999, 2_000, 50_000, 10_000_000] {
            let estimate = estimate_header_size(Path::new(name), size);
            assert!(estimate <= size / 2, "{} at {} bytes", name, size);
        }
    }
}

#[test]
fn cascade_stops_at_size_gate_for_identical_files() {
    let dir = TempDir::new().unwrap();
    let a = noisy_jpeg(&dir, "a.jpg");
    let b = dir.path().join("b.jpg");
    fs::copy(&a, &b).unwrap();

    let result = Cascade::default().run(&MotionDetector::default(), &a, &b);

    assert_eq!(result.decision(), Decision::NoMotion);
    assert_eq!(result.stages.len(), 1);
    assert!(result.stopped_early());
}

#[test]
fn cascade_runs_every_stage_on_real_motion() {
    let dir = TempDir::new().unwrap();
    let a = noisy_jpeg(&dir, "a.jpg");
    let b = solid_jpeg(&dir, "b.jpg", 640, 480, RED);

    let result = Cascade::default().run(&MotionDetector::default(), &a, &b);

    assert_eq!(result.decision(), Decision::Motion);
    assert_eq!(result.stages.len(), result.total_stages);
}

#[test]
fn batch_over_directory() {
    let dir = TempDir::new().unwrap();
    solid_jpeg(&dir, "0001.jpg", 64, 64, RED);
    solid_jpeg(&dir, "0002.jpg", 64, 64, RED);
    solid_jpeg(&dir, "0003.jpg", 64, 64, BLUE);
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let report = BatchRunner::new(MotionDetector::default(), params())
        .run(dir.path())
        .unwrap();

    assert_eq!(report.pairs.len(), 2);
    assert_eq!(report.motion_count, 1);
    assert_eq!(report.error_count, 0);
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn batch_on_missing_directory_fails() {
    let dir = TempDir::new().unwrap();
    let result = BatchRunner::new(MotionDetector::default(), params())
        .run(&dir.path().join("nope"));
    assert!(result.is_err());
}
