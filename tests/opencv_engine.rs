//! OpenCV engine tests. Only built with `--features opencv`.

#![cfg(feature = "opencv")]

use framestitch::{
    OpenCvStitcher, PanoramaError, PanoramaStitcher, StitchEngine, StitchMode, StitchStatus,
};
use image::{Rgb, RgbImage};

fn textured(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) % 256) as u8])
    })
}

#[test]
fn default_mode_is_panorama() {
    let engine = OpenCvStitcher::new();
    assert_eq!(engine.mode(), StitchMode::Panorama);
    assert!(engine.name().contains("panorama"));
}

#[test]
fn scans_mode_is_reported_in_name() {
    let engine = OpenCvStitcher::with_mode(StitchMode::Scans);
    assert_eq!(engine.mode(), StitchMode::Scans);
    assert!(engine.name().contains("scans"));
}

#[test]
fn single_image_needs_more_images() {
    let mut engine = OpenCvStitcher::new();
    let outcome = engine.stitch(&[textured(120, 80)]).expect("engine ran");
    assert_eq!(outcome.status, StitchStatus::NeedMoreImages);
    assert!(outcome.panorama.is_none());
}

#[test]
fn single_image_fails_through_stitcher() {
    let mut stitcher = PanoramaStitcher::with_engine(OpenCvStitcher::new());
    let error = stitcher.stitch_images(&[textured(120, 80)]).unwrap_err();
    assert!(matches!(
        error,
        PanoramaError::StitchFailure { code: Some(1), .. }
    ));
}
