//! End-to-end pipeline tests using a generated video and an in-process
//! stitching engine.

mod common;

use std::{fs, path::Path};

use common::{FixedEngine, SideBySideEngine};
use framestitch::{
    FrameRetention, PanoramaError, PanoramaOptions, Pipeline, PipelineStage, StitchStatus,
    create_panorama,
};

fn options_in(directory: &Path) -> PanoramaOptions {
    PanoramaOptions::new()
        .with_frame_interval(5)
        .with_frames_directory(directory.join("frames"))
}

#[test]
fn video_becomes_normalized_1024_by_512_exr() {
    let temp = tempfile::tempdir().expect("tempdir");
    let Some(video) = common::write_panning_video(&temp.path().join("pan.avi"), 30) else {
        return;
    };
    let output = temp.path().join("panorama.exr");

    let mut pipeline = Pipeline::new(SideBySideEngine::default(), options_in(temp.path()));
    let report = pipeline.run(&video, &output).expect("pipeline");

    assert_eq!(pipeline.stage(), PipelineStage::Done);
    assert_eq!(report.output, output);
    assert_eq!((report.width, report.height), (1024, 512));
    assert_eq!(report.keyframes.len(), 6);
    assert!(!report.frames_purged);
    assert_eq!(pipeline.stitcher().engine().last_input_count, 6);

    let written = image::open(&output).expect("read panorama").to_rgb32f();
    assert_eq!(written.dimensions(), (1024, 512));
    assert!(
        written
            .pixels()
            .flat_map(|pixel| pixel.0)
            .all(|value| (0.0..=1.0).contains(&value))
    );
    // The synthetic frames are bright everywhere.
    assert!(written.pixels().all(|pixel| pixel.0.iter().any(|&v| v > 0.0)));
}

#[test]
fn keyframes_are_retained_by_default() {
    let temp = tempfile::tempdir().expect("tempdir");
    let Some(video) = common::write_panning_video(&temp.path().join("pan.avi"), 10) else {
        return;
    };

    let report = Pipeline::new(SideBySideEngine::default(), options_in(temp.path()))
        .run(&video, temp.path().join("panorama.exr"))
        .expect("pipeline");

    assert!(report.keyframes.iter().all(|path| path.exists()));
}

#[test]
fn purge_removes_keyframes_and_empty_directory() {
    let temp = tempfile::tempdir().expect("tempdir");
    let Some(video) = common::write_panning_video(&temp.path().join("pan.avi"), 10) else {
        return;
    };
    let options = options_in(temp.path()).with_frame_retention(FrameRetention::Purge);

    let report = Pipeline::new(SideBySideEngine::default(), options)
        .run(&video, temp.path().join("panorama.exr"))
        .expect("pipeline");

    assert!(report.frames_purged);
    assert!(report.keyframes.iter().all(|path| !path.exists()));
    assert!(!temp.path().join("frames").exists());
    assert!(temp.path().join("panorama.exr").exists());
}

#[test]
fn purge_also_runs_when_stitching_fails() {
    let temp = tempfile::tempdir().expect("tempdir");
    let Some(video) = common::write_panning_video(&temp.path().join("pan.avi"), 10) else {
        return;
    };
    let options = options_in(temp.path()).with_frame_retention(FrameRetention::Purge);
    let output = temp.path().join("panorama.exr");

    let mut pipeline = Pipeline::new(
        FixedEngine::failing(StitchStatus::HomographyEstimationFailed),
        options,
    );
    let error = pipeline.run(&video, &output).unwrap_err();

    assert!(matches!(
        error,
        PanoramaError::StitchFailure { code: Some(2), .. }
    ));
    assert_eq!(pipeline.stage(), PipelineStage::Stitching);
    assert!(!temp.path().join("frames").exists());
    assert!(!output.exists());
}

#[test]
fn purge_removes_frames_saved_before_extraction_failed() {
    let temp = tempfile::tempdir().expect("tempdir");
    let Some(video) = common::write_panning_video(&temp.path().join("pan.avi"), 10) else {
        return;
    };
    let frames_directory = temp.path().join("frames");
    // A directory squatting on the second frame's name makes its save fail.
    fs::create_dir_all(frames_directory.join("frame_0001.jpg")).expect("create blocker");
    let options = options_in(temp.path()).with_frame_retention(FrameRetention::Purge);

    let mut pipeline = Pipeline::new(SideBySideEngine::default(), options);
    let error = pipeline
        .run(&video, temp.path().join("panorama.exr"))
        .unwrap_err();

    assert!(
        matches!(
            error,
            PanoramaError::IoError(_) | PanoramaError::ImageError(_)
        ),
        "{error:?}"
    );
    assert_eq!(pipeline.stage(), PipelineStage::Extracting);
    assert_eq!(pipeline.stitcher().engine().calls, 0);
    assert!(!frames_directory.join("frame_0000.jpg").exists());
    let leftover_files: Vec<_> = fs::read_dir(&frames_directory)
        .expect("read frames directory")
        .map(|entry| entry.expect("entry").path())
        .filter(|path| path.is_file())
        .collect();
    assert!(leftover_files.is_empty(), "{leftover_files:?}");
}

#[test]
fn stitch_failure_writes_no_output() {
    let temp = tempfile::tempdir().expect("tempdir");
    let Some(video) = common::write_panning_video(&temp.path().join("pan.avi"), 10) else {
        return;
    };
    let output = temp.path().join("panorama.exr");

    let mut pipeline = Pipeline::new(
        FixedEngine::failing(StitchStatus::NeedMoreImages),
        options_in(temp.path()),
    );
    let error = pipeline.run(&video, &output).unwrap_err();

    assert!(matches!(error, PanoramaError::StitchFailure { .. }));
    assert!(!output.exists());
    assert_eq!(pipeline.stitcher().engine().calls, 1);
}

#[test]
fn empty_video_stops_before_stitching() {
    let temp = tempfile::tempdir().expect("tempdir");
    let Some(video) = common::write_panning_video(&temp.path().join("empty.avi"), 0) else {
        return;
    };
    let output = temp.path().join("panorama.exr");

    let mut pipeline = Pipeline::new(SideBySideEngine::default(), options_in(temp.path()));
    match pipeline.run(&video, &output) {
        Err(PanoramaError::NoKeyframes) => {}
        // Some FFmpeg builds refuse to demux a stream without frames.
        Err(PanoramaError::SourceUnavailable { .. }) => {}
        other => panic!("expected NoKeyframes, got {other:?}"),
    }

    assert_eq!(pipeline.stitcher().engine().calls, 0);
    assert!(!output.exists());
}

#[test]
fn missing_video_is_source_unavailable() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut pipeline = Pipeline::new(SideBySideEngine::default(), options_in(temp.path()));

    let error = pipeline
        .run(temp.path().join("nope.mp4"), temp.path().join("panorama.exr"))
        .unwrap_err();

    assert!(matches!(error, PanoramaError::SourceUnavailable { .. }));
    assert_eq!(pipeline.stage(), PipelineStage::Extracting);
    assert!(!temp.path().join("frames").exists());
    assert_eq!(pipeline.stitcher().engine().calls, 0);
}

#[test]
fn invalid_output_size_fails_before_extraction() {
    let temp = tempfile::tempdir().expect("tempdir");
    let options = options_in(temp.path()).with_output_size(1024, 0);
    let mut pipeline = Pipeline::new(SideBySideEngine::default(), options);

    let error = pipeline
        .run(temp.path().join("nope.mp4"), temp.path().join("panorama.exr"))
        .unwrap_err();

    assert!(matches!(error, PanoramaError::InvalidOutputSize { .. }));
    assert_eq!(pipeline.stage(), PipelineStage::Idle);
}

#[test]
fn create_panorama_reports_unopenable_video() {
    let temp = tempfile::tempdir().expect("tempdir");
    let error = create_panorama(
        SideBySideEngine::default(),
        temp.path().join("nope.mp4"),
        temp.path().join("panorama.exr"),
        5,
    )
    .unwrap_err();

    match error {
        PanoramaError::SourceUnavailable { path, .. } => {
            assert_eq!(path, temp.path().join("nope.mp4"));
        }
        other => panic!("expected SourceUnavailable, got {other:?}"),
    }
}
