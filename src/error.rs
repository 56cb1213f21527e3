//! Error types for the `framestitch` crate.
//!
//! This module defines [`PanoramaError`], the unified error type returned by
//! every fallible operation in the crate. Each pipeline stage detects its own
//! failure class, logs it, and returns it; the driver propagates it unchanged.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `framestitch` operations.
///
/// None of these variants are fatal to the process. Each one halts only the
/// current pipeline run, and frame files already written stay on disk unless
/// [`FrameRetention::Purge`](crate::FrameRetention::Purge) is configured.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PanoramaError {
    /// The video source could not be opened or has no video stream.
    #[error("Could not open video source at {path}: {reason}")]
    SourceUnavailable {
        /// Path that was passed to the extractor.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// Extraction finished without sampling a single frame.
    #[error("No keyframes found")]
    NoKeyframes,

    /// One or more frame images could not be decoded before stitching.
    #[error("Failed to load {} image(s) for stitching: {}", .failed.len(), display_paths(.failed))]
    ImageLoadFailure {
        /// Every path that failed to load, in input order.
        failed: Vec<PathBuf>,
    },

    /// The stitching engine reported a non-success status, or reported
    /// success without a usable panorama.
    #[error("Panorama stitching failed{}: {reason}", .code.map(|c| format!(" (status {c})")).unwrap_or_default())]
    StitchFailure {
        /// Numeric status reported by the engine, when it reported one.
        code: Option<i32>,
        /// Human-readable description of the failure.
        reason: String,
    },

    /// A frame interval of zero was provided.
    #[error("Frame interval must be greater than zero")]
    InvalidInterval,

    /// The configured output resolution has a zero dimension.
    #[error("Invalid output size {width}x{height}: both dimensions must be non-zero")]
    InvalidOutputSize {
        /// Requested output width.
        width: u32,
        /// Requested output height.
        height: u32,
    },

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An internal fault raised by the stitching engine itself.
    #[error("Stitching engine error: {0}")]
    EngineError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while reading or writing images.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}

impl From<FfmpegError> for PanoramaError {
    fn from(error: FfmpegError) -> Self {
        PanoramaError::FfmpegError(error.to_string())
    }
}

#[cfg(feature = "opencv")]
impl From<opencv::Error> for PanoramaError {
    fn from(error: opencv::Error) -> Self {
        PanoramaError::EngineError(error.to_string())
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
