//! Pipeline configuration.
//!
//! [`PanoramaOptions`] is a builder that threads the frame stride, the
//! scratch directory for sampled frames, frame encoding, output resolution,
//! and a progress callback through every stage.
//!
//! # Example
//!
//! ```no_run
//! use framestitch::{FrameFormat, FrameRetention, PanoramaOptions};
//!
//! let options = PanoramaOptions::new()
//!     .with_frame_interval(10)
//!     .with_frames_directory("/tmp/run-42/frames")
//!     .with_frame_format(FrameFormat::Png)
//!     .with_output_size(2048, 1024)
//!     .with_frame_retention(FrameRetention::Purge);
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    error::PanoramaError,
    progress::{NoOpProgress, ProgressCallback},
};

/// Default stride between sampled frames.
pub const DEFAULT_FRAME_INTERVAL: u64 = 5;
/// Default directory that receives sampled frames.
pub const DEFAULT_FRAMES_DIRECTORY: &str = "extracted_frames";
/// Default panorama width after resizing.
pub const DEFAULT_OUTPUT_WIDTH: u32 = 1024;
/// Default panorama height after resizing.
pub const DEFAULT_OUTPUT_HEIGHT: u32 = 512;
/// Default JPEG quality for sampled frames.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Image format used for sampled frames on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameFormat {
    /// Lossy JPEG. This is the default.
    #[default]
    Jpeg,
    /// Lossless PNG.
    Png,
    /// Uncompressed BMP.
    Bmp,
}

impl FrameFormat {
    /// File extension written for this format, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            FrameFormat::Jpeg => "jpg",
            FrameFormat::Png => "png",
            FrameFormat::Bmp => "bmp",
        }
    }

    /// Parse a file extension (`jpg`, `.png`, `BMP`, ...).
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(FrameFormat::Jpeg),
            "png" => Some(FrameFormat::Png),
            "bmp" => Some(FrameFormat::Bmp),
            _ => None,
        }
    }
}

/// What happens to sampled frame files once a run finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameRetention {
    /// Leave every frame file on disk. This is the default.
    #[default]
    Retain,
    /// Delete the frame files written by the run, on success and on failure,
    /// then remove the frames directory if it is left empty.
    Purge,
}

/// Configuration for a panorama run.
///
/// All fields have sensible defaults: a default-constructed value samples
/// every 5th frame into `extracted_frames/` as JPEG, resizes the panorama to
/// 1024x512, and keeps the frame files.
#[derive(Clone)]
#[must_use]
pub struct PanoramaOptions {
    pub(crate) frame_interval: u64,
    pub(crate) frames_directory: PathBuf,
    pub(crate) frame_format: FrameFormat,
    pub(crate) jpeg_quality: u8,
    pub(crate) output_width: u32,
    pub(crate) output_height: u32,
    pub(crate) frame_retention: FrameRetention,
    pub(crate) progress: Arc<dyn ProgressCallback>,
}

impl Debug for PanoramaOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("PanoramaOptions")
            .field("frame_interval", &self.frame_interval)
            .field("frames_directory", &self.frames_directory)
            .field("frame_format", &self.frame_format)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("output_width", &self.output_width)
            .field("output_height", &self.output_height)
            .field("frame_retention", &self.frame_retention)
            .finish_non_exhaustive()
    }
}

impl Default for PanoramaOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl PanoramaOptions {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self {
            frame_interval: DEFAULT_FRAME_INTERVAL,
            frames_directory: PathBuf::from(DEFAULT_FRAMES_DIRECTORY),
            frame_format: FrameFormat::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            output_width: DEFAULT_OUTPUT_WIDTH,
            output_height: DEFAULT_OUTPUT_HEIGHT,
            frame_retention: FrameRetention::default(),
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Sample every `interval`-th decoded frame.
    ///
    /// Zero is accepted here and rejected with
    /// [`PanoramaError::InvalidInterval`] when extraction starts.
    pub fn with_frame_interval(mut self, interval: u64) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Directory that receives sampled frames. Created if absent.
    pub fn with_frames_directory<P: AsRef<Path>>(mut self, directory: P) -> Self {
        self.frames_directory = directory.as_ref().to_path_buf();
        self
    }

    /// Image format for sampled frames.
    pub fn with_frame_format(mut self, format: FrameFormat) -> Self {
        self.frame_format = format;
        self
    }

    /// JPEG quality (1-100) for sampled frames. Clamped into range.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Final panorama resolution.
    pub fn with_output_size(mut self, width: u32, height: u32) -> Self {
        self.output_width = width;
        self.output_height = height;
        self
    }

    /// Keep or purge sampled frames after the run.
    pub fn with_frame_retention(mut self, retention: FrameRetention) -> Self {
        self.frame_retention = retention;
        self
    }

    /// Attach a progress callback.
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Stride between sampled frames.
    pub fn frame_interval(&self) -> u64 {
        self.frame_interval
    }

    /// Directory that receives sampled frames.
    pub fn frames_directory(&self) -> &Path {
        &self.frames_directory
    }

    /// Image format for sampled frames.
    pub fn frame_format(&self) -> FrameFormat {
        self.frame_format
    }

    /// JPEG quality for sampled frames.
    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    /// Final panorama resolution as `(width, height)`.
    pub fn output_size(&self) -> (u32, u32) {
        (self.output_width, self.output_height)
    }

    /// Retention policy for sampled frames.
    pub fn frame_retention(&self) -> FrameRetention {
        self.frame_retention
    }

    pub(crate) fn validate_output_size(&self) -> Result<(), PanoramaError> {
        if self.output_width == 0 || self.output_height == 0 {
            return Err(PanoramaError::InvalidOutputSize {
                width: self.output_width,
                height: self.output_height,
            });
        }
        Ok(())
    }
}
