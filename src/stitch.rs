//! Panorama stitching.
//!
//! Composition itself (feature detection, matching, homography estimation,
//! seam blending) is delegated to a [`StitchEngine`]. [`PanoramaStitcher`]
//! wraps an engine with the surrounding steps: loading the frame files,
//! interpreting the engine's status, cropping the black padding, and
//! resizing to the target resolution.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "opencv")]
//! # fn main() -> Result<(), framestitch::PanoramaError> {
//! use framestitch::{OpenCvStitcher, PanoramaOptions, PanoramaStitcher};
//!
//! let mut stitcher = PanoramaStitcher::new(OpenCvStitcher::new(), &PanoramaOptions::new());
//! let panorama = stitcher.stitch_files(&["frame_0000.jpg", "frame_0001.jpg"])?;
//! panorama.save("panorama.png")?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "opencv"))]
//! # fn main() {}
//! ```

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    sync::Arc,
};

use image::RgbImage;

use crate::{
    configuration::{DEFAULT_OUTPUT_HEIGHT, DEFAULT_OUTPUT_WIDTH, PanoramaOptions},
    conversion::resize_area,
    crop::crop_black_borders,
    error::PanoramaError,
    progress::{NoOpProgress, OperationType, ProgressCallback, ProgressTracker},
};

/// Status reported by a stitching engine.
///
/// The numeric codes follow the widely used OpenCV convention so that
/// reports stay comparable across engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StitchStatus {
    /// The engine finished without error.
    Ok,
    /// Not enough overlapping images to build a panorama.
    NeedMoreImages,
    /// No consistent homography between the images could be estimated.
    HomographyEstimationFailed,
    /// Camera parameter refinement (bundle adjustment) did not converge.
    CameraParametersAdjustmentFailed,
    /// Any other engine-specific status code.
    Other(i32),
}

impl StitchStatus {
    /// Numeric status code.
    pub fn code(self) -> i32 {
        match self {
            StitchStatus::Ok => 0,
            StitchStatus::NeedMoreImages => 1,
            StitchStatus::HomographyEstimationFailed => 2,
            StitchStatus::CameraParametersAdjustmentFailed => 3,
            StitchStatus::Other(code) => code,
        }
    }

    /// Map a numeric status code back to a status.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => StitchStatus::Ok,
            1 => StitchStatus::NeedMoreImages,
            2 => StitchStatus::HomographyEstimationFailed,
            3 => StitchStatus::CameraParametersAdjustmentFailed,
            other => StitchStatus::Other(other),
        }
    }

    /// Returns `true` for [`StitchStatus::Ok`].
    pub fn is_ok(self) -> bool {
        self == StitchStatus::Ok
    }
}

impl Display for StitchStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StitchStatus::Ok => write!(f, "ok"),
            StitchStatus::NeedMoreImages => write!(f, "need more images"),
            StitchStatus::HomographyEstimationFailed => write!(f, "homography estimation failed"),
            StitchStatus::CameraParametersAdjustmentFailed => {
                write!(f, "camera parameters adjustment failed")
            }
            StitchStatus::Other(code) => write!(f, "engine status {code}"),
        }
    }
}

/// What a [`StitchEngine`] returns: a status and, possibly, a composite.
#[derive(Debug, Clone)]
pub struct StitchOutcome {
    /// Status reported by the engine.
    pub status: StitchStatus,
    /// The composite, if the engine produced one.
    pub panorama: Option<RgbImage>,
}

impl StitchOutcome {
    /// A successful outcome carrying `panorama`.
    pub fn success(panorama: RgbImage) -> Self {
        Self {
            status: StitchStatus::Ok,
            panorama: Some(panorama),
        }
    }

    /// A failed outcome with `status` and no composite.
    pub fn failure(status: StitchStatus) -> Self {
        Self {
            status,
            panorama: None,
        }
    }
}

/// A panorama composition engine.
///
/// Given an ordered list of overlapping RGB images, return a status and an
/// optional composite. Any engine honouring this contract can be dropped
/// into [`PanoramaStitcher`] and [`Pipeline`](crate::Pipeline) unchanged.
pub trait StitchEngine {
    /// Compose `images` into a single panorama.
    ///
    /// Return `Err` only for faults inside the engine itself; a stitch that
    /// simply does not work out is an `Ok` outcome with a non-success status.
    fn stitch(&mut self, images: &[RgbImage]) -> Result<StitchOutcome, PanoramaError>;

    /// Short engine name for log messages.
    fn name(&self) -> &str {
        "stitch engine"
    }
}

impl<E: StitchEngine + ?Sized> StitchEngine for Box<E> {
    fn stitch(&mut self, images: &[RgbImage]) -> Result<StitchOutcome, PanoramaError> {
        (**self).stitch(images)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Loads frame files, stitches them, crops the black border, and resizes
/// the result to a fixed resolution.
pub struct PanoramaStitcher<E> {
    engine: E,
    output_width: u32,
    output_height: u32,
    progress: Arc<dyn ProgressCallback>,
}

impl<E: StitchEngine> PanoramaStitcher<E> {
    /// Create a stitcher that uses `engine` and the output size and progress
    /// callback from `options`.
    pub fn new(engine: E, options: &PanoramaOptions) -> Self {
        let (output_width, output_height) = options.output_size();
        Self {
            engine,
            output_width,
            output_height,
            progress: Arc::clone(&options.progress),
        }
    }

    /// Create a stitcher with the default 1024x512 output and no progress
    /// reporting.
    pub fn with_engine(engine: E) -> Self {
        Self {
            engine,
            output_width: DEFAULT_OUTPUT_WIDTH,
            output_height: DEFAULT_OUTPUT_HEIGHT,
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Borrow the underlying engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Output resolution as `(width, height)`.
    pub fn output_size(&self) -> (u32, u32) {
        (self.output_width, self.output_height)
    }

    /// Load `paths`, stitch them, crop, and resize.
    ///
    /// Every path is attempted before any failure is reported.
    ///
    /// # Errors
    ///
    /// - [`PanoramaError::ImageLoadFailure`] listing every path that could
    ///   not be decoded; the engine is not invoked.
    /// - [`PanoramaError::StitchFailure`] if the engine reports a non-success
    ///   status, reports success without a composite, or the composite is
    ///   entirely black.
    /// - [`PanoramaError::InvalidOutputSize`] if the output size has a zero
    ///   dimension.
    pub fn stitch_files<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<RgbImage, PanoramaError> {
        let images = self.load_images(paths)?;
        self.stitch_images(&images)
    }

    /// Stitch already-decoded images, then crop and resize.
    ///
    /// # Errors
    ///
    /// Same as [`stitch_files`](PanoramaStitcher::stitch_files), minus the
    /// load failure.
    pub fn stitch_images(&mut self, images: &[RgbImage]) -> Result<RgbImage, PanoramaError> {
        if self.output_width == 0 || self.output_height == 0 {
            return Err(PanoramaError::InvalidOutputSize {
                width: self.output_width,
                height: self.output_height,
            });
        }

        log::info!(
            "Stitching {} image(s) with {}",
            images.len(),
            self.engine.name(),
        );

        let outcome = self.engine.stitch(images)?;
        ProgressTracker::new(
            Arc::clone(&self.progress),
            OperationType::Stitching,
            Some(1),
        )
        .advance(None);

        let panorama = accept_outcome(outcome)?;
        log::debug!(
            "Engine produced a {}x{} composite",
            panorama.width(),
            panorama.height(),
        );

        let cropped = crop_black_borders(&panorama);
        if cropped.width() == 0 || cropped.height() == 0 {
            log::error!("Stitched panorama has no non-black content");
            return Err(PanoramaError::StitchFailure {
                code: None,
                reason: "panorama has no non-black content".to_string(),
            });
        }

        resize_area(&cropped, self.output_width, self.output_height)
    }

    fn load_images<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<RgbImage>, PanoramaError> {
        let mut tracker = ProgressTracker::new(
            Arc::clone(&self.progress),
            OperationType::ImageLoading,
            Some(paths.len() as u64),
        );
        let mut images = Vec::with_capacity(paths.len());
        let mut failed: Vec<PathBuf> = Vec::new();

        for path in paths {
            let path = path.as_ref();
            match image::open(path) {
                Ok(image) => images.push(image.to_rgb8()),
                Err(error) => {
                    log::warn!("Could not load {}: {error}", path.display());
                    failed.push(path.to_path_buf());
                }
            }
            tracker.advance(None);
        }

        if !failed.is_empty() {
            log::error!("Some images were not loaded correctly ({} failed)", failed.len());
            return Err(PanoramaError::ImageLoadFailure { failed });
        }

        Ok(images)
    }
}

/// Turn an engine outcome into a usable composite or a stitch failure.
///
/// Success without a composite and an explicit failure status are treated
/// alike.
fn accept_outcome(outcome: StitchOutcome) -> Result<RgbImage, PanoramaError> {
    match outcome {
        StitchOutcome {
            status: StitchStatus::Ok,
            panorama: Some(panorama),
        } if panorama.width() > 0 && panorama.height() > 0 => Ok(panorama),
        StitchOutcome {
            status: StitchStatus::Ok,
            ..
        } => {
            log::error!("Stitching reported success but produced no panorama");
            Err(PanoramaError::StitchFailure {
                code: Some(StitchStatus::Ok.code()),
                reason: "engine reported success without a panorama".to_string(),
            })
        }
        StitchOutcome { status, .. } => {
            log::error!("Error stitching images: {} ({status})", status.code());
            Err(PanoramaError::StitchFailure {
                code: Some(status.code()),
                reason: status.to_string(),
            })
        }
    }
}
