//! The end-to-end panorama pipeline.
//!
//! [`Pipeline`] runs the stages in a fixed order: extract keyframes, stitch
//! them, convert the result to normalized floats, and save it. Any stage
//! failure ends the run; nothing is retried and nothing already written is
//! rolled back, except that sampled frames are deleted when
//! [`FrameRetention::Purge`] is configured.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "opencv")]
//! # fn main() -> Result<(), framestitch::PanoramaError> {
//! use framestitch::{OpenCvStitcher, PanoramaOptions, Pipeline};
//!
//! let options = PanoramaOptions::new().with_frame_interval(5);
//! let mut pipeline = Pipeline::new(OpenCvStitcher::new(), options);
//! let report = pipeline.run("input.mp4", "panorama.exr")?;
//! println!("{}x{} -> {}", report.width, report.height, report.output.display());
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "opencv"))]
//! # fn main() {}
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use image::DynamicImage;

use crate::{
    configuration::{FrameRetention, PanoramaOptions},
    conversion::to_normalized_float,
    error::PanoramaError,
    extract::KeyframeExtractor,
    stitch::{PanoramaStitcher, StitchEngine},
};

/// The stage a [`Pipeline`] is in, or stopped in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineStage {
    /// Not started yet.
    #[default]
    Idle,
    /// Decoding the video and saving sampled frames.
    Extracting,
    /// Loading frames and running the stitching engine.
    Stitching,
    /// Normalizing the panorama and writing it out.
    Converting,
    /// The output file has been written.
    Done,
}

/// Summary of a successful pipeline run.
#[derive(Debug, Clone)]
pub struct PanoramaReport {
    /// Where the floating-point panorama was written.
    pub output: PathBuf,
    /// Sampled frame files, in stream order. They may no longer exist when
    /// `frames_purged` is `true`.
    pub keyframes: Vec<PathBuf>,
    /// Width of the written panorama.
    pub width: u32,
    /// Height of the written panorama.
    pub height: u32,
    /// Whether the sampled frames were deleted after the run.
    pub frames_purged: bool,
}

/// Runs extraction, stitching, conversion, and saving in sequence.
pub struct Pipeline<E> {
    options: PanoramaOptions,
    stitcher: PanoramaStitcher<E>,
    stage: PipelineStage,
}

impl<E: StitchEngine> Pipeline<E> {
    /// Create a pipeline that stitches with `engine`.
    pub fn new(engine: E, options: PanoramaOptions) -> Self {
        let stitcher = PanoramaStitcher::new(engine, &options);
        Self {
            options,
            stitcher,
            stage: PipelineStage::Idle,
        }
    }

    /// The options this pipeline was built with.
    pub fn options(&self) -> &PanoramaOptions {
        &self.options
    }

    /// The stitcher (and through it, the engine) used by this pipeline.
    pub fn stitcher(&self) -> &PanoramaStitcher<E> {
        &self.stitcher
    }

    /// The last stage entered. After a failed run this is the stage that
    /// failed.
    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Turn `video` into a floating-point panorama at `output`.
    ///
    /// The output format follows the file extension; pick one that can hold
    /// 32-bit float channels, such as `.exr`.
    ///
    /// # Errors
    ///
    /// - [`PanoramaError::SourceUnavailable`] if the video cannot be opened.
    /// - [`PanoramaError::NoKeyframes`] if extraction yields no frames; the
    ///   stitching engine is not invoked.
    /// - [`PanoramaError::ImageLoadFailure`] or
    ///   [`PanoramaError::StitchFailure`] from the stitching stage.
    /// - [`PanoramaError::ImageError`] if the output cannot be written.
    ///
    /// With [`FrameRetention::Purge`], every frame saved before the error is
    /// deleted as well, including when extraction itself fails part-way.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
        &mut self,
        video: P,
        output: Q,
    ) -> Result<PanoramaReport, PanoramaError> {
        let output = output.as_ref();
        self.options.validate_output_size()?;

        self.stage = PipelineStage::Extracting;
        log::info!("Extracting keyframes...");
        let mut keyframes = Vec::new();
        let result = KeyframeExtractor::from_options(&self.options)
            .extract_into(video.as_ref(), &self.options.frames_directory, &mut keyframes)
            .and_then(|()| self.stitch_and_save(&keyframes, output));

        let frames_purged = match self.options.frame_retention {
            FrameRetention::Retain => false,
            FrameRetention::Purge => purge_frames(&keyframes, &self.options.frames_directory),
        };

        let (width, height) = result?;
        Ok(PanoramaReport {
            output: output.to_path_buf(),
            keyframes,
            width,
            height,
            frames_purged,
        })
    }

    fn stitch_and_save(
        &mut self,
        keyframes: &[PathBuf],
        output: &Path,
    ) -> Result<(u32, u32), PanoramaError> {
        if keyframes.is_empty() {
            log::error!("No keyframes found.");
            return Err(PanoramaError::NoKeyframes);
        }

        self.stage = PipelineStage::Stitching;
        log::info!("Stitching images...");
        let panorama = self.stitcher.stitch_files(keyframes).inspect_err(|error| {
            log::error!("Panorama stitching failed: {error}");
        })?;

        self.stage = PipelineStage::Converting;
        let (width, height) = panorama.dimensions();
        let normalized = to_normalized_float(&panorama);
        DynamicImage::ImageRgb32F(normalized).save(output)?;

        self.stage = PipelineStage::Done;
        log::info!("Panoramic HDR image saved as {}", output.display());
        Ok((width, height))
    }
}

/// Extract, stitch, and save in one call with default options apart from
/// the frame interval.
///
/// Sampled frames go to `extracted_frames/` and are kept.
pub fn create_panorama<E, P, Q>(
    engine: E,
    video: P,
    output: Q,
    frame_interval: u64,
) -> Result<PanoramaReport, PanoramaError>
where
    E: StitchEngine,
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let options = PanoramaOptions::new().with_frame_interval(frame_interval);
    Pipeline::new(engine, options).run(video, output)
}

/// Delete the frames written by a run, then the directory if it is empty.
///
/// Returns `true` when every frame file was removed.
fn purge_frames(keyframes: &[PathBuf], directory: &Path) -> bool {
    let mut all_removed = true;
    for path in keyframes {
        if let Err(error) = fs::remove_file(path) {
            log::warn!("Could not remove {}: {error}", path.display());
            all_removed = false;
        }
    }

    // Only succeeds when nothing else lives in the directory.
    if fs::remove_dir(directory).is_ok() {
        log::debug!("Removed empty frames directory {}", directory.display());
    }

    log::info!("Purged {} frame file(s)", keyframes.len());
    all_removed
}
