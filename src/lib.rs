//! # framestitch
//!
//! Turn a panning video into a panorama: sample every N-th frame, stitch the
//! samples, crop away the black padding, resize, and write the result as a
//! floating-point image.
//!
//! Video decoding is powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate and image I/O
//! by [`image`](https://crates.io/crates/image). Panorama composition is
//! delegated to a [`StitchEngine`]; the `opencv` feature provides
//! [`OpenCvStitcher`], backed by OpenCV's `Stitcher`.
//!
//! ## Quick Start
//!
//! ```no_run
//! # #[cfg(feature = "opencv")]
//! # fn main() -> Result<(), framestitch::PanoramaError> {
//! use framestitch::{OpenCvStitcher, PanoramaOptions, Pipeline};
//!
//! let options = PanoramaOptions::new()
//!     .with_frame_interval(5)
//!     .with_frames_directory("extracted_frames");
//! let report = Pipeline::new(OpenCvStitcher::new(), options)
//!     .run("input.mp4", "panorama.exr")?;
//! println!("saved {}", report.output.display());
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "opencv"))]
//! # fn main() {}
//! ```
//!
//! ## Stages
//!
//! - **Frame extraction**: [`KeyframeExtractor`] writes `frame_0000.jpg`,
//!   `frame_0001.jpg`, ... for decode ordinals 0, N, 2N, ...
//! - **Border cropping**: [`crop_black_borders`] trims pure-black padding.
//! - **Stitching**: [`PanoramaStitcher`] loads frames, runs the engine,
//!   crops, and resizes to 1024x512 with area averaging.
//! - **Driver**: [`Pipeline`] chains the stages and writes the panorama with
//!   every channel scaled into `[0.0, 1.0]`.
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `opencv` | [`OpenCvStitcher`] engine and the `framestitch` CLI |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed. The `opencv` feature also
//! needs OpenCV 4 with the `stitching` module and `libclang`.

pub mod configuration;
mod conversion;
pub mod crop;
pub mod error;
pub mod extract;
pub mod ffmpeg;
#[cfg(feature = "opencv")]
pub mod opencv_engine;
pub mod pipeline;
pub mod progress;
pub mod stitch;

pub use configuration::{FrameFormat, FrameRetention, PanoramaOptions};
pub use conversion::{resize_area, to_normalized_float};
pub use crop::{CropRegion, content_bounds, crop_black_borders};
pub use error::PanoramaError;
pub use extract::{KeyframeExtractor, extract_keyframes, frame_file_name};
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
#[cfg(feature = "opencv")]
pub use opencv_engine::{OpenCvStitcher, StitchMode};
pub use pipeline::{PanoramaReport, Pipeline, PipelineStage, create_panorama};
pub use progress::{OperationType, ProgressCallback, ProgressInfo};
pub use stitch::{PanoramaStitcher, StitchEngine, StitchOutcome, StitchStatus};
