//! OpenCV-backed stitching engine.
//!
//! [`OpenCvStitcher`] hands images to `cv::Stitcher`, which runs the full
//! feature matching, bundle adjustment, and seam blending pipeline. Only the
//! RGB/BGR conversion at the boundary lives here.
//!
//! Requires the `opencv` feature and an OpenCV installation with the
//! `stitching` module.

use image::{Rgb, RgbImage};
use opencv::{
    core::{Mat, Vec3b, VecN, Vector},
    prelude::*,
    stitching::{Stitcher, Stitcher_Mode, Stitcher_Status},
};

use crate::{
    error::PanoramaError,
    stitch::{StitchEngine, StitchOutcome, StitchStatus},
};

/// Warping model used by the OpenCV stitcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StitchMode {
    /// Spherical warping for photos taken by rotating a camera. This is the
    /// default and the right choice for panning video.
    #[default]
    Panorama,
    /// Affine model for flat scenes captured by translating the camera
    /// (documents, murals, satellite strips).
    Scans,
}

impl StitchMode {
    fn to_opencv(self) -> Stitcher_Mode {
        match self {
            StitchMode::Panorama => Stitcher_Mode::PANORAMA,
            StitchMode::Scans => Stitcher_Mode::SCANS,
        }
    }
}

/// [`StitchEngine`] backed by OpenCV's high-level `Stitcher`.
#[derive(Debug, Clone, Default)]
pub struct OpenCvStitcher {
    mode: StitchMode,
}

impl OpenCvStitcher {
    /// Create an engine in [`StitchMode::Panorama`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with the given warping mode.
    pub fn with_mode(mode: StitchMode) -> Self {
        Self { mode }
    }

    /// The configured warping mode.
    pub fn mode(&self) -> StitchMode {
        self.mode
    }
}

impl StitchEngine for OpenCvStitcher {
    fn stitch(&mut self, images: &[RgbImage]) -> Result<StitchOutcome, PanoramaError> {
        let mut inputs: Vector<Mat> = Vector::with_capacity(images.len());
        for image in images {
            inputs.push(rgb_to_bgr_mat(image)?);
        }

        let mut stitcher = Stitcher::create(self.mode.to_opencv())?;
        let mut panorama = Mat::default();
        let status = stitcher.stitch(&inputs, &mut panorama)?;

        let status = match status {
            Stitcher_Status::OK => StitchStatus::Ok,
            Stitcher_Status::ERR_NEED_MORE_IMGS => StitchStatus::NeedMoreImages,
            Stitcher_Status::ERR_HOMOGRAPHY_EST_FAIL => StitchStatus::HomographyEstimationFailed,
            Stitcher_Status::ERR_CAMERA_PARAMS_ADJUST_FAIL => {
                StitchStatus::CameraParametersAdjustmentFailed
            }
        };

        if !status.is_ok() || panorama.empty() {
            return Ok(StitchOutcome {
                status,
                panorama: None,
            });
        }

        Ok(StitchOutcome::success(bgr_mat_to_rgb(&panorama)?))
    }

    fn name(&self) -> &str {
        match self.mode {
            StitchMode::Panorama => "OpenCV stitcher (panorama)",
            StitchMode::Scans => "OpenCV stitcher (scans)",
        }
    }
}

/// Copy an RGB image into an owned 8UC3 BGR matrix.
fn rgb_to_bgr_mat(image: &RgbImage) -> Result<Mat, PanoramaError> {
    let rows: Vec<Vec<Vec3b>> = image
        .rows()
        .map(|row| {
            row.map(|&Rgb([r, g, b])| VecN([b, g, r]))
                .collect::<Vec<Vec3b>>()
        })
        .collect();
    Ok(Mat::from_slice_2d(rows.as_slice())?)
}

/// Copy an 8UC3 BGR matrix into an RGB image.
fn bgr_mat_to_rgb(mat: &Mat) -> Result<RgbImage, PanoramaError> {
    let owned;
    let mat = if mat.is_continuous() {
        mat
    } else {
        owned = mat.try_clone()?;
        &owned
    };

    let width = mat.cols() as u32;
    let height = mat.rows() as u32;
    let pixels = mat.data_typed::<Vec3b>()?;

    let mut buffer = Vec::with_capacity(pixels.len() * 3);
    for pixel in pixels {
        let [b, g, r] = pixel.0;
        buffer.extend_from_slice(&[r, g, b]);
    }

    RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        PanoramaError::EngineError(format!(
            "stitched matrix does not match its {width}x{height} shape"
        ))
    })
}
