//! Black border removal.
//!
//! Stitching warps every input onto a shared surface, so the composite is an
//! irregular shape padded with pure black. [`crop_black_borders`] trims that
//! padding down to the smallest rectangle holding every non-black pixel.

use image::{RgbImage, imageops};

/// A pixel is content when any channel is strictly above this.
const CONTENT_THRESHOLD: u8 = 0;

/// An axis-aligned rectangle inside an image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width of the region.
    pub width: u32,
    /// Height of the region.
    pub height: u32,
}

impl CropRegion {
    /// Returns `true` when the region covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Compute the bounding rectangle of all pixels that are not pure black.
///
/// An all-black (or empty) image yields a zero-area region at the origin.
pub fn content_bounds(image: &RgbImage) -> CropRegion {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut found = false;

    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel.0.iter().any(|&channel| channel > CONTENT_THRESHOLD) {
            found = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if !found {
        return CropRegion {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        };
    }

    CropRegion {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    }
}

/// Crop an image to the bounding rectangle of its non-black content.
///
/// An all-black image produces an empty `0x0` image rather than an error;
/// callers that need pixels must check for that themselves.
///
/// # Example
///
/// ```
/// use framestitch::crop_black_borders;
/// use image::{Rgb, RgbImage};
///
/// let mut image = RgbImage::new(10, 10);
/// for y in 2..8 {
///     for x in 2..8 {
///         image.put_pixel(x, y, Rgb([90, 90, 90]));
///     }
/// }
///
/// let cropped = crop_black_borders(&image);
/// assert_eq!(cropped.dimensions(), (6, 6));
/// ```
pub fn crop_black_borders(image: &RgbImage) -> RgbImage {
    let region = content_bounds(image);
    if region.is_empty() {
        log::warn!(
            "Image {}x{} is entirely black; crop is empty",
            image.width(),
            image.height(),
        );
        return RgbImage::new(0, 0);
    }

    log::debug!(
        "Cropping {}x{} to {}x{} at ({}, {})",
        image.width(),
        image.height(),
        region.width,
        region.height,
        region.x,
        region.y,
    );

    imageops::crop_imm(image, region.x, region.y, region.width, region.height).to_image()
}
