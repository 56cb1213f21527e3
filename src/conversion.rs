//! Pixel-data conversion between FFmpeg frames and `image` buffers.
//!
//! Also hosts the two pixel transformations the pipeline applies to the
//! stitched panorama: area-averaging resize (through swscale) and
//! normalization from 8-bit integers to `[0.0, 1.0]` floats.

use ffmpeg_next::{
    format::Pixel,
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{Rgb, Rgb32FImage, RgbImage};

use crate::error::PanoramaError;

const RGB_BYTES_PER_PIXEL: usize = 3;

/// Copy pixel data from an FFmpeg video frame into a tightly-packed buffer.
///
/// `bytes_per_pixel` is the number of bytes per pixel in plane 0
/// (3 for RGB24).
pub(crate) fn frame_to_buffer(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let expected_stride = (width as usize) * bytes_per_pixel;
    let data = video_frame.data(0);

    if stride == expected_stride {
        data[..expected_stride * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(expected_stride * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + expected_stride]);
        }
        buffer
    }
}

/// Wrap a scaled RGB24 frame as an [`RgbImage`].
pub(crate) fn frame_to_rgb_image(
    rgb_frame: &VideoFrame,
    width: u32,
    height: u32,
) -> Result<RgbImage, PanoramaError> {
    let buffer = frame_to_buffer(rgb_frame, width, height, RGB_BYTES_PER_PIXEL);
    RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        PanoramaError::FfmpegError(
            "Failed to construct RGB image from decoded frame data".to_string(),
        )
    })
}

/// Copy an [`RgbImage`] into a freshly allocated RGB24 FFmpeg frame,
/// honouring the frame's row stride.
pub(crate) fn rgb_image_to_frame(image: &RgbImage) -> VideoFrame {
    let (width, height) = image.dimensions();
    let mut frame = VideoFrame::new(Pixel::RGB24, width, height);
    let stride = frame.stride(0);
    let row_len = (width as usize) * RGB_BYTES_PER_PIXEL;
    let source = image.as_raw();
    let destination = frame.data_mut(0);

    for y in 0..height as usize {
        let source_start = y * row_len;
        let destination_start = y * stride;
        destination[destination_start..destination_start + row_len]
            .copy_from_slice(&source[source_start..source_start + row_len]);
    }

    frame
}

/// Resize an RGB image with area averaging.
///
/// Each output pixel is the mean of the source pixels it covers, which keeps
/// detail intact when a large panorama is shrunk.
///
/// # Errors
///
/// Returns [`PanoramaError::InvalidOutputSize`] if either target dimension
/// is zero, and [`PanoramaError::FfmpegError`] if the source is empty or
/// swscale rejects the conversion.
pub fn resize_area(image: &RgbImage, width: u32, height: u32) -> Result<RgbImage, PanoramaError> {
    if width == 0 || height == 0 {
        return Err(PanoramaError::InvalidOutputSize { width, height });
    }
    let (source_width, source_height) = image.dimensions();
    if source_width == 0 || source_height == 0 {
        return Err(PanoramaError::FfmpegError(
            "Cannot resize an empty image".to_string(),
        ));
    }
    if (source_width, source_height) == (width, height) {
        return Ok(image.clone());
    }

    let source = rgb_image_to_frame(image);
    let mut scaler = ScalingContext::get(
        Pixel::RGB24,
        source_width,
        source_height,
        Pixel::RGB24,
        width,
        height,
        ScalingFlags::AREA,
    )?;

    let mut scaled = VideoFrame::empty();
    scaler.run(&source, &mut scaled)?;

    log::debug!(
        "Resized {source_width}x{source_height} -> {width}x{height} (area averaging)"
    );

    frame_to_rgb_image(&scaled, width, height)
}

/// Rescale every channel from `[0, 255]` to `[0.0, 1.0]` by dividing by 255.
pub fn to_normalized_float(image: &RgbImage) -> Rgb32FImage {
    let (width, height) = image.dimensions();
    Rgb32FImage::from_fn(width, height, |x, y| {
        let Rgb([r, g, b]) = *image.get_pixel(x, y);
        Rgb([r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_float_maps_extremes() {
        let mut image = RgbImage::new(2, 1);
        image.put_pixel(0, 0, Rgb([0, 0, 0]));
        image.put_pixel(1, 0, Rgb([255, 128, 51]));

        let float = to_normalized_float(&image);
        assert_eq!(float.dimensions(), (2, 1));
        assert_eq!(float.get_pixel(0, 0).0, [0.0, 0.0, 0.0]);

        let [r, g, b] = float.get_pixel(1, 0).0;
        assert_eq!(r, 1.0);
        assert!((g - 128.0 / 255.0).abs() < f32::EPSILON);
        assert!((b - 0.2).abs() < 1e-6);
    }

    #[test]
    fn resize_area_rejects_zero_target() {
        let image = RgbImage::new(4, 4);
        assert!(matches!(
            resize_area(&image, 0, 4),
            Err(PanoramaError::InvalidOutputSize { width: 0, height: 4 })
        ));
    }

    #[test]
    fn resize_area_rejects_empty_source() {
        let image = RgbImage::new(0, 0);
        assert!(resize_area(&image, 8, 8).is_err());
    }

    #[test]
    fn resize_area_averages_uniform_image() {
        let image = RgbImage::from_pixel(64, 48, Rgb([200, 100, 50]));
        let resized = resize_area(&image, 16, 8).expect("resize");
        assert_eq!(resized.dimensions(), (16, 8));

        for pixel in resized.pixels() {
            for (channel, expected) in pixel.0.iter().zip([200u8, 100, 50]) {
                assert!(channel.abs_diff(expected) <= 4, "{pixel:?}");
            }
        }
    }
}
