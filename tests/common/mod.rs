//! Shared helpers for integration tests.
//!
//! Videos are generated on the fly with FFmpeg's MPEG-4 Part 2 encoder in an
//! AVI container, so no fixture files need to be checked in. Helpers return
//! `None` when the local FFmpeg build cannot encode, and callers skip.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use ffmpeg_next::{
    Packet, Rational,
    codec::{Id, context::Context as CodecContext},
    format::Pixel,
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use framestitch::{PanoramaError, StitchEngine, StitchOutcome, StitchStatus};
use image::{Rgb, RgbImage};

pub const FRAME_WIDTH: u32 = 64;
pub const FRAME_HEIGHT: u32 = 48;
const FPS: i32 = 25;

/// A bright, textured frame that shifts right as `index` grows, like a slow
/// camera pan. No channel ever drops near zero.
pub fn panning_frame(index: u32, width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let u = (x + index * 3) % 128;
        let v = y % 64;
        Rgb([
            (64 + u) as u8,
            (96 + v) as u8,
            (80 + (u + v) % 96) as u8,
        ])
    })
}

/// Write `frame_count` panning frames to `path`.
///
/// Returns `None` if the encoder or muxer is unavailable.
pub fn write_panning_video(path: &Path, frame_count: u32) -> Option<PathBuf> {
    let frames: Vec<RgbImage> = (0..frame_count)
        .map(|index| panning_frame(index, FRAME_WIDTH, FRAME_HEIGHT))
        .collect();
    match encode_video(path, &frames, FRAME_WIDTH, FRAME_HEIGHT) {
        Ok(()) => Some(path.to_path_buf()),
        Err(error) => {
            eprintln!("skipping: cannot write test video: {error}");
            None
        }
    }
}

fn encode_video(
    path: &Path,
    frames: &[RgbImage],
    width: u32,
    height: u32,
) -> Result<(), ffmpeg_next::Error> {
    ffmpeg_next::init()?;

    let mut output = ffmpeg_next::format::output(&path)?;
    let codec = ffmpeg_next::encoder::find(Id::MPEG4).ok_or(ffmpeg_next::Error::EncoderNotFound)?;

    let mut stream = output.add_stream(codec)?;
    let stream_index = stream.index();

    let mut encoder = CodecContext::from_parameters(stream.parameters())?
        .encoder()
        .video()?;
    let time_base = Rational::new(1, FPS);
    encoder.set_width(width);
    encoder.set_height(height);
    encoder.set_format(Pixel::YUV420P);
    encoder.set_time_base(time_base);
    encoder.set_frame_rate(Some(Rational::new(FPS, 1)));
    // Intra-only keeps every frame independently decodable.
    encoder.set_gop(1);

    let mut encoder = encoder.open_as(codec)?;
    stream.set_parameters(&encoder);

    output.write_header()?;
    let stream_time_base = output
        .stream(stream_index)
        .map(|stream| stream.time_base())
        .unwrap_or(time_base);

    let mut scaler = ScalingContext::get(
        Pixel::RGB24,
        width,
        height,
        Pixel::YUV420P,
        width,
        height,
        ScalingFlags::BILINEAR,
    )?;

    for (index, image) in frames.iter().enumerate() {
        let mut rgb_frame = VideoFrame::new(Pixel::RGB24, width, height);
        let stride = rgb_frame.stride(0);
        let row_len = width as usize * 3;
        let data = rgb_frame.data_mut(0);
        for (y, row) in image.as_raw().chunks_exact(row_len).enumerate() {
            data[y * stride..y * stride + row_len].copy_from_slice(row);
        }

        let mut yuv_frame = VideoFrame::empty();
        scaler.run(&rgb_frame, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(index as i64));

        encoder.send_frame(&yuv_frame)?;
        write_pending(&mut encoder, &mut output, stream_index, time_base, stream_time_base)?;
    }

    encoder.send_eof()?;
    write_pending(&mut encoder, &mut output, stream_index, time_base, stream_time_base)?;
    output.write_trailer()?;
    Ok(())
}

fn write_pending(
    encoder: &mut ffmpeg_next::encoder::Encoder,
    output: &mut ffmpeg_next::format::context::Output,
    stream_index: usize,
    time_base: Rational,
    stream_time_base: Rational,
) -> Result<(), ffmpeg_next::Error> {
    let mut packet = Packet::empty();
    while encoder.receive_packet(&mut packet).is_ok() {
        packet.set_stream(stream_index);
        packet.rescale_ts(time_base, stream_time_base);
        packet.write_interleaved(output)?;
    }
    Ok(())
}

/// Engine that places the inputs side by side, left to right.
#[derive(Debug, Default)]
pub struct SideBySideEngine {
    pub calls: usize,
    pub last_input_count: usize,
}

impl StitchEngine for SideBySideEngine {
    fn stitch(&mut self, images: &[RgbImage]) -> Result<StitchOutcome, PanoramaError> {
        self.calls += 1;
        self.last_input_count = images.len();

        let width: u32 = images.iter().map(RgbImage::width).sum();
        let height = images.iter().map(RgbImage::height).max().unwrap_or(0);
        let mut panorama = RgbImage::new(width, height);
        let mut offset = 0;
        for image in images {
            image::imageops::replace(&mut panorama, image, i64::from(offset), 0);
            offset += image.width();
        }
        Ok(StitchOutcome::success(panorama))
    }

    fn name(&self) -> &str {
        "side-by-side"
    }
}

/// Engine that always answers with the same outcome.
#[derive(Debug)]
pub struct FixedEngine {
    pub outcome: StitchOutcome,
    pub calls: usize,
}

impl FixedEngine {
    pub fn new(outcome: StitchOutcome) -> Self {
        Self { outcome, calls: 0 }
    }

    pub fn failing(status: StitchStatus) -> Self {
        Self::new(StitchOutcome::failure(status))
    }
}

impl StitchEngine for FixedEngine {
    fn stitch(&mut self, _images: &[RgbImage]) -> Result<StitchOutcome, PanoramaError> {
        self.calls += 1;
        Ok(self.outcome.clone())
    }
}
