//! Keyframe extraction.
//!
//! [`KeyframeExtractor`] decodes a video from start to finish and saves every
//! N-th decoded frame to disk. "Keyframe" here means a frame picked by a
//! fixed stride, not a codec-level I-frame.
//!
//! # Example
//!
//! ```no_run
//! use framestitch::{KeyframeExtractor, PanoramaError};
//!
//! let extractor = KeyframeExtractor::new(5);
//! let paths = extractor.extract("input.mp4", "extracted_frames")?;
//! println!("saved {} frames", paths.len());
//! # Ok::<(), PanoramaError>(())
//! ```

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use ffmpeg_next::{
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::Pixel,
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{RgbImage, codecs::jpeg::JpegEncoder};

use crate::{
    configuration::{DEFAULT_JPEG_QUALITY, FrameFormat, PanoramaOptions},
    conversion::frame_to_rgb_image,
    error::PanoramaError,
    progress::{NoOpProgress, OperationType, ProgressCallback, ProgressTracker},
};

/// File name for the sampled frame with output index `index`.
///
/// The index is zero-padded to four digits: `frame_0000.jpg`,
/// `frame_0001.jpg`, and so on.
pub fn frame_file_name(index: u64, format: FrameFormat) -> String {
    format!("frame_{index:04}.{}", format.extension())
}

/// A decoded frame that was picked for saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Sample {
    /// Position of the frame in decode order.
    pub(crate) ordinal: u64,
    /// Dense output counter, independent of `ordinal`.
    pub(crate) index: u64,
}

/// Decides which decode ordinals are sampled.
///
/// Ordinal `i` is sampled iff `i % interval == 0`; sampled frames receive a
/// gap-free counter starting at zero.
#[derive(Debug)]
pub(crate) struct StrideSampler {
    interval: u64,
    ordinal: u64,
    index: u64,
}

impl StrideSampler {
    pub(crate) fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            ordinal: 0,
            index: 0,
        }
    }

    /// Observe the next decoded frame.
    pub(crate) fn observe(&mut self) -> Option<Sample> {
        let ordinal = self.ordinal;
        self.ordinal += 1;

        if ordinal % self.interval != 0 {
            return None;
        }

        let sample = Sample {
            ordinal,
            index: self.index,
        };
        self.index += 1;
        Some(sample)
    }

    /// Number of frames observed so far.
    pub(crate) fn observed(&self) -> u64 {
        self.ordinal
    }
}

/// Samples frames from a video at a fixed stride and saves them as images.
///
/// Each call to [`extract`](KeyframeExtractor::extract) opens the source,
/// decodes it sequentially, and drops the demuxer and decoder before
/// returning, on success and on every error path.
#[derive(Clone)]
pub struct KeyframeExtractor {
    interval: u64,
    format: FrameFormat,
    jpeg_quality: u8,
    progress: Arc<dyn ProgressCallback>,
}

impl std::fmt::Debug for KeyframeExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyframeExtractor")
            .field("interval", &self.interval)
            .field("format", &self.format)
            .field("jpeg_quality", &self.jpeg_quality)
            .finish_non_exhaustive()
    }
}

impl KeyframeExtractor {
    /// Create an extractor that keeps every `interval`-th frame as JPEG.
    pub fn new(interval: u64) -> Self {
        Self {
            interval,
            format: FrameFormat::Jpeg,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Create an extractor from pipeline options.
    pub fn from_options(options: &PanoramaOptions) -> Self {
        Self {
            interval: options.frame_interval,
            format: options.frame_format,
            jpeg_quality: options.jpeg_quality,
            progress: Arc::clone(&options.progress),
        }
    }

    /// Set the on-disk image format for sampled frames.
    #[must_use]
    pub fn with_format(mut self, format: FrameFormat) -> Self {
        self.format = format;
        self
    }

    /// Extract sampled frames from `source` into `destination`.
    ///
    /// Returns the written paths in stream order. An empty vector means the
    /// stream decoded without producing a single frame.
    ///
    /// # Errors
    ///
    /// - [`PanoramaError::InvalidInterval`] if the stride is zero.
    /// - [`PanoramaError::SourceUnavailable`] if the source cannot be opened
    ///   or has no video stream. Nothing is written to disk in that case.
    /// - [`PanoramaError::IoError`] / [`PanoramaError::ImageError`] if the
    ///   destination cannot be created or a frame cannot be saved.
    /// - [`PanoramaError::FfmpegError`] if decoding fails part-way. Packets
    ///   the decoder rejects as invalid data are skipped with a warning
    ///   instead.
    pub fn extract<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        source: P,
        destination: Q,
    ) -> Result<Vec<PathBuf>, PanoramaError> {
        let mut paths = Vec::new();
        self.extract_into(source.as_ref(), destination.as_ref(), &mut paths)?;
        Ok(paths)
    }

    /// Like [`extract`](KeyframeExtractor::extract), but appends each path to
    /// `written` as soon as its file is saved. On error, `written` still
    /// lists every file produced before the failure.
    pub(crate) fn extract_into(
        &self,
        source: &Path,
        destination: &Path,
        written: &mut Vec<PathBuf>,
    ) -> Result<(), PanoramaError> {
        if self.interval == 0 {
            return Err(PanoramaError::InvalidInterval);
        }

        log::info!(
            "Extracting every {} frame(s) from {} into {}",
            self.interval,
            source.display(),
            destination.display(),
        );

        let unavailable = |reason: String| {
            log::error!("Could not open video {}: {reason}", source.display());
            PanoramaError::SourceUnavailable {
                path: source.to_path_buf(),
                reason,
            }
        };

        ffmpeg_next::init()
            .map_err(|error| unavailable(format!("FFmpeg initialisation failed: {error}")))?;

        let mut input_context =
            ffmpeg_next::format::input(&source).map_err(|error| unavailable(error.to_string()))?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or_else(|| unavailable("no video stream found".to_string()))?;
        let video_stream_index = stream.index();
        let declared_frames = stream.frames();

        let decoder_context = CodecContext::from_parameters(stream.parameters()).map_err(
            |error| unavailable(format!("failed to read codec parameters: {error}")),
        )?;
        let mut decoder = decoder_context
            .decoder()
            .video()
            .map_err(|error| unavailable(format!("failed to create video decoder: {error}")))?;

        fs::create_dir_all(destination)?;

        let expected = (declared_frames > 0).then(|| (declared_frames as u64).div_ceil(self.interval));
        let mut sink = FrameSink {
            extractor: self,
            destination,
            sampler: StrideSampler::new(self.interval),
            scaler: None,
            decoded_frame: VideoFrame::empty(),
            rgb_frame: VideoFrame::empty(),
            paths: written,
            tracker: ProgressTracker::new(
                Arc::clone(&self.progress),
                OperationType::FrameExtraction,
                expected,
            ),
        };

        for (stream, packet) in input_context.packets() {
            if stream.index() != video_stream_index {
                continue;
            }

            match decoder.send_packet(&packet) {
                Ok(()) => {}
                Err(error) if is_skippable(&error) => {
                    log::warn!("Skipping undecodable packet in {}: {error}", source.display());
                    continue;
                }
                Err(error) => return Err(error.into()),
            }
            sink.drain(&mut decoder)?;
        }

        // Flush the decoder.
        decoder.send_eof()?;
        sink.drain(&mut decoder)?;

        log::info!(
            "Decoded {} frame(s), saved {} keyframe(s) to {}",
            sink.sampler.observed(),
            sink.paths.len(),
            destination.display(),
        );

        Ok(())
    }

    fn save(&self, image: &RgbImage, path: &Path) -> Result<(), PanoramaError> {
        match self.format {
            FrameFormat::Jpeg => {
                let mut writer = BufWriter::new(File::create(path)?);
                image.write_with_encoder(JpegEncoder::new_with_quality(
                    &mut writer,
                    self.jpeg_quality,
                ))?;
                writer.flush()?;
            }
            FrameFormat::Png | FrameFormat::Bmp => image.save(path)?,
        }
        Ok(())
    }
}

/// Extract every `interval`-th frame of `source` into `destination` as JPEG.
///
/// Shorthand for `KeyframeExtractor::new(interval).extract(source, destination)`.
pub fn extract_keyframes<P: AsRef<Path>, Q: AsRef<Path>>(
    source: P,
    destination: Q,
    interval: u64,
) -> Result<Vec<PathBuf>, PanoramaError> {
    KeyframeExtractor::new(interval).extract(source, destination)
}

/// Corrupt packets are dropped instead of ending the run.
fn is_skippable(error: &ffmpeg_next::Error) -> bool {
    matches!(error, ffmpeg_next::Error::InvalidData)
}

/// Receives decoded frames and persists the sampled ones.
struct FrameSink<'a> {
    extractor: &'a KeyframeExtractor,
    destination: &'a Path,
    sampler: StrideSampler,
    scaler: Option<ScalingContext>,
    decoded_frame: VideoFrame,
    rgb_frame: VideoFrame,
    paths: &'a mut Vec<PathBuf>,
    tracker: ProgressTracker,
}

impl FrameSink<'_> {
    fn drain(&mut self, decoder: &mut VideoDecoder) -> Result<(), PanoramaError> {
        while decoder.receive_frame(&mut self.decoded_frame).is_ok() {
            let Some(sample) = self.sampler.observe() else {
                continue;
            };

            let image = self.convert()?;
            let path = self
                .destination
                .join(frame_file_name(sample.index, self.extractor.format));
            self.extractor.save(&image, &path)?;

            log::debug!(
                "Saved frame {} as #{} -> {}",
                sample.ordinal,
                sample.index,
                path.display(),
            );

            self.paths.push(path);
            self.tracker.advance(Some(sample.ordinal));
        }
        Ok(())
    }

    /// Convert the current decoded frame to RGB24.
    fn convert(&mut self) -> Result<RgbImage, PanoramaError> {
        let width = self.decoded_frame.width();
        let height = self.decoded_frame.height();
        let format = self.decoded_frame.format();

        // Rebuilt whenever the stream changes shape mid-way.
        let scaler = match self.scaler.take() {
            Some(scaler)
                if scaler.input().format == format
                    && scaler.input().width == width
                    && scaler.input().height == height =>
            {
                scaler
            }
            _ => {
                self.rgb_frame = VideoFrame::empty();
                ScalingContext::get(
                    format,
                    width,
                    height,
                    Pixel::RGB24,
                    width,
                    height,
                    ScalingFlags::BILINEAR,
                )?
            }
        };
        let scaler = self.scaler.insert(scaler);

        scaler.run(&self.decoded_frame, &mut self.rgb_frame)?;
        frame_to_rgb_image(&self.rgb_frame, width, height)
    }
}
