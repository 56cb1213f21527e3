//! Progress reporting.
//!
//! This module provides [`ProgressCallback`] for monitoring a pipeline run and
//! [`ProgressInfo`] for detailed progress snapshots. Callbacks observe the
//! run but cannot halt it.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framestitch::{PanoramaOptions, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         match info.total {
//!             Some(total) => println!("[{:?}] {}/{total}", info.operation, info.current),
//!             None => println!("[{:?}] {}", info.operation, info.current),
//!         }
//!     }
//! }
//!
//! let options = PanoramaOptions::new().with_progress(Arc::new(PrintProgress));
//! ```

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

/// The kind of work currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Decoding the video and saving sampled frames.
    FrameExtraction,
    /// Reading saved frames back for stitching.
    ImageLoading,
    /// Running the stitching engine.
    Stitching,
}

/// A snapshot of progress within one operation.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// What kind of work is being performed.
    pub operation: OperationType,
    /// How many items have been processed so far.
    pub current: u64,
    /// Total items expected, if known ahead of time.
    pub total: Option<u64>,
    /// Completion percentage (0.0 to 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time elapsed since the operation started.
    pub elapsed: Duration,
    /// The decode ordinal of the frame just saved (extraction only).
    pub current_frame: Option<u64>,
}

/// Trait for receiving progress updates during a pipeline run.
///
/// Implementations must be [`Send`] and [`Sync`] so that options holding
/// them can be shared freely.
pub trait ProgressCallback: Send + Sync {
    /// Called after each completed item.
    fn on_progress(&self, info: &ProgressInfo);
}

/// A no-op implementation that discards all progress notifications.
///
/// This is the default when no callback is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Internal helper that tracks progress timing and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    current: u64,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
    ) -> Self {
        Self {
            callback,
            operation,
            total,
            current: 0,
            start_time: Instant::now(),
        }
    }

    /// Record one completed item and fire the callback.
    pub(crate) fn advance(&mut self, frame_number: Option<u64>) {
        self.current += 1;

        let percentage = self
            .total
            .filter(|&t| t > 0)
            .map(|t| (self.current as f32 / t as f32) * 100.0);

        let info = ProgressInfo {
            operation: self.operation,
            current: self.current,
            total: self.total,
            percentage,
            elapsed: self.start_time.elapsed(),
            current_frame: frame_number,
        };

        self.callback.on_progress(&info);
    }
}
