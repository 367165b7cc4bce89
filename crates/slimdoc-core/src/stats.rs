//! Batch statistics.
//!
//! Byte counts are lengths of base64 text as it appears in the document, on
//! both sides, so the reduction percentage reflects how much the document
//! itself shrank. Failed images contribute to neither sum.

use serde::{Deserialize, Serialize};

use crate::batch::TranscodeResult;

const BYTES_PER_MEGABYTE: f64 = 1024.0 * 1024.0;

/// Convert a byte count to megabytes (1 MB = 1024 * 1024 bytes).
pub fn bytes_to_megabytes(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MEGABYTE
}

/// Aggregate statistics for one optimize call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsRecord {
    /// Inline images found, including those that failed.
    pub images_processed: usize,
    /// Images that transcoded successfully.
    pub images_optimized: usize,
    /// Encoded size of the successfully optimized images before optimization.
    pub original_bytes: u64,
    /// Encoded size of the same images afterwards.
    pub optimized_bytes: u64,
    /// Wall-clock seconds from batch start to the last collected result.
    pub elapsed_seconds: f64,
}

impl StatsRecord {
    /// Percentage saved over the optimized images; 0 when nothing was optimized.
    pub fn reduction_percentage(&self) -> f64 {
        if self.original_bytes == 0 {
            return 0.0;
        }
        (self.original_bytes as f64 - self.optimized_bytes as f64) / self.original_bytes as f64
            * 100.0
    }

    pub fn images_failed(&self) -> usize {
        self.images_processed - self.images_optimized
    }
}

/// Folds transcode results into a [`StatsRecord`].
#[derive(Debug, Default)]
pub struct StatsAggregator {
    record: StatsRecord,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one terminal result. Each result must be recorded once.
    pub fn record(&mut self, result: &TranscodeResult) {
        self.record.images_processed += 1;
        if let TranscodeResult::Succeeded {
            original_bytes,
            optimized_bytes,
            ..
        } = result
        {
            self.record.images_optimized += 1;
            self.record.original_bytes += original_bytes;
            self.record.optimized_bytes += optimized_bytes;
        }
    }

    pub fn finish(mut self, elapsed_seconds: f64) -> StatsRecord {
        self.record.elapsed_seconds = elapsed_seconds;
        self.record
    }
}

/// Wall-clock timer that also works on `wasm32-unknown-unknown`, where
/// `std::time::Instant` is unavailable.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    #[cfg(not(target_arch = "wasm32"))]
    started: std::time::Instant,
    #[cfg(target_arch = "wasm32")]
    started_ms: f64,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            started: std::time::Instant::now(),
            #[cfg(target_arch = "wasm32")]
            started_ms: js_sys::Date::now(),
        }
    }

    pub fn elapsed_seconds(&self) -> f64 {
        #[cfg(not(target_arch = "wasm32"))]
        {
            self.started.elapsed().as_secs_f64()
        }
        #[cfg(target_arch = "wasm32")]
        {
            ((js_sys::Date::now() - self.started_ms) / 1000.0).max(0.0)
        }
    }
}
