//! Entry point: optimize every inline image of a document in one call.

use thiserror::Error;

use crate::batch::{BatchCoordinator, TranscodeTask, WorkerPolicy};
use crate::decode::Dimensions;
use crate::document::{Document, ParseError};
use crate::encode::clamp_quality;
use crate::payload;
use crate::stats::{StatsAggregator, StatsRecord};
use crate::transcode::Transcoder;

/// Default JPEG quality.
pub const DEFAULT_QUALITY: u8 = 85;

/// Errors that fail a whole optimize call. Per-image problems never show up
/// here; they are counted in [`StatsRecord`].
#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("failed to parse document: {0}")]
    Parse(#[from] ParseError),

    #[error("invalid options: {0}")]
    InvalidOptions(String),
}

/// Settings for one optimize call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizeOptions {
    /// JPEG quality, 1-100. Out-of-range values are clamped.
    pub quality: u8,
    /// Images larger than this on either axis are shrunk to fit.
    pub max_dimensions: Dimensions,
    pub workers: WorkerPolicy,
    /// Keep an inline JPEG as-is when re-encoding would not shrink it.
    pub never_grow: bool,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            max_dimensions: Dimensions::default(),
            workers: WorkerPolicy::default(),
            never_grow: true,
        }
    }
}

impl OptimizeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn max_dimensions(mut self, width: u32, height: u32) -> Self {
        self.max_dimensions = Dimensions::new(width, height);
        self
    }

    pub fn workers(mut self, workers: WorkerPolicy) -> Self {
        self.workers = workers;
        self
    }

    pub fn never_grow(mut self, never_grow: bool) -> Self {
        self.never_grow = never_grow;
        self
    }

    fn validate(&self) -> Result<(), OptimizeError> {
        if self.max_dimensions.is_empty() {
            return Err(OptimizeError::InvalidOptions(format!(
                "max dimensions must be non-zero, got {}",
                self.max_dimensions
            )));
        }
        Ok(())
    }

    fn transcoder(&self) -> Transcoder {
        let quality = clamp_quality(self.quality);
        if quality != self.quality {
            log::warn!(
                "quality {} is outside 1-100; using {}",
                self.quality,
                quality
            );
        }
        Transcoder::new(quality, self.max_dimensions)
    }
}

/// The optimized document and what it took to produce it.
#[derive(Debug, Clone, PartialEq)]
pub struct Optimized {
    pub text: String,
    pub stats: StatsRecord,
}

/// Shrink every inline image in `text`.
///
/// Images already within `options.max_dimensions` keep their size; larger
/// ones are downsampled. Everything that is not an inline image `src` comes
/// back byte-for-byte.
///
/// # Errors
///
/// Fails only if the options are invalid, or, for [`optimize_bytes`], the
/// input is not UTF-8. Broken markup such as a tag cut off at end of input is
/// kept as text. A document either comes back whole or not at all.
pub fn optimize(text: &str, options: &OptimizeOptions) -> Result<Optimized, OptimizeError> {
    options.validate()?;
    let mut document = Document::parse(text);

    let tasks: Vec<TranscodeTask> = payload::extract(&document)
        .into_iter()
        .map(|(node, payload)| TranscodeTask::new(node, payload))
        .collect();

    if tasks.is_empty() {
        log::debug!("no inline images found");
        return Ok(Optimized {
            text: text.to_string(),
            stats: StatsRecord::default(),
        });
    }

    let coordinator = BatchCoordinator::new(options.transcoder(), options.workers)
        .with_never_grow(options.never_grow);
    let outcome = coordinator.run(&mut document, tasks);

    let mut aggregator = StatsAggregator::new();
    for result in &outcome.results {
        aggregator.record(result);
    }
    let stats = aggregator.finish(outcome.elapsed_seconds);

    log::info!(
        "optimized {}/{} inline images in {:.2}s on {} workers: {} -> {} bytes ({:.1}% smaller)",
        stats.images_optimized,
        stats.images_processed,
        stats.elapsed_seconds,
        outcome.workers,
        stats.original_bytes,
        stats.optimized_bytes,
        stats.reduction_percentage()
    );

    Ok(Optimized {
        text: document.serialize(),
        stats,
    })
}

/// Like [`optimize`], for a document that has not been decoded as UTF-8 yet.
pub fn optimize_bytes(bytes: &[u8], options: &OptimizeOptions) -> Result<Optimized, OptimizeError> {
    let text = std::str::from_utf8(bytes).map_err(|e| ParseError::InvalidUtf8 {
        valid_up_to: e.valid_up_to(),
    })?;
    optimize(text, options)
}
