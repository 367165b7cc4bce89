//! Slimdoc Core - inline image optimizer
//!
//! This crate shrinks images embedded in HTML as `data:` URLs. It scans the
//! document for inline images, re-encodes each one as a size-bounded JPEG on
//! a worker pool, writes the results back in place and reports how many bytes
//! were saved. Everything outside the rewritten `src` values is preserved
//! byte-for-byte.
//!
//! ```ignore
//! use slimdoc_core::{optimize, OptimizeOptions};
//!
//! let out = optimize(&html, &OptimizeOptions::new().quality(80))?;
//! println!("{:.1}% smaller", out.stats.reduction_percentage());
//! ```

pub mod batch;
pub mod decode;
pub mod document;
pub mod encode;
pub mod optimizer;
pub mod payload;
pub mod stats;
pub mod transcode;

pub use batch::{BatchCoordinator, BatchOutcome, TranscodeResult, TranscodeTask, WorkerPolicy};
pub use decode::Dimensions;
pub use document::{Document, NodeId, ParseError};
pub use optimizer::{optimize, optimize_bytes, OptimizeError, OptimizeOptions, Optimized};
pub use payload::InlinePayload;
pub use stats::{bytes_to_megabytes, StatsRecord};
pub use transcode::{TranscodeError, Transcoder};
