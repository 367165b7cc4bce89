//! Image encoding for optimized inline payloads.
//!
//! Every optimized image is re-encoded as baseline JPEG regardless of the
//! format it arrived in.
//!
//! # Examples
//!
//! ```ignore
//! use slimdoc_core::encode::encode_jpeg;
//!
//! let pixels = vec![128u8; 100 * 100 * 3]; // Gray image
//! let jpeg_bytes = encode_jpeg(&pixels, 100, 100, 85)?;
//! println!("Encoded {} bytes", jpeg_bytes.len());
//! ```

mod jpeg;

pub use jpeg::{clamp_quality, encode_jpeg, EncodeError, JPEG_SUBTYPE};
