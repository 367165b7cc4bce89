//! Image decoding pipeline for inline payloads.
//!
//! This module provides functionality for:
//! - Decoding any supported raster container into 8-bit RGB pixels
//! - Baking EXIF orientation into the pixels
//! - Shrinking images to fit a bounding box
//!
//! # Examples
//!
//! ```ignore
//! use slimdoc_core::decode::{decode_image, resize_to_fit, Dimensions, FilterType};
//!
//! let image = decode_image(&png_bytes)?;
//! let bounded = resize_to_fit(&image, Dimensions::new(800, 800), FilterType::Lanczos3)?;
//! println!("{}x{} -> {}x{}", image.width, image.height, bounded.width, bounded.height);
//! ```

mod raster;
mod resize;
mod types;

pub use raster::decode_image;
pub use resize::{fit_within, resize, resize_to_fit};
pub use types::{DecodeError, DecodedImage, Dimensions, FilterType};
