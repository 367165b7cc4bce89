//! The transcoder: decode, flatten, bound and re-encode one image.
//!
//! A `Transcoder` is plain configuration. `transcode` has no side effects
//! and depends only on its input bytes, so it is safe to call from any number
//! of threads at once and always yields the same bytes for the same input.

use thiserror::Error;

use crate::decode::{self, DecodeError, Dimensions, FilterType};
use crate::encode::{self, EncodeError};

/// Why a single image could not be optimized.
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// The base64 text could not be decoded.
    #[error("payload error: {0}")]
    Payload(#[from] base64::DecodeError),

    /// The bytes are not a decodable image.
    #[error("decode error: {0}")]
    Decode(DecodeError),

    /// Downsampling failed.
    #[error("resize error: {0}")]
    Resize(DecodeError),

    /// JPEG encoding failed.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// The task panicked; the message is the panic payload if it was a string.
    #[error("panic while transcoding: {0}")]
    Panicked(String),
}

/// Output of one successful transcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcoded {
    /// JPEG bytes.
    pub bytes: Vec<u8>,
    /// Size of the encoded image.
    pub dimensions: Dimensions,
    /// Size of the decoded source, after EXIF orientation.
    pub source_dimensions: Dimensions,
}

/// Resampling filter for every shrink.
const RESAMPLE_FILTER: FilterType = FilterType::Lanczos3;

/// Settings for re-encoding inline images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transcoder {
    quality: u8,
    bound: Dimensions,
}

impl Transcoder {
    pub fn new(quality: u8, bound: Dimensions) -> Self {
        Self { quality, bound }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn bound(&self) -> Dimensions {
        self.bound
    }

    /// Decode `bytes`, flatten to RGB, shrink to the bound and encode as JPEG.
    ///
    /// # Errors
    ///
    /// Every failure is returned as a [`TranscodeError`]; nothing here panics
    /// on bad input.
    pub fn transcode(&self, bytes: &[u8]) -> Result<Transcoded, TranscodeError> {
        let image = decode::decode_image(bytes).map_err(TranscodeError::Decode)?;
        let source_dimensions = image.dimensions();

        let image = decode::resize_to_fit(&image, self.bound, RESAMPLE_FILTER)
            .map_err(TranscodeError::Resize)?;

        let bytes = encode::encode_jpeg(&image.pixels, image.width, image.height, self.quality)?;

        Ok(Transcoded {
            bytes,
            dimensions: image.dimensions(),
            source_dimensions,
        })
    }
}

impl Default for Transcoder {
    fn default() -> Self {
        Self::new(85, Dimensions::default())
    }
}
