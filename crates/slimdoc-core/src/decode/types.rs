//! Pixel buffers, sizes and decode errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a payload could not be turned into pixels.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// No enabled codec recognises the bytes.
    #[error("Invalid or unsupported image format")]
    InvalidFormat,

    /// The container was recognised but the data is damaged or truncated.
    #[error("Corrupted or incomplete image data: {0}")]
    CorruptedFile(String),

    /// The decoder refused to allocate the pixel buffer.
    #[error("Image exceeds decoder limits: {0}")]
    LimitsExceeded(String),

    /// A target size is zero on some axis.
    #[error("Invalid target dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Resampling filter used when shrinking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterType {
    Nearest,
    /// Maps to the image crate's `Triangle` filter.
    Bilinear,
    #[default]
    Lanczos3,
}

impl FilterType {
    pub fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            FilterType::Nearest => image::imageops::FilterType::Nearest,
            FilterType::Bilinear => image::imageops::FilterType::Triangle,
            FilterType::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// A width/height pair in pixels, used both for image sizes and size bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when neither axis exceeds the corresponding axis of `bound`.
    pub fn fits_within(self, bound: Dimensions) -> bool {
        self.width <= bound.width && self.height <= bound.height
    }

    /// True when either axis is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Default for Dimensions {
    /// 800x800, the default bound for inline images.
    fn default() -> Self {
        Self::new(800, 800)
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// 8-bit RGB pixels, row-major, no alpha.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// `width * height * 3` bytes.
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(
            pixels.len(),
            width as usize * height as usize * 3,
            "Pixel buffer size mismatch"
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn from_rgb_image(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            pixels: img.into_raw(),
        }
    }

    /// Copy into an `image::RgbImage`. `None` if the buffer length
    /// does not match the dimensions.
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}
