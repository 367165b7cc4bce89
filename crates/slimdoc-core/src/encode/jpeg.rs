//! JPEG encoding for optimized payloads.
//!
//! Baseline JPEG with Huffman tables built from each image's own symbol
//! statistics. Output for a given pixel buffer and quality is byte-for-byte
//! deterministic.

use pixo::jpeg::{self as pixo_jpeg, JpegOptions};
use pixo::ColorType;
use thiserror::Error;

/// Media subtype written into the `data:` URL of every re-encoded image.
pub const JPEG_SUBTYPE: &str = "jpeg";

/// Errors that can occur during JPEG encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes (width * height * 3), got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// JPEG encoding failed
    #[error("JPEG encoding failed: {0}")]
    EncodingFailed(String),
}

/// Clamp a requested quality into the encoder's 1-100 range.
///
/// Returns the clamped value; out-of-range requests are not an error.
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(1, 100)
}

/// Encoder settings: 4:4:4 baseline with optimized Huffman coding.
fn encoder_options(quality: u8) -> JpegOptions {
    JpegOptions::balanced(clamp_quality(quality))
}

/// Encode RGB pixel data to JPEG bytes.
///
/// # Arguments
///
/// * `pixels` - RGB pixel data (3 bytes per pixel, row-major order)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `quality` - JPEG quality, clamped to 1-100
///
/// # Quality Guidelines
///
/// * 85: default for inline images, visually lossless for most photos
/// * 60-80: acceptable for decorative images
/// * Below 60: visible artifacts
pub fn encode_jpeg(
    pixels: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }

    let expected_len = (width as usize) * (height as usize) * 3;
    if pixels.len() != expected_len {
        return Err(EncodeError::InvalidPixelData {
            expected: expected_len,
            actual: pixels.len(),
        });
    }

    let options = encoder_options(quality);
    pixo_jpeg::encode_with_options(pixels, width, height, ColorType::Rgb, &options)
        .map_err(|e| EncodeError::EncodingFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> Vec<u8> {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push((x * 255 / width) as u8);
                pixels.push((y * 255 / height) as u8);
                pixels.push(((x ^ y) & 0xFF) as u8);
            }
        }
        pixels
    }

    #[test]
    fn test_encode_jpeg_markers() {
        let jpeg = encode_jpeg(&vec![128u8; 64 * 64 * 3], 64, 64, 85).unwrap();

        // SOI ... EOI
        assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);
        assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_encode_jpeg_decodes_back_to_same_size() {
        let jpeg = encode_jpeg(&gradient(120, 45), 120, 45, 85).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (120, 45));
    }

    #[test]
    fn test_lower_quality_is_smaller_for_detailed_content() {
        let pixels = gradient(128, 128);
        let low = encode_jpeg(&pixels, 128, 128, 20).unwrap();
        let high = encode_jpeg(&pixels, 128, 128, 95).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_optimized_coding_is_not_larger_than_standard_tables() {
        let pixels = gradient(96, 64);
        let optimized = encode_jpeg(&pixels, 96, 64, 85).unwrap();
        let standard = pixo_jpeg::encode_with_options(
            &pixels,
            96,
            64,
            ColorType::Rgb,
            &JpegOptions::fast(85),
        )
        .unwrap();
        assert!(optimized.len() <= standard.len());
        assert!(encoder_options(85).optimize_huffman);
    }

    #[test]
    fn test_clamp_quality() {
        assert_eq!(clamp_quality(0), 1);
        assert_eq!(clamp_quality(1), 1);
        assert_eq!(clamp_quality(85), 85);
        assert_eq!(clamp_quality(101), 100);
        assert_eq!(clamp_quality(255), 100);
    }

    #[test]
    fn test_out_of_range_quality_encodes_as_clamped() {
        let pixels = gradient(16, 16);
        let zero = encode_jpeg(&pixels, 16, 16, 0).unwrap();
        let one = encode_jpeg(&pixels, 16, 16, 1).unwrap();
        assert_eq!(zero, one);

        let huge = encode_jpeg(&pixels, 16, 16, 200).unwrap();
        let hundred = encode_jpeg(&pixels, 16, 16, 100).unwrap();
        assert_eq!(huge, hundred);
    }

    #[test]
    fn test_encode_jpeg_invalid_pixel_data() {
        let result = encode_jpeg(&vec![128u8; 99 * 100 * 3], 100, 100, 85);
        assert!(matches!(
            result,
            Err(EncodeError::InvalidPixelData {
                expected: 30000,
                actual: 29700
            })
        ));
    }

    #[test]
    fn test_encode_jpeg_zero_dimensions() {
        assert!(matches!(
            encode_jpeg(&[], 0, 100, 85),
            Err(EncodeError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            encode_jpeg(&[], 100, 0, 85),
            Err(EncodeError::InvalidDimensions { .. })
        ));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================
