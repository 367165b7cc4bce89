//! Raster decoding with EXIF orientation handling and RGB flattening.
//!
//! Inline payloads carry a declared media subtype, but it is frequently wrong
//! (`image/jpg` holding a PNG is common in exported documents), so the
//! container format is always sniffed from the bytes.

use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::error::ImageError;
use image::metadata::Orientation;
use image::{DynamicImage, ImageReader};

use super::{DecodeError, DecodedImage};

/// Decode an image from bytes, apply its EXIF orientation and flatten it to RGB.
///
/// Supports every container enabled on the `image` dependency (JPEG, PNG,
/// GIF, WebP, BMP). Animated GIFs decode to their first frame.
///
/// The re-encoded output carries no metadata, so orientation is baked into
/// the pixels here.
///
/// # Errors
///
/// Returns `DecodeError::InvalidFormat` if the format cannot be recognised.
/// Returns `DecodeError::CorruptedFile` if the data is damaged or truncated.
/// Returns `DecodeError::LimitsExceeded` if the decoder refuses the allocation.
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    let mut img = decode_dynamic(bytes)?;
    if let Some(orientation) = exif_orientation(bytes) {
        if orientation != Orientation::NoTransforms {
            log::trace!("applying EXIF orientation {:?}", orientation);
            img.apply_orientation(orientation);
        }
    }
    Ok(flatten_to_rgb(img))
}

fn decode_dynamic(bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    if reader.format().is_none() {
        return Err(DecodeError::InvalidFormat);
    }

    reader.decode().map_err(map_image_error)
}

fn map_image_error(err: ImageError) -> DecodeError {
    match err {
        ImageError::Unsupported(_) => DecodeError::InvalidFormat,
        ImageError::Limits(e) => DecodeError::LimitsExceeded(e.to_string()),
        other => DecodeError::CorruptedFile(other.to_string()),
    }
}

/// Drop alpha, expand palette/grey and narrow 16-bit samples to 8-bit RGB.
///
/// Transparent pixels keep whatever colour they store.
fn flatten_to_rgb(img: DynamicImage) -> DecodedImage {
    let color = img.color();
    if color.has_alpha() || color.channel_count() != 3 || color.bytes_per_pixel() != 3 {
        log::trace!("flattening {:?} to Rgb8", color);
    }
    DecodedImage::from_rgb_image(img.into_rgb8())
}

/// Orientation tag from any container kamadak-exif understands.
fn exif_orientation(bytes: &[u8]) -> Option<Orientation> {
    let exif = Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;
    let value = exif
        .get_field(Tag::Orientation, In::PRIMARY)?
        .value
        .get_uint(0)?;
    Orientation::from_exif(u8::try_from(value).ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageBuffer, ImageFormat, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    use crate::encode::encode_jpeg;

    // Minimal valid JPEG bytes (1x1 grey pixel)
    const MINIMAL_JPEG: &[u8] = &[
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01, 0x01, 0x00, 0x00,
        0x01, 0x00, 0x01, 0x00, 0x00, 0xFF, 0xDB, 0x00, 0x43, 0x00, 0x08, 0x06, 0x06, 0x07, 0x06,
        0x05, 0x08, 0x07, 0x07, 0x07, 0x09, 0x09, 0x08, 0x0A, 0x0C, 0x14, 0x0D, 0x0C, 0x0B, 0x0B,
        0x0C, 0x19, 0x12, 0x13, 0x0F, 0x14, 0x1D, 0x1A, 0x1F, 0x1E, 0x1D, 0x1A, 0x1C, 0x1C, 0x20,
        0x24, 0x2E, 0x27, 0x20, 0x22, 0x2C, 0x23, 0x1C, 0x1C, 0x28, 0x37, 0x29, 0x2C, 0x30, 0x31,
        0x34, 0x34, 0x34, 0x1F, 0x27, 0x39, 0x3D, 0x38, 0x32, 0x3C, 0x2E, 0x33, 0x34, 0x32, 0xFF,
        0xC0, 0x00, 0x0B, 0x08, 0x00, 0x01, 0x00, 0x01, 0x01, 0x01, 0x11, 0x00, 0xFF, 0xC4, 0x00,
        0x1F, 0x00, 0x00, 0x01, 0x05, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B,
        0xFF, 0xC4, 0x00, 0xB5, 0x10, 0x00, 0x02, 0x01, 0x03, 0x03, 0x02, 0x04, 0x03, 0x05, 0x05,
        0x04, 0x04, 0x00, 0x00, 0x01, 0x7D, 0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12, 0x21,
        0x31, 0x41, 0x06, 0x13, 0x51, 0x61, 0x07, 0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xA1, 0x08,
        0x23, 0x42, 0xB1, 0xC1, 0x15, 0x52, 0xD1, 0xF0, 0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0A,
        0x16, 0x17, 0x18, 0x19, 0x1A, 0x25, 0x26, 0x27, 0x28, 0x29, 0x2A, 0x34, 0x35, 0x36, 0x37,
        0x38, 0x39, 0x3A, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4A, 0x53, 0x54, 0x55, 0x56,
        0x57, 0x58, 0x59, 0x5A, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69, 0x6A, 0x73, 0x74, 0x75,
        0x76, 0x77, 0x78, 0x79, 0x7A, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89, 0x8A, 0x92, 0x93,
        0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0xA8, 0xA9,
        0xAA, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6,
        0xC7, 0xC8, 0xC9, 0xCA, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xE1, 0xE2,
        0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9, 0xEA, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7,
        0xF8, 0xF9, 0xFA, 0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00, 0xFB, 0xD5,
        0xDB, 0x20, 0xA8, 0xF1, 0x7E, 0xFF, 0xD9,
    ];

    fn encode_rgba_png(img: &RgbaImage) -> Vec<u8> {
        encode_as(DynamicImage::ImageRgba8(img.clone()), ImageFormat::Png)
    }

    fn encode_as(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    /// APP1 segment holding a big-endian TIFF block with a single
    /// Orientation entry.
    fn exif_app1(orientation: u16) -> Vec<u8> {
        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"MM\x00\x2A");
        tiff.extend_from_slice(&8u32.to_be_bytes());
        tiff.extend_from_slice(&1u16.to_be_bytes());
        tiff.extend_from_slice(&0x0112u16.to_be_bytes());
        tiff.extend_from_slice(&3u16.to_be_bytes());
        tiff.extend_from_slice(&1u32.to_be_bytes());
        tiff.extend_from_slice(&orientation.to_be_bytes());
        tiff.extend_from_slice(&[0, 0]);
        tiff.extend_from_slice(&0u32.to_be_bytes());

        let mut segment = vec![0xFF, 0xE1];
        let len = (2 + 6 + tiff.len()) as u16;
        segment.extend_from_slice(&len.to_be_bytes());
        segment.extend_from_slice(b"Exif\x00\x00");
        segment.extend_from_slice(&tiff);
        segment
    }

    /// 16x8 JPEG, red on the left half and blue on the right, tagged with
    /// the given EXIF orientation.
    fn oriented_jpeg(orientation: u16) -> Vec<u8> {
        let img = RgbImage::from_fn(16, 8, |x, _| {
            if x < 8 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });
        let jpeg = encode_jpeg(img.as_raw(), 16, 8, 95).unwrap();
        let mut out = jpeg[..2].to_vec();
        out.extend_from_slice(&exif_app1(orientation));
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    fn is_reddish(px: &[u8]) -> bool {
        px[0] > 180 && px[2] < 80
    }

    fn is_bluish(px: &[u8]) -> bool {
        px[2] > 180 && px[0] < 80
    }

    fn pixel(img: &DecodedImage, x: u32, y: u32) -> &[u8] {
        let at = ((y * img.width + x) * 3) as usize;
        &img.pixels[at..at + 3]
    }

    #[test]
    fn test_decode_valid_jpeg() {
        let img = decode_image(MINIMAL_JPEG).unwrap();
        assert_eq!(img.width, 1);
        assert_eq!(img.height, 1);
        assert_eq!(img.pixels.len(), 3); // grey expanded to RGB
    }

    #[test]
    fn test_decode_png_with_alpha_flattens_to_rgb() {
        let mut rgba = RgbaImage::new(4, 2);
        for (x, _, px) in rgba.enumerate_pixels_mut() {
            *px = Rgba([200, 10, x as u8 * 10, 0]);
        }
        let img = decode_image(&encode_rgba_png(&rgba)).unwrap();

        assert_eq!((img.width, img.height), (4, 2));
        assert_eq!(img.pixels.len(), 4 * 2 * 3);
        // Alpha is dropped, colour kept
        assert_eq!(&img.pixels[0..3], &[200, 10, 0]);
    }

    #[test]
    fn test_decode_invalid_bytes() {
        let result = decode_image(&[0x00, 0x01, 0x02, 0x03]);
        assert!(matches!(result, Err(DecodeError::InvalidFormat)));
    }

    #[test]
    fn test_decode_empty_bytes() {
        assert!(decode_image(&[]).is_err());
    }

    #[test]
    fn test_decode_truncated_jpeg() {
        let truncated = &MINIMAL_JPEG[0..20];
        match decode_image(truncated) {
            Err(DecodeError::CorruptedFile(_)) => {}
            other => panic!("Expected CorruptedFile error, got: {:?}", other),
        }
    }

    #[test]
    fn test_no_exif_means_no_orientation() {
        assert_eq!(exif_orientation(MINIMAL_JPEG), None);
        assert_eq!(exif_orientation(&[0x00, 0x01, 0x02]), None);
    }

    #[test]
    fn test_exif_orientation_is_read_from_jpeg() {
        assert_eq!(exif_orientation(&oriented_jpeg(6)), Some(Orientation::Rotate90));
        assert_eq!(exif_orientation(&oriented_jpeg(1)), Some(Orientation::NoTransforms));
    }

    #[test]
    fn test_decode_applies_exif_rotation() {
        let img = decode_image(&oriented_jpeg(6)).unwrap();

        assert_eq!((img.width, img.height), (8, 16));
        assert_eq!(img.pixels.len(), 8 * 16 * 3);
        // Rotated 90 degrees clockwise: the left half is now on top
        assert!(is_reddish(pixel(&img, 4, 2)), "{:?}", pixel(&img, 4, 2));
        assert!(is_bluish(pixel(&img, 4, 13)), "{:?}", pixel(&img, 4, 13));
    }

    #[test]
    fn test_decode_upright_exif_keeps_layout() {
        let img = decode_image(&oriented_jpeg(1)).unwrap();
        assert_eq!((img.width, img.height), (16, 8));
        assert!(is_reddish(pixel(&img, 2, 4)));
        assert!(is_bluish(pixel(&img, 13, 4)));
    }

    #[test]
    fn test_decode_paletted_png_expands_to_rgb() {
        let palette = [[10, 20, 30], [200, 100, 50]];
        let indices = [0, 1, 1, 0, 1, 0];
        let alpha = [255u8, 0];
        let png = pixo::png::encode_indexed(&indices, 3, 2, &palette, Some(&alpha[..])).unwrap();

        let img = decode_image(&png).unwrap();

        assert_eq!((img.width, img.height), (3, 2));
        assert_eq!(img.pixels.len(), 3 * 2 * 3);
        assert_eq!(pixel(&img, 0, 0), &[10, 20, 30]);
        // Fully transparent entry keeps its stored colour
        assert_eq!(pixel(&img, 1, 0), &[200, 100, 50]);
    }

    #[test]
    fn test_decode_grayscale_png_expands_to_rgb() {
        let gray = GrayImage::from_fn(5, 3, |x, _| Luma([x as u8 * 50]));
        let png = encode_as(DynamicImage::ImageLuma8(gray), ImageFormat::Png);
        let img = decode_image(&png).unwrap();

        assert_eq!((img.width, img.height), (5, 3));
        assert_eq!(img.pixels.len(), 5 * 3 * 3);
        assert_eq!(pixel(&img, 3, 1), &[150, 150, 150]);
    }

    #[test]
    fn test_decode_16_bit_png_narrows_to_8_bit() {
        let deep: ImageBuffer<Rgb<u16>, Vec<u16>> =
            ImageBuffer::from_pixel(4, 4, Rgb([65535, 0, 32896]));
        let png = encode_as(DynamicImage::ImageRgb16(deep), ImageFormat::Png);
        let img = decode_image(&png).unwrap();

        assert_eq!(img.pixels.len(), 4 * 4 * 3);
        assert_eq!(pixel(&img, 2, 2), &[255, 0, 128]);
    }

    #[test]
    fn test_decode_gif_first_frame() {
        let rgba = RgbaImage::from_fn(6, 4, |x, _| {
            if x < 3 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        let gif = encode_as(DynamicImage::ImageRgba8(rgba), ImageFormat::Gif);
        assert!(gif.starts_with(b"GIF8"));

        let img = decode_image(&gif).unwrap();

        assert_eq!((img.width, img.height), (6, 4));
        assert_eq!(img.pixels.len(), 6 * 4 * 3);
        assert!(is_reddish(pixel(&img, 0, 0)));
        assert!(is_bluish(pixel(&img, 5, 3)));
    }
}
