//! Downsampling of decoded images to a bounding box.
//!
//! All functions return new `DecodedImage` instances without modifying the input.

use super::{DecodeError, DecodedImage, Dimensions, FilterType};

/// Resize an image to exact dimensions.
///
/// # Errors
///
/// Returns `DecodeError::InvalidDimensions` if either target axis is zero and
/// `DecodeError::CorruptedFile` if the pixel buffer does not match the size.
pub fn resize(
    image: &DecodedImage,
    width: u32,
    height: u32,
    filter: FilterType,
) -> Result<DecodedImage, DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidDimensions { width, height });
    }

    // Fast path: if dimensions match, just clone
    if image.width == width && image.height == height {
        return Ok(image.clone());
    }

    let rgb_image = image
        .to_rgb_image()
        .ok_or_else(|| DecodeError::CorruptedFile("Failed to create RgbImage".to_string()))?;

    let resized = image::imageops::resize(&rgb_image, width, height, filter.to_image_filter());

    Ok(DecodedImage::from_rgb_image(resized))
}

/// Shrink an image so it fits inside `bound`, preserving aspect ratio.
///
/// Images that already fit are returned unchanged; this never upsamples.
///
/// # Errors
///
/// Returns `DecodeError::InvalidDimensions` if `bound` is zero on either axis.
pub fn resize_to_fit(
    image: &DecodedImage,
    bound: Dimensions,
    filter: FilterType,
) -> Result<DecodedImage, DecodeError> {
    if bound.is_empty() {
        return Err(DecodeError::InvalidDimensions {
            width: bound.width,
            height: bound.height,
        });
    }

    let target = fit_within(image.dimensions(), bound);
    if target == image.dimensions() {
        return Ok(image.clone());
    }

    resize(image, target.width, target.height, filter)
}

/// Calculate the largest size with the same aspect ratio as `size` that fits
/// inside `bound`. Sizes already inside the bound are returned as is.
///
/// The constrained axis lands exactly on the bound; the other axis is rounded
/// to the nearest pixel and never drops below 1.
pub fn fit_within(size: Dimensions, bound: Dimensions) -> Dimensions {
    if size.is_empty() || size.fits_within(bound) {
        return size;
    }

    let (w, h) = (size.width as u64, size.height as u64);
    let (bw, bh) = (bound.width as u64, bound.height as u64);

    // Compare w/bw against h/bh without floating point
    if w * bh >= h * bw {
        // Width is the binding constraint
        let new_height = div_round(h * bw, w).clamp(1, bh);
        Dimensions::new(bound.width, new_height as u32)
    } else {
        let new_width = div_round(w * bh, h).clamp(1, bw);
        Dimensions::new(new_width as u32, bound.height)
    }
}

fn div_round(numerator: u64, denominator: u64) -> u64 {
    (numerator + denominator / 2) / denominator
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: the fitted size never exceeds the bound.
        #[test]
        fn prop_fit_is_within_bound(
            w in 1u32..=20_000,
            h in 1u32..=20_000,
            bw in 1u32..=2_000,
            bh in 1u32..=2_000,
        ) {
            let fitted = fit_within(Dimensions::new(w, h), Dimensions::new(bw, bh));
            prop_assert!(fitted.fits_within(Dimensions::new(bw, bh)));
            prop_assert!(fitted.width >= 1 && fitted.height >= 1);
        }

        /// Property: fitting never upsamples.
        #[test]
        fn prop_fit_never_upsamples(
            w in 1u32..=5_000,
            h in 1u32..=5_000,
            bw in 1u32..=5_000,
            bh in 1u32..=5_000,
        ) {
            let fitted = fit_within(Dimensions::new(w, h), Dimensions::new(bw, bh));
            prop_assert!(fitted.width <= w && fitted.height <= h);
        }

        /// Property: aspect ratio is preserved to within one pixel of rounding.
        #[test]
        fn prop_fit_preserves_aspect_ratio(
            w in 2u32..=10_000,
            h in 2u32..=10_000,
            bound in 16u32..=1_000,
        ) {
            let fitted = fit_within(Dimensions::new(w, h), Dimensions::new(bound, bound));
            let expected_h = fitted.width as f64 * h as f64 / w as f64;
            let expected_w = fitted.height as f64 * w as f64 / h as f64;
            prop_assert!(
                (fitted.height as f64 - expected_h).abs() <= 1.0
                    || (fitted.width as f64 - expected_w).abs() <= 1.0,
                "{}x{} -> {}", w, h, fitted
            );
        }
    }
}
