//! Optimize bindings.
//!
//! Both functions run the whole batch on the calling thread and return once
//! the document has been rewritten.

use slimdoc_core::{OptimizeOptions, WorkerPolicy};
use wasm_bindgen::prelude::*;

use crate::types::JsOptimizationResult;

/// Narrow a JS number to the 1-100 quality range.
///
/// wasm-bindgen truncates numbers modulo 2^N when converting to an integer
/// type, so narrowing to `u8` at the boundary would turn 300 into 44.
fn clamp_js_quality(quality: u32) -> u8 {
    let clamped = quality.clamp(1, 100) as u8;
    if u32::from(clamped) != quality {
        log::warn!("quality {quality} is outside 1-100; using {clamped}");
    }
    clamped
}

/// Options for a browser call: one worker, never-grow on.
fn browser_options(quality: u32, max_width: u32, max_height: u32) -> OptimizeOptions {
    OptimizeOptions::new()
        .quality(clamp_js_quality(quality))
        .max_dimensions(max_width, max_height)
        .workers(WorkerPolicy::Fixed(1))
}

fn run(html: &str, options: &OptimizeOptions) -> Result<JsOptimizationResult, String> {
    let optimized = slimdoc_core::optimize(html, options).map_err(|e| e.to_string())?;
    Ok(JsOptimizationResult::new(optimized.text, optimized.stats))
}

/// Shrink every inline `data:image` in an HTML string.
///
/// # Arguments
///
/// * `html` - The document text
/// * `quality` - JPEG quality (1-100, recommended: 85); other values are clamped
/// * `max_width`, `max_height` - Bounding box for image pixel size (recommended: 800x800)
///
/// # Errors
///
/// Returns an error if the bound is zero.
/// Images that fail to decode are left as they were and do not cause an error.
///
/// # Example
///
/// ```typescript
/// const result = optimize_html(html, 85, 800, 800);
/// console.log(`${result.reduction_percentage.toFixed(1)}% smaller`);
/// ```
#[wasm_bindgen]
pub fn optimize_html(
    html: &str,
    quality: u32,
    max_width: u32,
    max_height: u32,
) -> Result<JsOptimizationResult, JsValue> {
    run(html, &browser_options(quality, max_width, max_height)).map_err(|e| JsValue::from_str(&e))
}

/// Same as [`optimize_html`] for a document given as UTF-8 bytes, e.g. the
/// contents of an uploaded file.
#[wasm_bindgen]
pub fn optimize_html_bytes(
    bytes: &[u8],
    quality: u32,
    max_width: u32,
    max_height: u32,
) -> Result<JsOptimizationResult, JsValue> {
    let options = browser_options(quality, max_width, max_height);
    slimdoc_core::optimize_bytes(bytes, &options)
        .map(|optimized| JsOptimizationResult::new(optimized.text, optimized.stats))
        .map_err(|e| JsValue::from_str(&e.to_string()))
}


/// WASM-specific tests that require JsValue.
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_optimize_html_passthrough() {
        let result = optimize_html("<p>hi</p>", 85, 800, 800).unwrap();
        assert_eq!(result.html(), "<p>hi</p>");
        assert!(result.stats().is_ok());
    }

    #[wasm_bindgen_test]
    fn test_optimize_html_quality_above_255() {
        let result = optimize_html("<p>hi</p>", 300, 800, 800).unwrap();
        assert_eq!(result.html(), "<p>hi</p>");
    }

    #[wasm_bindgen_test]
    fn test_optimize_html_zero_bound() {
        assert!(optimize_html("<p>hi</p>", 85, 0, 0).is_err());
    }

    #[wasm_bindgen_test]
    fn test_optimize_html_bytes_invalid_utf8() {
        assert!(optimize_html_bytes(&[0x3c, 0xff], 85, 800, 800).is_err());
    }
}
