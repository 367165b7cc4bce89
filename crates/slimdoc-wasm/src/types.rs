//! JavaScript-facing result types.

use slimdoc_core::{bytes_to_megabytes, StatsRecord};
use wasm_bindgen::prelude::*;

/// Result of optimizing one HTML document.
///
/// The optimized markup stays in WASM memory until `html()` copies it out.
#[wasm_bindgen]
pub struct JsOptimizationResult {
    html: String,
    stats: StatsRecord,
}

impl JsOptimizationResult {
    pub(crate) fn new(html: String, stats: StatsRecord) -> Self {
        Self { html, stats }
    }
}

#[wasm_bindgen]
impl JsOptimizationResult {
    /// The optimized document.
    pub fn html(&self) -> String {
        self.html.clone()
    }

    /// Statistics as a plain object with `images_processed`,
    /// `images_optimized`, `original_bytes`, `optimized_bytes` and
    /// `elapsed_seconds`.
    pub fn stats(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.stats).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(getter)]
    pub fn images_processed(&self) -> usize {
        self.stats.images_processed
    }

    #[wasm_bindgen(getter)]
    pub fn images_optimized(&self) -> usize {
        self.stats.images_optimized
    }

    /// Percentage saved over the optimized images (0 if none were).
    #[wasm_bindgen(getter)]
    pub fn reduction_percentage(&self) -> f64 {
        self.stats.reduction_percentage()
    }

    #[wasm_bindgen(getter)]
    pub fn original_size_mb(&self) -> f64 {
        bytes_to_megabytes(self.stats.original_bytes)
    }

    #[wasm_bindgen(getter)]
    pub fn final_size_mb(&self) -> f64 {
        bytes_to_megabytes(self.stats.optimized_bytes)
    }

    #[wasm_bindgen(getter)]
    pub fn elapsed_seconds(&self) -> f64 {
        self.stats.elapsed_seconds
    }
}
