//! Slimdoc WASM - WebAssembly bindings for slimdoc
//!
//! This crate exposes the slimdoc-core optimizer to JavaScript so a page can
//! shrink the inline images of an HTML string without a server round trip.
//!
//! # Module Structure
//!
//! - `optimize` - `optimize_html` entry points
//! - `types` - JS-facing result wrapper
//! - `console_logger` - routes `log` records to the browser console
//!
//! # Usage
//!
//! ```typescript
//! import init, { optimize_html } from '@slimdoc/wasm';
//!
//! await init();
//!
//! const result = optimize_html(html, 85, 800, 800);
//! const stats = result.stats();
//! console.log(`${stats.images_optimized}/${stats.images_processed} images optimized`);
//! download(result.html);
//! ```
//!
//! Browsers run the batch on a single worker; there are no threads here.

use wasm_bindgen::prelude::*;

mod console_logger;
mod optimize;
mod types;

pub use optimize::{optimize_html, optimize_html_bytes};
pub use types::JsOptimizationResult;

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    console_logger::init(log::LevelFilter::Info);
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Change how much the optimizer logs to the console.
///
/// Accepts `error`, `warn`, `info`, `debug`, `trace` or `off`; anything
/// else leaves the level unchanged and returns false.
#[wasm_bindgen]
pub fn set_log_level(level: &str) -> bool {
    match parse_level(level) {
        Some(filter) => {
            log::set_max_level(filter);
            true
        }
        None => false,
    }
}

fn parse_level(level: &str) -> Option<log::LevelFilter> {
    level.trim().parse().ok()
}
