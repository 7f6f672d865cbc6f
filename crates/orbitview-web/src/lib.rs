//! orbitview web - WebGL2 viewport for the browser
//!
//! This crate provides the browser host for `orbitview-core` and the
//! `OrbitView` class exported to JavaScript.

mod bindings;
mod host;
mod input;
mod webgl;

pub use bindings::OrbitView;
pub use host::WebHost;
pub use webgl::WebGlRenderer;

use wasm_bindgen::prelude::*;

/// Entry point for WASM module
#[wasm_bindgen(start)]
pub fn main() {
    // Set panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize logging; only warnings and errors reach the console
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::WARN)
            .build(),
    );
}
