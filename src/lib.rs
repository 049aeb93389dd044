pub mod catalog;
pub mod config;
pub mod dsp;
pub mod error;
pub mod session;
pub mod web;

pub use crate::catalog::Catalog;
pub use crate::config::MixerConfig;
pub use crate::dsp::engine::{MixerState, SoundKind, SoundState};
pub use crate::error::MixerError;
pub use crate::session::Session;

use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the ambience-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: the built-in catalog as JSON (sound ids, layers, presets).
#[wasm_bindgen]
pub fn catalog_json() -> String {
    catalog::BUILTIN_CATALOG.to_string()
}
