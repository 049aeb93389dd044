//! DSP Engine: Pure Rust ambient-sound synthesis and mixing.
//!
//! Noise buffers, biquad filters and LFOs are wired into per-sound chains
//! that feed a master bus. The same code runs inside an AudioWorklet (via
//! WASM) and in the offline WAV renderer.

pub mod chain;
pub mod context;
pub mod engine;
pub mod filter;
pub mod mixer;
pub mod noise;
pub mod oscillator;
pub mod param;
pub mod renderer;
pub mod source;
