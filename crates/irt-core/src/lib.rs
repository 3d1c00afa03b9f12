//! irt-core: Shared types for the IR tester
//!
//! Buffers, equalizer/mix state and the constants every other crate agrees on.

mod buffer;
mod error;
mod eq;
mod mix;

pub use buffer::*;
pub use error::*;
pub use eq::*;
pub use mix::*;

/// Frames requested from the output device per callback
pub const DEFAULT_BLOCK_SIZE: usize = 1024;

/// Number of equalizer bands
pub const NUM_BANDS: usize = 10;

/// ISO octave band centers, ascending
pub const ISO_BANDS: [f64; NUM_BANDS] = [
    31.0, 62.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

/// Peaking filter Q (roughly one octave)
pub const EQ_Q: f64 = 1.41;

/// Gain range exposed to the shell, in dB
pub const MAX_GAIN_DB: f64 = 12.0;

/// Output level after final normalization
pub const HEADROOM: f32 = 0.9;

/// Initial playback volume
pub const DEFAULT_VOLUME: f32 = 0.8;
