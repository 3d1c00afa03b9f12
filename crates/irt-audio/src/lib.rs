//! irt-audio: Real-time playback for the IR tester
//!
//! A single mono output stream reads the active buffer through lock-free shared state.
//! Buffers are swapped with `arc-swap`; transport flags, cursor and volume are plain atomics.
//! The output device sits behind [`OutputBackend`] so the engine can run against cpal or be
//! driven by the caller.

mod backend;
mod device;
mod error;
mod playback;

pub use backend::*;
pub use device::*;
pub use error::*;
pub use playback::*;
