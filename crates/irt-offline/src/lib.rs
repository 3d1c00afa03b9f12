//! irt-offline: Background convolution / EQ processing
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    ProcessingPipeline                         │
//! │                                                               │
//! │  submit(job) ── cancel + join previous ── spawn worker        │
//! │                                                               │
//! │  worker:  Resample IR → FFT convolve → Normalize/mix → EQ     │
//! │             (cancel token checked between stages)             │
//! │                                                               │
//! │  events (crossbeam) ── Progress / Finished / Failed ── drain  │
//! │                         (stale job ids dropped)               │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod job;
mod pipeline;
mod processors;

pub use config::*;
pub use error::*;
pub use job::*;
pub use pipeline::*;
pub use processors::*;
