//! Immutable mono audio buffer
//!
//! Every processing stage produces a fresh buffer; nothing downstream mutates one in place.
//! Cloning is an `Arc` bump, which is what lets the playback engine hot-swap buffers.

use std::fmt;
use std::sync::Arc;

use crate::{CoreError, CoreResult};

/// Mono f32 samples plus their sample rate
#[derive(Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> CoreResult<Self> {
        Self::from_shared(samples.into(), sample_rate)
    }

    pub fn from_shared(samples: Arc<[f32]>, sample_rate: u32) -> CoreResult<Self> {
        if sample_rate == 0 {
            return Err(CoreError::InvalidSampleRate(sample_rate));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Absolute peak
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |m, &s| m.max(s.abs()))
    }

    /// True when both buffers share the same allocation
    #[inline]
    pub fn ptr_eq(&self, other: &AudioBuffer) -> bool {
        Arc::ptr_eq(&self.samples, &other.samples)
    }
}

impl fmt::Debug for AudioBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioBuffer")
            .field("len", &self.samples.len())
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}
