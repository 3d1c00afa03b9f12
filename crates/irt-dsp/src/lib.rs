//! irt-dsp: Offline DSP for the IR tester
//!
//! ## Modules
//! - `biquad` - TDF-II peaking sections
//! - `equalizer` - 10-band cascaded peaking EQ over whole buffers
//! - `convolution` - FFT linear convolution
//! - `resample` - FFT-domain sample rate conversion
//! - `normalize` - peak normalization and dry/wet blending

pub mod biquad;
pub mod convolution;
pub mod equalizer;
mod error;
pub mod normalize;
pub mod resample;

pub use error::*;

/// Mono processor trait
pub trait MonoProcessor {
    /// Process a single sample
    fn process_sample(&mut self, input: f64) -> f64;

    /// Clear filter state
    fn reset(&mut self);

    /// Process a block of samples
    fn process_block(&mut self, buffer: &mut [f64]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }
}
