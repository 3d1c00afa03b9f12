//! DSP error types

use irt_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DspError {
    #[error("Expected {expected} equalizer gains, got {got}")]
    InvalidBandCount { expected: usize, got: usize },

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    #[error("Empty input: {0}")]
    EmptyInput(&'static str),

    #[error("FFT error: {0}")]
    Fft(String),

    #[error("Resample error: {0}")]
    Resample(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type DspResult<T> = Result<T, DspError>;
