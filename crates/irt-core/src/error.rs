//! Error types shared by the IR tester crates

use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    #[error("Expected {expected} equalizer gains, got {got}")]
    InvalidBandCount { expected: usize, got: usize },

    #[error("Band index out of range: {0}")]
    InvalidBand(usize),

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),
}

/// Result type alias
pub type CoreResult<T> = Result<T, CoreError>;
