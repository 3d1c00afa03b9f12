//! Error types for background processing

use irt_dsp::DspError;
use thiserror::Error;

/// Processing errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessingError {
    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Sample rate conversion failed: {0}")]
    SampleRateConversion(String),

    #[error("FFT failed: {0}")]
    Fft(String),

    #[error("Invalid equalizer settings: {0}")]
    InvalidGains(String),

    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    #[error("Job cancelled")]
    Cancelled,

    #[error("Failed to spawn worker: {0}")]
    Spawn(String),
}

/// Result type for processing operations
pub type ProcessingResult<T> = Result<T, ProcessingError>;

impl From<DspError> for ProcessingError {
    fn from(err: DspError) -> Self {
        match err {
            DspError::EmptyInput(what) => ProcessingError::EmptyInput(what.to_string()),
            DspError::Resample(msg) => ProcessingError::SampleRateConversion(msg),
            DspError::InvalidSampleRate(rate) => {
                ProcessingError::SampleRateConversion(format!("invalid rate {rate}"))
            }
            DspError::Fft(msg) => ProcessingError::Fft(msg),
            e @ DspError::InvalidBandCount { .. } => ProcessingError::InvalidGains(e.to_string()),
            DspError::Core(e) => ProcessingError::ProcessingFailed(e.to_string()),
        }
    }
}
