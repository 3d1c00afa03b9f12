//! File I/O error types

use irt_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("No audio track found")]
    NoAudioTrack,

    #[error("File contains no samples: {0}")]
    Empty(String),

    #[error("WAV error: {0}")]
    WavError(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type FileResult<T> = Result<T, FileError>;

impl From<hound::Error> for FileError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => FileError::Io(e),
            hound::Error::Unsupported => FileError::UnsupportedFormat("WAV variant".to_string()),
            other => FileError::WavError(other.to_string()),
        }
    }
}

impl From<symphonia::core::errors::Error> for FileError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        use symphonia::core::errors::Error;
        match err {
            Error::IoError(e) => FileError::Io(e),
            Error::Unsupported(what) => FileError::UnsupportedFormat(what.to_string()),
            other => FileError::DecodeError(other.to_string()),
        }
    }
}
