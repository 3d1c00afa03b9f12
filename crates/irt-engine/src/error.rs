//! Session error types

use irt_audio::AudioError;
use irt_core::CoreError;
use irt_file::FileError;
use irt_offline::ProcessingError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Load error: {0}")]
    Load(#[from] FileError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Processing error: {0}")]
    Processing(#[from] ProcessingError),

    #[error("Invalid parameter: {0}")]
    Param(#[from] CoreError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Config(err.to_string())
    }
}
