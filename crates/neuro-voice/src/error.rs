//! Error types for the audio providers

use thiserror::Error;

/// Result type alias for provider operations
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Errors raised while resolving audio or calling an audio provider
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Audio reference error: {0}")]
    AudioRef(String),

    #[error("Audio fetch error: {0}")]
    Fetch(String),

    #[error("STT error: {0}")]
    Stt(String),

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
