//! Error types for yomi-voice

use thiserror::Error;

/// yomi-voice error type
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Speech synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Playback failed: {0}")]
    PlaybackFailed(String),

    #[error("Audio decoding error: {0}")]
    DecodingError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Text too long for backend: {len} chars (limit {limit})")]
    TextTooLong { len: usize, limit: usize },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] yomi_core::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, VoiceError>;
