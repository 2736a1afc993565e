//! Text-to-Speech synthesis
//!
//! Supports two backends:
//! - VOICEVOX engine (local HTTP server)
//! - Google Translate TTS

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use yomi_core::{TtsBackend, TtsConfig};

use crate::error::{Result, VoiceError};
use crate::google::GoogleTtsClient;
use crate::voicevox::VoicevoxClient;

/// Speaker (voice) identifier understood by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpeakerId(pub u32);

impl std::fmt::Display for SpeakerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Encoded audio format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Wav,
    Mp3,
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wav => write!(f, "wav"),
            Self::Mp3 => write!(f, "mp3"),
        }
    }
}

/// Audio produced from one text chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSegment {
    /// Encoded audio bytes
    pub data: Vec<u8>,
    /// Audio format
    pub format: AudioFormat,
    /// The text this audio speaks
    pub text: String,
}

impl AudioSegment {
    pub fn new(data: Vec<u8>, format: AudioFormat, text: impl Into<String>) -> Self {
        Self {
            data,
            format,
            text: text.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A text-to-speech backend
///
/// Implementations hold no per-call state; one instance serves every session.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Longest text the backend accepts in one request, if limited
    fn max_chunk_chars(&self) -> Option<usize> {
        None
    }

    /// Synthesize one chunk of text
    async fn synthesize(&self, text: &str, speaker: SpeakerId) -> Result<AudioSegment>;
}

/// Build the configured backend
pub fn build_synthesizer(config: &TtsConfig) -> Result<Arc<dyn SpeechSynthesizer>> {
    match config.backend {
        TtsBackend::Voicevox => {
            let mut client = VoicevoxClient::new(&config.voicevox_url)?;
            if let Some(scale) = config.speed_scale {
                client = client.with_speed_scale(scale);
            }
            Ok(Arc::new(client))
        }
        TtsBackend::Google => Ok(Arc::new(
            GoogleTtsClient::new(&config.google_host)?.with_lang(&config.google_lang),
        )),
    }
}

/// HTTP client shared by the backends
pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| VoiceError::ConfigError(format!("Failed to create HTTP client: {}", e)))
}
