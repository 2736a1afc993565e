//! VOICEVOX engine client
//!
//! Synthesis is two requests: `/audio_query` builds the synthesis
//! parameters, `/synthesis` renders them to WAV.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Result, VoiceError};
use crate::tts::{AudioFormat, AudioSegment, SpeakerId, SpeechSynthesizer, http_client};

/// VOICEVOX HTTP client
pub struct VoicevoxClient {
    client: Client,
    base_url: String,
    speed_scale: Option<f64>,
}

impl VoicevoxClient {
    /// Create a client for the engine at `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client(Duration::from_secs(30))?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            speed_scale: None,
        })
    }

    /// Override the query's `speedScale` (faster speech means less lag)
    pub fn with_speed_scale(mut self, scale: f64) -> Self {
        self.speed_scale = Some(scale);
        self
    }

    /// Build synthesis parameters for `text`
    async fn audio_query(&self, text: &str, speaker: SpeakerId) -> Result<serde_json::Value> {
        let url = format!("{}/audio_query", self.base_url);
        let speaker = speaker.to_string();

        let response = self
            .client
            .post(&url)
            .query(&[("text", text), ("speaker", speaker.as_str())])
            .send()
            .await
            .map_err(|e| VoiceError::ApiError(format!("audio_query request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(VoiceError::SynthesisFailed(format!(
                "audio_query error {}: {}",
                status, error_text
            )));
        }

        let mut query: serde_json::Value = response
            .json()
            .await
            .map_err(|e| VoiceError::SynthesisFailed(format!("Malformed audio_query: {}", e)))?;

        if let Some(scale) = self.speed_scale {
            match query.as_object_mut() {
                Some(obj) => {
                    obj.insert("speedScale".to_string(), serde_json::json!(scale));
                }
                None => {
                    return Err(VoiceError::SynthesisFailed(
                        "audio_query response is not an object".to_string(),
                    ));
                }
            }
        }

        Ok(query)
    }

    /// Render synthesis parameters to WAV bytes
    async fn render(&self, query: &serde_json::Value, speaker: SpeakerId) -> Result<Vec<u8>> {
        let url = format!("{}/synthesis", self.base_url);

        let response = self
            .client
            .post(&url)
            .query(&[("speaker", speaker.0)])
            .json(query)
            .send()
            .await
            .map_err(|e| VoiceError::ApiError(format!("synthesis request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(VoiceError::SynthesisFailed(format!(
                "synthesis error {}: {}",
                status, error_text
            )));
        }

        let audio_data = response.bytes().await.map_err(|e| {
            VoiceError::SynthesisFailed(format!("Failed to read audio data: {}", e))
        })?;

        if audio_data.is_empty() {
            return Err(VoiceError::SynthesisFailed("empty audio".to_string()));
        }

        Ok(audio_data.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizer for VoicevoxClient {
    fn name(&self) -> &str {
        "voicevox"
    }

    async fn synthesize(&self, text: &str, speaker: SpeakerId) -> Result<AudioSegment> {
        debug!("Synthesizing {} chars with speaker {}", text.chars().count(), speaker);

        let query = self.audio_query(text, speaker).await?;
        let audio = self.render(&query, speaker).await?;

        info!("Synthesis complete: {} bytes", audio.len());
        Ok(AudioSegment::new(audio, AudioFormat::Wav, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn query_body() -> serde_json::Value {
        json!({ "accent_phrases": [], "speedScale": 1.0, "pitchScale": 0.0 })
    }

    #[tokio::test]
    async fn test_two_phase_synthesis() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/audio_query"))
            .and(query_param("text", "こんにちは"))
            .and(query_param("speaker", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(query_body()))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/synthesis"))
            .and(query_param("speaker", "3"))
            .and(body_partial_json(json!({ "speedScale": 1.0 })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFFfakewav".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let client = VoicevoxClient::new(server.uri()).unwrap();
        let segment = client.synthesize("こんにちは", SpeakerId(3)).await.unwrap();

        assert_eq!(segment.data, b"RIFFfakewav");
        assert_eq!(segment.format, AudioFormat::Wav);
        assert_eq!(segment.text, "こんにちは");
    }

    #[tokio::test]
    async fn test_speed_scale_override() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/audio_query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(query_body()))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/synthesis"))
            .and(body_partial_json(json!({ "speedScale": 1.3 })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFF".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let client = VoicevoxClient::new(server.uri()).unwrap().with_speed_scale(1.3);
        tokio_test::assert_ok!(client.synthesize("はやい", SpeakerId(1)).await);
    }

    #[tokio::test]
    async fn test_query_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/audio_query"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad speaker"))
            .mount(&server)
            .await;

        let client = VoicevoxClient::new(server.uri()).unwrap();
        let err = client.synthesize("テスト", SpeakerId(999)).await.unwrap_err();
        assert!(matches!(err, VoiceError::SynthesisFailed(msg) if msg.contains("422")));
    }

    #[tokio::test]
    async fn test_malformed_query() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/audio_query"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = VoicevoxClient::new(server.uri()).unwrap();
        tokio_test::assert_err!(client.synthesize("テスト", SpeakerId(3)).await);
    }

    #[tokio::test]
    async fn test_engine_unreachable() {
        let client = VoicevoxClient::new("http://127.0.0.1:1").unwrap();
        let err = client.synthesize("テスト", SpeakerId(3)).await.unwrap_err();
        assert!(matches!(err, VoiceError::ApiError(_)));
    }
}
