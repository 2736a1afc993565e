//! Google Translate TTS client
//!
//! Uses the `jQ1olc` RPC of the translate web UI, which answers with
//! base64-encoded MP3. Requests are limited to 200 characters.

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Result, VoiceError};
use crate::tts::{AudioFormat, AudioSegment, SpeakerId, SpeechSynthesizer, http_client};

/// Per-request character limit of the endpoint
pub const MAX_CHARS: usize = 200;

const RPC_ID: &str = "jQ1olc";
/// Length of the `)]}'` anti-XSSI guard (plus newline) before the JSON body
const XSSI_PREFIX_LEN: usize = 5;

/// Google Translate TTS client
pub struct GoogleTtsClient {
    client: Client,
    host: String,
    lang: String,
}

impl GoogleTtsClient {
    /// Create a client against `host` (normally `https://translate.google.com`)
    pub fn new(host: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client(Duration::from_secs(10))?,
            host: host.into().trim_end_matches('/').to_string(),
            lang: "ja".to_string(),
        })
    }

    /// Set the speech language
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    /// Build the `f.req` form value
    fn request_payload(&self, text: &str) -> Result<String> {
        let inner = serde_json::to_string(&json!([text, self.lang, null, "null"]))?;
        Ok(serde_json::to_string(&json!([[[RPC_ID, inner, null, "generic"]]]))?)
    }
}

/// Extract the MP3 bytes from a batchexecute response body
fn parse_response(body: &str) -> Result<Vec<u8>> {
    let json = body
        .get(XSSI_PREFIX_LEN..)
        .ok_or_else(|| VoiceError::DecodingError("response too short".to_string()))?;
    let envelope: Value = serde_json::from_str(json.trim_start())?;

    let inner = envelope[0][2].as_str().ok_or_else(|| {
        VoiceError::SynthesisFailed("no audio in response (unsupported language?)".to_string())
    })?;
    let payload: Value = serde_json::from_str(inner)?;
    let audio_base64 = payload[0]
        .as_str()
        .ok_or_else(|| VoiceError::DecodingError("missing base64 audio".to_string()))?;

    BASE64
        .decode(audio_base64)
        .map_err(|e| VoiceError::DecodingError(format!("Invalid base64 audio: {}", e)))
}

#[async_trait]
impl SpeechSynthesizer for GoogleTtsClient {
    fn name(&self) -> &str {
        "google"
    }

    fn max_chunk_chars(&self) -> Option<usize> {
        Some(MAX_CHARS)
    }

    async fn synthesize(&self, text: &str, speaker: SpeakerId) -> Result<AudioSegment> {
        let len = text.chars().count();
        if len > MAX_CHARS {
            return Err(VoiceError::TextTooLong {
                len,
                limit: MAX_CHARS,
            });
        }

        // The endpoint has a single voice per language.
        debug!("Synthesizing {} chars (lang {}, speaker {} ignored)", len, self.lang, speaker);

        let url = format!("{}/_/TranslateWebserverUi/data/batchexecute", self.host);
        let payload = self.request_payload(text)?;

        let response = self
            .client
            .post(&url)
            .form(&[("f.req", payload.as_str())])
            .send()
            .await
            .map_err(|e| VoiceError::ApiError(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(VoiceError::SynthesisFailed(format!(
                "API error {}: {}",
                status, error_text
            )));
        }

        let body = response.text().await?;
        let audio = parse_response(&body)?;

        info!("Synthesis complete: {} bytes", audio.len());
        Ok(AudioSegment::new(audio, AudioFormat::Mp3, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OK_BODY: &str = ")]}'\n\n[[\"wrb.fr\",\"jQ1olc\",\"[\\\"SUQz\\\"]\",null,null,null,\"generic\"]]";

    #[test]
    fn test_request_payload() {
        let client = GoogleTtsClient::new("https://translate.google.com").unwrap();
        let payload = client.request_payload("こんにちは").unwrap();

        let outer: Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(outer[0][0][0], "jQ1olc");
        assert_eq!(outer[0][0][3], "generic");
        let inner: Value = serde_json::from_str(outer[0][0][1].as_str().unwrap()).unwrap();
        assert_eq!(inner, json!(["こんにちは", "ja", null, "null"]));

        let english = client.with_lang("en").request_payload("a").unwrap();
        let outer: Value = serde_json::from_str(&english).unwrap();
        let inner: Value = serde_json::from_str(outer[0][0][1].as_str().unwrap()).unwrap();
        assert_eq!(inner[1], "en");
    }

    #[test]
    fn test_parse_response() {
        assert_eq!(parse_response(OK_BODY).unwrap(), b"ID3");
    }

    #[test]
    fn test_parse_response_without_audio() {
        let body = ")]}'\n\n[[\"wrb.fr\",\"jQ1olc\",null,null,null,[3],\"generic\"]]";
        assert!(matches!(parse_response(body), Err(VoiceError::SynthesisFailed(_))));
        assert!(parse_response("oops").is_err());
    }

    #[tokio::test]
    async fn test_synthesize() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/_/TranslateWebserverUi/data/batchexecute"))
            .and(body_string_contains("f.req="))
            .respond_with(ResponseTemplate::new(200).set_body_string(OK_BODY))
            .expect(1)
            .mount(&server)
            .await;

        let client = GoogleTtsClient::new(server.uri()).unwrap();
        let segment = client.synthesize("テスト", SpeakerId(3)).await.unwrap();
        assert_eq!(segment.data, b"ID3");
        assert_eq!(segment.format, AudioFormat::Mp3);
    }

    #[tokio::test]
    async fn test_rejects_long_text() {
        let client = GoogleTtsClient::new("http://127.0.0.1:1").unwrap();
        let text = "あ".repeat(MAX_CHARS + 1);
        let err = client.synthesize(&text, SpeakerId(3)).await.unwrap_err();
        assert!(matches!(err, VoiceError::TextTooLong { len: 201, limit: 200 }));
    }

    #[tokio::test]
    async fn test_server_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = GoogleTtsClient::new(server.uri()).unwrap();
        assert!(client.synthesize("テスト", SpeakerId(3)).await.is_err());
    }
}
