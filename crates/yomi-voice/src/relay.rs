//! Chat-to-speech relay across voice connections
//!
//! One [`VoiceSession`] per connection key (guild). Incoming chat text is
//! normalized with the shared dictionary, given the author's voice and
//! handed to that guild's session.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

use yomi_core::{Config, Preferences, TextNormalizer};

use crate::error::Result;
use crate::player::AudioSink;
use crate::session::{SessionOptions, SubmitReport, VoiceSession};
use crate::tts::{SpeakerId, SpeechSynthesizer};

/// Routes chat messages to per-guild speech sessions
pub struct SpeechRelay {
    sessions: DashMap<u64, Arc<VoiceSession>>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    prefs: Arc<Preferences>,
    normalizer: TextNormalizer,
    options: SessionOptions,
    default_speaker: SpeakerId,
}

impl SpeechRelay {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        prefs: Arc<Preferences>,
        config: &Config,
    ) -> Result<Self> {
        Ok(Self {
            sessions: DashMap::new(),
            normalizer: TextNormalizer::new(config.playback.max_text_length)?,
            options: SessionOptions::from_config(config)?,
            default_speaker: SpeakerId(config.tts.default_speaker),
            synthesizer,
            prefs,
        })
    }

    /// Session for `key`, created and attached to `sink` on first connect.
    ///
    /// Connecting again while a session is live returns the existing one;
    /// its player stays subscribed to the first sink.
    pub fn connect(&self, key: u64, sink: Arc<dyn AudioSink>) -> Arc<VoiceSession> {
        let session = self
            .sessions
            .entry(key)
            .or_insert_with(|| {
                info!("Creating voice session for {} ({})", key, self.synthesizer.name());
                Arc::new(VoiceSession::new(
                    key,
                    self.synthesizer.clone(),
                    self.options.clone(),
                ))
            })
            .clone();

        if !session.attach(sink) {
            debug!("Session {} already attached", key);
        }
        session
    }

    /// Close and forget the session for `key`
    pub async fn disconnect(&self, key: u64) -> bool {
        // Removed before closing so new messages stop reaching it.
        let Some((_, session)) = self.sessions.remove(&key) else {
            return false;
        };
        session.close().await;
        true
    }

    pub fn is_connected(&self, key: u64) -> bool {
        self.sessions.contains_key(&key)
    }

    pub fn session(&self, key: u64) -> Option<Arc<VoiceSession>> {
        self.sessions.get(&key).map(|s| s.clone())
    }

    pub fn preferences(&self) -> &Arc<Preferences> {
        &self.prefs
    }

    /// Speaker for a chat author: their own choice, else the default
    pub async fn resolve_speaker(&self, author: u64) -> SpeakerId {
        self.prefs
            .voice_for(author)
            .await
            .map(SpeakerId)
            .unwrap_or(self.default_speaker)
    }

    /// Read a chat message aloud in `key`'s voice channel.
    ///
    /// Returns `None` when there is no session or nothing speakable is left
    /// after normalization.
    pub async fn submit(&self, key: u64, author: u64, text: &str) -> Result<Option<SubmitReport>> {
        let Some(session) = self.session(key) else {
            return Ok(None);
        };

        let normalized = {
            let dictionary = self.prefs.dictionary().await;
            self.normalizer.normalize(text, &dictionary)
        };
        let Some(normalized) = normalized else {
            debug!("Nothing to read in message from {}", author);
            return Ok(None);
        };

        let speaker = self.resolve_speaker(author).await;
        session.speak(&normalized, speaker).await.map(Some)
    }

    /// Speak already-normalized text with an explicit speaker
    pub async fn speak(&self, key: u64, text: &str, speaker: SpeakerId) -> Result<Option<SubmitReport>> {
        match self.session(key) {
            Some(session) => session.speak(text, speaker).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn add_word(&self, word: &str, reading: &str) -> Result<()> {
        Ok(self.prefs.add_word(word, reading).await?)
    }

    pub async fn set_voice(&self, user_id: u64, speaker: SpeakerId) -> Result<()> {
        Ok(self.prefs.set_voice(user_id, speaker.0).await?)
    }

    /// Close every session
    pub async fn shutdown(&self) {
        let keys: Vec<u64> = self.sessions.iter().map(|e| *e.key()).collect();
        for key in keys {
            self.disconnect(key).await;
        }
    }
}
