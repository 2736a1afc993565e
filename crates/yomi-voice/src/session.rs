//! One voice connection's synthesis pipeline

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use yomi_core::{Config, OverflowPolicy};

use crate::chunker::chunk_text;
use crate::error::{Result, VoiceError};
use crate::player::{AudioSink, PlayerDriver, PlayerState};
use crate::tts::{AudioSegment, SpeakerId, SpeechSynthesizer};

/// Per-session pipeline settings
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Maximum characters per synthesis call
    pub chunk_chars: usize,
    /// Maximum queued segments
    pub queue_capacity: usize,
    pub overflow: OverflowPolicy,
    /// Extra synthesis attempts per chunk
    pub retries: u32,
}

impl SessionOptions {
    pub fn new(chunk_chars: usize) -> Result<Self> {
        if chunk_chars == 0 {
            return Err(VoiceError::ConfigError(
                "chunk size must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            chunk_chars,
            queue_capacity: 0,
            overflow: OverflowPolicy::DropNewest,
            retries: 0,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let mut options = Self::new(config.playback.chunk_size)?;
        options.queue_capacity = config.playback.queue_capacity;
        options.overflow = config.playback.overflow;
        options.retries = config.tts.retries;
        Ok(options)
    }

    /// Clamp the chunk size to what the backend accepts
    pub fn for_backend(mut self, synthesizer: &dyn SpeechSynthesizer) -> Self {
        if let Some(limit) = synthesizer.max_chunk_chars() {
            self.chunk_chars = self.chunk_chars.min(limit.max(1));
        }
        self
    }
}

/// What happened to one submission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitReport {
    /// Chunks the text was split into
    pub chunks: usize,
    /// Chunks whose audio reached the queue
    pub queued: usize,
    /// Chunks whose synthesis failed
    pub failed: usize,
    /// Chunks synthesized but not queued (queue full or session closed)
    pub dropped: usize,
}

/// Queue, player and synthesis loop for one voice connection
pub struct VoiceSession {
    key: u64,
    player: PlayerDriver,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    options: SessionOptions,
    /// Held for a whole submission so messages are not interleaved
    turn: Mutex<()>,
}

impl VoiceSession {
    pub fn new(key: u64, synthesizer: Arc<dyn SpeechSynthesizer>, options: SessionOptions) -> Self {
        let options = options.for_backend(synthesizer.as_ref());
        Self {
            key,
            player: PlayerDriver::new(options.queue_capacity, options.overflow),
            synthesizer,
            options,
            turn: Mutex::new(()),
        }
    }

    /// Connection key (guild ID)
    pub fn key(&self) -> u64 {
        self.key
    }

    pub fn player(&self) -> &PlayerDriver {
        &self.player
    }

    /// Effective characters per chunk
    pub fn chunk_chars(&self) -> usize {
        self.options.chunk_chars
    }

    pub fn is_closed(&self) -> bool {
        self.player.state() == PlayerState::Closed
    }

    /// Subscribe the player to the connection's output; only the first call attaches
    pub fn attach(&self, sink: Arc<dyn AudioSink>) -> bool {
        self.player.attach(sink)
    }

    /// Chunk, synthesize and queue already-normalized text.
    ///
    /// Chunks are synthesized one after another and queued in order. A chunk
    /// whose synthesis fails is skipped; the rest still play.
    pub async fn speak(&self, text: &str, speaker: SpeakerId) -> Result<SubmitReport> {
        let chunks = chunk_text(text, self.options.chunk_chars)?;
        let mut report = SubmitReport {
            chunks: chunks.len(),
            ..SubmitReport::default()
        };
        if chunks.is_empty() {
            return Ok(report);
        }

        let _turn = self.turn.lock().await;

        for chunk in &chunks {
            if self.is_closed() {
                debug!("Session {} closed, abandoning remaining chunks", self.key);
                report.dropped += 1;
                continue;
            }

            match self.synthesize(chunk, speaker).await {
                Ok(segment) => {
                    if self.player.enqueue(segment) {
                        report.queued += 1;
                    } else {
                        report.dropped += 1;
                    }
                }
                Err(e) => {
                    warn!("音声生成エラー ({}): {}", self.synthesizer.name(), e);
                    report.failed += 1;
                }
            }
        }

        debug!("Session {}: {:?}", self.key, report);
        Ok(report)
    }

    async fn synthesize(&self, chunk: &str, speaker: SpeakerId) -> Result<AudioSegment> {
        let mut attempt = 0;
        loop {
            match self.synthesizer.synthesize(chunk, speaker).await {
                Ok(segment) => return Ok(segment),
                Err(e) if attempt < self.options.retries => {
                    attempt += 1;
                    debug!("Retrying synthesis ({}/{}): {}", attempt, self.options.retries, e);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Tear the session down; nothing more is played
    pub async fn close(&self) {
        self.player.reset().await;
        info!("Session {} closed", self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingSink, ScriptedSynthesizer, wait_until};

    fn session(synth: Arc<ScriptedSynthesizer>, chunk_chars: usize) -> VoiceSession {
        VoiceSession::new(1, synth, SessionOptions::new(chunk_chars).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunks_play_in_order() {
        let synth = ScriptedSynthesizer::new();
        let sink = RecordingSink::new();
        let session = session(synth.clone(), 20);
        session.attach(sink.clone());

        let text = format!("{}{}{}", "a".repeat(20), "b".repeat(20), "cccc");
        let report = session.speak(&text, SpeakerId(3)).await.unwrap();
        assert_eq!(report, SubmitReport { chunks: 3, queued: 3, failed: 0, dropped: 0 });

        wait_until(|| sink.finished() == 3).await;
        assert_eq!(sink.started(), vec!["a".repeat(20), "b".repeat(20), "cccc".to_string()]);
        assert_eq!(synth.texts(), sink.started());
        assert!(synth.calls().iter().all(|(_, speaker)| *speaker == SpeakerId(3)));
        assert_eq!(sink.max_concurrent(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_chunk_is_skipped() {
        let synth = ScriptedSynthesizer::failing_on(&["bbb"]);
        let sink = RecordingSink::new();
        let session = session(synth.clone(), 3);
        session.attach(sink.clone());

        let report = session.speak("aaabbbccc", SpeakerId(1)).await.unwrap();
        assert_eq!(report.queued, 2);
        assert_eq!(report.failed, 1);

        wait_until(|| sink.finished() == 2).await;
        assert_eq!(sink.started(), vec!["aaa", "ccc"]);
        assert_eq!(synth.texts(), vec!["aaa", "bbb", "ccc"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_before_dropping() {
        let synth = ScriptedSynthesizer::failing_on(&["xx"]);
        let mut options = SessionOptions::new(2).unwrap();
        options.retries = 2;
        let session = VoiceSession::new(1, synth.clone(), options);

        let report = session.speak("xxyy", SpeakerId(1)).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.queued, 1);
        assert_eq!(synth.texts(), vec!["xx", "xx", "xx", "yy"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_text_is_noop() {
        let synth = ScriptedSynthesizer::new();
        let session = session(synth.clone(), 20);
        let report = session.speak("", SpeakerId(3)).await.unwrap();
        assert_eq!(report, SubmitReport::default());
        assert!(synth.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_limit_clamps_chunks() {
        let synth = ScriptedSynthesizer::with_limit(4);
        let session = session(synth.clone(), 20);
        assert_eq!(session.chunk_chars(), 4);

        session.speak("abcdefghij", SpeakerId(3)).await.unwrap();
        assert_eq!(synth.texts(), vec!["abcd", "efgh", "ij"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_submissions_do_not_interleave() {
        let synth = ScriptedSynthesizer::new();
        let sink = RecordingSink::new();
        let session = Arc::new(session(synth.clone(), 4));
        session.attach(sink.clone());

        let first = {
            let session = session.clone();
            tokio::spawn(async move { session.speak("slow1slow2", SpeakerId(1)).await })
        };
        tokio::task::yield_now().await;
        let second = {
            let session = session.clone();
            tokio::spawn(async move { session.speak("fast", SpeakerId(2)).await })
        };

        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        wait_until(|| sink.finished() == 4).await;
        assert_eq!(sink.started(), vec!["slow", "1slo", "w2", "fast"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_discards_in_flight_audio() {
        let synth = ScriptedSynthesizer::new();
        let sink = RecordingSink::new();
        let session = Arc::new(session(synth.clone(), 4));
        session.attach(sink.clone());

        let speaking = {
            let session = session.clone();
            tokio::spawn(async move { session.speak("slowslowslow", SpeakerId(1)).await })
        };
        // Let the first chunk reach the sink, then disconnect mid-submission.
        wait_until(|| sink.started().len() == 1).await;
        session.close().await;

        let report = speaking.await.unwrap().unwrap();
        assert!(report.dropped >= 1);

        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        assert_eq!(sink.started(), vec!["slow"]);
        assert!(session.is_closed());
    }
}
