//! Test doubles for sinks and synthesizers

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{Result, VoiceError};
use crate::player::AudioSink;
use crate::tts::{AudioFormat, AudioSegment, SpeakerId, SpeechSynthesizer};

pub fn segment(text: &str) -> AudioSegment {
    AudioSegment::new(text.as_bytes().to_vec(), AudioFormat::Wav, text)
}

/// Poll `cond` until it holds, panicking after ten (virtual) seconds
pub async fn wait_until(cond: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(tokio::time::Instant::now() < deadline, "condition not reached");
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Start(String),
    End(String),
}

/// Sink that records what it plays and how many segments overlap
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    stopped: AtomicBool,
    fail_on: Option<String>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(None))
    }

    /// A sink reporting a playback error for segments with this text
    pub fn failing_on(text: &str) -> Arc<Self> {
        Arc::new(Self::build(Some(text.to_string())))
    }

    fn build(fail_on: Option<String>) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            stopped: AtomicBool::new(false),
            fail_on,
        }
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Start(text) => Some(text),
                SinkEvent::End(_) => None,
            })
            .collect()
    }

    pub fn finished(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, SinkEvent::End(_)))
            .count()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioSink for RecordingSink {
    async fn play(&self, segment: AudioSegment) -> Result<()> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Start(segment.text.clone()));

        tokio::time::sleep(Duration::from_millis(10)).await;

        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::End(segment.text.clone()));
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.fail_on.as_deref() == Some(segment.text.as_str()) {
            return Err(VoiceError::PlaybackFailed("decoder error".to_string()));
        }
        Ok(())
    }

    async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Synthesizer echoing the text back as audio.
///
/// Texts listed in `fail_on` fail; texts starting with `slow` take longer
/// than the rest so ordering does not depend on latency.
pub struct ScriptedSynthesizer {
    calls: Mutex<Vec<(String, SpeakerId)>>,
    fail_on: Vec<String>,
    limit: Option<usize>,
}

impl ScriptedSynthesizer {
    pub fn new() -> Arc<Self> {
        Self::with(&[], None)
    }

    pub fn failing_on(texts: &[&str]) -> Arc<Self> {
        Self::with(texts, None)
    }

    pub fn with_limit(limit: usize) -> Arc<Self> {
        Self::with(&[], Some(limit))
    }

    fn with(fail_on: &[&str], limit: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail_on: fail_on.iter().map(|s| s.to_string()).collect(),
            limit,
        })
    }

    pub fn calls(&self) -> Vec<(String, SpeakerId)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.calls().into_iter().map(|(text, _)| text).collect()
    }
}

#[async_trait]
impl SpeechSynthesizer for ScriptedSynthesizer {
    fn name(&self) -> &str {
        "scripted"
    }

    fn max_chunk_chars(&self) -> Option<usize> {
        self.limit
    }

    async fn synthesize(&self, text: &str, speaker: SpeakerId) -> Result<AudioSegment> {
        self.calls.lock().unwrap().push((text.to_string(), speaker));

        let delay = if text.starts_with("slow") { 50 } else { 2 };
        tokio::time::sleep(Duration::from_millis(delay)).await;

        if self.fail_on.iter().any(|f| f == text) {
            return Err(VoiceError::SynthesisFailed("backend returned 500".to_string()));
        }
        Ok(segment(text))
    }
}
