//! Songbird-backed audio output

use async_trait::async_trait;
use songbird::input::{AudioStream, Input, LiveInput};
use songbird::{Call, Event, EventContext, EventHandler as VoiceEventHandler, TrackEvent};
use std::io::Cursor;
use std::sync::Arc;
use symphonia::core::io::MediaSource;
use symphonia::core::probe::Hint;
use tokio::sync::{Mutex, oneshot};
use tracing::debug;

use yomi_voice::{AudioFormat, AudioSegment, AudioSink, VoiceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackOutcome {
    Ended,
    Failed,
}

/// Forwards the first end/error event of a track to the waiting player
#[derive(Clone)]
struct TrackNotifier {
    outcome: TrackOutcome,
    tx: Arc<std::sync::Mutex<Option<oneshot::Sender<TrackOutcome>>>>,
}

#[async_trait]
impl VoiceEventHandler for TrackNotifier {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        let tx = self.tx.lock().ok().and_then(|mut tx| tx.take());
        if let Some(tx) = tx {
            let _ = tx.send(self.outcome);
        }
        Some(Event::Cancel)
    }
}

/// End and error notifiers sharing one sender.
///
/// The sender lives only inside the notifiers, so once the driver drops them
/// all without firing, the receiver resolves with an error.
fn track_notifiers(tx: oneshot::Sender<TrackOutcome>) -> [(TrackEvent, TrackNotifier); 2] {
    let tx = Arc::new(std::sync::Mutex::new(Some(tx)));
    [
        (
            TrackEvent::End,
            TrackNotifier {
                outcome: TrackOutcome::Ended,
                tx: tx.clone(),
            },
        ),
        (
            TrackEvent::Error,
            TrackNotifier {
                outcome: TrackOutcome::Failed,
                tx,
            },
        ),
    ]
}

/// Plays segments on one guild's voice call
pub struct SongbirdSink {
    call: Arc<Mutex<Call>>,
}

impl SongbirdSink {
    pub fn new(call: Arc<Mutex<Call>>) -> Self {
        Self { call }
    }
}

/// In-memory audio with a container hint for the decoder
fn to_input(segment: AudioSegment) -> Input {
    let mut hint = Hint::new();
    hint.with_extension(extension(segment.format));

    let source: Box<dyn MediaSource> = Box::new(Cursor::new(segment.data));
    Input::Live(
        LiveInput::Raw(AudioStream {
            input: source,
            hint: Some(hint),
        }),
        None,
    )
}

fn extension(format: AudioFormat) -> &'static str {
    match format {
        AudioFormat::Wav => "wav",
        AudioFormat::Mp3 => "mp3",
    }
}

#[async_trait]
impl AudioSink for SongbirdSink {
    async fn play(&self, segment: AudioSegment) -> yomi_voice::Result<()> {
        let text = segment.text.clone();
        let (tx, rx) = oneshot::channel();

        let handle = {
            let mut call = self.call.lock().await;
            call.play_only_input(to_input(segment))
        };

        for (event, notifier) in track_notifiers(tx) {
            if handle.add_event(Event::Track(event), notifier).is_err() {
                // The track is already gone.
                debug!("Track finished before events were registered: {}", text);
                return Ok(());
            }
        }

        match rx.await {
            Ok(TrackOutcome::Ended) => Ok(()),
            Ok(TrackOutcome::Failed) => Err(VoiceError::PlaybackFailed(format!(
                "track error while playing \"{}\"",
                text
            ))),
            Err(_) => Err(VoiceError::PlaybackFailed(
                "voice call dropped the track".to_string(),
            )),
        }
    }

    async fn stop(&self) {
        self.call.lock().await.stop();
    }
}
