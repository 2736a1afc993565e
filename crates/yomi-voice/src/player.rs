//! Player driver: drains the playback queue into one audio sink
//!
//! State machine:
//!
//! ```text
//!            enqueue / attach (sink set, queue non-empty)
//!   Idle ─────────────────────────────────────────────▶ Draining
//!    ▲                                                    │
//!    └──────── segment finished or failed, queue empty ───┘
//!
//!   any ── reset ──▶ Closed
//! ```
//!
//! While draining, exactly one segment is in the sink; the next is popped
//! only after the sink reports the current one finished or failed.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use yomi_core::OverflowPolicy;

use crate::error::Result;
use crate::queue::{PlaybackQueue, PushOutcome};
use crate::tts::AudioSegment;

/// Audio output for one voice connection
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Play one segment, resolving once the output reports it finished or failed
    async fn play(&self, segment: AudioSegment) -> Result<()>;

    /// Stop any current output
    async fn stop(&self) {}
}

/// Player state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// Nothing playing
    Idle,
    /// One segment handed to the sink
    Draining,
    /// Torn down; accepts nothing
    Closed,
}

struct Inner {
    state: PlayerState,
    sink: Option<Arc<dyn AudioSink>>,
    /// Bumped on reset so drains started earlier stop handing out segments
    generation: u64,
}

struct Shared {
    queue: PlaybackQueue,
    inner: Mutex<Inner>,
    /// Publishes the generation after each reset; wakes drains awaiting a sink
    resets: watch::Sender<u64>,
}

/// Drains queued audio into the attached sink one segment at a time
#[derive(Clone)]
pub struct PlayerDriver {
    shared: Arc<Shared>,
}

impl PlayerDriver {
    /// Create an idle driver with no sink attached
    pub fn new(capacity: usize, overflow: OverflowPolicy) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: PlaybackQueue::new(capacity, overflow),
                inner: Mutex::new(Inner {
                    state: PlayerState::Idle,
                    sink: None,
                    generation: 0,
                }),
                resets: watch::Sender::new(0),
            }),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.shared.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current state
    pub fn state(&self) -> PlayerState {
        self.inner().state
    }

    /// Segments waiting behind the one playing
    pub fn queued(&self) -> usize {
        self.shared.queue.len()
    }

    /// Whether a sink is attached
    pub fn is_attached(&self) -> bool {
        self.inner().sink.is_some()
    }

    /// Subscribe the driver to a sink.
    ///
    /// Returns `false` if a sink is already attached or the driver is closed;
    /// a driver is subscribed at most once.
    pub fn attach(&self, sink: Arc<dyn AudioSink>) -> bool {
        {
            let mut inner = self.inner();
            if inner.state == PlayerState::Closed || inner.sink.is_some() {
                return false;
            }
            inner.sink = Some(sink);
        }

        self.kick();
        true
    }

    /// Append a segment and start draining if idle.
    ///
    /// Returns `false` if the segment was not queued (driver closed or queue full).
    pub fn enqueue(&self, segment: AudioSegment) -> bool {
        let outcome = {
            // Held across the push so a concurrent reset either sees the
            // segment and clears it, or closes the driver before it lands.
            let inner = self.inner();
            if inner.state == PlayerState::Closed {
                debug!("Player closed, discarding segment");
                return false;
            }
            self.shared.queue.push(segment)
        };

        let queued = match outcome {
            PushOutcome::Queued => true,
            PushOutcome::EvictedOldest(old) => {
                debug!("Evicted queued segment: {}", old.text);
                true
            }
            PushOutcome::Rejected(_) => false,
        };

        self.kick();
        queued
    }

    /// Start a drain if idle, attached and there is something to play
    fn kick(&self) {
        let (generation, sink, resets) = {
            let mut inner = self.inner();
            if inner.state != PlayerState::Idle || self.shared.queue.is_empty() {
                return;
            }
            let Some(sink) = inner.sink.clone() else {
                return;
            };
            inner.state = PlayerState::Draining;
            (inner.generation, sink, self.shared.resets.subscribe())
        };

        let driver = self.clone();
        tokio::spawn(async move { driver.drain(generation, sink, resets).await });
    }

    async fn drain(
        self,
        generation: u64,
        sink: Arc<dyn AudioSink>,
        mut resets: watch::Receiver<u64>,
    ) {
        loop {
            let segment = {
                let mut inner = self.inner();
                if inner.generation != generation {
                    return;
                }
                match self.shared.queue.pop() {
                    Some(segment) => segment,
                    None => {
                        inner.state = PlayerState::Idle;
                        return;
                    }
                }
            };

            debug!("Playing segment ({} bytes): {}", segment.len(), segment.text);
            let result = tokio::select! {
                // A reset after the pop wins before the sink is ever polled.
                biased;
                _ = resets.changed() => {
                    debug!("Player reset, dropping in-flight segment");
                    return;
                }
                result = sink.play(segment) => result,
            };
            if let Err(e) = result {
                // Treated like a normal finish so the queue keeps moving.
                warn!("再生エラー: {}", e);
            }
        }
    }

    /// Tear down: clear the queue, detach and stop the sink, and invalidate
    /// any drain in progress. Nothing is handed to a sink afterwards.
    pub async fn reset(&self) {
        let sink = {
            let mut inner = self.inner();
            inner.generation += 1;
            inner.state = PlayerState::Closed;
            self.shared.resets.send_replace(inner.generation);
            inner.sink.take()
        };

        let dropped = self.shared.queue.clear();
        info!("Player reset, {} queued segments dropped", dropped);

        if let Some(sink) = sink {
            sink.stop().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingSink, SinkEvent, segment, wait_until};

    fn driver() -> PlayerDriver {
        PlayerDriver::new(0, OverflowPolicy::DropNewest)
    }

    #[tokio::test(start_paused = true)]
    async fn test_plays_in_order_without_overlap() {
        let sink = RecordingSink::new();
        let player = driver();
        assert!(player.attach(sink.clone()));

        for text in ["one", "two", "three"] {
            assert!(player.enqueue(segment(text)));
        }

        wait_until(|| sink.finished() == 3).await;
        assert_eq!(
            sink.events(),
            vec![
                SinkEvent::Start("one".into()),
                SinkEvent::End("one".into()),
                SinkEvent::Start("two".into()),
                SinkEvent::End("two".into()),
                SinkEvent::Start("three".into()),
                SinkEvent::End("three".into()),
            ]
        );
        assert_eq!(sink.max_concurrent(), 1);
        wait_until(|| player.state() == PlayerState::Idle).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_error_advances_queue() {
        let sink = RecordingSink::failing_on("bad");
        let player = driver();
        player.attach(sink.clone());

        player.enqueue(segment("ok1"));
        player.enqueue(segment("bad"));
        player.enqueue(segment("ok2"));

        wait_until(|| sink.finished() == 3).await;
        assert_eq!(sink.started(), vec!["ok1", "bad", "ok2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_sink() {
        let sink = RecordingSink::new();
        let player = driver();

        player.enqueue(segment("early"));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(player.state(), PlayerState::Idle);
        assert_eq!(player.queued(), 1);

        assert!(player.attach(sink.clone()));
        wait_until(|| sink.finished() == 1).await;
        assert_eq!(sink.started(), vec!["early"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_once() {
        let player = driver();
        assert!(player.attach(RecordingSink::new()));
        assert!(!player.attach(RecordingSink::new()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_enqueue_while_draining_appends() {
        let sink = RecordingSink::new();
        let player = driver();
        player.attach(sink.clone());

        player.enqueue(segment("first"));
        wait_until(|| sink.started().len() == 1).await;
        assert_eq!(player.state(), PlayerState::Draining);

        player.enqueue(segment("second"));
        wait_until(|| sink.finished() == 2).await;
        assert_eq!(sink.started(), vec!["first", "second"]);
        assert_eq!(sink.max_concurrent(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_stops_handing_out_segments() {
        let sink = RecordingSink::new();
        let player = driver();
        player.attach(sink.clone());

        player.enqueue(segment("playing"));
        player.enqueue(segment("queued1"));
        player.enqueue(segment("queued2"));
        wait_until(|| sink.started().len() == 1).await;

        player.reset().await;
        assert_eq!(player.state(), PlayerState::Closed);
        assert_eq!(player.queued(), 0);
        assert!(sink.stopped());

        assert!(!player.enqueue(segment("late")));
        assert!(!player.attach(RecordingSink::new()));

        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        assert_eq!(sink.started(), vec!["playing"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_abandons_in_flight_segment() {
        let sink = RecordingSink::new();
        let player = driver();
        player.attach(sink.clone());

        player.enqueue(segment("cut"));
        wait_until(|| sink.started().len() == 1).await;
        player.reset().await;

        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        assert_eq!(sink.started(), vec!["cut"]);
        assert_eq!(sink.finished(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_before_drain_runs() {
        let sink = RecordingSink::new();
        let player = driver();
        player.attach(sink.clone());

        // The drain task is spawned but has not been polled yet.
        assert!(player.enqueue(segment("never")));
        player.reset().await;

        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        assert!(sink.started().is_empty());
        assert_eq!(player.queued(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enqueue_from_other_task_after_reset() {
        let player = driver();
        player.reset().await;

        let other = player.clone();
        let queued = tokio::spawn(async move { other.enqueue(segment("late")) })
            .await
            .unwrap();
        assert!(!queued);
        assert_eq!(player.queued(), 0);
        assert_eq!(player.state(), PlayerState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_queue_rejects() {
        let player = PlayerDriver::new(1, OverflowPolicy::DropNewest);
        assert!(player.enqueue(segment("a")));
        assert!(!player.enqueue(segment("b")));
        assert_eq!(player.queued(), 1);
    }
}
