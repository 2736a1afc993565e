//! Bounded FIFO of synthesized audio waiting for playback

use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::warn;

use yomi_core::OverflowPolicy;

use crate::tts::AudioSegment;

/// Result of offering a segment to a full or non-full queue
#[derive(Debug, PartialEq, Eq)]
pub enum PushOutcome {
    /// Appended to the tail
    Queued,
    /// Appended after evicting the head
    EvictedOldest(AudioSegment),
    /// Not appended; the queue is full
    Rejected(AudioSegment),
}

/// Audio segments in admission order
pub struct PlaybackQueue {
    items: Mutex<VecDeque<AudioSegment>>,
    capacity: usize,
    overflow: OverflowPolicy,
}

impl PlaybackQueue {
    /// Create a queue holding at most `capacity` segments (0 = unbounded)
    pub fn new(capacity: usize, overflow: OverflowPolicy) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            capacity,
            overflow,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<AudioSegment>> {
        // Nothing panics while holding the lock, so a poisoned queue is still consistent.
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a segment, applying the overflow policy when full
    pub fn push(&self, segment: AudioSegment) -> PushOutcome {
        let mut items = self.lock();

        if self.capacity == 0 || items.len() < self.capacity {
            items.push_back(segment);
            return PushOutcome::Queued;
        }

        match self.overflow {
            OverflowPolicy::DropNewest => {
                warn!("Playback queue full ({}), dropping new segment", self.capacity);
                PushOutcome::Rejected(segment)
            }
            OverflowPolicy::DropOldest => {
                warn!("Playback queue full ({}), dropping oldest segment", self.capacity);
                let evicted = items.pop_front();
                items.push_back(segment);
                match evicted {
                    Some(old) => PushOutcome::EvictedOldest(old),
                    None => PushOutcome::Queued,
                }
            }
        }
    }

    /// Take the head
    pub fn pop(&self) -> Option<AudioSegment> {
        self.lock().pop_front()
    }

    /// Drop everything, returning how many segments were discarded
    pub fn clear(&self) -> usize {
        let mut items = self.lock();
        let n = items.len();
        items.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
