//! Delayed auto-disconnect when a voice channel empties

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// One pending timer per connection key
pub struct IdleTimers {
    delay: Duration,
    pending: Arc<DashMap<u64, (u64, JoinHandle<()>)>>,
    next_token: AtomicU64,
}

impl IdleTimers {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(DashMap::new()),
            next_token: AtomicU64::new(0),
        }
    }

    /// Run `on_expire` after the delay unless cancelled first.
    ///
    /// If a timer for `key` is already pending it is left alone and `false`
    /// is returned, so repeated "channel is empty" events do not push the
    /// deadline back.
    pub fn arm<F, Fut>(&self, key: u64, on_expire: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let vacant = match self.pending.entry(key) {
            Entry::Occupied(_) => return false,
            Entry::Vacant(vacant) => vacant,
        };

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let delay = self.delay;
        let pending = self.pending.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Deregister first; a cancel racing with expiry then finds nothing to abort.
            if pending.remove_if(&key, |_, (t, _)| *t == token).is_some() {
                debug!("Idle timer for {} expired", key);
                on_expire().await;
            }
        });

        vacant.insert((token, handle));
        debug!("Idle timer for {} armed ({:?})", key, delay);
        true
    }

    /// Abort the pending timer for `key`, if any
    pub fn cancel(&self, key: u64) -> bool {
        match self.pending.remove(&key) {
            Some((_, (_, handle))) => {
                handle.abort();
                debug!("Idle timer for {} cancelled", key);
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self, key: u64) -> bool {
        self.pending.contains_key(&key)
    }
}

impl Drop for IdleTimers {
    fn drop(&mut self) {
        for entry in self.pending.iter() {
            entry.value().1.abort();
        }
    }
}
