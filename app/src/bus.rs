//! Bus plumbing: thin wrappers over `tokio::sync::broadcast` so actors
//! never touch the channel types directly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;

use fairway::{FairwayEvent, FairwayMessage};

/// Slots in the broadcast ring. A 1 Hz GPS source and a handful of
/// commands never come close; lagging receivers log and skip.
pub const BUS_CAPACITY: usize = 1024;

/// Create the single shared bus.
pub fn channel() -> broadcast::Sender<FairwayMessage> {
    broadcast::channel(BUS_CAPACITY).0
}

/// `BusReceiver::poll()` failed: the bus closed or the owning actor was
/// told to stop.
#[derive(Debug)]
pub enum PollError {
    Shutdown,
}

/// Per-actor sender. Stamps `source` with the actor id on every message.
#[derive(Clone)]
pub struct BusSender {
    actor_id: String,
    inner: broadcast::Sender<FairwayMessage>,
    shutdown: Arc<AtomicBool>,
}

impl BusSender {
    pub fn new(
        actor_id: String,
        inner: broadcast::Sender<FairwayMessage>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            actor_id,
            inner,
            shutdown,
        }
    }

    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    /// Underlying broadcast sender, for async consumers that want
    /// `recv().await` instead of polling.
    pub fn raw_sender(&self) -> &broadcast::Sender<FairwayMessage> {
        &self.inner
    }

    pub fn send(&self, mut msg: FairwayMessage) {
        msg.source.clone_from(&self.actor_id);
        // No subscribers is not an error; the drain task keeps one alive
        let _ = self.inner.send(msg);
    }

    /// Wrap and send an event with the current timestamp.
    pub fn emit(&self, event: impl Into<FairwayEvent>) {
        self.send(FairwayMessage::new(event));
    }

    /// Subscribe a receiver that shares this sender's shutdown flag.
    pub fn subscribe(&self) -> BusReceiver {
        BusReceiver {
            inner: self.inner.subscribe(),
            shutdown: Arc::clone(&self.shutdown),
        }
    }
}

/// Polling receiver for thread-based actors.
pub struct BusReceiver {
    inner: broadcast::Receiver<FairwayMessage>,
    shutdown: Arc<AtomicBool>,
}

impl BusReceiver {
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Next queued message without blocking. `Ok(None)` when the queue is
    /// empty.
    pub fn poll(&mut self) -> Result<Option<FairwayMessage>, PollError> {
        if self.is_shutdown() {
            return Err(PollError::Shutdown);
        }
        loop {
            match self.inner.try_recv() {
                Ok(msg) => return Ok(Some(msg)),
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => return Err(PollError::Shutdown),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!("bus: lagged, dropped {n} events");
                }
            }
        }
    }
}
