//! # Event Emitters
//!
//! Where `ScanEvent`s go. The controller calls `emit` after every state
//! change and never waits on the receiver.

use tokio::sync::broadcast;
use tracing::trace;

use scanstation_core::ScanEvent;

/// Capacity used by `BroadcastEmitter::default`.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Receives presentation events.
pub trait ScanEventEmitter: Send + Sync {
    fn emit(&self, event: &ScanEvent);
}

/// No-op event emitter for testing and headless use.
pub struct NoOpEmitter;

impl ScanEventEmitter for NoOpEmitter {
    fn emit(&self, _event: &ScanEvent) {}
}

/// Fans events out to any number of subscribers.
///
/// Slow subscribers lag and lose the oldest events; the controller is
/// never blocked.
#[derive(Clone)]
pub struct BroadcastEmitter {
    tx: broadcast::Sender<ScanEvent>,
}

impl BroadcastEmitter {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        BroadcastEmitter { tx }
    }

    /// Returns a receiver for events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl ScanEventEmitter for BroadcastEmitter {
    fn emit(&self, event: &ScanEvent) {
        // No subscribers is fine
        if self.tx.send(event.clone()).is_err() {
            trace!(kind = event.kind(), "Event dropped, no subscribers");
        }
    }
}
