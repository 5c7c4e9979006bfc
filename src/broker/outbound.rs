use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::event::Event;

use super::topic::Topic;

/// One published event as mirrored to remote listeners.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    /// Unique id of this publish.
    pub id: Uuid,
    /// Topic the event was published on.
    pub topic: Topic,
    /// Publish time.
    pub timestamp: DateTime<Utc>,
    /// The event itself, shared with local subscribers.
    pub payload: Arc<Event>,
}

impl Envelope {
    /// Stamps `payload` with a fresh id and the current time.
    #[must_use]
    pub fn new(topic: Topic, payload: Arc<Event>) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic,
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Sink that forwards every published event to remote listeners.
pub trait Outbound: Send + Sync {
    /// Forwards one envelope. Must not block and must not fail the publish.
    fn broadcast(&self, envelope: Envelope);
}

/// Outbound sink backed by a `tokio::sync::broadcast` channel.
///
/// Every connected listener holds a receiver. Listeners that fall behind by
/// more than the channel capacity skip the oldest envelopes.
#[derive(Debug, Clone)]
pub struct BroadcastOutbound {
    tx: broadcast::Sender<Envelope>,
}

impl BroadcastOutbound {
    /// Creates a channel buffering up to `capacity` envelopes per listener.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Attaches a new remote listener.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }

    /// Number of attached listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Outbound for BroadcastOutbound {
    fn broadcast(&self, envelope: Envelope) {
        // No listeners is the normal idle state.
        if self.tx.send(envelope).is_err() {
            tracing::trace!("no remote listeners attached");
        }
    }
}

/// Outbound sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOutbound;

impl Outbound for NullOutbound {
    fn broadcast(&self, _envelope: Envelope) {}
}
