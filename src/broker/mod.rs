//! In-process topic broker.
//!
//! `Broker::publish` delivers synchronously, in registration order, to every
//! subscriber of the exact topic, then mirrors the event to the outbound
//! sink within the same call. Subscribers may publish from inside `notify`;
//! such cascades nest on the caller's stack. The subscriber list is
//! snapshotted before dispatch, so subscribing during a cascade is allowed
//! and only affects later publishes.

/// Remote mirror of published events.
pub mod outbound;
/// Subscriber trait and closure adapter.
pub mod subscriber;
/// Topic names.
pub mod topic;

pub use outbound::{BroadcastOutbound, Envelope, NullOutbound, Outbound};
pub use subscriber::{FnSubscriber, Subscriber};
pub use topic::{topics, Topic};

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::ExecutionError;
use crate::event::Event;

/// Topic registry and fan-out dispatcher.
pub struct Broker {
    topics: RwLock<HashMap<Topic, Vec<Arc<dyn Subscriber>>>>,
    outbound: Arc<dyn Outbound>,
    published: AtomicU64,
    failed_deliveries: AtomicU64,
}

impl Broker {
    /// Creates a broker mirroring every publish to `outbound`.
    #[must_use]
    pub fn new(outbound: Arc<dyn Outbound>) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            outbound,
            published: AtomicU64::new(0),
            failed_deliveries: AtomicU64::new(0),
        }
    }

    /// Creates a broker without remote listeners.
    #[must_use]
    pub fn detached() -> Self {
        Self::new(Arc::new(NullOutbound))
    }

    /// Registers `subscriber` on `topic`. Registering twice delivers twice.
    pub fn subscribe(&self, topic: Topic, subscriber: Arc<dyn Subscriber>) {
        tracing::debug!(topic = %topic, subscriber = subscriber.name(), "subscribed");
        self.topics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(topic)
            .or_default()
            .push(subscriber);
    }

    /// Registers a closure receiving only the payload.
    pub fn subscribe_fn<F>(&self, topic: Topic, name: &str, f: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.subscribe(topic, Arc::new(FnSubscriber::new(name, f)));
    }

    /// Publishes `event` on `topic`.
    ///
    /// Never fails: a subscriber that errors or panics is logged and skipped,
    /// and the remaining subscribers and the outbound mirror still run.
    pub fn publish(&self, topic: &Topic, event: impl Into<Event>) {
        let event = Arc::new(event.into());
        let subscribers: Vec<Arc<dyn Subscriber>> = self
            .topics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .cloned()
            .unwrap_or_default();

        self.published.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            topic = %topic,
            shape = event.shape(),
            subscribers = subscribers.len(),
            "publish"
        );

        for subscriber in &subscribers {
            self.deliver(topic, subscriber.as_ref(), &event);
        }

        self.outbound.broadcast(Envelope::new(topic.clone(), event));
    }

    fn deliver(&self, topic: &Topic, subscriber: &dyn Subscriber, event: &Event) {
        match panic::catch_unwind(AssertUnwindSafe(|| subscriber.notify(topic, event))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                self.failed_deliveries.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(topic = %topic, subscriber = subscriber.name(), error = %err, "subscriber failed");
            }
            Err(_) => {
                self.failed_deliveries.fetch_add(1, Ordering::Relaxed);
                let err = ExecutionError::SubscriberPanicked { topic: topic.clone() };
                tracing::error!(subscriber = subscriber.name(), error = %err, "delivery aborted");
            }
        }
    }

    /// Number of registrations on `topic` (duplicates included).
    #[must_use]
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.topics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .map_or(0, Vec::len)
    }

    /// Total registrations across all topics.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.topics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }

    /// Number of publish calls so far.
    #[must_use]
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Number of deliveries that errored or panicked.
    #[must_use]
    pub fn failed_deliveries(&self) -> u64 {
        self.failed_deliveries.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broker")
            .field("subscriptions", &self.subscription_count())
            .field("published", &self.published_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::PulseResult;
    use crate::event::{Insight, StockLevels};

    fn insight(text: &str) -> Event {
        Event::Insight(Insight {
            insight: text.to_string(),
        })
    }

    struct Failing;

    impl Subscriber for Failing {
        fn notify(&self, topic: &Topic, _event: &Event) -> PulseResult<()> {
            Err(ExecutionError::SubscriberFailed {
                topic: topic.clone(),
                reason: "refused".to_string(),
            }
            .into())
        }
    }

    struct Panicking;

    impl Subscriber for Panicking {
        fn notify(&self, _topic: &Topic, _event: &Event) -> PulseResult<()> {
            panic!("subscriber bug");
        }
    }

    #[test]
    fn delivers_in_registration_order_exactly_once() {
        let broker = Broker::detached();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for label in ["a", "b", "c"] {
            let seen = Arc::clone(&seen);
            broker.subscribe_fn(topics::AI_INSIGHTS, label, move |_| seen.lock().unwrap().push(label));
        }

        broker.publish(&topics::AI_INSIGHTS, insight("x"));
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn duplicate_registration_delivers_twice() {
        let broker = Broker::detached();
        let hits = Arc::new(AtomicU64::new(0));
        let sub: Arc<dyn Subscriber> = {
            let hits = Arc::clone(&hits);
            Arc::new(FnSubscriber::new("dup", move |_| {
                hits.fetch_add(1, Ordering::Relaxed);
            }))
        };
        broker.subscribe(topics::ANOMALY, Arc::clone(&sub));
        broker.subscribe(topics::ANOMALY, sub);

        broker.publish(&topics::ANOMALY, insight("x"));
        assert_eq!(hits.load(Ordering::Relaxed), 2);
        assert_eq!(broker.subscriber_count(&topics::ANOMALY), 2);
    }

    #[test]
    fn other_topics_are_not_delivered() {
        let broker = Broker::detached();
        let hits = Arc::new(AtomicU64::new(0));
        let h = Arc::clone(&hits);
        broker.subscribe_fn(topics::ANOMALY, "anomaly-only", move |_| {
            h.fetch_add(1, Ordering::Relaxed);
        });

        broker.publish(&Topic::new("anomaly_extra"), insight("x"));
        broker.publish(&topics::UPDATE, insight("x"));
        assert_eq!(hits.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn failing_and_panicking_subscribers_are_isolated() {
        let broker = Broker::detached();
        let hits = Arc::new(AtomicU64::new(0));
        broker.subscribe(topics::ANOMALY, Arc::new(Failing));
        broker.subscribe(topics::ANOMALY, Arc::new(Panicking));
        let h = Arc::clone(&hits);
        broker.subscribe_fn(topics::ANOMALY, "after", move |_| {
            h.fetch_add(1, Ordering::Relaxed);
        });

        broker.publish(&topics::ANOMALY, insight("x"));
        assert_eq!(hits.load(Ordering::Relaxed), 1);
        assert_eq!(broker.failed_deliveries(), 2);
    }

    #[test]
    fn zero_subscriber_publish_still_reaches_outbound() {
        let outbound = BroadcastOutbound::new(8);
        let mut rx = outbound.subscribe();
        let broker = Broker::new(Arc::new(outbound));

        broker.publish(&Topic::new("nobody_listens"), insight("x"));

        let envelope = rx.try_recv().unwrap();
        assert_eq!(envelope.topic.as_str(), "nobody_listens");
        assert_eq!(*envelope.payload, insight("x"));
        assert_eq!(broker.published_count(), 1);
    }

    #[test]
    fn nested_publish_cascades_within_one_call() {
        let broker = Arc::new(Broker::detached());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let inner = Arc::downgrade(&broker);
        broker.subscribe_fn(topics::RAW_DATA, "relay", move |_| {
            if let Some(b) = inner.upgrade() {
                b.publish(
                    &topics::STOCK_LEVELS_UPDATE,
                    StockLevels {
                        warehouse_1: 1,
                        warehouse_2: 0,
                        warehouse_3: 0,
                        total_stock: 1,
                    },
                );
            }
        });
        let s = Arc::clone(&seen);
        broker.subscribe_fn(topics::STOCK_LEVELS_UPDATE, "sink", move |e| {
            s.lock().unwrap().push(e.shape());
        });

        broker.publish(&topics::RAW_DATA, insight("root"));
        assert_eq!(*seen.lock().unwrap(), vec!["stock_levels"]);
        assert_eq!(broker.published_count(), 2);
    }
}
