//! In-process topic-keyed publish/subscribe (§4.1).
//!
//! Delivery is synchronous in the publisher's thread: `publish` takes a
//! short-held lock just long enough to snapshot the handler list for a
//! topic, then invokes every handler against the copy with no lock held.
//! A handler that panics is caught and logged; it does not stop the
//! remaining handlers from running, matching the teacher's pattern of
//! isolating one subscriber's failure from the rest (`stream.rs`'s
//! per-device error callbacks never take down the other stream).

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use log::{error, warn};
use uuid::Uuid;

/// Handle returned by [`EventBus::subscribe`]; used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

struct Subscription<M> {
    id: SubscriptionId,
    handler: Arc<dyn Fn(&M) + Send + Sync>,
}

/// A topic-keyed registry of handlers for one message type.
///
/// One `EventBus<AudioFrame>` instance backs `audio.frame`; one
/// `EventBus<TranscriptionResult>` instance backs every `transcription.<name>`
/// topic (each consumer's result topic is just a different string key on
/// the same bus instance). This is the "generic bus per message type"
/// option from §9's design note.
pub struct EventBus<M> {
    topics: Mutex<HashMap<String, Vec<Subscription<M>>>>,
}

impl<M> Default for EventBus<M> {
    fn default() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
        }
    }
}

impl<M> EventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` on `topic`. Not idempotent-by-equality (closures
    /// aren't comparable) but each call returns a distinct id, so the same
    /// `(topic, logical subscriber)` pair registered twice yields two
    /// independent subscriptions — callers that care hold onto the id.
    pub fn subscribe<F>(&self, topic: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: Fn(&M) + Send + Sync + 'static,
    {
        let id = SubscriptionId(Uuid::new_v4());
        let sub = Subscription {
            id,
            handler: Arc::new(handler),
        };
        let mut topics = self.topics.lock().unwrap();
        topics.entry(topic.into()).or_default().push(sub);
        id
    }

    /// Remove a subscription. Missing is a no-op with a warning (§4.1).
    pub fn unsubscribe(&self, topic: &str, id: SubscriptionId) {
        let mut topics = self.topics.lock().unwrap();
        let Some(subs) = topics.get_mut(topic) else {
            warn!("unsubscribe: unknown topic '{}'", topic);
            return;
        };
        let before = subs.len();
        subs.retain(|s| s.id != id);
        if subs.len() == before {
            warn!("unsubscribe: subscription not found on topic '{}'", topic);
        }
    }

    /// Invoke every current subscriber on `topic` with `msg`, in the
    /// publisher's thread. Subscribers are snapshotted (cloned `Arc`s)
    /// before invocation so the registry lock is never held while a
    /// handler runs — a slow or reentrant handler can subscribe/unsubscribe
    /// without deadlocking.
    pub fn publish(&self, topic: &str, msg: &M) {
        let handlers: Vec<Arc<dyn Fn(&M) + Send + Sync>> = {
            let topics = self.topics.lock().unwrap();
            match topics.get(topic) {
                Some(subs) => subs.iter().map(|s| s.handler.clone()).collect(),
                None => return,
            }
        };

        for handler in handlers {
            let result = panic::catch_unwind(AssertUnwindSafe(|| handler(msg)));
            if let Err(payload) = result {
                let detail = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "<non-string panic payload>".to_string());
                error!("subscriber on topic '{}' panicked: {}", topic, detail);
            }
        }
    }

    /// Number of live subscriptions on `topic`, for tests/diagnostics.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .lock()
            .unwrap()
            .get(topic)
            .map(|v| v.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn publish_invokes_all_subscribers_in_order() {
        let bus: EventBus<u32> = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o1 = order.clone();
        bus.subscribe("t", move |m: &u32| o1.lock().unwrap().push(("a", *m)));
        let o2 = order.clone();
        bus.subscribe("t", move |m: &u32| o2.lock().unwrap().push(("b", *m)));

        bus.publish("t", &1);
        bus.publish("t", &2);

        assert_eq!(
            *order.lock().unwrap(),
            vec![("a", 1), ("b", 1), ("a", 2), ("b", 2)]
        );
    }

    #[test]
    fn unsubscribe_removes_handler() {
        let bus: EventBus<u32> = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let id = bus.subscribe("t", move |_: &u32| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish("t", &1);
        bus.unsubscribe("t", id);
        bus.publish("t", &2);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_missing_is_a_noop() {
        let bus: EventBus<u32> = EventBus::new();
        let id = bus.subscribe("t", |_: &u32| {});
        bus.unsubscribe("other-topic", id);
        bus.unsubscribe("t", SubscriptionId(Uuid::new_v4()));
        // Original subscription is untouched.
        bus.publish("t", &1);
    }

    #[test]
    fn panicking_handler_does_not_block_others() {
        let bus: EventBus<u32> = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        bus.subscribe("t", |_: &u32| panic!("boom"));
        let c = count.clone();
        bus.subscribe("t", move |_: &u32| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish("t", &1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn publish_to_unknown_topic_is_a_noop() {
        let bus: EventBus<u32> = EventBus::new();
        bus.publish("nothing-subscribed", &1);
        assert_eq!(bus.subscriber_count("nothing-subscribed"), 0);
    }
}
