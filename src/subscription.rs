//! Topic subscription registry.
//!
//! Maps logical topics (e.g. `rooms/{id}`) to delivery callbacks. The
//! registry is owned by a [`Connection`](crate::connection::Connection) and
//! survives reconnects: entries represent *interest*, not wire state, so the
//! connection re-issues subscribe frames for every live topic after each
//! successful handshake.
//!
//! Multiple independent callers may subscribe to the same topic; each gets
//! its own [`SubscriptionHandle`] and callback. The registry does not
//! deduplicate at the transport level — a small bandwidth cost traded for
//! fully independent callback lifecycles per UI surface.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

/// Callback invoked with the raw JSON payload of each message published on
/// a subscribed topic. Payload decoding beyond the frame envelope is the
/// subscriber's job (and must be defensive — see the room modules).
pub type TopicCallback = Arc<dyn Fn(&serde_json::Value) + Send + Sync>;

/// Opaque token identifying one subscription for later cancellation.
///
/// Returned immediately by `subscribe` even though the underlying wire
/// subscription may not exist yet (the connection may still be
/// establishing). This keeps cleanup bookkeeping trivial for callers that
/// unmount before the connection is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

struct Entry {
    topic: String,
    callback: TopicCallback,
}

/// Registry of live subscriptions, keyed by handle.
pub(crate) struct Registry {
    next_id: AtomicU64,
    entries: StdMutex<HashMap<u64, Entry>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: StdMutex::new(HashMap::new()),
        }
    }

    /// Register a callback for a topic and return its handle.
    pub(crate) fn insert(
        &self,
        topic: impl Into<String>,
        callback: TopicCallback,
    ) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let entry = Entry {
            topic: topic.into(),
            callback,
        };
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(id, entry);
        }
        SubscriptionHandle(id)
    }

    /// Remove a handle. Returns the topic and whether other handles still
    /// reference it (the connection only unsubscribes on the wire once the
    /// last handle for a topic is gone).
    pub(crate) fn remove(&self, handle: SubscriptionHandle) -> Option<(String, bool)> {
        let mut entries = self.entries.lock().ok()?;
        let removed = entries.remove(&handle.0)?;
        let topic_still_live = entries.values().any(|e| e.topic == removed.topic);
        Some((removed.topic, topic_still_live))
    }

    /// Whether the handle still refers to a live entry. Subscription retry
    /// loops use this as their liveness check.
    pub(crate) fn contains(&self, handle: SubscriptionHandle) -> bool {
        self.entries
            .lock()
            .map(|entries| entries.contains_key(&handle.0))
            .unwrap_or(false)
    }

    /// The deduplicated set of live topics, for re-subscription after a
    /// reconnect handshake.
    pub(crate) fn topics(&self) -> Vec<String> {
        let Ok(entries) = self.entries.lock() else {
            return Vec::new();
        };
        let mut topics: Vec<String> = entries.values().map(|e| e.topic.clone()).collect();
        topics.sort_unstable();
        topics.dedup();
        topics
    }

    /// Deliver a payload to every callback subscribed to `topic`.
    ///
    /// Callbacks are collected under the lock and invoked after releasing
    /// it, so a callback may itself subscribe or unsubscribe.
    pub(crate) fn dispatch(&self, topic: &str, payload: &serde_json::Value) {
        let callbacks: Vec<TopicCallback> = match self.entries.lock() {
            Ok(entries) => entries
                .values()
                .filter(|e| e.topic == topic)
                .map(|e| Arc::clone(&e.callback))
                .collect(),
            Err(_) => return,
        };
        for callback in callbacks {
            callback(payload);
        }
    }

    /// Number of live entries, across all topics.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_callback() -> (TopicCallback, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_cb = Arc::clone(&count);
        let callback: TopicCallback = Arc::new(move |_payload| {
            count_cb.fetch_add(1, Ordering::Relaxed);
        });
        (callback, count)
    }

    #[test]
    fn dispatch_reaches_only_matching_topic() {
        let registry = Registry::new();
        let (cb_a, count_a) = counting_callback();
        let (cb_b, count_b) = counting_callback();
        registry.insert("rooms/a", cb_a);
        registry.insert("rooms/b", cb_b);

        registry.dispatch("rooms/a", &serde_json::json!({}));

        assert_eq!(count_a.load(Ordering::Relaxed), 1);
        assert_eq!(count_b.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn same_topic_fans_out_to_every_handle() {
        let registry = Registry::new();
        let (cb_1, count_1) = counting_callback();
        let (cb_2, count_2) = counting_callback();
        registry.insert("rooms/a", cb_1);
        registry.insert("rooms/a", cb_2);

        registry.dispatch("rooms/a", &serde_json::json!({"event": "UNKNOWN"}));

        assert_eq!(count_1.load(Ordering::Relaxed), 1);
        assert_eq!(count_2.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn remove_reports_remaining_interest() {
        let registry = Registry::new();
        let (cb_1, _) = counting_callback();
        let (cb_2, _) = counting_callback();
        let h1 = registry.insert("rooms/a", cb_1);
        let h2 = registry.insert("rooms/a", cb_2);

        let (topic, still_live) = registry.remove(h1).unwrap();
        assert_eq!(topic, "rooms/a");
        assert!(still_live);

        let (_, still_live) = registry.remove(h2).unwrap();
        assert!(!still_live);
    }

    #[test]
    fn remove_unknown_handle_is_none() {
        let registry = Registry::new();
        let (cb, _) = counting_callback();
        let handle = registry.insert("rooms/a", cb);
        assert!(registry.remove(handle).is_some());
        assert!(registry.remove(handle).is_none());
    }

    #[test]
    fn topics_are_deduplicated() {
        let registry = Registry::new();
        let (cb_1, _) = counting_callback();
        let (cb_2, _) = counting_callback();
        let (cb_3, _) = counting_callback();
        registry.insert("rooms/a", cb_1);
        registry.insert("rooms/a", cb_2);
        registry.insert("users/u", cb_3);

        assert_eq!(registry.topics(), vec!["rooms/a", "users/u"]);
    }

    #[test]
    fn callback_may_unsubscribe_during_dispatch() {
        let registry = Arc::new(Registry::new());
        let handle_slot: Arc<StdMutex<Option<SubscriptionHandle>>> =
            Arc::new(StdMutex::new(None));

        let registry_cb = Arc::clone(&registry);
        let slot_cb = Arc::clone(&handle_slot);
        let callback: TopicCallback = Arc::new(move |_payload| {
            if let Some(handle) = slot_cb.lock().unwrap().take() {
                registry_cb.remove(handle);
            }
        });
        let handle = registry.insert("rooms/a", callback);
        *handle_slot.lock().unwrap() = Some(handle);

        // Must not deadlock on the entries mutex.
        registry.dispatch("rooms/a", &serde_json::json!({}));
        assert_eq!(registry.len(), 0);
    }
}
