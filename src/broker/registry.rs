//! Topic registry
//!
//! Two maps, kept mutually consistent under one lock:
//! - topic name -> subscriber ids (`Topic`)
//! - subscriber id -> outbound sink
//!
//! Every id listed under a topic has a sink entry, and a topic is dropped
//! as soon as its last subscriber leaves. The lock is a plain
//! `std::sync::Mutex` and is never held across an `.await`: fan-out works
//! from a snapshot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::broker::topic::{SubscriberId, Topic};
use crate::client::MessageSink;

#[derive(Debug, Default)]
struct RegistryState {
    topics: HashMap<String, Topic>,
    sinks: HashMap<SubscriberId, Arc<dyn MessageSink>>,
}

impl RegistryState {
    fn remove_subscriber(&mut self, id: &str) -> bool {
        let mut removed = self.sinks.remove(id).is_some();

        self.topics.retain(|name, topic| {
            if topic.unsubscribe(id) {
                debug!(subscriber = %id, topic = %name, "unsubscribed");
                removed = true;
            }
            !topic.is_empty()
        });

        removed
    }
}

/// Topic registry shared by every connection of one broker.
///
/// All methods take `&self` and lock internally, so they are atomic with
/// respect to each other.
#[derive(Debug, Default)]
pub struct Registry {
    state: Mutex<RegistryState>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        // maps are never left half-updated; recover from poisoning
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add `id` to `topic`, creating the topic if needed, and record `sink`
    /// as the subscriber's outbound sink (replacing any previous one).
    ///
    /// Returns `true` if this is a new subscription.
    pub fn subscribe(&self, id: SubscriberId, sink: Arc<dyn MessageSink>, topic: &str) -> bool {
        let mut state = self.state();

        let added = state
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| Topic::new(topic))
            .subscribe(id.clone());
        state.sinks.insert(id, sink);

        added
    }

    /// Copy of the current subscribers of `topic` with their sinks.
    ///
    /// Empty when the topic is unknown. The copy may be stale by the time
    /// the caller writes to it; failed writes are handled by [`Registry::evict`].
    pub fn snapshot_subscribers(&self, topic: &str) -> Vec<(SubscriberId, Arc<dyn MessageSink>)> {
        let state = self.state();

        let Some(topic) = state.topics.get(topic) else {
            return Vec::new();
        };

        topic
            .subscribers
            .iter()
            .filter_map(|id| {
                state
                    .sinks
                    .get(id)
                    .map(|sink| (id.clone(), Arc::clone(sink)))
            })
            .collect()
    }

    /// Remove `id` from every topic and drop its sink. Idempotent.
    ///
    /// Returns `true` if anything was removed.
    pub fn purge(&self, id: &str) -> bool {
        self.state().remove_subscriber(id)
    }

    /// Purge `id` only if `sink` is still the sink registered for it.
    ///
    /// Used after a failed fan-out write: by then the subscriber may have
    /// disconnected and its identity been reused by a new connection, which
    /// must not be torn down by a stale snapshot.
    pub fn evict(&self, id: &str, sink: &Arc<dyn MessageSink>) -> bool {
        let mut state = self.state();

        let registered = state
            .sinks
            .get(id)
            .is_some_and(|current| Arc::ptr_eq(current, sink));

        registered && state.remove_subscriber(id)
    }

    /// Number of topics with at least one subscriber.
    pub fn topic_count(&self) -> usize {
        self.state().topics.len()
    }

    /// Number of subscribers that hold a sink, i.e. have subscribed to
    /// something and not been purged.
    pub fn subscriber_count(&self) -> usize {
        self.state().sinks.len()
    }

    /// Whether `id` is currently listed under `topic`.
    pub fn is_subscribed(&self, topic: &str, id: &str) -> bool {
        self.state()
            .topics
            .get(topic)
            .is_some_and(|t| t.subscribers.contains(id))
    }

    /// Topics `id` is currently subscribed to, sorted by name.
    pub fn topics_of(&self, id: &str) -> Vec<String> {
        let state = self.state();
        let mut topics: Vec<String> = state
            .topics
            .values()
            .filter(|t| t.subscribers.contains(id))
            .map(|t| t.name.clone())
            .collect();
        topics.sort();
        topics
    }

    /// Panics if the two maps disagree or an empty topic was left behind.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let state = self.state();
        for (name, topic) in &state.topics {
            assert!(!topic.is_empty(), "empty topic {name} left in registry");
            for id in &topic.subscribers {
                assert!(
                    state.sinks.contains_key(id),
                    "subscriber {id} of {name} has no sink"
                );
            }
        }
    }
}
