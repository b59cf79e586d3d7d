//! Topic management
//!
//! A `Topic` holds the subscriber ids for one topic name. Duplicate
//! subscriptions are a no-op. Callers synchronize access through the
//! registry lock.

use std::collections::HashSet;

/// Connection-scoped subscriber identity, usually the peer address.
pub type SubscriberId = String;

/// A named topic and the ids of its current subscribers.
///
/// A topic only lives in the registry while it has at least one subscriber.
#[derive(Debug, Default)]
pub struct Topic {
    pub name: String,
    pub subscribers: HashSet<SubscriberId>,
}

impl Topic {
    /// Create a new topic with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: HashSet::new(),
        }
    }

    /// Add a subscriber. Returns `false` if it was already subscribed.
    pub fn subscribe(&mut self, id: SubscriberId) -> bool {
        self.subscribers.insert(id)
    }

    /// Remove a subscriber. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&mut self, id: &str) -> bool {
        self.subscribers.remove(id)
    }

    /// Whether the topic has no subscribers left.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
