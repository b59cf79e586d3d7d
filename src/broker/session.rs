//! Per-connection session state
//!
//! ```text
//! Connected --SUB--> Active --SUB/PUB/ERR--> Active
//!     |                 |
//!     +-----------------+--> Terminated
//! ```
//!
//! A session owns only its identity and its sink. Termination purges the
//! subscriber from the registry exactly once.

use std::sync::Arc;

use tracing::info;

use crate::broker::registry::Registry;
use crate::broker::topic::SubscriberId;
use crate::client::MessageSink;

/// Lifecycle of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, no topics yet.
    Connected,
    /// At least one `SUB` succeeded.
    Active,
    /// Purged from the registry. Final.
    Terminated,
}

/// One connection's identity, outbound sink and state.
///
/// Created by [`Broker::connect`](crate::broker::Broker::connect) and
/// consumed by [`Broker::disconnect`](crate::broker::Broker::disconnect).
#[derive(Debug)]
pub struct Session {
    id: SubscriberId,
    sink: Arc<dyn MessageSink>,
    state: SessionState,
}

impl Session {
    /// Start a session in the `Connected` state.
    pub fn new(id: SubscriberId, sink: Arc<dyn MessageSink>) -> Self {
        Self {
            id,
            sink,
            state: SessionState::Connected,
        }
    }

    /// The subscriber identity, usually the peer address.
    pub fn id(&self) -> &SubscriberId {
        &self.id
    }

    /// The sink replies and deliveries for this connection are written to.
    pub fn sink(&self) -> &Arc<dyn MessageSink> {
        &self.sink
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == SessionState::Terminated
    }

    pub(crate) fn mark_subscribed(&mut self) {
        if self.state == SessionState::Connected {
            self.state = SessionState::Active;
        }
    }

    /// Enter `Terminated` and purge the subscriber. Later calls do nothing.
    ///
    /// Returns `true` on the call that actually terminated the session.
    pub(crate) fn terminate(&mut self, registry: &Registry) -> bool {
        if self.is_terminated() {
            return false;
        }
        self.state = SessionState::Terminated;

        // a fan-out eviction may already have purged us
        let purged = registry.purge(&self.id);
        info!(subscriber = %self.id, purged, "session terminated");
        true
    }
}
