//! Broker engine
//!
//! This module contains the dispatch engine responsible for:
//! - executing `SUB` and `PUB` requests against the topic registry
//! - fanning published messages out to every current subscriber
//! - answering malformed requests with an `ERR` reply
//!
//! Concurrency and usage notes:
//! - `Broker` is cheap to clone; clones share one registry. Each connection
//!   task holds its own clone and its own `Session`.
//! - Fan-out runs on the publishing task. It takes a registry snapshot,
//!   releases the lock, then awaits each subscriber's sink in turn, so a
//!   slow subscriber slows down whoever publishes to it. There is no
//!   internal queue and no timeout.
//! - A failed fan-out write does not stop delivery to the others. Failed
//!   subscribers are evicted once the loop is done.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::broker::registry::Registry;
use crate::broker::session::Session;
use crate::broker::topic::SubscriberId;
use crate::client::MessageSink;
use crate::protocol::{Frame, MalformedReason, Reply};
use crate::utils::SinkError;

/// Outcome of one publish.
///
/// `delivered` counts successful writes. `evicted` lists the subscribers
/// whose sink failed during this publish, in the order they were tried.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub evicted: Vec<SubscriberId>,
}

/// The broker: a shared topic registry plus the dispatch logic run on it.
///
/// Brokers are explicit instances; several can live in one process without
/// seeing each other's topics.
#[derive(Debug, Clone, Default)]
pub struct Broker {
    registry: Arc<Registry>,
}

impl Broker {
    /// Create a broker with an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by every clone of this broker.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Start a session for a freshly accepted connection.
    pub fn connect(&self, id: SubscriberId, sink: Arc<dyn MessageSink>) -> Session {
        info!(subscriber = %id, "client connected");
        Session::new(id, sink)
    }

    /// Decode one inbound line and dispatch it.
    pub async fn on_line(&self, session: &mut Session, line: &str) -> Result<(), SinkError> {
        self.dispatch(session, Frame::decode(line)).await
    }

    /// Execute `frame` on behalf of `session`.
    ///
    /// An error means the session's own sink failed; the caller should
    /// terminate the connection. Failures of other subscribers' sinks are
    /// handled here and never returned.
    pub async fn dispatch(&self, session: &mut Session, frame: Frame) -> Result<(), SinkError> {
        if session.is_terminated() {
            return Err(SinkError::Closed);
        }

        match frame {
            Frame::Subscribe { topic } => self.handle_subscribe(session, &topic).await,
            Frame::Publish { topic, payload } => {
                debug!(subscriber = %session.id(), topic = %topic, "publish");
                self.handle_publish(&topic, &payload).await;
                Ok(())
            }
            Frame::Malformed { raw, reason } => self.handle_malformed(session, &raw, reason).await,
        }
    }

    /// Subscribe the session to `topic` and acknowledge with
    /// `SUBSCRIBED to <topic>`.
    ///
    /// Subscribing twice is harmless and is acknowledged again. The session
    /// becomes `Active`. An error means the acknowledgment could not be
    /// written.
    pub async fn handle_subscribe(&self, session: &mut Session, topic: &str) -> Result<(), SinkError> {
        let added = self
            .registry
            .subscribe(session.id().clone(), Arc::clone(session.sink()), topic);
        session.mark_subscribed();

        if added {
            info!(subscriber = %session.id(), topic, "subscribed");
        }

        session
            .sink()
            .send(&Reply::Subscribed {
                topic: topic.to_string(),
            })
            .await
    }

    /// Deliver `payload` to every current subscriber of `topic`.
    ///
    /// Publishing to a topic nobody listens to is a no-op.
    pub async fn handle_publish(&self, topic: &str, payload: &str) -> PublishReport {
        let subscribers = self.registry.snapshot_subscribers(topic);
        if subscribers.is_empty() {
            debug!(topic, "no subscribers");
            return PublishReport::default();
        }

        let reply = Reply::Message {
            topic: topic.to_string(),
            payload: payload.to_string(),
        };

        let mut report = PublishReport::default();
        let mut failed = Vec::new();

        for (id, sink) in subscribers {
            match sink.send(&reply).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(subscriber = %id, topic, error = %e, "delivery failed");
                    failed.push((id, sink));
                }
            }
        }

        for (id, sink) in failed {
            if self.registry.evict(&id, &sink) {
                info!(subscriber = %id, "evicted after failed delivery");
            }
            sink.close();
            report.evicted.push(id);
        }

        report
    }

    /// Answer a malformed request with `ERR <reason>`.
    ///
    /// The session stays open; only a failure to write the reply is returned.
    pub async fn handle_malformed(
        &self,
        session: &mut Session,
        raw: &str,
        reason: MalformedReason,
    ) -> Result<(), SinkError> {
        debug!(subscriber = %session.id(), raw, %reason, "malformed frame");
        session.sink().send(&Reply::error(reason)).await
    }

    /// End a session and purge it from the registry.
    ///
    /// Takes the session by value: a connection disconnects once.
    pub fn disconnect(&self, mut session: Session) {
        session.terminate(&self.registry);
    }

    /// Terminate a session the caller keeps hold of. Idempotent.
    pub fn terminate(&self, session: &mut Session) -> bool {
        session.terminate(&self.registry)
    }
}
