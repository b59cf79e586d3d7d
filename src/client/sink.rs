//! Outbound sinks
//!
//! A `MessageSink` is the write capability the broker holds for one
//! connection. The registry stores one per subscriber, the dispatcher
//! writes acknowledgments and fan-out messages through it.

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::protocol::Reply;
use crate::utils::SinkError;

#[async_trait]
pub trait MessageSink: Send + Sync + fmt::Debug {
    /// Write one frame. Returns once the frame has been handed to the
    /// transport, or fails if the connection is gone.
    async fn send(&self, reply: &Reply) -> Result<(), SinkError>;

    /// Ask the owning connection to shut down. Called after a failed
    /// fan-out write evicted this sink's subscriber.
    fn close(&self) {}
}

/// In-memory sink backed by an unbounded channel.
///
/// Sending fails with [`SinkError::Closed`] once the receiver is dropped,
/// which is how tests simulate a dead subscriber.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: UnboundedSender<Reply>,
}

impl ChannelSink {
    pub fn new() -> (Self, UnboundedReceiver<Reply>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl MessageSink for ChannelSink {
    async fn send(&self, reply: &Reply) -> Result<(), SinkError> {
        self.sender
            .send(reply.clone())
            .map_err(|_| SinkError::Closed)
    }
}
