//! The `client` module defines how the broker talks back to a connected
//! client: the `MessageSink` trait and an in-memory `ChannelSink`.
//!
//! The TCP implementation lives next to the driver in `transport::tcp`.

pub mod sink;
pub use sink::{ChannelSink, MessageSink};
