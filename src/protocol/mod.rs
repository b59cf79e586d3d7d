//! The `protocol` module defines the newline-delimited text protocol spoken
//! between nodes and the broker, and the codecs that frame it on a byte
//! stream.

pub mod codec;
pub mod frame;

pub use codec::{DEFAULT_MAX_LINE_LENGTH, FrameCodec, NodeCodec};
pub use frame::{Frame, MalformedReason, Reply, Request};
