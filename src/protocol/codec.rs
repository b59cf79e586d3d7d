//! Line codecs
//!
//! [`FrameCodec`] is the broker side: it decodes request lines into
//! [`Frame`]s and encodes [`Reply`]s. [`NodeCodec`] is the mirror image
//! used by the node client. Both sit on top of `LinesCodec`, which buffers
//! partial lines across reads and strips a trailing `\r`.

use std::io;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};
use tracing::debug;

use crate::protocol::frame::{Frame, MalformedReason, Reply, Request};
use crate::utils::CodecError;

/// Longest line either codec buffers unless told otherwise.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

#[derive(Debug)]
pub struct FrameCodec {
    lines: LinesCodec,
}

impl FrameCodec {
    /// `max_line_length` bounds how much of a single line is buffered.
    pub fn new(max_line_length: usize) -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(max_line_length),
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LENGTH)
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, CodecError> {
        decode_frame(self.lines.decode(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, CodecError> {
        decode_frame(self.lines.decode_eof(src))
    }
}

/// Map a `LinesCodec` result onto a request frame.
///
/// Over-long and non-UTF-8 lines are answerable protocol errors, not
/// transport failures. `LinesCodec` has already consumed (or is discarding)
/// the offending line, so the stream stays usable.
fn decode_frame(
    line: Result<Option<String>, LinesCodecError>,
) -> Result<Option<Frame>, CodecError> {
    match line {
        Ok(line) => Ok(line.map(|line| Frame::decode(&line))),
        Err(LinesCodecError::MaxLineLengthExceeded) => {
            debug!("inbound line exceeded the maximum length");
            Ok(Some(Frame::Malformed {
                raw: String::new(),
                reason: MalformedReason::LineTooLong,
            }))
        }
        Err(LinesCodecError::Io(e)) if e.kind() == io::ErrorKind::InvalidData => {
            debug!("inbound line is not valid UTF-8");
            Ok(Some(Frame::Malformed {
                raw: String::new(),
                reason: MalformedReason::InvalidFormat,
            }))
        }
        Err(LinesCodecError::Io(e)) => Err(CodecError::Io(e)),
    }
}

impl Encoder<&Reply> for FrameCodec {
    type Error = CodecError;

    fn encode(&mut self, reply: &Reply, dst: &mut BytesMut) -> Result<(), CodecError> {
        encode_line(reply, dst);
        Ok(())
    }
}

impl Encoder<Reply> for FrameCodec {
    type Error = CodecError;

    fn encode(&mut self, reply: Reply, dst: &mut BytesMut) -> Result<(), CodecError> {
        encode_line(&reply, dst);
        Ok(())
    }
}

/// Client-side codec: writes [`Request`]s, reads broker lines.
///
/// Lines that are not a recognised reply (garbled, over-long or not UTF-8)
/// decode to `None` inside `Some`, so a bad line from the broker does not
/// end the stream.
#[derive(Debug)]
pub struct NodeCodec {
    lines: LinesCodec,
}

impl NodeCodec {
    pub fn new(max_line_length: usize) -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(max_line_length),
        }
    }
}

impl Default for NodeCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LENGTH)
    }
}

impl Decoder for NodeCodec {
    type Item = Option<Reply>;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Option<Reply>>, CodecError> {
        decode_reply(self.lines.decode(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Option<Reply>>, CodecError> {
        decode_reply(self.lines.decode_eof(src))
    }
}

fn decode_reply(
    line: Result<Option<String>, LinesCodecError>,
) -> Result<Option<Option<Reply>>, CodecError> {
    match line {
        Ok(line) => Ok(line.map(|line| Reply::parse(&line))),
        Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(None)),
        Err(LinesCodecError::Io(e)) if e.kind() == io::ErrorKind::InvalidData => Ok(Some(None)),
        Err(LinesCodecError::Io(e)) => Err(CodecError::Io(e)),
    }
}

impl Encoder<Request> for NodeCodec {
    type Error = CodecError;

    fn encode(&mut self, request: Request, dst: &mut BytesMut) -> Result<(), CodecError> {
        encode_line(&request, dst);
        Ok(())
    }
}

fn encode_line(item: &impl std::fmt::Display, dst: &mut BytesMut) {
    let line = item.to_string();
    dst.reserve(line.len() + 1);
    dst.extend_from_slice(line.as_bytes());
    dst.extend_from_slice(b"\n");
}
