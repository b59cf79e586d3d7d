//! Frame definitions for the line protocol
//!
//! Inbound lines decode into a [`Frame`]; everything the broker writes back
//! is a [`Reply`]. The node client speaks the other direction with
//! [`Request`] and parses replies with [`Reply::parse`].
//!
//! Wire format (one frame per `\n`-terminated line):
//! - `SUB <topic>` / `PUB <topic> <message>` from clients
//! - `SUBSCRIBED to <topic>`, `MSG <topic> <message>`, `ERR <reason>` from the broker

use std::fmt;

/// A decoded client request. Never mutated after decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Subscribe { topic: String },
    Publish { topic: String, payload: String },
    Malformed { raw: String, reason: MalformedReason },
}

/// Why a line could not be turned into a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    InvalidFormat,
    MissingMessage,
    UnknownCommand,
    LineTooLong,
}

impl MalformedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MalformedReason::InvalidFormat => "invalid message format",
            MalformedReason::MissingMessage => "missing message",
            MalformedReason::UnknownCommand => "unknown command",
            MalformedReason::LineTooLong => "line too long",
        }
    }
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A frame written by the broker to a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Subscribed { topic: String },
    Message { topic: String, payload: String },
    Error { reason: String },
}

/// A frame written by a node to the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Subscribe { topic: String },
    Publish { topic: String, message: String },
}

const SUB: &str = "SUB";
const PUB: &str = "PUB";
const SUBSCRIBED: &str = "SUBSCRIBED";
const MSG: &str = "MSG";
const ERR: &str = "ERR";

/// Splits a line into at most three whitespace-separated fields.
///
/// The third field is the untouched remainder of the line, so it keeps any
/// inner whitespace. Empty fields are not returned.
pub(crate) fn split_fields(line: &str) -> Vec<&str> {
    let mut fields = Vec::with_capacity(3);
    let mut rest = line.trim();

    while !rest.is_empty() {
        if fields.len() == 2 {
            fields.push(rest);
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                fields.push(&rest[..end]);
                rest = rest[end..].trim_start();
            }
            None => {
                fields.push(rest);
                break;
            }
        }
    }

    fields
}

impl Frame {
    /// Decode one line (without its newline) into a request frame.
    pub fn decode(line: &str) -> Frame {
        let fields = split_fields(line);

        let malformed = |reason| Frame::Malformed {
            raw: line.to_string(),
            reason,
        };

        match fields.as_slice() {
            [] | [_] => malformed(MalformedReason::InvalidFormat),
            [SUB, topic, ..] => Frame::Subscribe {
                topic: topic.to_string(),
            },
            [PUB, _] => malformed(MalformedReason::MissingMessage),
            [PUB, topic, payload] => Frame::Publish {
                topic: topic.to_string(),
                payload: payload.to_string(),
            },
            _ => malformed(MalformedReason::UnknownCommand),
        }
    }
}

impl Reply {
    /// Parse a broker line as seen by a node. Unrecognised lines yield `None`.
    pub fn parse(line: &str) -> Option<Reply> {
        let line = line.trim();
        let (head, tail) = match line.split_once(char::is_whitespace) {
            Some((head, tail)) => (head, tail.trim_start()),
            None => (line, ""),
        };

        match head {
            SUBSCRIBED => {
                match split_fields(tail).as_slice() {
                    ["to", topic] => Some(Reply::Subscribed {
                        topic: topic.to_string(),
                    }),
                    _ => None,
                }
            }
            MSG => {
                let (topic, payload) = tail.split_once(char::is_whitespace)?;
                let payload = payload.trim_start();
                if payload.is_empty() {
                    return None;
                }
                Some(Reply::Message {
                    topic: topic.to_string(),
                    payload: payload.to_string(),
                })
            }
            ERR if !tail.is_empty() => Some(Reply::Error {
                reason: tail.to_string(),
            }),
            _ => None,
        }
    }

    pub fn error(reason: impl fmt::Display) -> Reply {
        Reply::Error {
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Subscribed { topic } => write!(f, "{SUBSCRIBED} to {topic}"),
            Reply::Message { topic, payload } => write!(f, "{MSG} {topic} {payload}"),
            Reply::Error { reason } => write!(f, "{ERR} {reason}"),
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Subscribe { topic } => write!(f, "{SUB} {topic}"),
            Request::Publish { topic, message } => write!(f, "{PUB} {topic} {message}"),
        }
    }
}
