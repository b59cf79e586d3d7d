//! The `error` module defines the error types used within `whisper`.
//!
//! Protocol errors never show up here: a malformed frame is answered with an
//! `ERR` reply and the connection carries on. What remains are transport
//! failures (fatal to one connection) and startup failures (fatal to the
//! process).

use std::io;

use thiserror::Error;

/// Errors surfaced by the broker driver, the node client and configuration.
#[derive(Debug, Error)]
pub enum WhisperError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Failure to deliver a frame through a subscriber's outbound sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("subscriber sink closed")]
    Closed,

    #[error("write failed: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised by the line codecs while reading or writing a stream.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<CodecError> for SinkError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io(e) => SinkError::Io(e),
        }
    }
}

impl From<CodecError> for WhisperError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io(e) => WhisperError::Io(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, WhisperError>;
