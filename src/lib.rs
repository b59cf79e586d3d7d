//! # Whisper
//!
//! `whisper` is a minimal, in-memory publish/subscribe broker speaking a
//! newline-delimited text protocol over TCP. Delivery is best-effort and
//! at-most-once: nothing is persisted, acknowledged or retried.
//!
//! ## Core Modules
//!
//! - `broker`: topic registry, per-connection sessions and the fan-out engine.
//! - `protocol`: request/reply frames and the line codecs.
//! - `client`: the `MessageSink` abstraction the broker writes through.
//! - `transport`: the TCP connection driver.
//! - `node`: the client side, with a line-oriented console front end.
//! - `config`: layered settings loading.
//! - `utils`: error types and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod node;
pub mod protocol;
pub mod transport;
pub mod utils;
