//! The `transport` module is the connection driver: it owns the TCP
//! listener, runs one read loop per connection and forwards every decoded
//! frame to the broker.

pub mod tcp;

pub use tcp::{Server, TcpSink};

#[cfg(test)]
mod tests;
