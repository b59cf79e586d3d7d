//! TCP transport
//!
//! This file implements the connection driver. Responsibilities:
//! - Accept TCP connections and spawn one task per connection
//! - Create a `Session` with a `TcpSink` for each connection
//! - Decode inbound lines and hand each frame to the `Broker`
//! - Tear the session down exactly once, on EOF, read error, a failed
//!   write (ours or one observed during someone else's fan-out), or
//!   broker shutdown

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::broker::Broker;
use crate::client::MessageSink;
use crate::config::BrokerSettings;
use crate::protocol::{FrameCodec, Reply};
use crate::utils::{Result, SinkError, WhisperError};

/// Write half of a broker connection.
///
/// Whole frames are written under a lock, so concurrent publishers never
/// interleave inside a line. A failed write cancels `closed`, which ends
/// the connection's read loop.
#[derive(Debug)]
pub struct TcpSink {
    writer: Mutex<FramedWrite<OwnedWriteHalf, FrameCodec>>,
    closed: CancellationToken,
}

impl TcpSink {
    pub fn new(write_half: OwnedWriteHalf, closed: CancellationToken) -> Self {
        Self {
            writer: Mutex::new(FramedWrite::new(write_half, FrameCodec::default())),
            closed,
        }
    }
}

#[async_trait]
impl MessageSink for TcpSink {
    async fn send(&self, reply: &Reply) -> std::result::Result<(), SinkError> {
        if self.closed.is_cancelled() {
            return Err(SinkError::Closed);
        }

        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.send(reply).await {
            self.closed.cancel();
            return Err(e.into());
        }
        Ok(())
    }

    fn close(&self) {
        self.closed.cancel();
    }
}

pub struct Server {
    listener: TcpListener,
    broker: Broker,
    settings: BrokerSettings,
}

impl Server {
    /// Bind the listener. Fails if the address is unusable.
    pub async fn bind(addr: &str, broker: Broker, settings: BrokerSettings) -> Result<Server> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| WhisperError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        info!("Broker listening on {addr}");

        Ok(Server {
            listener,
            broker,
            settings,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` is cancelled, then wait for every
    /// connection task to finish its teardown.
    pub async fn run(self, shutdown: CancellationToken) {
        let tracker = TaskTracker::new();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Broker shutting down");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        tracker.spawn(handle_connection(
                            stream,
                            addr,
                            self.broker.clone(),
                            self.settings.max_line_length,
                            shutdown.child_token(),
                        ));
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {e}");
                    }
                },
            }
        }

        tracker.close();
        tracker.wait().await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    broker: Broker,
    max_line_length: usize,
    closed: CancellationToken,
) {
    let client_id = addr.to_string();
    let (read_half, write_half) = stream.into_split();

    let sink = Arc::new(TcpSink::new(write_half, closed.clone()));
    let mut session = broker.connect(client_id.clone(), sink);
    let mut frames = FramedRead::new(read_half, FrameCodec::new(max_line_length));

    loop {
        tokio::select! {
            _ = closed.cancelled() => {
                debug!(subscriber = %client_id, "connection closed by broker");
                break;
            }
            next = frames.next() => match next {
                Some(Ok(frame)) => {
                    if let Err(e) = broker.dispatch(&mut session, frame).await {
                        warn!(subscriber = %client_id, error = %e, "write failed");
                        break;
                    }
                }
                Some(Err(e)) => {
                    warn!(subscriber = %client_id, error = %e, "read failed");
                    break;
                }
                None => {
                    info!(subscriber = %client_id, "client disconnected");
                    break;
                }
            },
        }
    }

    broker.disconnect(session);
}
