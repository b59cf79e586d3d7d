//! The `node` module is the client side of the protocol.
//!
//! A `Node` connects to a broker, sends `SUB`/`PUB` requests and, once
//! `listen` is called, routes every `MSG` it receives to the handler
//! registered for that topic. Handlers live in a map from topic name to
//! `MessageHandler`, so a node can be driven over any byte stream.

pub mod console;
pub mod handler;

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, RwLock};

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{error, info, warn};

use crate::protocol::{NodeCodec, Reply, Request};
use crate::utils::{Result, WhisperError};

pub use handler::{MessageHandler, PrintHandler};

type Reader = FramedRead<Box<dyn AsyncRead + Send + Unpin>, NodeCodec>;
type Writer = FramedWrite<Box<dyn AsyncWrite + Send + Unpin>, NodeCodec>;
type Handlers = Arc<RwLock<HashMap<String, Arc<dyn MessageHandler>>>>;

pub struct Node {
    id: String,
    writer: Mutex<Writer>,
    reader: StdMutex<Option<Reader>>,
    handlers: Handlers,
}

impl Node {
    /// Connect to a broker over TCP.
    pub async fn connect(addr: &str) -> Result<Node> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| WhisperError::Connect {
                addr: addr.to_string(),
                source,
            })?;
        let id = stream.local_addr()?.to_string();

        info!("Connected to broker {addr} as {id}");
        Ok(Node::from_stream(id, stream))
    }

    /// Build a node on top of an already established stream.
    pub fn from_stream<S>(id: impl Into<String>, stream: S) -> Node
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let read_half: Box<dyn AsyncRead + Send + Unpin> = Box::new(read_half);
        let write_half: Box<dyn AsyncWrite + Send + Unpin> = Box::new(write_half);

        Node {
            id: id.into(),
            writer: Mutex::new(FramedWrite::new(write_half, NodeCodec::default())),
            reader: StdMutex::new(Some(FramedRead::new(read_half, NodeCodec::default()))),
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Ask the broker for messages on `topic`.
    pub async fn subscribe(&self, topic: &str) -> Result<()> {
        self.send(Request::Subscribe {
            topic: topic.to_string(),
        })
        .await
    }

    pub async fn publish(&self, topic: &str, message: &str) -> Result<()> {
        self.send(Request::Publish {
            topic: topic.to_string(),
            message: message.to_string(),
        })
        .await
    }

    async fn send(&self, request: Request) -> Result<()> {
        self.writer.lock().await.send(request).await?;
        Ok(())
    }

    /// Route messages for `topic` to `handler`, replacing any previous one.
    pub fn register_handler<H>(&self, topic: &str, handler: H)
    where
        H: MessageHandler + 'static,
    {
        self.handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(topic.to_string(), Arc::new(handler));
    }

    pub fn has_handler(&self, topic: &str) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(topic)
    }

    /// Spawn the receive loop. Returns `None` if it is already running.
    ///
    /// The task ends when the broker closes the connection or a read fails.
    pub fn listen(&self) -> Option<JoinHandle<()>> {
        let reader = self
            .reader
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()?;
        let handlers = Arc::clone(&self.handlers);
        Some(tokio::spawn(receive_loop(reader, handlers)))
    }
}

async fn receive_loop(mut reader: Reader, handlers: Handlers) {
    while let Some(next) = reader.next().await {
        match next {
            Ok(Some(Reply::Message { topic, payload })) => {
                let handler = handlers
                    .read()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .get(&topic)
                    .cloned();
                match handler {
                    Some(handler) => handler.handle(&topic, &payload),
                    None => warn!("No handler registered for topic: {topic}"),
                }
            }
            Ok(Some(Reply::Subscribed { topic })) => info!("Subscribed to topic: {topic}"),
            Ok(Some(Reply::Error { reason })) => warn!("Broker error: {reason}"),
            Ok(None) => warn!("Malformed message from broker"),
            Err(e) => {
                error!("Read error: {e}");
                return;
            }
        }
    }

    info!("Broker closed the connection");
}
