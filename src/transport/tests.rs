use crate::broker::Broker;
use crate::config::BrokerSettings;
use crate::protocol::Reply;
use crate::transport::tcp::Server;
use crate::utils::SinkError;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("Failed to connect");
        let (read_half, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("Failed to send line");
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer
            .write_all(bytes)
            .await
            .expect("Failed to send bytes");
    }

    async fn recv(&mut self) -> String {
        let mut line = String::new();
        timeout(Duration::from_secs(2), self.reader.read_line(&mut line))
            .await
            .expect("Did not receive response")
            .expect("read failed");
        line
    }

    async fn expect_silence(&mut self) {
        let mut line = String::new();
        let res = timeout(Duration::from_millis(200), self.reader.read_line(&mut line)).await;
        assert!(res.is_err(), "unexpected line: {line:?}");
    }
}

async fn setup_server() -> (SocketAddr, Broker, CancellationToken, JoinHandle<()>) {
    let broker = Broker::new();
    let settings = BrokerSettings {
        max_line_length: 1024,
    };
    let server = Server::bind("127.0.0.1:0", broker.clone(), settings)
        .await
        .expect("bind failed");
    let addr = server.local_addr().expect("local addr");
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(server.run(shutdown.clone()));
    (addr, broker, shutdown, handle)
}

async fn wait_for_subscribers(broker: &Broker, count: usize) {
    timeout(Duration::from_secs(2), async {
        while broker.registry().subscriber_count() != count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("registry never reached the expected subscriber count");
}

#[tokio::test]
async fn test_end_to_end_fan_out() {
    let (addr, _broker, _shutdown, _handle) = setup_server().await;
    let mut a = TestClient::connect(addr).await;
    let mut b = TestClient::connect(addr).await;
    let mut c = TestClient::connect(addr).await;

    a.send("SUB news").await;
    assert_eq!(a.recv().await, "SUBSCRIBED to news\n");

    b.send("PUB news hello world").await;
    assert_eq!(a.recv().await, "MSG news hello world\n");

    b.expect_silence().await;
    c.expect_silence().await;
}

#[tokio::test]
async fn test_every_subscriber_gets_exactly_one_copy() {
    let (addr, _broker, _shutdown, _handle) = setup_server().await;
    let mut subscribers = Vec::new();
    for _ in 0..4 {
        let mut client = TestClient::connect(addr).await;
        client.send("SUB news").await;
        assert_eq!(client.recv().await, "SUBSCRIBED to news\n");
        subscribers.push(client);
    }

    let mut publisher = TestClient::connect(addr).await;
    publisher.send("PUB news  spaced   out ").await;

    for client in &mut subscribers {
        assert_eq!(client.recv().await, "MSG news spaced   out\n");
    }
    for client in &mut subscribers {
        client.expect_silence().await;
    }
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection_usable() {
    let (addr, _broker, _shutdown, _handle) = setup_server().await;
    let mut client = TestClient::connect(addr).await;

    client.send("SUB").await;
    assert_eq!(client.recv().await, "ERR invalid message format\n");

    client.send("PUB news").await;
    assert_eq!(client.recv().await, "ERR missing message\n");

    client.send("FOO news text").await;
    assert_eq!(client.recv().await, "ERR unknown command\n");

    client.send("SUB news").await;
    assert_eq!(client.recv().await, "SUBSCRIBED to news\n");
}

#[tokio::test]
async fn test_overlong_line_is_rejected_but_not_fatal() {
    let (addr, _broker, _shutdown, _handle) = setup_server().await;
    let mut client = TestClient::connect(addr).await;

    client.send(&format!("PUB news {}", "x".repeat(2048))).await;
    assert_eq!(client.recv().await, "ERR line too long\n");

    client.send("SUB news").await;
    assert_eq!(client.recv().await, "SUBSCRIBED to news\n");
}

#[tokio::test]
async fn test_invalid_utf8_line_is_rejected_but_not_fatal() {
    let (addr, broker, _shutdown, _handle) = setup_server().await;
    let mut client = TestClient::connect(addr).await;

    client.send_raw(b"PUB news \xff\xfe\n").await;
    assert_eq!(client.recv().await, "ERR invalid message format\n");

    client.send("SUB news").await;
    assert_eq!(client.recv().await, "SUBSCRIBED to news\n");
    wait_for_subscribers(&broker, 1).await;
}

#[tokio::test]
async fn test_closed_sink_ends_connection_and_purges() {
    let (addr, broker, _shutdown, _handle) = setup_server().await;
    let mut client = TestClient::connect(addr).await;
    client.send("SUB news").await;
    assert_eq!(client.recv().await, "SUBSCRIBED to news\n");
    wait_for_subscribers(&broker, 1).await;

    let mut subscribers = broker.registry().snapshot_subscribers("news");
    let (_, sink) = subscribers.pop().expect("subscriber registered");
    sink.close();
    assert!(matches!(
        sink.send(&Reply::error("late")).await,
        Err(SinkError::Closed)
    ));
    drop(sink);

    wait_for_subscribers(&broker, 0).await;
    assert_eq!(broker.registry().topic_count(), 0);

    let mut line = String::new();
    let read = timeout(Duration::from_secs(2), client.reader.read_line(&mut line))
        .await
        .expect("connection was not closed");
    assert!(matches!(read, Ok(0) | Err(_)));
}

#[tokio::test]
async fn test_disconnect_purges_subscriber() {
    let (addr, broker, _shutdown, _handle) = setup_server().await;
    let mut a = TestClient::connect(addr).await;
    let mut b = TestClient::connect(addr).await;

    a.send("SUB news").await;
    assert_eq!(a.recv().await, "SUBSCRIBED to news\n");
    b.send("SUB news").await;
    assert_eq!(b.recv().await, "SUBSCRIBED to news\n");
    wait_for_subscribers(&broker, 2).await;

    drop(a);
    wait_for_subscribers(&broker, 1).await;

    b.send("PUB news still here").await;
    assert_eq!(b.recv().await, "MSG news still here\n");
    assert_eq!(broker.registry().topic_count(), 1);
}

#[tokio::test]
async fn test_shutdown_closes_connections() {
    let (addr, broker, shutdown, handle) = setup_server().await;
    let mut client = TestClient::connect(addr).await;
    client.send("SUB news").await;
    assert_eq!(client.recv().await, "SUBSCRIBED to news\n");

    shutdown.cancel();
    timeout(Duration::from_secs(2), handle)
        .await
        .expect("server did not stop")
        .expect("server task panicked");

    assert_eq!(broker.registry().subscriber_count(), 0);
    let mut line = String::new();
    let read = timeout(Duration::from_secs(2), client.reader.read_line(&mut line))
        .await
        .expect("connection was not closed");
    assert!(matches!(read, Ok(0) | Err(_)));
}

#[tokio::test]
async fn test_bind_failure_is_reported() {
    let (addr, _broker, _shutdown, _handle) = setup_server().await;
    let err = Server::bind(
        &addr.to_string(),
        Broker::new(),
        BrokerSettings {
            max_line_length: 1024,
        },
    )
    .await;
    assert!(matches!(err, Err(crate::utils::WhisperError::Bind { .. })));
}
