//! Integration tests for the word stream and the connection-count push stream.

use futures_util::{Stream, StreamExt};
use serde_json::Value;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use wordcast_core::Error;
use wordcast_server::{serve, AppState, ServerConfig};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

struct TestServer {
    state: AppState,
    stream_addr: SocketAddr,
    push_addr: SocketAddr,
    task: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    /// Start both servers on ephemeral ports with a fixed word source
    async fn start(interval_ms: u64) -> Self {
        let mut config = ServerConfig {
            host: "127.0.0.1".to_string(),
            stream_port: 0,
            push_port: 0,
            keep_alive_ms: 100,
            ..Default::default()
        };
        config.broadcast.interval_ms = interval_ms;

        let state = AppState::with_source(
            config,
            Arc::new(|| Ok::<_, Error>("lantern".to_string())),
            None,
        );

        let stream_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let push_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let stream_addr = stream_listener.local_addr().unwrap();
        let push_addr = push_listener.local_addr().unwrap();

        let task = tokio::spawn(serve(state.clone(), stream_listener, push_listener));

        Self {
            state,
            stream_addr,
            push_addr,
            task,
        }
    }

    async fn connect_stream(&self, path: &str) -> WsStream {
        let (ws, _) = connect_async(format!("ws://{}{}", self.stream_addr, path))
            .await
            .expect("WebSocket connect failed");
        ws
    }

    async fn connect_observer(&self) -> EventReader {
        EventReader::connect(self.push_addr, "/connections").await
    }

    async fn stop(self) {
        self.state.engine.shutdown();
        timeout(WAIT, self.task)
            .await
            .expect("server did not stop")
            .unwrap()
            .unwrap();
    }
}

/// Minimal `text/event-stream` reader
struct EventReader {
    body: Pin<Box<dyn Stream<Item = reqwest::Result<Vec<u8>>> + Send>>,
    buf: String,
}

impl EventReader {
    async fn connect(addr: SocketAddr, path: &str) -> Self {
        let resp = reqwest::get(format!("http://{}{}", addr, path))
            .await
            .expect("SSE connect failed");
        assert_eq!(resp.status(), 200);
        let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/event-stream"));
        assert_eq!(resp.headers()["cache-control"], "no-cache");

        Self {
            body: Box::pin(resp.bytes_stream().map(|r| r.map(|b| b.to_vec()))),
            buf: String::new(),
        }
    }

    /// Raw text of the next event, including its terminating blank line.
    /// Keep-alive comments are skipped.
    async fn next_event(&mut self) -> Option<String> {
        loop {
            if let Some(pos) = self.buf.find("\n\n") {
                let event: String = self.buf.drain(..pos + 2).collect();
                if event.lines().all(|line| line.is_empty() || line.starts_with(':')) {
                    continue;
                }
                return Some(event);
            }
            let chunk = timeout(WAIT, self.body.next()).await.expect("timed out")?;
            self.buf.push_str(std::str::from_utf8(&chunk.ok()?).unwrap());
        }
    }

    async fn next_count(&mut self) -> u64 {
        let event = self.next_event().await.expect("event stream ended");
        let data = event
            .strip_prefix("data: ")
            .and_then(|rest| rest.strip_suffix("\n\n"))
            .unwrap_or_else(|| panic!("unexpected event: {:?}", event));
        let value: Value = serde_json::from_str(data).unwrap();
        value["active_connections"].as_u64().unwrap()
    }

    async fn wait_for_count(&mut self, expected: u64) {
        while self.next_count().await != expected {}
    }
}

async fn next_word(ws: &mut WsStream) -> String {
    loop {
        let msg = timeout(WAIT, ws.next())
            .await
            .expect("timed out waiting for a word")
            .expect("stream closed")
            .expect("WebSocket error");
        if let Message::Text(text) = msg {
            let value: Value = serde_json::from_str(&text).unwrap();
            return value["word"].as_str().unwrap().to_string();
        }
    }
}

async fn health(addr: SocketAddr) -> Value {
    reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_observer_sees_baseline_then_changes() {
    let server = TestServer::start(100).await;

    let mut observer = server.connect_observer().await;
    assert_eq!(observer.next_count().await, 0);

    let mut ws = server.connect_stream("/").await;
    assert_eq!(observer.next_count().await, 1);
    assert_eq!(next_word(&mut ws).await, "lantern");

    ws.close(None).await.unwrap();
    assert_eq!(observer.next_count().await, 0);

    server.stop().await;
}

#[tokio::test]
async fn test_late_observer_gets_current_count() {
    let server = TestServer::start(100).await;

    let mut streams = Vec::new();
    for _ in 0..3 {
        streams.push(server.connect_stream("/").await);
    }
    // Joins land after the handshake completes; wait until all three count.
    let mut first = server.connect_observer().await;
    first.wait_for_count(3).await;

    let mut late = server.connect_observer().await;
    assert_eq!(late.next_count().await, 3);

    drop(streams);
    server.stop().await;
}

#[tokio::test]
async fn test_every_client_receives_words() {
    let server = TestServer::start(50).await;

    let mut a = server.connect_stream("/").await;
    let mut b = server.connect_stream("/ws").await;

    for ws in [&mut a, &mut b] {
        assert_eq!(next_word(ws).await, "lantern");
        assert_eq!(next_word(ws).await, "lantern");
    }

    server.stop().await;
}

#[tokio::test]
async fn test_health_reports_counts() {
    let server = TestServer::start(100).await;
    let mut observer = server.connect_observer().await;
    assert_eq!(observer.next_count().await, 0);

    let _ws = server.connect_stream("/").await;
    observer.wait_for_count(1).await;

    let report = health(server.push_addr).await;
    assert_eq!(report["status"], "ok");
    assert_eq!(report["active_connections"], 1);
    assert_eq!(report["observers"], 1);

    let metrics = reqwest::get(format!("http://{}/metrics", server.push_addr))
        .await
        .unwrap();
    assert_eq!(metrics.status(), 200);

    server.stop().await;
}

#[tokio::test]
async fn test_vanished_observer_leaves_while_count_is_quiet() {
    let server = TestServer::start(100).await;
    let _ws = server.connect_stream("/").await;

    let mut observer = server.connect_observer().await;
    observer.wait_for_count(1).await;
    assert_eq!(health(server.push_addr).await["observers"], 1);

    // No stream client joins or leaves from here on.
    drop(observer);

    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        let report = health(server.push_addr).await;
        if report["observers"] == 0 {
            assert_eq!(report["active_connections"], 1);
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "observer still registered: {}",
            report
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    server.stop().await;
}

#[tokio::test]
async fn test_shutdown_closes_open_connections() {
    let server = TestServer::start(100).await;
    let mut observer = server.connect_observer().await;
    let mut ws = server.connect_stream("/").await;
    observer.wait_for_count(1).await;

    server.state.engine.shutdown();

    // The stream client gets a close frame (or the socket ends) ...
    loop {
        match timeout(WAIT, ws.next()).await.expect("stream not closed") {
            Some(Ok(Message::Text(_))) => continue,
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
            Some(Ok(_)) => continue,
        }
    }
    // ... and the event stream ends without further events.
    assert!(observer.next_event().await.is_none());

    timeout(WAIT, server.task)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();
}
