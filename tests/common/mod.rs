//! Shared helpers for integration tests: a live server on an ephemeral port and a small
//! WebSocket client speaking the `{"event", "data"}` envelope.

use std::{net::SocketAddr, time::Duration};

use couch_arcade_back::{
    config::AppConfig,
    routes,
    state::{AppState, SharedState},
};
use futures::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long a test waits before concluding nothing will arrive.
pub const QUIET_PERIOD: Duration = Duration::from_millis(200);
/// Upper bound for an expected message to show up.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Spawn a server with default configuration.
#[allow(dead_code)]
pub async fn spawn_server() -> (SharedState, SocketAddr) {
    spawn_server_with_config(AppConfig::default()).await
}

/// Spawn a server with custom configuration, returning its state and bound address.
pub async fn spawn_server_with_config(config: AppConfig) -> (SharedState, SocketAddr) {
    let state = AppState::new(config);
    let app = routes::router(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service()).await;
    });

    (state, addr)
}

/// WebSocket client connected to `/ws`.
pub struct TestClient {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
}

#[allow(dead_code)]
impl TestClient {
    /// Connect to the relay endpoint.
    pub async fn connect(addr: SocketAddr) -> Self {
        let url = format!("ws://{addr}/ws");
        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("failed to connect");
        let (sink, stream) = ws.split();
        Self { sink, stream }
    }

    /// Send a raw text frame.
    pub async fn send_raw(&mut self, text: &str) {
        self.sink
            .send(Message::Text(text.to_string().into()))
            .await
            .unwrap();
    }

    /// Send an event with optional payload.
    pub async fn send_event(&mut self, event: &str, data: Option<Value>) {
        let frame = match data {
            Some(data) => json!({"event": event, "data": data}),
            None => json!({"event": event}),
        };
        self.send_raw(&frame.to_string()).await;
    }

    /// Next event, skipping control frames. Panics when the channel closes.
    pub async fn recv(&mut self) -> Value {
        tokio::time::timeout(RECV_TIMEOUT, self.next_event())
            .await
            .expect("timed out waiting for an event")
            .expect("connection closed while waiting for an event")
    }

    /// Next event if one arrives within [`QUIET_PERIOD`].
    pub async fn recv_quiet(&mut self) -> Option<Value> {
        tokio::time::timeout(QUIET_PERIOD, self.next_event())
            .await
            .ok()
            .flatten()
    }

    async fn next_event(&mut self) -> Option<Value> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Some(serde_json::from_str(text.as_str()).expect("invalid JSON"));
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return None,
                Some(Ok(_)) => continue,
            }
        }
    }

    /// Become a host and return the session code.
    pub async fn host(&mut self) -> String {
        self.send_event("request_host", None).await;
        let created = self.recv().await;
        assert_eq!(created["event"], "session_created", "got {created}");
        created["data"]["code"].as_str().unwrap().to_string()
    }

    /// Ask to join `code` and return the `controller_joined` payload.
    pub async fn join(&mut self, code: &str) -> Value {
        self.send_event("request_controller", Some(json!(code))).await;
        let joined = self.recv().await;
        assert_eq!(joined["event"], "controller_joined", "got {joined}");
        joined["data"].clone()
    }

    /// Send a button press.
    pub async fn press(&mut self, button: &str) {
        self.send_event(
            "input",
            Some(json!({"button": button, "transition": "down", "originTimestamp": 1})),
        )
        .await;
    }

    /// Close the channel cleanly.
    pub async fn close(mut self) {
        let _ = self.sink.send(Message::Close(None)).await;
        let _ = self.sink.close().await;
    }
}
