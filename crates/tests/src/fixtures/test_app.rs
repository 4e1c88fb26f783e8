use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use livetrans_server::{build_router, settings::Settings, state::AppState};
use livetrans_translation::error::TranslateError;
use livetrans_translation::{
    TranslateBackend, TranslateRequest, TranslationConfig, TranslationEngine,
};

/// Deterministic backend for end-to-end tests: "text" becomes
/// "<target>:text", so assertions can predict every translation.
pub struct EchoTranslate;

#[async_trait]
impl TranslateBackend for EchoTranslate {
    async fn translate(&self, request: TranslateRequest) -> Result<Vec<String>, TranslateError> {
        Ok(request
            .texts
            .iter()
            .map(|t| format!("{}:{}", request.target_lang, t))
            .collect())
    }

    fn name(&self) -> &str {
        "echo"
    }
}

/// Spawns the full server on an ephemeral port with the echo backend and
/// short debounce/batch windows so tests run quickly in real time.
pub struct TestApp {
    pub addr: SocketAddr,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let translation = TranslationConfig {
            debounce_ms: 200,
            batch_timeout_ms: 100,
            ..TranslationConfig::default()
        };
        let settings = Settings {
            listen_addr: "127.0.0.1:0".parse().expect("loopback addr"),
            google_api_key: "test-key".to_string(),
            google_endpoint: None,
            translation: translation.clone(),
        };
        let engine = TranslationEngine::new(Arc::new(EchoTranslate), translation);
        let state = AppState {
            settings: Arc::new(settings),
            engine,
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, build_router(state)).await;
        });

        Self { addr }
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn connect_ws(&self) -> WsClient {
        let (stream, _) = connect_async(format!("ws://{}/ws", self.addr))
            .await
            .expect("ws connect");
        WsClient { stream }
    }
}

/// Thin JSON-frame client over tokio-tungstenite.
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    pub async fn send_json(&mut self, value: &serde_json::Value) {
        self.stream
            .send(Message::text(value.to_string()))
            .await
            .expect("ws send");
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.stream
            .send(Message::text(text.to_string()))
            .await
            .expect("ws send");
    }

    pub async fn send_hypothesis(&mut self, text: &str, is_final: bool) {
        self.send_json(&serde_json::json!({
            "type": "hypothesis",
            "data": { "text": text, "is_final": is_final },
        }))
        .await;
    }

    /// Next text frame parsed as JSON; panics after 2s of silence.
    pub async fn recv_json(&mut self) -> serde_json::Value {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(2), self.stream.next())
                .await
                .expect("timed out waiting for WS frame")
                .expect("socket closed")
                .expect("ws error");
            match msg {
                Message::Text(text) => {
                    return serde_json::from_str(text.as_str()).expect("frame is JSON");
                }
                Message::Ping(_) | Message::Pong(_) => continue,
                other => panic!("unexpected frame: {other:?}"),
            }
        }
    }

    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}
