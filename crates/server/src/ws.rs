use std::sync::Arc;

use axum::extract::{
    State, WebSocketUpgrade,
    ws::{Message, WebSocket},
};
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use livetrans_translation::{ConfigUpdate, HypothesisEvent, SessionEvent, TranslationSession};

use crate::state::AppState;

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

pub async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One translation session per WebSocket connection. Inbound frames carry
/// STT hypotheses and config updates; outbound frames carry translation
/// messages from the session's delivery sink.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4().to_string();
    info!(%connection_id, "Client connected");

    let (sender, mut receiver) = socket.split();
    let sender: WsSender = Arc::new(Mutex::new(sender));

    let (session, mut events) = state.engine.start_session(&connection_id).await;

    // Outbound pump: session events → socket frames.
    let pump_sender = sender.clone();
    let pump_connection_id = connection_id.clone();
    let pump = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::Translation(message) => {
                    let frame = serde_json::json!({
                        "type": "translation",
                        "data": message,
                    });
                    send_json(&pump_sender, &frame).await;
                }
                SessionEvent::Fatal(reason) => {
                    warn!(%pump_connection_id, %reason, "Session fatal, closing socket");
                    let frame = serde_json::json!({
                        "type": "session_error",
                        "data": { "message": reason },
                    });
                    send_json(&pump_sender, &frame).await;
                    let mut guard = pump_sender.lock().await;
                    let _ = guard.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_client_message(&session, &sender, &connection_id, &text).await;
            }
            Ok(Message::Ping(data)) => {
                let mut guard = sender.lock().await;
                let _ = guard.send(Message::Pong(data)).await;
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                warn!(%connection_id, %e, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    pump.abort();
    state.engine.stop_session(&connection_id).await;
    info!(%connection_id, "Client disconnected");
}

async fn handle_client_message(
    session: &Arc<TranslationSession>,
    sender: &WsSender,
    connection_id: &str,
    text: &str,
) {
    let parsed: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => {
            debug!(%connection_id, "Unparseable WS frame, skipping");
            session.record_skipped();
            return;
        }
    };

    let msg_type = parsed.get("type").and_then(|t| t.as_str()).unwrap_or("");
    let data = parsed.get("data");

    match msg_type {
        "hypothesis" => {
            match data.cloned().map(serde_json::from_value::<HypothesisEvent>) {
                Some(Ok(event)) => session.handle_event(event).await,
                _ => {
                    debug!(%connection_id, "Malformed hypothesis event, skipping");
                    session.record_skipped();
                }
            }
        }
        "update_translation_config" => {
            let status = match data.cloned().map(serde_json::from_value::<ConfigUpdate>) {
                Some(Ok(update)) => session.update_config(update).await,
                Some(Err(e)) => format!("error: invalid config payload: {e}"),
                None => "error: missing config payload".to_string(),
            };
            let frame = serde_json::json!({
                "type": "config_result",
                "data": { "status": status },
            });
            send_json(sender, &frame).await;
        }
        "ping" => {
            send_json(sender, &serde_json::json!({ "type": "pong" })).await;
        }
        _ => {
            debug!(%connection_id, msg_type, "Unknown WS message type");
        }
    }
}

async fn send_json(sender: &WsSender, value: &serde_json::Value) {
    let text = serde_json::to_string(value).unwrap_or_default();
    let mut guard = sender.lock().await;
    if let Err(e) = guard.send(Message::text(text)).await {
        debug!(%e, "Failed to send WS message");
    }
}
