//! `WebSocket` handler for real-time view frame streaming.
//!
//! Clients connect to `GET /ws/track`, receive the current frame (if any)
//! straight away, then one JSON-encoded [`ViewFrame`] per update. A client
//! that falls behind skips ahead to the newest frame.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use colitrack_types::ViewFrame;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming view frames.
///
/// # Route
///
/// `GET /ws/track`
pub async fn ws_track(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

fn frame_message(frame: &ViewFrame) -> Option<Message> {
    match serde_json::to_string(frame) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            warn!(code = %frame.code, "failed to serialize view frame: {e}");
            None
        }
    }
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("WebSocket client connected");

    // Subscribe before reading the snapshot so no frame falls in between.
    let mut rx = state.subscribe();
    let initial = state.snapshot.read().await.frame.as_ref().and_then(frame_message);
    let delivered = match initial {
        Some(msg) => socket.send(msg).await.is_ok(),
        None => true,
    };
    if !delivered {
        debug!("WebSocket client disconnected (initial frame)");
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(frame) => {
                        let Some(msg) = frame_message(&frame) else {
                            continue;
                        };
                        if socket.send(msg).await.is_err() {
                            debug!("WebSocket client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!(skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(RecvError::Closed) => {
                        debug!("frame channel closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    // Clients have nothing to say.
                    _ => {}
                }
            }
        }
    }
}
