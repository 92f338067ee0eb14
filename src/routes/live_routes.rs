use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::time::timeout;

use crate::services::broadcast_service::Hub;
use crate::state::app::AppState;

/// Build the live viewer route (WebSocket upgrade)
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(upgrade))
        .with_state(state)
}

/// GET /ws
async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let send_timeout = Duration::from_millis(state.config.send_timeout_ms);
    ws.on_upgrade(move |socket| stream_to_viewer(socket, state.hub, send_timeout))
}

/// Push hub messages to one viewer until either side goes away.
///
/// The socket is push-only: text or binary frames from the viewer are
/// ignored, a Close frame or transport error ends the session. A frame
/// that cannot be written within `send_timeout` also ends it, so a viewer
/// that stops reading never pins this task.
async fn stream_to_viewer(socket: WebSocket, hub: Hub, send_timeout: Duration) {
    let mut sub = hub.subscribe();
    let id = sub.id;
    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            // ── Downstream: hub → viewer ───────────────────────────────────
            message = sub.recv() => {
                let Some(message) = message else {
                    // Dropped by the hub (queue overflow).
                    let _ = timeout(send_timeout, ws_tx.send(Message::Close(None))).await;
                    break;
                };

                match serde_json::to_string(&message) {
                    Ok(text) => match timeout(send_timeout, ws_tx.send(Message::Text(text))).await {
                        Ok(Ok(())) => {}
                        Ok(Err(_)) => break,
                        Err(_) => {
                            tracing::warn!(subscriber = id, "Viewer stalled, closing live session");
                            break;
                        }
                    },
                    Err(e) => tracing::error!(subscriber = id, "Cannot serialize hub message: {e}"),
                }
            }
            // ── Upstream: only watch for the viewer leaving ────────────────
            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    hub.unsubscribe(id);
    tracing::debug!(subscriber = id, "Live session closed");
}
