//! Event feed over WebSocket
//!
//! Sends the pool `snapshot` and then every `update` as JSON text frames.
//! Pings are answered; a close frame or disconnect ends the subscription.

use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    Extension,
};
use futures_util::{SinkExt, StreamExt};
use motorpool_core::{LeaseRegistry, ShutdownController};
use tracing::{debug, error, info, warn};

/// WebSocket upgrade handler
pub async fn events_handler(
    ws: WebSocketUpgrade,
    Extension(registry): Extension<Arc<LeaseRegistry>>,
    Extension(shutdown): Extension<Arc<ShutdownController>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, registry, shutdown))
}

async fn handle_socket(
    socket: WebSocket,
    registry: Arc<LeaseRegistry>,
    shutdown: Arc<ShutdownController>,
) {
    let guard = shutdown.register_stream();
    let token = guard.token();
    let mut subscription = registry.subscribe().await;
    let session_id = subscription.id();
    info!(session_id = %session_id, "WebSocket events connection established");

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!(session_id = %session_id, error = %e, "WebSocket error");
                        break;
                    }
                }
            }
            event = subscription.recv() => {
                let Some(event) = event else {
                    debug!(session_id = %session_id, "Subscription closed");
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                };
                match serde_json::to_string(&event) {
                    Ok(json) => {
                        if sender.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, kind = event.kind(), "Failed to encode event"),
                }
            }
        }
    }

    drop(subscription);
    drop(guard);
    info!(session_id = %session_id, "WebSocket events connection ended");
}
