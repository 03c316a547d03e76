//! Subscriber WebSocket endpoint for liverelay
//!
//! Each connection gets a bounded outbound queue and a writer task draining
//! it, so one stalled subscriber never blocks the broadcast path. The reader
//! side accepts target requests; everything else a subscriber sends is
//! ignored with a log line.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::AppState;
use crate::gateway::{ClientConnection, Inbound};

/// Interval between keepalive pings on an idle connection
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4().to_string();
    let (mut sink, mut stream) = socket.split();

    let (tx, mut rx) = mpsc::channel::<Arc<String>>(state.config.relay.max_send_queue);
    let connection = Arc::new(ClientConnection::new(connection_id.clone(), tx));
    state.gateway.add(connection).await;
    info!(connection_id = %connection_id, "Subscriber connected");

    // Writer task: drains the outbound queue and keeps the connection alive
    let writer_id = connection_id.clone();
    let writer = tokio::spawn(async move {
        let start = tokio::time::Instant::now() + HEARTBEAT_INTERVAL;
        let mut heartbeat = tokio::time::interval_at(start, HEARTBEAT_INTERVAL);
        loop {
            tokio::select! {
                queued = rx.recv() => match queued {
                    Some(text) => {
                        if sink.send(Message::Text(text.as_str().into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                _ = heartbeat.tick() => {
                    if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
        debug!(connection_id = %writer_id, "Writer task finished");
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                handle_inbound(&state, &connection_id, text.as_str()).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(connection_id = %connection_id, error = %e, "Subscriber read error");
                break;
            }
        }
    }

    state.gateway.remove(&connection_id).await;
    writer.abort();
    info!(connection_id = %connection_id, "Subscriber disconnected");
}

async fn handle_inbound(state: &AppState, connection_id: &str, text: &str) {
    match serde_json::from_str::<Inbound>(text) {
        Ok(Inbound::SetTarget { target }) => {
            state.sessions.set_target(&target, connection_id).await;
        }
        Err(e) => {
            warn!(
                connection_id = %connection_id,
                error = %e,
                "Ignoring malformed subscriber message"
            );
        }
    }
}
