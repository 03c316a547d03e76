//! Production upstream connector speaking JSON frames over WebSocket
//!
//! Connects to a live-session bridge at `{UPSTREAM_URL}?target={identity}`.
//! The bridge sends one `connected` frame carrying the resolved session
//! state, then a stream of `event` frames until it reports `disconnected`
//! or `streamEnd`:
//!
//! ```text
//! {"type":"connected","roomId":"7312", ...}
//! {"type":"event","kind":"chat","data":{"userId":"u1","comment":"hi"}}
//! {"type":"disconnected"}
//! {"type":"streamEnd"}
//! ```
//!
//! A socket closed without a terminal frame is treated as an involuntary
//! disconnect.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{SessionState, UpstreamConnector, UpstreamEvent, UpstreamHandle, UpstreamSession};
use crate::config::UpstreamConfig;
use crate::error::{Error, Result};
use crate::models::EventKind;

/// Depth of the per-session event channel toward the relay
const EVENT_CHANNEL_DEPTH: usize = 256;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Upstream connector backed by a WebSocket bridge
pub struct WsConnector {
    config: UpstreamConfig,
}

impl WsConnector {
    /// Create a new connector for the configured bridge URL
    pub fn new(config: UpstreamConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl UpstreamConnector for WsConnector {
    async fn connect(&self, target: &str) -> Result<UpstreamSession> {
        let url = format!("{}?target={}", self.config.url, target);

        let (ws, _response) = timeout(self.config.connect_timeout(), connect_async(url.as_str()))
            .await
            .map_err(|_| Error::connection("Upstream connect timed out"))?
            .map_err(|e| Error::connection(format!("Upstream handshake failed: {}", e)))?;

        let (sink, mut stream) = ws.split();

        // The bridge must announce the resolved session state before anything else
        let state = timeout(self.config.connect_timeout(), read_hello(&mut stream))
            .await
            .map_err(|_| Error::connection("Timed out waiting for session state"))??;

        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_DEPTH);
        let (close_tx, close_rx) = oneshot::channel();

        tokio::spawn(read_loop(sink, stream, events_tx, close_rx));

        Ok(UpstreamSession {
            state,
            events: events_rx,
            handle: Box::new(WsHandle {
                close: Some(close_tx),
            }),
        })
    }
}

/// Teardown handle for a WebSocket-backed session
struct WsHandle {
    close: Option<oneshot::Sender<()>>,
}

#[async_trait]
impl UpstreamHandle for WsHandle {
    async fn disconnect(&mut self) -> Result<()> {
        match self.close.take() {
            Some(tx) => tx
                .send(())
                .map_err(|_| Error::connection("Upstream session already closed")),
            None => Ok(()),
        }
    }
}

/// Wait for the bridge's `connected` frame
async fn read_hello(stream: &mut WsStream) -> Result<SessionState> {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => return parse_hello(text.as_str()),
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(_)) | None => {
                return Err(Error::connection("Upstream closed during handshake"));
            },
            Some(Err(e)) => {
                return Err(Error::connection(format!("Upstream socket error: {}", e)));
            },
        }
    }
}

/// Parse the `connected` handshake frame into a session state
fn parse_hello(text: &str) -> Result<SessionState> {
    let value: Value = serde_json::from_str(text)?;

    match value.get("type").and_then(Value::as_str) {
        Some("connected") => {},
        Some("connectFailed") => {
            let reason = value
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or("target unavailable");
            return Err(Error::connection(reason));
        },
        _ => return Err(Error::connection("Unexpected frame during handshake")),
    }

    let mut extra = value.as_object().cloned().unwrap_or_default();
    extra.remove("type");
    // The relay injects the target identity itself; drop a conflicting echo
    extra.remove("uniqueId");

    let room_id = match extra.remove("roomId") {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    Ok(SessionState { room_id, extra })
}

/// Pump frames from the socket into the session's event channel
async fn read_loop(
    mut sink: WsSink,
    mut stream: WsStream,
    events_tx: mpsc::Sender<UpstreamEvent>,
    mut close_rx: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            // Voluntary teardown: close the socket without signaling a disconnect
            _ = &mut close_rx => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => match parse_frame(text.as_str()) {
                    Ok(Some(event)) => {
                        let terminal = !matches!(event, UpstreamEvent::Event(..));
                        if events_tx.send(event).await.is_err() || terminal {
                            break;
                        }
                    },
                    Ok(None) => {},
                    Err(e) => {
                        tracing::warn!(error = %e, "Dropping malformed upstream frame");
                    },
                },
                Some(Ok(Message::Ping(data))) => {
                    let _ = sink.send(Message::Pong(data)).await;
                },
                Some(Ok(Message::Close(_))) | None => {
                    let _ = events_tx.send(UpstreamEvent::Disconnected).await;
                    break;
                },
                Some(Ok(_)) => {},
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Upstream socket error");
                    let _ = events_tx.send(UpstreamEvent::Disconnected).await;
                    break;
                },
            }
        }
    }
}

/// Parse a post-handshake frame into an upstream event
///
/// Returns `Ok(None)` for frames the relay ignores (unknown types or
/// unknown event kinds).
fn parse_frame(text: &str) -> Result<Option<UpstreamEvent>> {
    let value: Value = serde_json::from_str(text)?;

    match value.get("type").and_then(Value::as_str) {
        Some("event") => {
            let kind_tag = value.get("kind").and_then(Value::as_str).unwrap_or("");
            let kind = match EventKind::from_str(kind_tag) {
                Ok(kind) => kind,
                Err(e) => {
                    tracing::debug!(error = %e, "Ignoring event of unknown kind");
                    return Ok(None);
                },
            };
            let data = value.get("data").cloned().unwrap_or(Value::Null);
            Ok(Some(UpstreamEvent::Event(kind, data)))
        },
        Some("disconnected") => Ok(Some(UpstreamEvent::Disconnected)),
        Some("streamEnd") => Ok(Some(UpstreamEvent::StreamEnded)),
        _ => Ok(None),
    }
}
