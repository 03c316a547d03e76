//! Notification fan-out to connected subscribers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use super::Outbound;

/// Maximum total lifetime message drops before forcibly disconnecting a slow subscriber.
const MAX_TOTAL_DROPS: u64 = 100;

/// A connected subscriber.
///
/// Holds the bounded send queue toward the connection's writer task; a full
/// queue counts a drop rather than blocking the pipeline.
pub struct ClientConnection {
    /// Connection ID.
    pub id: String,
    tx: mpsc::Sender<Arc<String>>,
    drops: AtomicU64,
}

impl ClientConnection {
    /// Create a connection around its outbound queue.
    pub fn new(id: String, tx: mpsc::Sender<Arc<String>>) -> Self {
        Self {
            id,
            tx,
            drops: AtomicU64::new(0),
        }
    }

    /// Queue a serialized message; returns false (and counts a drop) when full or closed.
    pub fn send(&self, message: Arc<String>) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(_) => {
                self.drops.fetch_add(1, Ordering::Relaxed);
                false
            },
        }
    }

    /// Total lifetime drops for this connection.
    pub fn drop_count(&self) -> u64 {
        self.drops.load(Ordering::Relaxed)
    }
}

/// Manages notification delivery to connected subscribers.
pub struct BroadcastManager {
    /// Connected subscribers indexed by connection ID.
    connections: RwLock<HashMap<String, Arc<ClientConnection>>>,
    /// Atomic counter tracking total connections (avoids read-locking for count queries).
    active_count: AtomicUsize,
}

impl BroadcastManager {
    /// Create a new broadcast manager.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            active_count: AtomicUsize::new(0),
        }
    }

    /// Add a connection.
    pub async fn add(&self, connection: Arc<ClientConnection>) {
        let mut conns = self.connections.write().await;
        if conns.insert(connection.id.clone(), connection).is_none() {
            let _ = self.active_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Remove a connection by ID.
    pub async fn remove(&self, connection_id: &str) {
        let mut conns = self.connections.write().await;
        if conns.remove(connection_id).is_some() {
            let _ = self.active_count.fetch_sub(1, Ordering::Relaxed);
        }
    }

    /// Deliver a requester-scoped message to one connection.
    ///
    /// Returns false when the connection is gone or its queue rejected the
    /// message. Subscribers that connected after the signal was emitted never
    /// see it; there is no replay buffer.
    pub async fn send_to(&self, connection_id: &str, message: &Outbound) -> bool {
        let json = match serialize(message) {
            Some(json) => json,
            None => return false,
        };
        let conns = self.connections.read().await;
        match conns.get(connection_id) {
            Some(conn) => {
                let delivered = conn.send(json);
                if !delivered {
                    warn!(conn_id = %connection_id, "Failed to send message to requester (queue full)");
                }
                delivered
            },
            None => {
                debug!(conn_id = %connection_id, "Requester no longer connected");
                false
            },
        }
    }

    /// Serialize a message, fan out to all subscribers, remove slow ones.
    pub async fn broadcast(&self, message: &Outbound) {
        let json = match serialize(message) {
            Some(json) => json,
            None => return,
        };
        let mut to_remove = Vec::new();
        {
            let conns = self.connections.read().await;
            let mut recipients = 0u32;
            for conn in conns.values() {
                recipients += 1;
                if !conn.send(Arc::clone(&json)) {
                    let drops = conn.drop_count();
                    if drops >= MAX_TOTAL_DROPS {
                        warn!(conn_id = %conn.id, drops, "Disconnecting slow subscriber");
                        to_remove.push(conn.id.clone());
                    } else {
                        warn!(conn_id = %conn.id, total_drops = drops, "Failed to send message to subscriber (queue full)");
                    }
                }
            }
            debug!(recipients, "Broadcast message");
        }
        if !to_remove.is_empty() {
            let mut conns = self.connections.write().await;
            for id in &to_remove {
                if conns.remove(id).is_some() {
                    let _ = self.active_count.fetch_sub(1, Ordering::Relaxed);
                }
            }
        }
    }

    /// Number of active connections.
    pub fn connection_count(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

impl Default for BroadcastManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize an outbound message once, shared across recipients.
fn serialize(message: &Outbound) -> Option<Arc<String>> {
    match serde_json::to_string(message) {
        Ok(json) => Some(Arc::new(json)),
        Err(e) => {
            warn!(error = %e, "Failed to serialize outbound message");
            None
        },
    }
}
