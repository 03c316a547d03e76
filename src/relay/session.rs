//! Upstream session lifecycle management
//!
//! At most one upstream session exists at a time. Every accepted target
//! request bumps a generation counter; the connect/reconnect loop it spawns
//! carries that generation and abandons itself as soon as a newer one exists.
//! Switching targets is therefore also the only cancellation mechanism:
//! the superseded loop tears its session down and exits silently, without
//! emitting lifecycle notifications for a target nobody asked about anymore.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::config::UpstreamConfig;
use crate::error::Error;
use crate::gateway::{BroadcastManager, Outbound};
use crate::models::{ClassifierOptions, NormalizedEvent};
use crate::upstream::{
    SessionState, UpstreamConnector, UpstreamEvent, UpstreamHandle, UpstreamSession,
};

/// Snapshot of the current session, as reported by the status endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// Target identity of the active session, if any
    pub target: Option<String>,
    /// Whether an upstream session is currently established
    pub active: bool,
    /// Room identifier resolved at connect time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    /// When the active session was established
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<DateTime<Utc>>,
}

/// Why a session's event pump stopped
enum SessionEnd {
    /// Involuntary loss; eligible for reconnect
    Reconnect,
    /// The broadcast ended; terminal for the target
    Ended,
    /// A newer target took over; exit without notifications
    Superseded,
}

struct ActiveSession {
    target: String,
    generation: u64,
    state: SessionState,
    handle: Box<dyn UpstreamHandle>,
    connected_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    /// Bumped on every accepted target request
    generation: u64,
    current: Option<ActiveSession>,
}

/// Owns the single upstream session and its connect/reconnect lifecycle
///
/// Cheap to clone; clones share the session slot and generation counter.
#[derive(Clone)]
pub struct SessionManager {
    connector: Arc<dyn UpstreamConnector>,
    gateway: Arc<BroadcastManager>,
    events_tx: mpsc::Sender<NormalizedEvent>,
    config: UpstreamConfig,
    classifier: ClassifierOptions,
    inner: Arc<Mutex<Inner>>,
}

impl SessionManager {
    pub fn new(
        connector: Arc<dyn UpstreamConnector>,
        gateway: Arc<BroadcastManager>,
        events_tx: mpsc::Sender<NormalizedEvent>,
        config: UpstreamConfig,
        classifier: ClassifierOptions,
    ) -> Self {
        Self {
            connector,
            gateway,
            events_tx,
            config,
            classifier,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Point the relay at a new upstream target
    ///
    /// Normalizes the identity (trims whitespace, strips a leading `@`),
    /// tears down any prior session, and spawns the connect loop for the new
    /// one. An empty identity is rejected with a requester-scoped failure and
    /// leaves the current session untouched.
    pub async fn set_target(&self, raw_target: &str, requester: &str) {
        let target = raw_target.trim().trim_start_matches('@').trim().to_string();
        if target.is_empty() {
            let err = Error::invalid_target("target identity is empty");
            warn!(requester = %requester, "Rejected target request");
            self.gateway
                .send_to(requester, &Outbound::session_failed(err.to_string()))
                .await;
            return;
        }

        info!(target = %target, requester = %requester, "Switching upstream target");

        let (generation, previous) = {
            let mut inner = self.inner.lock().await;
            inner.generation += 1;
            (inner.generation, inner.current.take())
        };

        if let Some(mut previous) = previous {
            info!(target = %previous.target, "Tearing down prior upstream session");
            if let Err(e) = previous.handle.disconnect().await {
                // Teardown is best-effort; the replacement proceeds regardless
                warn!(target = %previous.target, error = %e, "Upstream teardown failed");
            }
        }

        let manager = self.clone();
        let requester = requester.to_string();
        tokio::spawn(async move {
            manager.run(target, generation, requester).await;
        });
    }

    /// Snapshot for the status endpoint
    pub async fn status(&self) -> SessionStatus {
        let inner = self.inner.lock().await;
        match &inner.current {
            Some(session) => SessionStatus {
                target: Some(session.target.clone()),
                active: true,
                room_id: session.state.room_id.clone(),
                connected_at: Some(session.connected_at),
            },
            None => SessionStatus {
                target: None,
                active: false,
                room_id: None,
                connected_at: None,
            },
        }
    }

    /// Connect loop for one accepted target request
    ///
    /// Runs until the target is superseded, the broadcast ends, or a connect
    /// failure is not retryable.
    async fn run(self, target: String, generation: u64, requester: String) {
        let mut was_connected = false;
        loop {
            if !self.is_current(generation).await {
                return;
            }

            info!(target = %target, "Connecting to upstream");
            match self.connector.connect(&target).await {
                Ok(session) => {
                    was_connected = true;
                    let state = session.state.clone();
                    let Some(events) = self.install(&target, generation, session).await else {
                        return;
                    };

                    info!(target = %target, room_id = ?state.room_id, "Upstream session established");
                    self.gateway
                        .send_to(
                            &requester,
                            &Outbound::SessionEstablished {
                                unique_id: target.clone(),
                                state,
                            },
                        )
                        .await;

                    match self.pump_events(events, generation).await {
                        SessionEnd::Reconnect => {
                            self.clear_current(generation).await;
                            warn!(
                                target = %target,
                                delay_ms = %self.config.reconnect_delay_ms,
                                "Upstream disconnected, reconnecting"
                            );
                            self.gateway
                                .broadcast(&Outbound::disconnected("Connection lost, retrying"))
                                .await;
                            tokio::time::sleep(self.config.reconnect_delay()).await;
                        }
                        SessionEnd::Ended => {
                            self.clear_current(generation).await;
                            info!(target = %target, "Live broadcast ended");
                            self.gateway.broadcast(&Outbound::StreamEnd).await;
                            return;
                        }
                        SessionEnd::Superseded => return,
                    }
                }
                Err(e) => {
                    warn!(target = %target, error = %e, "Upstream connect failed");
                    self.gateway
                        .send_to(&requester, &Outbound::session_failed(e.to_string()))
                        .await;
                    // A failed reconnect keeps retrying until superseded or
                    // the stream ends; a failed initial connect only retries
                    // when configured to
                    if was_connected {
                        tokio::time::sleep(self.config.reconnect_delay()).await;
                    } else if self.config.retry_failed_connect {
                        tokio::time::sleep(self.config.failed_connect_retry_delay()).await;
                    } else {
                        return;
                    }
                }
            }
        }
    }

    /// Store a freshly connected session, unless a newer target won the race
    ///
    /// Returns the session's event receiver when installed, or `None` after
    /// tearing the fresh session down because it was superseded mid-connect.
    async fn install(
        &self,
        target: &str,
        generation: u64,
        session: UpstreamSession,
    ) -> Option<mpsc::Receiver<UpstreamEvent>> {
        let UpstreamSession {
            state,
            events,
            handle,
        } = session;

        let rejected = {
            let mut inner = self.inner.lock().await;
            if inner.generation == generation {
                inner.current = Some(ActiveSession {
                    target: target.to_string(),
                    generation,
                    state,
                    handle,
                    connected_at: Utc::now(),
                });
                None
            } else {
                Some(handle)
            }
        };

        match rejected {
            None => Some(events),
            Some(mut handle) => {
                debug!(target = %target, "Discarding connect superseded by a newer target");
                if let Err(e) = handle.disconnect().await {
                    debug!(target = %target, error = %e, "Teardown of superseded connect failed");
                }
                None
            }
        }
    }

    /// Forward upstream events into the relay pipeline until the session ends
    async fn pump_events(
        &self,
        mut events: mpsc::Receiver<UpstreamEvent>,
        generation: u64,
    ) -> SessionEnd {
        while let Some(event) = events.recv().await {
            if !self.is_current(generation).await {
                return SessionEnd::Superseded;
            }
            match event {
                UpstreamEvent::Event(kind, payload) => {
                    let event =
                        NormalizedEvent::from_payload(kind, &payload).classify(&self.classifier);
                    if self.events_tx.send(event).await.is_err() {
                        warn!("Relay pipeline closed, stopping session");
                        return SessionEnd::Superseded;
                    }
                }
                UpstreamEvent::Disconnected => return SessionEnd::Reconnect,
                UpstreamEvent::StreamEnded => return SessionEnd::Ended,
            }
        }
        // Channel closed without a terminal signal: torn down by a successor
        SessionEnd::Superseded
    }

    async fn is_current(&self, generation: u64) -> bool {
        self.inner.lock().await.generation == generation
    }

    /// Drop the stored session if it still belongs to this generation
    async fn clear_current(&self, generation: u64) {
        let mut inner = self.inner.lock().await;
        if inner
            .current
            .as_ref()
            .is_some_and(|s| s.generation == generation)
        {
            inner.current = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockConnector;

    fn test_upstream_config() -> UpstreamConfig {
        UpstreamConfig {
            url: "ws://127.0.0.1:8081/live".to_string(),
            connect_timeout_ms: 1000,
            reconnect_delay_ms: 20,
            retry_failed_connect: false,
            failed_connect_retry_ms: 20,
        }
    }

    fn manager_with(
        connector: Arc<MockConnector>,
    ) -> (Arc<SessionManager>, mpsc::Receiver<NormalizedEvent>) {
        let (events_tx, events_rx) = mpsc::channel(64);
        let manager = Arc::new(SessionManager::new(
            connector,
            Arc::new(BroadcastManager::new()),
            events_tx,
            test_upstream_config(),
            ClassifierOptions::default(),
        ));
        (manager, events_rx)
    }

    /// Poll until the active session matches the expected target
    async fn wait_for_target(manager: &SessionManager, expected: &str) {
        for _ in 0..200 {
            let status = manager.status().await;
            if status.active && status.target.as_deref() == Some(expected) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        panic!("session for {expected} never became active");
    }

    #[tokio::test]
    async fn test_empty_target_is_rejected() {
        let connector = Arc::new(MockConnector::new());
        let (manager, _events) = manager_with(Arc::clone(&connector));

        manager.set_target("  @  ", "client-1").await;
        tokio::task::yield_now().await;

        assert_eq!(connector.connect_count(), 0);
        assert!(!manager.status().await.active);
    }

    #[tokio::test]
    async fn test_target_is_normalized() {
        let connector = Arc::new(MockConnector::new());
        let (manager, _events) = manager_with(Arc::clone(&connector));

        manager.set_target(" @somehost ", "client-1").await;
        wait_for_target(&manager, "somehost").await;

        assert_eq!(connector.connect_targets(), vec!["somehost"]);
    }

    #[tokio::test]
    async fn test_failed_connect_without_retry_gives_up() {
        let connector = Arc::new(MockConnector::new());
        connector.push_failure("target is offline");
        let (manager, _events) = manager_with(Arc::clone(&connector));

        manager.set_target("somehost", "client-1").await;
        connector.wait_for_connects(1).await;
        tokio::time::sleep(std::time::Duration::from_millis(60)).await;

        assert_eq!(connector.connect_count(), 1);
        assert!(!manager.status().await.active);
    }

    #[tokio::test]
    async fn test_new_target_supersedes_previous_session() {
        let connector = Arc::new(MockConnector::new());
        let (manager, _events) = manager_with(Arc::clone(&connector));

        manager.set_target("first", "client-1").await;
        wait_for_target(&manager, "first").await;

        manager.set_target("second", "client-1").await;
        wait_for_target(&manager, "second").await;

        assert_eq!(connector.connect_targets(), vec!["first", "second"]);
        assert_eq!(connector.disconnect_count(), 1);
    }
}
