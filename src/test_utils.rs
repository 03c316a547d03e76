//! Test utilities for liverelay
//!
//! This module provides mock implementations and payload builders for testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::upstream::{
    SessionState, UpstreamConnector, UpstreamEvent, UpstreamHandle, UpstreamSession,
};

/// Scripted result for one mock connect attempt
#[derive(Debug, Clone)]
pub enum ConnectOutcome {
    Success(SessionState),
    Failure(String),
}

/// Mock implementation of UpstreamConnector for testing
///
/// Connect attempts consume scripted outcomes in order; once the script is
/// exhausted every attempt succeeds with a default session state. Each
/// successful connect exposes its event sender so tests can drive the
/// session from the outside.
pub struct MockConnector {
    outcomes: Mutex<VecDeque<ConnectOutcome>>,
    targets: Mutex<Vec<String>>,
    disconnects: Arc<AtomicUsize>,
    event_senders: Mutex<Vec<mpsc::WeakSender<UpstreamEvent>>>,
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnector {
    /// Create a mock connector where every connect succeeds
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            targets: Mutex::new(Vec::new()),
            disconnects: Arc::new(AtomicUsize::new(0)),
            event_senders: Mutex::new(Vec::new()),
        }
    }

    /// Script the next connect attempt to fail with the given reason
    pub fn push_failure(&self, reason: &str) {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(ConnectOutcome::Failure(reason.to_string()));
    }

    /// Script the next connect attempt to succeed with the given state
    pub fn push_success(&self, state: SessionState) {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(ConnectOutcome::Success(state));
    }

    /// Targets of every connect attempt so far, in order
    pub fn connect_targets(&self) -> Vec<String> {
        self.targets.lock().unwrap().clone()
    }

    /// Number of connect attempts so far
    pub fn connect_count(&self) -> usize {
        self.targets.lock().unwrap().len()
    }

    /// Number of disconnect calls across all handed-out handles
    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// Event sender of the most recent successful connect, if still alive
    pub fn latest_events(&self) -> Option<mpsc::Sender<UpstreamEvent>> {
        self.event_senders
            .lock()
            .unwrap()
            .last()
            .and_then(|weak| weak.upgrade())
    }

    /// Block until at least `n` connect attempts have been made
    ///
    /// Panics after one second to keep a broken test from hanging.
    pub async fn wait_for_connects(&self, n: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        while self.connect_count() < n {
            if tokio::time::Instant::now() > deadline {
                panic!("timed out waiting for {n} connect attempts");
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }
}

#[async_trait]
impl UpstreamConnector for MockConnector {
    async fn connect(&self, target: &str) -> Result<UpstreamSession> {
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                ConnectOutcome::Success(SessionState {
                    room_id: Some("mock-room".to_string()),
                    extra: Default::default(),
                })
            });

        self.targets.lock().unwrap().push(target.to_string());

        match outcome {
            ConnectOutcome::Failure(reason) => Err(Error::connection(reason)),
            ConnectOutcome::Success(state) => {
                let (tx, rx) = mpsc::channel(64);
                self.event_senders.lock().unwrap().push(tx.downgrade());
                Ok(UpstreamSession {
                    state,
                    events: rx,
                    handle: Box::new(MockHandle {
                        disconnects: Arc::clone(&self.disconnects),
                        sender: Some(tx),
                    }),
                })
            }
        }
    }
}

/// Handle for a mock session; dropping the held sender closes the event
/// channel once no test-side clone remains
struct MockHandle {
    disconnects: Arc<AtomicUsize>,
    sender: Option<mpsc::Sender<UpstreamEvent>>,
}

#[async_trait]
impl UpstreamHandle for MockHandle {
    async fn disconnect(&mut self) -> Result<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.sender.take();
        Ok(())
    }
}

/// Build a chat event payload in the upstream wire shape
pub fn chat_payload(unique_id: &str, comment: &str) -> Value {
    json!({
        "uniqueId": unique_id,
        "nickname": unique_id,
        "profilePictureUrl": format!("https://cdn.example/{unique_id}.jpg"),
        "comment": comment,
        "isFollower": false,
    })
}

/// Build a gift event payload in the upstream wire shape
pub fn gift_payload(unique_id: &str, gift_name: &str, repeat_count: u64) -> Value {
    json!({
        "uniqueId": unique_id,
        "nickname": unique_id,
        "giftName": gift_name,
        "repeatCount": repeat_count,
    })
}

/// Build a viewer-count payload in the upstream wire shape
pub fn room_user_payload(viewer_count: u64) -> Value {
    json!({ "viewerCount": viewer_count })
}
