//! Relay core for liverelay
//!
//! This module provides:
//! - The batch buffer with its time-windowed coalescing policy
//! - The pipeline task feeding flushed batches to the broadcast gateway
//! - The session manager supervising the single upstream connection

mod batch;
mod session;

pub use batch::BatchBuffer;
pub use session::{SessionManager, SessionStatus};

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::{FlushTrigger, RelayConfig};
use crate::gateway::{BroadcastManager, Outbound};
use crate::models::NormalizedEvent;

/// Depth of the channel between session event pumps and the pipeline task
const PIPELINE_CHANNEL_DEPTH: usize = 1024;

/// Spawn the pipeline task that owns the batch buffer
///
/// Events sent on the returned channel are buffered and flushed to all
/// subscribers under the configured coalescing policy. One task owns the
/// buffer, so arrival order is preserved end to end. When the last sender
/// is dropped the task drains the buffer and exits; no event is lost.
pub fn spawn_pipeline(
    gateway: Arc<BroadcastManager>,
    config: &RelayConfig,
) -> mpsc::Sender<NormalizedEvent> {
    let (tx, mut rx) = mpsc::channel::<NormalizedEvent>(PIPELINE_CHANNEL_DEPTH);
    let interval = config.flush_interval();
    let trigger = config.trigger().unwrap_or(FlushTrigger::Enqueue);

    tokio::spawn(async move {
        let mut buffer = BatchBuffer::new(interval);
        let mut tick = tokio::time::interval(interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => {
                        buffer.enqueue(event);
                        if trigger == FlushTrigger::Enqueue {
                            flush_ready(&mut buffer, &gateway).await;
                        }
                    },
                    None => break,
                },
                _ = tick.tick(), if trigger == FlushTrigger::Interval => {
                    flush_ready(&mut buffer, &gateway).await;
                },
            }
        }

        // Final drain so buffered events survive shutdown
        if let Some(events) = buffer.drain() {
            debug!(count = events.len(), "Draining buffer on pipeline shutdown");
            gateway.broadcast(&Outbound::Batch { events }).await;
        }
        info!("Pipeline stopped");
    });

    tx
}

/// Flush the buffer if its policy allows, broadcasting the batch
async fn flush_ready(buffer: &mut BatchBuffer, gateway: &BroadcastManager) {
    if let Some(events) = buffer.maybe_flush(Instant::now()) {
        debug!(count = events.len(), "Flushing batch");
        gateway.broadcast(&Outbound::Batch { events }).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ClientConnection;
    use crate::models::EventKind;
    use serde_json::{json, Value};
    use std::time::Duration;

    fn test_relay_config(trigger: &str) -> RelayConfig {
        RelayConfig {
            flush_interval_ms: 20,
            flush_trigger: trigger.to_string(),
            guess_requires_follower: false,
            max_send_queue: 64,
        }
    }

    fn event(user: &str) -> NormalizedEvent {
        NormalizedEvent::from_payload(EventKind::Chat, &json!({ "userId": user, "comment": "hi" }))
    }

    async fn subscribe(
        gateway: &BroadcastManager,
        id: &str,
    ) -> mpsc::Receiver<Arc<String>> {
        let (tx, rx) = mpsc::channel(64);
        gateway.add(Arc::new(ClientConnection::new(id.into(), tx))).await;
        rx
    }

    fn batch_events(msg: &str) -> Vec<Value> {
        let parsed: Value = serde_json::from_str(msg).unwrap();
        assert_eq!(parsed["type"], "batch");
        parsed["events"].as_array().unwrap().clone()
    }

    #[tokio::test]
    async fn pipeline_delivers_all_events_in_order() {
        let gateway = Arc::new(BroadcastManager::new());
        let mut rx = subscribe(&gateway, "c1").await;
        let tx = spawn_pipeline(Arc::clone(&gateway), &test_relay_config("enqueue"));

        for i in 0..10 {
            tx.send(event(&format!("u{}", i))).await.unwrap();
        }
        drop(tx);

        // Collect until the pipeline drains on shutdown
        let mut seen = Vec::new();
        while seen.len() < 10 {
            let msg = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .expect("timed out waiting for batches")
                .expect("gateway channel closed");
            seen.extend(batch_events(&msg));
        }

        assert_eq!(seen.len(), 10);
        for (i, ev) in seen.iter().enumerate() {
            assert_eq!(ev["userId"], format!("u{}", i));
        }
    }

    #[tokio::test]
    async fn pipeline_coalesces_bursts() {
        let gateway = Arc::new(BroadcastManager::new());
        let mut rx = subscribe(&gateway, "c1").await;
        let tx = spawn_pipeline(Arc::clone(&gateway), &test_relay_config("enqueue"));

        // A burst faster than the flush interval
        for i in 0..20 {
            tx.send(event(&format!("u{}", i))).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(60)).await;
        drop(tx);

        let mut batches = 0usize;
        let mut total = 0usize;
        while total < 20 {
            let msg = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .expect("timed out waiting for batches")
                .expect("gateway channel closed");
            batches += 1;
            total += batch_events(&msg).len();
        }

        assert_eq!(total, 20);
        // Coalescing must produce fewer emissions than events
        assert!(batches < 20, "expected coalescing, got {} batches", batches);
    }

    #[tokio::test]
    async fn pipeline_interval_mode_flushes_on_tick() {
        let gateway = Arc::new(BroadcastManager::new());
        let mut rx = subscribe(&gateway, "c1").await;
        let tx = spawn_pipeline(Arc::clone(&gateway), &test_relay_config("interval"));

        tx.send(event("u0")).await.unwrap();

        let msg = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for tick flush")
            .expect("gateway channel closed");
        let events = batch_events(&msg);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["userId"], "u0");
    }

    #[tokio::test]
    async fn pipeline_never_broadcasts_empty_batches() {
        let gateway = Arc::new(BroadcastManager::new());
        let mut rx = subscribe(&gateway, "c1").await;
        let tx = spawn_pipeline(Arc::clone(&gateway), &test_relay_config("interval"));

        // Several ticks pass with nothing enqueued
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());
        drop(tx);
    }
}
