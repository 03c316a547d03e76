//! Time-windowed batch coalescing for normalized events
//!
//! The buffer bounds the emission rate toward subscribers regardless of the
//! upstream burst rate: a flush happens only when the configured minimum
//! interval has elapsed since the previous one, and only when there is
//! something to flush. Nothing is ever dropped; the policy throttles
//! emission frequency, not volume.

use std::mem;
use std::time::Duration;

use tokio::time::Instant;

use crate::models::NormalizedEvent;

/// In-memory event buffer with a minimum-interval flush policy
#[derive(Debug)]
pub struct BatchBuffer {
    events: Vec<NormalizedEvent>,
    min_interval: Duration,
    last_flush: Instant,
}

impl BatchBuffer {
    /// Create a buffer with the given minimum flush interval
    pub fn new(min_interval: Duration) -> Self {
        Self {
            events: Vec::new(),
            min_interval,
            // Backdate so the first event can flush without waiting a full interval
            last_flush: Instant::now() - min_interval,
        }
    }

    /// Append an event in arrival order
    pub fn enqueue(&mut self, event: NormalizedEvent) {
        self.events.push(event);
    }

    /// Number of buffered events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the buffer holds no events
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Flush the buffer if the interval has elapsed and it is non-empty
    ///
    /// Atomically removes and returns the entire sequence, resetting the
    /// last-flush timestamp. Empty buffers never flush.
    pub fn maybe_flush(&mut self, now: Instant) -> Option<Vec<NormalizedEvent>> {
        if self.events.is_empty() || now.duration_since(self.last_flush) < self.min_interval {
            return None;
        }
        self.last_flush = now;
        Some(mem::take(&mut self.events))
    }

    /// Drain whatever is buffered, ignoring the interval
    ///
    /// Used on shutdown so buffered events are not lost.
    pub fn drain(&mut self) -> Option<Vec<NormalizedEvent>> {
        if self.events.is_empty() {
            return None;
        }
        self.last_flush = Instant::now();
        Some(mem::take(&mut self.events))
    }
}
