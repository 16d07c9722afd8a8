// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Non-blocking, coalesced consumption of asynchronous button presses.
//!
//! The GPIO edge-detection callback runs on its own worker and only ever
//! timestamps-and-enqueues (§4.4, §5). The FSM thread is the sole consumer
//! and drains the queue through [`ButtonQueue::has_been_pressed`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::clock::Clock;

/// Default staleness window used when callers do not specify one.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(9);

/// Capacity of the rising-edge FIFO. Overflow policy is drop-newest: once
/// full, further edges are silently discarded since presses are only used
/// as level triggers, not as a counted event stream.
pub const CAPACITY: usize = 16;

/// Thread-safe FIFO of rising-edge timestamps.
///
/// Cloning shares the underlying queue — the GPIO callback thread holds one
/// handle, the FSM thread holds another.
#[derive(Clone)]
pub struct ButtonQueue {
    inner: Arc<Mutex<VecDeque<Instant>>>,
}

impl ButtonQueue {
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(VecDeque::with_capacity(CAPACITY))) }
    }

    /// Called from the edge-detection callback. Drops the event if the
    /// queue is already at capacity.
    pub fn record_press(&self, at: Instant) {
        #[allow(clippy::unwrap_used)]
        let mut queue = self.inner.lock().unwrap();
        if queue.len() >= CAPACITY {
            return;
        }
        queue.push_back(at);
    }

    /// Drains the queue, discarding entries older than `max_age` and
    /// returning `true` as soon as one within the window is found.
    ///
    /// Consumes every entry examined: a later call will not see events this
    /// call already looked at, whether or not they were fresh enough to
    /// report.
    pub fn has_been_pressed(&self, clock: &dyn Clock, max_age: Duration) -> bool {
        let now = clock.now();
        #[allow(clippy::unwrap_used)]
        let mut queue = self.inner.lock().unwrap();
        let mut pressed = false;
        while let Some(at) = queue.pop_front() {
            if now.saturating_duration_since(at) < max_age {
                pressed = true;
            }
        }
        pressed
    }

    /// Drains and discards any pending events without reporting them,
    /// matching the "clear pending events" step required at the entry of
    /// every state that later calls `has_been_pressed` (§4.1 policy).
    pub fn clear(&self) {
        #[allow(clippy::unwrap_used)]
        let mut queue = self.inner.lock().unwrap();
        queue.clear();
    }
}

impl Default for ButtonQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "button_tests.rs"]
mod tests;
