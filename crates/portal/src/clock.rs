// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A tiny clock abstraction so the session FSM's wall-clock deadlines
//! (grace periods, timeouts, button-event ages) can be driven by a fake
//! clock in tests instead of real sleeps.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Anything that can tell the time and sleep. The real implementation
/// forwards to `std::time`/`std::thread::sleep`; tests substitute
/// [`FakeClock`], which advances only when told to.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Forwards to the operating system's clock. Used in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// A clock that only advances when [`FakeClock::advance`] is called.
/// `sleep` advances the clock immediately rather than blocking the thread,
/// so FSM tests run at the speed of the test, not of the grace periods
/// they exercise.
#[derive(Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<Instant>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(Instant::now())) }
    }

    pub fn advance(&self, duration: Duration) {
        #[allow(clippy::unwrap_used)]
        let mut guard = self.inner.lock().unwrap();
        *guard += duration;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        #[allow(clippy::unwrap_used)]
        let guard = self.inner.lock().unwrap();
        *guard
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
