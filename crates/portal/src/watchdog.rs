// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Liveness beacons consumed by the external watchdog (§6). These are
//! plain file writes, not a network heartbeat — the watchdog restarts the
//! service if `/tmp/boxactivity` stops changing.

use std::fs;
use std::path::{Path, PathBuf};

/// Writes `/tmp/boxactivity` and `/tmp/running`. Disabled entirely when
/// `watchdog.enabled = false`, in which case every method is a no-op — the
/// FSM does not need to know whether the watchdog is configured.
pub struct Watchdog {
    enabled: bool,
    activity_path: PathBuf,
    running_path: PathBuf,
}

impl Watchdog {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            activity_path: PathBuf::from("/tmp/boxactivity"),
            running_path: PathBuf::from("/tmp/running"),
        }
    }

    #[cfg(test)]
    pub fn at(enabled: bool, dir: &Path) -> Self {
        Self {
            enabled,
            activity_path: dir.join("boxactivity"),
            running_path: dir.join("running"),
        }
    }

    /// Called on every loop iteration of every long-running FSM state, with
    /// a short token identifying what the loop is currently doing.
    pub fn beacon(&self, token: &str) {
        if !self.enabled {
            return;
        }
        // Best-effort: a watchdog write failure must never interrupt the FSM.
        let _ = fs::write(&self.activity_path, token);
    }

    /// Reflects whether the equipment is currently powered, consumed by the
    /// external watchdog and any out-of-band monitoring.
    pub fn set_running(&self, running: bool) {
        if !self.enabled {
            return;
        }
        let value = if running { "True" } else { "False" };
        let _ = fs::write(&self.running_path, value);
    }
}

#[cfg(test)]
#[path = "watchdog_tests.rs"]
mod tests;
