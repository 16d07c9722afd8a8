// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process harness for black-box tests of the `portal` crate's public
//! surface.
//!
//! `portalbox` only runs meaningfully on a Raspberry Pi with the RFID
//! reader, LED strip, interlock relay, and directory all wired up, so
//! there is no host this crate could build the `portalbox` binary and
//! spawn as a subprocess against. Instead this harness builds the same
//! [`Fsm`] the daemon's `main` constructs, wired to `portal::test_support`'s
//! fakes, and drives it entirely through the crate's public API — no
//! `super::*` access to crate-internal items the way `portal`'s own
//! `fsm_tests.rs` has. A test here failing to compile is a signal that
//! something `fsm_tests.rs` depends on was accidentally left private.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use portal::button::ButtonQueue;
use portal::card::Uid;
use portal::clock::{Clock, FakeClock};
use portal::directory::Profile;
use portal::reader::CardReader;
use portal::session::{ExitReason, Fsm};
use portal::test_support::{FakeCardReader, FakeDirectory, FakeDisplay, FakeHal, FakeNotifier};
use portal::watchdog::Watchdog;

/// MAC address every scenario's `FakeDirectory` is keyed on.
pub const MAC: &str = "aa:bb:cc:dd:ee:ff";

/// The UIDs §8's worked scenarios are written against, preserved verbatim
/// so a reader can cross-reference a failing assertion against that table.
pub const SHUTDOWN_UID: Uid = 550_014_053;
pub const USER_UID: Uid = 1_626_651_146;
pub const PROXY_UID: Uid = 2_232_841_801;
pub const TRAINING_UID: Uid = 1_709_165_641;
pub const UNAUTHORIZED_UID: Uid = 362_577_737;

/// A typical equipment profile: no session time limit.
pub fn profile() -> Profile {
    Profile {
        equipment_id: 1,
        equipment_type_id: 10,
        equipment_type: "3D Printer".to_string(),
        location_id: 2,
        location: "Main Shop".to_string(),
        timeout_minutes: 0,
    }
}

/// Every collaborator the session FSM needs, wired to fakes. Owns its
/// `running` flag so a test can clear it mid-scenario the same way a
/// SIGTERM would.
pub struct Harness {
    pub hal: FakeHal,
    pub reader: Box<dyn CardReader>,
    pub display: FakeDisplay,
    pub directory: FakeDirectory,
    pub notifier: FakeNotifier,
    pub buttons: ButtonQueue,
    pub clock: Box<dyn Clock>,
    pub watchdog: Watchdog,
    pub running: Arc<AtomicBool>,
}

impl Harness {
    /// Builds a harness around `directory` and a reader scripted with
    /// `reads`, ready for `run()`.
    pub fn new(directory: FakeDirectory, reads: impl IntoIterator<Item = Option<Uid>>) -> Self {
        Self {
            hal: FakeHal::new(),
            reader: Box::new(FakeCardReader::new(reads)),
            display: FakeDisplay::new(),
            directory,
            notifier: FakeNotifier::new(),
            buttons: ButtonQueue::new(),
            clock: Box::new(FakeClock::new()),
            watchdog: Watchdog::new(false),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Swaps in a different [`CardReader`] — e.g. one implemented outside
    /// this crate entirely, to prove the trait is usable by a third party.
    pub fn with_reader(mut self, reader: impl CardReader + 'static) -> Self {
        self.reader = Box::new(reader);
        self
    }

    /// Swaps in a different [`Clock`] — e.g. one that clears `running` as
    /// a side effect of sleeping, to simulate a signal arriving mid-wait.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Runs the FSM against [`MAC`] to completion.
    pub fn run(&mut self) -> ExitReason {
        let mut fsm = Fsm::new(
            &mut self.hal,
            &mut self.reader,
            &self.display,
            &self.directory,
            &self.notifier,
            &self.buttons,
            self.clock.as_ref(),
            &self.watchdog,
            Arc::clone(&self.running),
        );
        fsm.run(MAC)
    }

    /// Clears `running`, as a signal handler would on SIGINT/SIGTERM.
    pub fn signal_shutdown(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}
