// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Literal-UID scenarios exercised entirely through `portal`'s public API,
//! verifying the crate's published surface — not its internals — composes
//! into a working session FSM.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use portal::card::{CardKind, Uid};
use portal::clock::{Clock, FakeClock};
use portal::reader::CardReader;
use portal::session::ExitReason;
use portal::test_support::FakeDirectory;

use portal_specs::{profile, Harness, PROXY_UID, SHUTDOWN_UID, UNAUTHORIZED_UID, USER_UID};

#[test]
fn shutdown_card_in_idle_halts_without_ever_powering_equipment() {
    let directory = FakeDirectory::new().with_profile(profile()).with_card(SHUTDOWN_UID, CardKind::Shutdown);
    let mut harness = Harness::new(directory, [Some(SHUTDOWN_UID)]);

    let reason = harness.run();

    assert_eq!(reason, ExitReason::ShutdownCard);
    assert!(harness.hal.power_history.is_empty(), "equipment was never energized");
    assert_eq!(harness.directory.shutdowns.lock().expect("lock").as_slice(), [(profile().equipment_id, Some(SHUTDOWN_UID))]);
}

#[test]
fn authorized_session_ends_cleanly_when_a_shutdown_card_is_presented_mid_session() {
    let directory = FakeDirectory::new()
        .with_profile(profile())
        .with_card(USER_UID, CardKind::User)
        .with_card(SHUTDOWN_UID, CardKind::Shutdown)
        .with_authorization(USER_UID, profile().equipment_type_id, true);
    let mut harness = Harness::new(directory, [Some(USER_UID), Some(SHUTDOWN_UID)]);

    let reason = harness.run();

    assert_eq!(reason, ExitReason::ShutdownCard);
    assert_eq!(harness.hal.power_history, vec![true, false]);
    assert_eq!(
        harness.directory.access_completions.lock().expect("lock").as_slice(),
        [(USER_UID, profile().equipment_id)]
    );
    assert_eq!(harness.directory.shutdowns.lock().expect("lock").as_slice(), [(profile().equipment_id, Some(SHUTDOWN_UID))]);
}

#[test]
fn unauthorized_card_is_logged_and_rejected_without_powering_equipment() {
    let directory = FakeDirectory::new()
        .with_profile(profile())
        .with_card(UNAUTHORIZED_UID, CardKind::User)
        .with_card(SHUTDOWN_UID, CardKind::Shutdown);
    // Idle reads the unauthorized card, `unauthorized_removal` waits for it
    // to be taken away, then a shutdown card ends the scenario.
    let mut harness = Harness::new(directory, [Some(UNAUTHORIZED_UID), None, Some(SHUTDOWN_UID)]);

    let reason = harness.run();

    assert_eq!(reason, ExitReason::ShutdownCard);
    assert!(harness.hal.power_history.is_empty());
    assert_eq!(
        harness.directory.access_attempts.lock().expect("lock").as_slice(),
        [(UNAUTHORIZED_UID, profile().equipment_id, false)]
    );
}

#[test]
fn a_proxy_card_presented_directly_in_idle_is_unauthorized() {
    // §4.1: proxy/training cards only have meaning as a hand-off accepted
    // from inside an already-running session's grace period.
    let directory = FakeDirectory::new()
        .with_profile(profile())
        .with_card(PROXY_UID, CardKind::Proxy)
        .with_card(SHUTDOWN_UID, CardKind::Shutdown);
    let mut harness = Harness::new(directory, [Some(PROXY_UID), None, Some(SHUTDOWN_UID)]);

    let reason = harness.run();

    assert_eq!(reason, ExitReason::ShutdownCard);
    assert_eq!(
        harness.directory.access_attempts.lock().expect("lock").as_slice(),
        [(PROXY_UID, profile().equipment_id, false)]
    );
}

/// A [`CardReader`] implemented outside the crate, demonstrating the trait
/// really is usable by a third party: it clears a shared `running` flag
/// the moment it's asked for a card, simulating a SIGTERM that lands
/// while the box is still waiting in `Idle`.
struct StopOnFirstRead {
    running: Arc<AtomicBool>,
}

impl CardReader for StopOnFirstRead {
    fn read(&mut self) -> Option<Uid> {
        self.running.store(false, Ordering::Relaxed);
        None
    }
}

#[test]
fn a_third_party_card_reader_can_drive_a_clean_signal_exit() {
    let directory = FakeDirectory::new().with_profile(profile());
    let harness = Harness::new(directory, []);
    let reader = StopOnFirstRead { running: Arc::clone(&harness.running) };
    let mut harness = harness.with_reader(reader);

    let reason = harness.run();

    assert_eq!(reason, ExitReason::Signal);
}

/// A [`Clock`] implemented outside the crate, clearing `running` the
/// moment `identify` first sleeps between profile lookups — simulating a
/// SIGTERM landing before the directory ever assigns this box a profile.
struct ClearRunningOnSleep {
    inner: FakeClock,
    running: Arc<AtomicBool>,
}

impl Clock for ClearRunningOnSleep {
    fn now(&self) -> Instant {
        self.inner.now()
    }

    fn sleep(&self, duration: Duration) {
        self.running.store(false, Ordering::Relaxed);
        self.inner.sleep(duration);
    }
}

#[test]
fn no_profile_before_a_signal_exits_with_no_profile() {
    let directory = FakeDirectory::new(); // no profile ever assigned
    let mut harness = Harness::new(directory, []);
    let clock = ClearRunningOnSleep { inner: FakeClock::new(), running: Arc::clone(&harness.running) };
    harness = harness.with_clock(clock);

    let reason = harness.run();

    assert_eq!(reason, ExitReason::NoProfile);
}
