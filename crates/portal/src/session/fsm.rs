// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The access FSM's run loop (§4.1). All waits are wall-clock deadlines
//! driven through [`Clock`], never loop counts, so [`crate::clock::FakeClock`]
//! can drive a test through a 10 s grace period instantly.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::button::{ButtonQueue, DEFAULT_MAX_AGE};
use crate::card::{CardKind, Uid};
use crate::clock::Clock;
use crate::directory::{Directory, Profile};
use crate::display::{Color, Display};
use crate::gpio::Hal;
use crate::notifier::Notifier;
use crate::reader::CardReader;
use crate::watchdog::Watchdog;

use super::{Session, State};

const POLL_TICK: Duration = Duration::from_millis(100);
const GRACE_REMOVAL_DURATION: Duration = Duration::from_secs(10);
const GRACE_TIMEOUT_DURATION: Duration = Duration::from_secs(10);
const IDENTIFY_POLL: Duration = Duration::from_secs(5);
/// Buzzer chirps once every this many poll ticks during both grace states.
const BUZZER_CHIRP_EVERY: u32 = 20;
const BOOT_WIPE_MS: u32 = 10;
const FORGOTTEN_WIPE_MS: u32 = 50;
const UNAUTH_FLASH_MS: u32 = 100;

const RED: Color = Color { r: 0xFF, g: 0x00, b: 0x00 };
const GREEN: Color = Color { r: 0x00, g: 0xFF, b: 0x00 };
const YELLOW: Color = Color { r: 0xFF, g: 0xFF, b: 0x00 };
const BLUE: Color = Color { r: 0x00, g: 0x00, b: 0xFF };
const ORANGE: Color = Color { r: 0xDF, g: 0x20, b: 0x00 };
const PURPLE: Color = Color { r: 0x80, g: 0x00, b: 0x80 };

/// Why [`Fsm::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// A shutdown card was presented; the caller should halt the OS.
    ShutdownCard,
    /// SIGINT/SIGTERM after the box was already identified and running —
    /// a clean shutdown, exit code 0 (§6).
    Signal,
    /// `running` was cleared before `Identify` ever found a profile. The
    /// box never did useful work; the caller exits with code 1 (§6).
    NoProfile,
}

/// How [`Fsm::grace_removal`] was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GraceOutcome {
    /// The authorized card, a proxy, or a valid training hand-off
    /// resumed the session.
    Resumed,
    /// The button ended the session, or the 10 s window expired.
    Ended,
    /// A shutdown card was presented during grace; carries its UID so the
    /// caller can log it against the right card.
    Shutdown(Uid),
}

/// Everything the FSM needs to run one box. Borrowed, not owned: `main`
/// constructs the hardware/directory/notifier handles, builds one `Fsm`
/// around references to them, and calls [`Fsm::run`] once.
pub struct Fsm<'a> {
    pub hal: &'a mut dyn Hal,
    pub reader: &'a mut dyn CardReader,
    pub display: &'a dyn Display,
    pub directory: &'a dyn Directory,
    pub notifier: &'a dyn Notifier,
    pub buttons: &'a ButtonQueue,
    pub clock: &'a dyn Clock,
    pub watchdog: &'a Watchdog,
    pub running: Arc<AtomicBool>,
    state: Cell<State>,
}

impl<'a> Fsm<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        hal: &'a mut dyn Hal,
        reader: &'a mut dyn CardReader,
        display: &'a dyn Display,
        directory: &'a dyn Directory,
        notifier: &'a dyn Notifier,
        buttons: &'a ButtonQueue,
        clock: &'a dyn Clock,
        watchdog: &'a Watchdog,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            hal,
            reader,
            display,
            directory,
            notifier,
            buttons,
            clock,
            watchdog,
            running,
            state: Cell::new(State::Boot),
        }
    }

    /// The current high-level state, for logging and tests.
    pub fn state(&self) -> State {
        self.state.get()
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Runs until a shutdown card is read or `running` is cleared.
    pub fn run(&mut self, mac: &str) -> ExitReason {
        self.boot();

        let Some(profile) = self.identify(mac) else {
            self.state.set(State::Shutdown);
            return ExitReason::NoProfile;
        };

        self.directory.log_started(profile.equipment_id);
        self.display.wipe(GREEN, BOOT_WIPE_MS);
        self.display.sleep();
        let timeout = timeout_for(&profile);

        loop {
            self.state.set(State::Idle);
            if !self.is_running() {
                self.directory.log_shutdown(profile.equipment_id, None);
                self.state.set(State::Shutdown);
                return ExitReason::Signal;
            }

            self.watchdog.beacon("wait_for_a_card");
            let Some(uid) = self.reader.read() else {
                self.clock.sleep(POLL_TICK);
                continue;
            };

            if let Some(reason) = self.classify_and_handle(&profile, timeout, uid) {
                self.state.set(State::Shutdown);
                return reason;
            }
        }
    }

    fn boot(&mut self) {
        self.state.set(State::Boot);
        self.watchdog.beacon("portalbox_init");
        self.watchdog.set_running(false);
        self.display.wipe(RED, BOOT_WIPE_MS);
        self.display.wipe(ORANGE, BOOT_WIPE_MS);
    }

    fn identify(&mut self, mac: &str) -> Option<Profile> {
        self.state.set(State::Identify);
        loop {
            if !self.is_running() {
                return None;
            }
            self.watchdog.beacon("equipment_profile");
            if let Some(profile) = self.directory.get_equipment_profile(mac) {
                return Some(profile);
            }
            self.clock.sleep(IDENTIFY_POLL);
        }
    }

    /// A card was read in `Idle`: classify it and act. Returns `Some` when
    /// the FSM should stop entirely — either this card is a shutdown card,
    /// or one was presented later, mid-session.
    fn classify_and_handle(&mut self, profile: &Profile, timeout: Option<Duration>, uid: Uid) -> Option<ExitReason> {
        self.state.set(State::Classify);
        let kind = self.directory.get_card_type(uid);

        match kind {
            CardKind::Shutdown => {
                self.directory.log_shutdown(profile.equipment_id, Some(uid));
                self.hal.set_equipment_power(false);
                self.watchdog.set_running(false);
                self.display.set_color(Color::BLACK);
                Some(ExitReason::ShutdownCard)
            }
            CardKind::User => {
                let reason = if self.directory.is_user_authorized(uid, profile.equipment_type_id) {
                    let is_trainer = self.directory.is_user_trainer(uid);
                    self.run_session(profile, timeout, uid, is_trainer)
                } else {
                    self.directory.log_access_attempt(uid, profile.equipment_id, false);
                    self.unauthorized_removal();
                    None
                };
                self.display.sleep();
                reason
            }
            // §4.1: a proxy or training card presented directly in Idle
            // (no prior trainer session) is unauthorized, as is any
            // card the directory does not recognize.
            CardKind::Proxy | CardKind::Training | CardKind::Unknown => {
                self.directory.log_access_attempt(uid, profile.equipment_id, false);
                self.unauthorized_removal();
                self.display.sleep();
                None
            }
        }
    }

    fn unauthorized_removal(&mut self) {
        self.state.set(State::UnauthorizedRemoval);
        loop {
            if !self.is_running() {
                return;
            }
            self.watchdog.beacon("unauthorized_removal");
            self.display.blink(RED, UNAUTH_FLASH_MS, 1);
            if self.reader.read().is_none() {
                return;
            }
        }
    }

    fn run_session(&mut self, profile: &Profile, timeout: Option<Duration>, uid: Uid, is_trainer: bool) -> Option<ExitReason> {
        self.state.set(State::RunSession);
        self.directory.log_access_attempt(uid, profile.equipment_id, true);

        self.hal.set_buzzer(true);
        self.clock.sleep(Duration::from_millis(50));
        self.hal.set_buzzer(false);

        self.display.set_color(GREEN);
        self.hal.set_equipment_power(true);
        self.watchdog.set_running(true);

        let mut session = Session::new(uid, is_trainer, self.clock.now());
        let mut shutdown_uid = None;

        loop {
            self.state.set(State::RunSession);
            if !self.is_running() {
                break;
            }
            self.watchdog.beacon("run_session");

            if let Some(timeout) = timeout {
                if self.clock.now().saturating_duration_since(session.start_time) >= timeout {
                    if !self.grace_timeout(profile, &mut session, timeout) {
                        break;
                    }
                    continue;
                }
            }

            match self.reader.read() {
                Some(read_uid) if read_uid == session.authorized_uid || Some(read_uid) == session.proxy_uid => {
                    self.clock.sleep(POLL_TICK);
                }
                Some(read_uid) if self.directory.get_card_type(read_uid) == CardKind::Shutdown => {
                    shutdown_uid = Some(read_uid);
                    break;
                }
                _ => match self.grace_removal(profile, &mut session) {
                    GraceOutcome::Resumed => {}
                    GraceOutcome::Ended => break,
                    GraceOutcome::Shutdown(uid) => {
                        shutdown_uid = Some(uid);
                        break;
                    }
                },
            }
        }

        self.hal.set_equipment_power(false);
        self.watchdog.set_running(false);
        self.directory.log_access_completion(session.authorized_uid, profile.equipment_id);

        shutdown_uid.map(|uid| {
            self.directory.log_shutdown(profile.equipment_id, Some(uid));
            self.display.set_color(Color::BLACK);
            ExitReason::ShutdownCard
        })
    }

    /// The user's card went missing mid-session (§4.1 `GraceRemoval`,
    /// 10 s). A shutdown card presented during grace takes priority over
    /// every other resolution, matching §4.1's "shutdown card in any
    /// state" rule.
    fn grace_removal(&mut self, profile: &Profile, session: &mut Session) -> GraceOutcome {
        self.state.set(State::GraceRemoval);
        self.buttons.clear();
        let deadline = self.clock.now() + GRACE_REMOVAL_DURATION;
        let mut tick: u32 = 0;

        while self.is_running() && self.clock.now() < deadline {
            self.watchdog.beacon("grace_removal");

            if self.buttons.has_been_pressed(self.clock, DEFAULT_MAX_AGE) {
                self.hal.set_buzzer(false);
                return GraceOutcome::Ended;
            }

            if let Some(read_uid) = self.reader.read() {
                if read_uid == session.authorized_uid {
                    self.hal.set_buzzer(false);
                    self.resume_display(session);
                    return GraceOutcome::Resumed;
                }

                let kind = self.directory.get_card_type(read_uid);

                if kind == CardKind::Shutdown {
                    self.hal.set_buzzer(false);
                    return GraceOutcome::Shutdown(read_uid);
                }

                if session.proxy_uid.is_none() && !session.training_mode && kind == CardKind::Proxy {
                    session.accept_proxy(read_uid);
                    self.hal.set_buzzer(false);
                    self.resume_display(session);
                    return GraceOutcome::Resumed;
                }

                if session.proxy_uid.is_none()
                    && session.user_is_trainer
                    && kind == CardKind::Training
                    && self.directory.is_training_card_for(read_uid, profile.equipment_type_id)
                {
                    session.start_training(read_uid);
                    self.directory.log_access_attempt(read_uid, profile.equipment_id, true);
                    self.hal.set_buzzer(false);
                    self.resume_display(session);
                    return GraceOutcome::Resumed;
                }
            }

            self.hal.set_buzzer(tick % BUZZER_CHIRP_EVERY == 0);
            self.display.blink(YELLOW, 100, 1);
            tick += 1;
            self.clock.sleep(POLL_TICK);
        }

        self.hal.set_buzzer(false);
        GraceOutcome::Ended
    }

    fn resume_display(&self, session: &Session) {
        let color = if session.proxy_uid.is_some() {
            ORANGE
        } else if session.training_mode {
            PURPLE
        } else {
            GREEN
        };
        self.display.set_color(color);
    }

    /// Usage time has been exceeded (§4.1 `GraceTimeout`, 10 s). Returns
    /// `true` if the button renewed the session, `false` if it ended
    /// (button-with-no-card, or the timer expiring outright).
    fn grace_timeout(&mut self, profile: &Profile, session: &mut Session, _timeout: Duration) -> bool {
        self.state.set(State::GraceTimeout);
        self.buttons.clear();
        self.display.set_color(ORANGE);
        let deadline = self.clock.now() + GRACE_TIMEOUT_DURATION;
        let mut tick: u32 = 0;

        while self.is_running() && self.clock.now() < deadline {
            self.watchdog.beacon("grace_timeout");

            if self.buttons.has_been_pressed(self.clock, DEFAULT_MAX_AGE) {
                if self.reader.read().is_some() {
                    session.renew(self.clock.now());
                    self.resume_display(session);
                    return true;
                }
                self.hal.set_buzzer(false);
                return false;
            }

            self.hal.set_buzzer(tick % BUZZER_CHIRP_EVERY == 0);
            tick += 1;
            self.clock.sleep(POLL_TICK);
        }

        self.hal.set_buzzer(false);
        self.hal.set_equipment_power(false);
        self.watchdog.set_running(false);

        if self.reader.read().is_some() {
            self.forgotten_card(profile, session);
        }
        false
    }

    /// Grace expired with the card still physically present (§4.1
    /// `ForgottenCard`): notify the user and wait for them to come back
    /// for it.
    fn forgotten_card(&mut self, profile: &Profile, session: &Session) {
        self.state.set(State::ForgottenCard);
        self.display.wipe(BLUE, FORGOTTEN_WIPE_MS);

        if let Some(user) = self.directory.get_user(session.authorized_uid) {
            self.notifier.notify_forgotten_card(&user.email, &user.name, &profile.equipment_type, &profile.location);
        }

        self.display.set_color(RED);
        loop {
            if !self.is_running() {
                return;
            }
            self.watchdog.beacon("forgotten_card");
            if self.reader.read().is_none() {
                return;
            }
        }
    }
}

fn timeout_for(profile: &Profile) -> Option<Duration> {
    if profile.timeout_minutes == 0 {
        None
    } else {
        Some(Duration::from_secs(u64::from(profile.timeout_minutes) * 60))
    }
}

#[cfg(test)]
#[path = "fsm_tests.rs"]
mod tests;
