// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fakes for every trait the session FSM depends on, so the FSM (and the
//! integration suite under `tests/specs`) can be exercised without real
//! GPIO, SPI/UART, or a MySQL connection. Gated behind the `test-support`
//! feature (always on for `#[cfg(test)]`) rather than restricted to this
//! crate's own unit tests, since `tests/specs` needs the same fakes.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use crate::card::{CardKind, Uid};
use crate::directory::{Directory, Profile, User};
use crate::display::{Color, Command, Display};
use crate::gpio::Hal;
use crate::notifier::Notifier;
use crate::reader::CardReader;

/// Scripted card reads. Once the script is exhausted, repeats whatever it
/// last returned — most FSM loops poll faster than a test wants to script,
/// so "card stays present/absent" is the useful default.
#[derive(Default)]
pub struct FakeCardReader {
    reads: VecDeque<Option<Uid>>,
    last: Option<Uid>,
}

impl FakeCardReader {
    pub fn new(reads: impl IntoIterator<Item = Option<Uid>>) -> Self {
        Self { reads: reads.into_iter().collect(), last: None }
    }

    /// A reader that never sees a card.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl CardReader for FakeCardReader {
    fn read(&mut self) -> Option<Uid> {
        match self.reads.pop_front() {
            Some(uid) => {
                self.last = uid;
                uid
            }
            None => self.last,
        }
    }
}

/// Records every power/buzzer transition instead of driving real pins.
#[derive(Default)]
pub struct FakeHal {
    pub equipment_power: bool,
    pub buzzer: bool,
    pub power_history: Vec<bool>,
}

impl FakeHal {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Hal for FakeHal {
    fn set_equipment_power(&mut self, on: bool) {
        self.equipment_power = on;
        self.power_history.push(on);
    }

    fn set_buzzer(&mut self, on: bool) {
        self.buzzer = on;
    }

    fn set_rfid_reset(&mut self, _deasserted: bool) {}
}

/// Records every [`Command`] it is sent instead of driving a strip.
/// Cloning shares the recording, so a test can hold one handle while
/// passing another into the `Fsm`.
#[derive(Default, Clone)]
pub struct FakeDisplay {
    commands: Arc<Mutex<Vec<Command>>>,
}

impl FakeDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<Command> {
        #[allow(clippy::unwrap_used)]
        self.commands.lock().unwrap().clone()
    }

    /// The color of the most recent `Color` command, if any has been sent.
    pub fn last_color(&self) -> Option<Color> {
        #[allow(clippy::unwrap_used)]
        self.commands.lock().unwrap().iter().rev().find_map(|command| match command {
            Command::Color { r, g, b } => Some(Color::new(*r, *g, *b)),
            _ => None,
        })
    }

    fn push(&self, command: Command) {
        #[allow(clippy::unwrap_used)]
        self.commands.lock().unwrap().push(command);
    }
}

impl Display for FakeDisplay {
    fn wake(&self) {
        self.push(Command::Wake);
    }

    fn sleep(&self) {
        self.push(Command::Sleep);
    }

    fn set_color(&self, color: Color) {
        self.push(Command::Color { r: color.r, g: color.g, b: color.b });
    }

    fn wipe(&self, color: Color, duration_ms: u32) {
        self.push(Command::Wipe { r: color.r, g: color.g, b: color.b, duration_ms });
    }

    fn blink(&self, color: Color, duration_ms: u32, flashes: u32) {
        self.push(Command::Blink { r: color.r, g: color.g, b: color.b, duration_ms, flashes });
    }

    fn pulse(&self, color: Color) {
        self.push(Command::Pulse { r: color.r, g: color.g, b: color.b });
    }
}

/// Scripted, in-memory stand-in for the MySQL-backed directory. Every
/// field is public so a test can poke exactly the scenario it needs
/// without a builder.
#[derive(Default)]
pub struct FakeDirectory {
    pub registered: bool,
    pub profile: Option<Profile>,
    pub card_kinds: HashMap<Uid, CardKind>,
    pub authorized: HashMap<(Uid, i64), bool>,
    pub training_for: HashMap<(Uid, i64), bool>,
    pub trainers: HashSet<Uid>,
    pub users: HashMap<Uid, User>,
    pub access_attempts: Mutex<Vec<(Uid, i64, bool)>>,
    pub access_completions: Mutex<Vec<(Uid, i64)>>,
    pub started: Mutex<Vec<i64>>,
    pub shutdowns: Mutex<Vec<(i64, Option<Uid>)>>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn with_card(mut self, uid: Uid, kind: CardKind) -> Self {
        self.card_kinds.insert(uid, kind);
        self
    }

    pub fn with_authorization(mut self, uid: Uid, equipment_type_id: i64, authorized: bool) -> Self {
        self.authorized.insert((uid, equipment_type_id), authorized);
        self
    }

    pub fn with_training_for(mut self, uid: Uid, equipment_type_id: i64, valid: bool) -> Self {
        self.training_for.insert((uid, equipment_type_id), valid);
        self
    }

    pub fn with_trainer(mut self, uid: Uid) -> Self {
        self.trainers.insert(uid);
        self
    }

    pub fn with_user(mut self, uid: Uid, user: User) -> Self {
        self.users.insert(uid, user);
        self
    }
}

impl Directory for FakeDirectory {
    fn is_registered(&self, _mac: &str) -> bool {
        self.registered
    }

    fn register(&self, _mac: &str) -> bool {
        true
    }

    fn get_equipment_profile(&self, _mac: &str) -> Option<Profile> {
        self.profile.clone()
    }

    fn log_started(&self, equipment_id: i64) {
        #[allow(clippy::unwrap_used)]
        self.started.lock().unwrap().push(equipment_id);
    }

    fn log_shutdown(&self, equipment_id: i64, card_id: Option<Uid>) {
        #[allow(clippy::unwrap_used)]
        self.shutdowns.lock().unwrap().push((equipment_id, card_id));
    }

    fn log_access_attempt(&self, card_id: Uid, equipment_id: i64, successful: bool) {
        #[allow(clippy::unwrap_used)]
        self.access_attempts.lock().unwrap().push((card_id, equipment_id, successful));
    }

    fn log_access_completion(&self, card_id: Uid, equipment_id: i64) {
        #[allow(clippy::unwrap_used)]
        self.access_completions.lock().unwrap().push((card_id, equipment_id));
    }

    fn get_card_type(&self, uid: Uid) -> CardKind {
        self.card_kinds.get(&uid).copied().unwrap_or(CardKind::Unknown)
    }

    fn is_training_card_for(&self, uid: Uid, equipment_type_id: i64) -> bool {
        self.training_for.get(&(uid, equipment_type_id)).copied().unwrap_or(false)
    }

    fn is_user_authorized(&self, card_id: Uid, equipment_type_id: i64) -> bool {
        self.authorized.get(&(card_id, equipment_type_id)).copied().unwrap_or(false)
    }

    fn is_user_trainer(&self, card_id: Uid) -> bool {
        self.trainers.contains(&card_id)
    }

    fn get_user(&self, card_id: Uid) -> Option<User> {
        self.users.get(&card_id).cloned()
    }
}

/// Records every forgotten-card notification instead of sending email.
#[derive(Default, Clone)]
pub struct FakeNotifier {
    sent: Arc<Mutex<Vec<(String, String, String, String)>>>,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String, String, String)> {
        #[allow(clippy::unwrap_used)]
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for FakeNotifier {
    fn notify_forgotten_card(&self, to: &str, name: &str, equipment_type: &str, location: &str) {
        #[allow(clippy::unwrap_used)]
        self.sent.lock().unwrap().push((to.to_string(), name.to_string(), equipment_type.to_string(), location.to_string()));
    }
}
