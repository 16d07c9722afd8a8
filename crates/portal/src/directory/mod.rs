// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed operations against the backend directory store (§4.5). Defined
//! as a trait so the session FSM, the registration binary, and tests can
//! all run against either the real MySQL-backed implementation or a fake.
//!
//! Every fallible operation absorbs its error into a safe, documented
//! default at the call site (§7) — callers never see a `Result` here;
//! the one exception is [`Directory::register`], whose caller (the
//! registration binary) needs to distinguish success from failure.

#[cfg(target_os = "linux")]
pub mod mysql_client;

use crate::card::CardKind;

/// Equipment profile assigned to this box by its MAC address (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub equipment_id: i64,
    pub equipment_type_id: i64,
    pub equipment_type: String,
    pub location_id: i64,
    pub location: String,
    /// `0` means "no session time limit".
    pub timeout_minutes: u32,
}

/// Name and email of the person a card belongs to, used to compose the
/// forgotten-card notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub email: String,
}

pub trait Directory: Send {
    /// `true` if a box with this MAC address already has an equipment row.
    fn is_registered(&self, mac: &str) -> bool;

    /// Inserts an "out of service" equipment row for this MAC. Used only
    /// by the one-shot registration tool; `true` iff exactly one row was
    /// inserted.
    fn register(&self, mac: &str) -> bool;

    /// The equipment profile assigned to this MAC, if any.
    fn get_equipment_profile(&self, mac: &str) -> Option<Profile>;

    /// Records that this box has finished booting.
    fn log_started(&self, equipment_id: i64);

    /// Records a planned shutdown, optionally attributed to the card
    /// that triggered it.
    fn log_shutdown(&self, equipment_id: i64, card_id: Option<crate::card::Uid>);

    /// Records the start of an access attempt (authorized or not).
    fn log_access_attempt(&self, card_id: crate::card::Uid, equipment_id: i64, successful: bool);

    /// Records the end of a completed, authorized session.
    fn log_access_completion(&self, card_id: crate::card::Uid, equipment_id: i64);

    /// `CardKind::Unknown` if the UID is not on file.
    fn get_card_type(&self, uid: crate::card::Uid) -> CardKind;

    /// `true` if `uid` is a training card valid for `equipment_type_id`.
    fn is_training_card_for(&self, uid: crate::card::Uid, equipment_type_id: i64) -> bool;

    /// Composition of the `requires_training`/`requires_payment` policy
    /// described in §3. Preserves the known defect where the payment
    /// check is not equipment-type-specific (§9 open question (a)).
    fn is_user_authorized(&self, card_id: crate::card::Uid, equipment_type_id: i64) -> bool;

    /// `true` if the holder of `card_id` is flagged as a trainer.
    fn is_user_trainer(&self, card_id: crate::card::Uid) -> bool;

    /// Name and email for the holder of `card_id`, if on file.
    fn get_user(&self, card_id: crate::card::Uid) -> Option<User>;
}
