// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The session state machine (§4.1): the core of the daemon. Coordinates
//! the card reader, the interlock, the LED display, the button, and wall
//! clock deadlines to produce correct behavior under flaky reads, user
//! error, and loss of connectivity.

pub mod fsm;
pub mod state;

pub use fsm::{ExitReason, Fsm};
pub use state::State;

use std::time::Instant;

use crate::card::Uid;

/// Attributes of a live, authorized session (§3). Constructed only once a
/// user card has been accepted in `Idle`; dropped when the equipment is
/// powered back off.
#[derive(Debug, Clone)]
pub struct Session {
    pub authorized_uid: Uid,
    /// `None` until a proxy card is accepted during `GraceRemoval`.
    /// Mutually exclusive with `training_mode`.
    pub proxy_uid: Option<Uid>,
    /// Set only when a trainer's session is handed off to a training
    /// card; see [`Session::start_training`].
    pub training_mode: bool,
    /// Whether the holder of `authorized_uid` is flagged as a trainer.
    /// Cleared the moment a hand-off to `training_mode` happens, so a
    /// training card can never itself start a second training session.
    pub user_is_trainer: bool,
    pub start_time: Instant,
    pub card_present: bool,
}

impl Session {
    pub fn new(authorized_uid: Uid, user_is_trainer: bool, start_time: Instant) -> Self {
        Self {
            authorized_uid,
            proxy_uid: None,
            training_mode: false,
            user_is_trainer,
            start_time,
            card_present: true,
        }
    }

    /// Accept a proxy card during grace. Only valid while not already
    /// training (§3: proxy and training are mutually exclusive).
    pub fn accept_proxy(&mut self, uid: Uid) {
        self.proxy_uid = Some(uid);
    }

    /// Hand the session off to a training card. Clears `user_is_trainer`
    /// so the resulting training session cannot itself spawn another.
    pub fn start_training(&mut self, training_uid: Uid) {
        self.authorized_uid = training_uid;
        self.training_mode = true;
        self.user_is_trainer = false;
    }

    pub fn renew(&mut self, now: Instant) {
        self.start_time = now;
    }
}
