// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Card identity types shared by the reader, the directory client, and the
//! session FSM.

/// A 4-byte RFID UID, packed MSB-first into a `u32`. Never zero — the card
/// reader and the directory both treat `0` as "no card"/"unknown", never as
/// a valid UID.
pub type Uid = u32;

/// The directory's classification of a UID. Fixed per UID; a card cannot
/// change kind between reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardKind {
    Shutdown,
    Proxy,
    Training,
    User,
    Unknown,
}

impl CardKind {
    /// Decode the legacy wire encoding used by `cards.type_id`:
    /// 1=shutdown, 2=proxy, 3=training, 4=user, anything else (including the
    /// `-1` not-found sentinel) is `Unknown`.
    pub fn from_type_id(type_id: i64) -> Self {
        match type_id {
            1 => Self::Shutdown,
            2 => Self::Proxy,
            3 => Self::Training,
            4 => Self::User,
            _ => Self::Unknown,
        }
    }
}
