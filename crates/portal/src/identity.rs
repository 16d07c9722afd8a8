// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host identity: the MAC address used to look up the equipment profile,
//! and the Raspberry Pi hardware revision that governs interlock polarity
//! and the default LED driver choice.

use std::fmt;
use std::fs;

use crate::config::DisplayDriver;

/// Revision string for the Raspberry Pi Zero W, per `/proc/cpuinfo`.
pub const REVISION_PI_ZERO_W: &str = "9000c1";

/// A MAC address formatted as lowercase hex with no separators, matching
/// the legacy directory schema's `equipment.mac_address` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacAddress(String);

impl MacAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Discover the host's primary MAC address.
    pub fn discover() -> Result<Self, String> {
        let addr = mac_address::get_mac_address()
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "no network interface with a MAC address was found".to_string())?;
        Ok(Self(format!(
            "{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            addr.bytes()[0],
            addr.bytes()[1],
            addr.bytes()[2],
            addr.bytes()[3],
            addr.bytes()[4],
            addr.bytes()[5],
        )))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which interlock polarity and default display driver this board uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardRevision {
    /// Raspberry Pi Zero W: interlock output is active-high (`HIGH` = powered).
    PiZeroW,
    /// Any other revision: interlock output is active-low (`HIGH` = open).
    Other,
}

impl BoardRevision {
    /// `true` when equipment power should drive the interlock pin HIGH.
    pub fn interlock_active_high(&self) -> bool {
        matches!(self, Self::PiZeroW)
    }

    /// Which LED backend a box of this revision ships with when
    /// `display.driver` is not set in config. Pi Zero W boxes pair with
    /// the UART NeoPixel controller board; every other revision ships
    /// with the SPI Dotstar strip from the original kit.
    pub fn default_display_driver(&self) -> DisplayDriver {
        match self {
            Self::PiZeroW => DisplayDriver::NeoPixel,
            Self::Other => DisplayDriver::Dotstar,
        }
    }

    /// Detect the board revision by reading `/proc/cpuinfo`'s `Revision:` line.
    pub fn detect() -> Self {
        match fs::read_to_string("/proc/cpuinfo") {
            Ok(contents) => Self::from_cpuinfo(&contents),
            Err(_) => Self::Other,
        }
    }

    fn from_cpuinfo(contents: &str) -> Self {
        for line in contents.lines() {
            if let Some((key, value)) = line.split_once(':') {
                if key.trim().eq_ignore_ascii_case("Revision") {
                    return if value.trim() == REVISION_PI_ZERO_W {
                        Self::PiZeroW
                    } else {
                        Self::Other
                    };
                }
            }
        }
        Self::Other
    }
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
