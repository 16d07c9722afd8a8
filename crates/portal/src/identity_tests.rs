// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn pi_zero_w_revision_is_detected() {
    let cpuinfo = "Hardware\t: BCM2835\nRevision\t: 9000c1\nSerial\t: 0000\n";
    assert_eq!(BoardRevision::from_cpuinfo(cpuinfo), BoardRevision::PiZeroW);
}

#[test]
fn other_revisions_fall_back_to_active_low_interlock() {
    let cpuinfo = "Hardware\t: BCM2711\nRevision\t: c03111\n";
    assert_eq!(BoardRevision::from_cpuinfo(cpuinfo), BoardRevision::Other);
}

#[test]
fn missing_revision_line_falls_back_to_other() {
    let cpuinfo = "Hardware\t: BCM2835\n";
    assert_eq!(BoardRevision::from_cpuinfo(cpuinfo), BoardRevision::Other);
}

#[test]
fn interlock_polarity_matches_revision() {
    assert!(BoardRevision::PiZeroW.interlock_active_high());
    assert!(!BoardRevision::Other.interlock_active_high());
}

#[test]
fn default_display_driver_matches_revision() {
    assert_eq!(BoardRevision::PiZeroW.default_display_driver(), DisplayDriver::NeoPixel);
    assert_eq!(BoardRevision::Other.default_display_driver(), DisplayDriver::Dotstar);
}
