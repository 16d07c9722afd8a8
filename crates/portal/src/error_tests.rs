// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn config_error_names_the_offending_key() {
    let err = ConfigError::MissingKey { section: "db", key: "host" };
    assert_eq!(err.to_string(), "missing required config key: db.host");
}

#[test]
fn config_error_invalid_value_includes_what_was_given() {
    let err = ConfigError::InvalidValue {
        section: "db",
        key: "use_persistent_connection",
        value: "maybe".to_string(),
    };
    assert!(err.to_string().contains("maybe"));
    assert!(err.to_string().contains("db.use_persistent_connection"));
}

#[test]
fn box_error_display_is_distinct_per_subsystem() {
    let directory = BoxError::Directory("connection refused".to_string());
    let notifier = BoxError::Notifier("auth failed".to_string());
    let display = BoxError::Display("channel closed".to_string());
    let reader = BoxError::Reader("spi timeout".to_string());

    assert!(directory.to_string().starts_with("directory error"));
    assert!(notifier.to_string().starts_with("notifier error"));
    assert!(display.to_string().starts_with("display driver error"));
    assert!(reader.to_string().starts_with("card reader error"));
}
