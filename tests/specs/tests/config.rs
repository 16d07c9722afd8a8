// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exercises `Config::load` through `portal`'s public API against real
//! temporary INI files on disk, the way `portalbox`'s own `main` does —
//! distinct from `portal`'s internal `config_tests.rs`, which reaches
//! `Config::load_db`/`load_email` through `super::*`.

use std::io::Write;

use portal::config::{Config, DisplayDriver, LogLevel};
use portal::error::ConfigError;

fn write_ini(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    file.write_all(contents.as_bytes()).expect("write");
    file
}

const MINIMAL: &str = "
[db]
host = localhost
user = portal
password = secret
database = portalbox

[email]
smtp_server = smtp.example.org
smtp_port = 587
auth_user = portal@example.org
auth_password = secret
from_address = portal@example.org
to_address = admin@example.org
";

#[test]
fn a_config_file_missing_entirely_is_an_unreadable_error() {
    let err = Config::load(std::path::Path::new("/nonexistent/config.ini")).unwrap_err();
    assert!(matches!(err, ConfigError::Unreadable { .. }));
}

#[test]
fn minimal_config_loads_with_documented_defaults() {
    let ini = write_ini(MINIMAL);
    let config = Config::load(ini.path()).expect("should load");

    assert!(config.db.use_persistent_connection);
    assert_eq!(config.db.port, None);
    assert_eq!(config.log_level, LogLevel::Error);
    assert_eq!(config.display.driver, None);
    assert_eq!(config.display.sleep_color, portal::config::Rgb { r: 0x00, g: 0x00, b: 0xFF });
    assert!(!config.watchdog.enabled);
}

#[test]
fn an_explicit_display_driver_overrides_the_board_default() {
    let ini = write_ini(&format!("{MINIMAL}\n[display]\ndriver = neopixel\n"));
    let config = Config::load(ini.path()).expect("should load");
    assert_eq!(config.display.driver, Some(DisplayDriver::NeoPixel));
}

#[test]
fn an_unrecognized_display_driver_is_a_config_error_naming_the_value() {
    let ini = write_ini(&format!("{MINIMAL}\n[display]\ndriver = incandescent\n"));
    let err = Config::load(ini.path()).unwrap_err();
    match err {
        ConfigError::InvalidValue { section, key, value } => {
            assert_eq!(section, "display");
            assert_eq!(key, "driver");
            assert_eq!(value, "incandescent");
        }
        other => panic!("expected InvalidValue, got {other:?}"),
    }
}

#[test]
fn watchdog_can_be_enabled_explicitly() {
    let ini = write_ini(&format!("{MINIMAL}\n[watchdog]\nenabled = yes\n"));
    let config = Config::load(ini.path()).expect("should load");
    assert!(config.watchdog.enabled);
}
