// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Startup-fatal configuration problems. Raised once while loading
/// `config.ini`; the process exits with code 1 without ever reaching the
/// session FSM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required `section.key` was absent from the INI file.
    MissingKey { section: &'static str, key: &'static str },
    /// A key was present but could not be parsed into the expected type.
    InvalidValue { section: &'static str, key: &'static str, value: String },
    /// The INI file itself could not be read or parsed.
    Unreadable { path: String, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingKey { section, key } => {
                write!(f, "missing required config key: {section}.{key}")
            }
            Self::InvalidValue { section, key, value } => {
                write!(f, "invalid value {value:?} for {section}.{key}")
            }
            Self::Unreadable { path, reason } => {
                write!(f, "could not read config file {path}: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Operational errors: everything that can go wrong talking to the
/// directory, the notifier, or the LED driver once the box is running.
///
/// `BoxError` never unwinds out of the session FSM. Every call site that can
/// produce one absorbs it into the documented safe default (§7) and logs it
/// through `tracing` at the point of absorption.
#[derive(Debug)]
pub enum BoxError {
    Directory(String),
    Notifier(String),
    Display(String),
    Reader(String),
}

impl fmt::Display for BoxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory(msg) => write!(f, "directory error: {msg}"),
            Self::Notifier(msg) => write!(f, "notifier error: {msg}"),
            Self::Display(msg) => write!(f, "display driver error: {msg}"),
            Self::Reader(msg) => write!(f, "card reader error: {msg}"),
        }
    }
}

impl std::error::Error for BoxError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
