// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Merged view of the CLI (just the config file path, §6) and the parsed
//! INI document, exposed as one validated [`Config`] value. Required keys
//! missing at startup are a fatal [`ConfigError`]; optional keys fall back
//! to documented defaults.

use std::path::{Path, PathBuf};

use clap::Parser;
use ini::Ini;

use crate::error::ConfigError;

/// Access-control daemon for a single portal box.
#[derive(Debug, Parser)]
#[command(name = "portalbox", version, about)]
pub struct Cli {
    /// Path to the INI configuration file.
    #[arg(default_value = "config.ini")]
    pub config_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub port: Option<u16>,
    pub use_persistent_connection: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub auth_user: String,
    pub auth_password: String,
    pub from_address: String,
    pub to_address: String,
    pub cc_address: Option<String>,
    pub bcc_address: Option<String>,
    pub reply_to: Option<String>,
    pub weak_certificate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    /// The `tracing`/`EnvFilter` directive this level corresponds to. There
    /// is no `tracing` level more severe than `error`, so `critical` maps
    /// to the same filter as `error`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Critical | Self::Error => "error",
            Self::Warning => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayDriver {
    Dotstar,
    NeoPixel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayConfig {
    pub driver: Option<DisplayDriver>,
    pub sleep_color: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogConfig {
    pub enabled: bool,
}

/// The fully validated configuration for one run of the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db: DbConfig,
    pub email: EmailConfig,
    pub log_level: LogLevel,
    pub watchdog: WatchdogConfig,
    pub display: DisplayConfig,
}

impl Config {
    /// Parse and validate the INI file at `path`. A missing required key
    /// or an unparseable optional key is a fatal [`ConfigError`]; this is
    /// the only place those errors are raised (§7).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            db: Self::load_db(&ini)?,
            email: Self::load_email(&ini)?,
            log_level: Self::load_log_level(&ini)?,
            watchdog: Self::load_watchdog(&ini),
            display: Self::load_display(&ini)?,
        })
    }

    fn load_db(ini: &Ini) -> Result<DbConfig, ConfigError> {
        let section = ini.section(Some("db"));
        let required = |key: &'static str| -> Result<String, ConfigError> {
            section
                .and_then(|s| s.get(key))
                .map(str::to_owned)
                .ok_or(ConfigError::MissingKey { section: "db", key })
        };

        let port = match section.and_then(|s| s.get("port")) {
            Some(raw) => Some(raw.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                section: "db",
                key: "port",
                value: raw.to_string(),
            })?),
            None => None,
        };

        let use_persistent_connection = match section.and_then(|s| s.get("use_persistent_connection")) {
            Some(raw) => parse_bool(raw).ok_or(ConfigError::InvalidValue {
                section: "db",
                key: "use_persistent_connection",
                value: raw.to_string(),
            })?,
            None => true,
        };

        Ok(DbConfig {
            host: required("host")?,
            user: required("user")?,
            password: required("password")?,
            database: required("database")?,
            port,
            use_persistent_connection,
        })
    }

    fn load_email(ini: &Ini) -> Result<EmailConfig, ConfigError> {
        let section = ini.section(Some("email"));
        let required = |key: &'static str| -> Result<String, ConfigError> {
            section
                .and_then(|s| s.get(key))
                .map(str::to_owned)
                .ok_or(ConfigError::MissingKey { section: "email", key })
        };

        let smtp_port_raw = required("smtp_port")?;
        let smtp_port = smtp_port_raw.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
            section: "email",
            key: "smtp_port",
            value: smtp_port_raw.clone(),
        })?;

        let weak_certificate = match section.and_then(|s| s.get("my_smtp_server_uses_a_weak_certificate")) {
            Some(raw) => parse_bool(raw).unwrap_or(false),
            None => false,
        };

        Ok(EmailConfig {
            smtp_server: required("smtp_server")?,
            smtp_port,
            auth_user: required("auth_user")?,
            auth_password: required("auth_password")?,
            from_address: required("from_address")?,
            to_address: required("to_address")?,
            cc_address: section.and_then(|s| s.get("cc_address")).map(str::to_owned),
            bcc_address: section.and_then(|s| s.get("bcc_address")).map(str::to_owned),
            reply_to: section.and_then(|s| s.get("reply_to")).map(str::to_owned),
            weak_certificate,
        })
    }

    fn load_log_level(ini: &Ini) -> Result<LogLevel, ConfigError> {
        let raw = ini.section(Some("logging")).and_then(|s| s.get("level"));
        let level = match raw {
            None => LogLevel::Error,
            Some(value) => match value.to_lowercase().as_str() {
                "critical" => LogLevel::Critical,
                "error" => LogLevel::Error,
                "warning" => LogLevel::Warning,
                "info" => LogLevel::Info,
                "debug" => LogLevel::Debug,
                _ => LogLevel::Error,
            },
        };
        Ok(level)
    }

    fn load_watchdog(ini: &Ini) -> WatchdogConfig {
        let enabled = ini
            .section(Some("watchdog"))
            .and_then(|s| s.get("enabled"))
            .and_then(parse_bool)
            .unwrap_or(false);
        WatchdogConfig { enabled }
    }

    fn load_display(ini: &Ini) -> Result<DisplayConfig, ConfigError> {
        let section = ini.section(Some("display"));

        let driver = match section.and_then(|s| s.get("driver")) {
            Some(raw) => match raw.to_lowercase().as_str() {
                "dotstar" => Some(DisplayDriver::Dotstar),
                "neopixel" => Some(DisplayDriver::NeoPixel),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        section: "display",
                        key: "driver",
                        value: raw.to_string(),
                    })
                }
            },
            None => None,
        };

        let sleep_color = match section.and_then(|s| s.get("sleep_color")) {
            Some(raw) => parse_rgb(raw).ok_or(ConfigError::InvalidValue {
                section: "display",
                key: "sleep_color",
                value: raw.to_string(),
            })?,
            None => Rgb { r: 0x00, g: 0x00, b: 0xFF },
        };

        Ok(DisplayConfig { driver, sleep_color })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "yes" | "true" | "1" => Some(true),
        "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

fn parse_rgb(raw: &str) -> Option<Rgb> {
    let mut parts = raw.split(',').map(str::trim);
    let r = parts.next()?.parse::<u8>().ok()?;
    let g = parts.next()?.parse::<u8>().ok()?;
    let b = parts.next()?.parse::<u8>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Rgb { r, g, b })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
