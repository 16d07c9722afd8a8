// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `portalbox-register`: a one-shot tool that inserts an "out of service"
//! equipment row for this host's MAC address, so a freshly imaged box has
//! something for an administrator to assign a location and type to (§4.6).
//!
//! Shares the directory module's trait and [`MysqlDirectory`]
//! implementation with the daemon, but never touches GPIO, the LED
//! strip, or the session FSM — registration is a database write, not an
//! access-control decision.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use portal::config::Config;
use portal::directory::mysql_client::MysqlDirectory;
use portal::directory::Directory;
use portal::identity::MacAddress;

/// Inserts an out-of-service equipment row for this box's MAC address.
#[derive(Debug, Parser)]
#[command(name = "portalbox-register", version, about)]
struct Cli {
    /// Path to the INI configuration file.
    #[arg(default_value = "config.ini")]
    config_path: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    std::process::exit(run(&cli));
}

fn run(cli: &Cli) -> i32 {
    let config = match Config::load(&cli.config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "failed to load configuration");
            return 1;
        }
    };

    let mac = match MacAddress::discover() {
        Ok(mac) => mac,
        Err(e) => {
            error!(error = %e, "failed to discover MAC address");
            return 1;
        }
    };

    let directory = match MysqlDirectory::new(&config.db) {
        Ok(directory) => directory,
        Err(e) => {
            error!(error = %e, "failed to connect to directory");
            return 1;
        }
    };

    if directory.is_registered(mac.as_str()) {
        info!(mac = %mac, "this box is already registered");
        return 0;
    }

    if directory.register(mac.as_str()) {
        info!(mac = %mac, "registered a new out-of-service equipment row");
        0
    } else {
        error!(mac = %mac, "registration failed");
        1
    }
}
