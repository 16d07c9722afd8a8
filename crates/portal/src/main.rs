// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `portalbox`: glue that wires the real hardware, directory, and
//! notifier implementations together and runs one [`Fsm`] to completion
//! (§5, §6). Everything interesting lives in the library; this binary
//! only constructs and tears down.

use std::process::Command as OsCommand;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use clap::Parser;
use crossbeam_channel::bounded;
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::{error, info, warn};

use portal::button::ButtonQueue;
use portal::clock::SystemClock;
use portal::config::{Cli, Config, DisplayDriver};
use portal::directory::mysql_client::MysqlDirectory;
use portal::display::dotstar::{DotstarStrip, RppalSpiWriter, LED_COUNT};
use portal::display::neopixel::SerialPortChannel;
use portal::display::{driver as dotstar_driver, neopixel, ChannelDisplay, Color};
use portal::gpio::rpi::{ButtonWorker, RpiHal};
use portal::identity::{BoardRevision, MacAddress};
use portal::notifier::SmtpNotifier;
use portal::reader::mfrc522::{Mfrc522Reader, SpiBus};
use portal::session::{ExitReason, Fsm};
use portal::watchdog::Watchdog;

/// Path the NeoPixel backend talks over; the box's wiring harness has
/// never put the LED microcontroller on anything else.
const NEOPIXEL_SERIAL_PORT: &str = "/dev/serial0";

fn main() {
    let cli = Cli::parse();

    let config = match Config::load(&cli.config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.as_filter())),
        )
        .init();

    std::process::exit(run(&config));
}

/// Builds every collaborator, runs the FSM to completion, and maps the
/// outcome to a process exit code (§6). Returns rather than calls
/// `process::exit` itself so hardware handles drop (and [`RpiHal`]'s fail
/// safe guard fires) before the process actually ends.
fn run(config: &Config) -> i32 {
    let mac = match MacAddress::discover() {
        Ok(mac) => mac,
        Err(e) => {
            error!(error = %e, "failed to discover MAC address");
            return 1;
        }
    };
    info!(mac = %mac, "discovered equipment identity");

    let revision = BoardRevision::detect();

    let directory = match MysqlDirectory::new(&config.db) {
        Ok(directory) => directory,
        Err(e) => {
            error!(error = %e, "failed to connect to directory");
            return 1;
        }
    };

    let notifier = match SmtpNotifier::new(&config.email) {
        Ok(notifier) => notifier,
        Err(e) => {
            error!(error = %e, "failed to build notifier");
            return 1;
        }
    };

    let mut hal = match RpiHal::new(revision) {
        Ok(hal) => hal,
        Err(e) => {
            error!(error = %e, "failed to initialize GPIO");
            return 1;
        }
    };

    let sleep_color = Color::new(config.display.sleep_color.r, config.display.sleep_color.g, config.display.sleep_color.b);
    let driver = config.display.driver.unwrap_or_else(|| revision.default_display_driver());
    let (display, reader_display_tx, display_thread) = match spawn_display(driver, sleep_color) {
        Ok(handles) => handles,
        Err(e) => {
            error!(error = %e, "failed to start the LED display driver");
            return 1;
        }
    };

    let reader_bus = match SpiBus::new() {
        Ok(bus) => bus,
        Err(e) => {
            error!(error = %e, "failed to open the card reader's SPI bus");
            display.shutdown();
            let _ = display_thread.join();
            return 1;
        }
    };
    let buzzer_handle = hal.buzzer_handle();
    let set_buzzer: Box<dyn FnMut(bool) + Send> = Box::new(move |on| {
        if let Ok(mut pin) = buzzer_handle.lock() {
            pin.write(if on { rppal::gpio::Level::High } else { rppal::gpio::Level::Low });
        }
    });
    let mut reader = Mfrc522Reader::new(reader_bus, set_buzzer, reader_display_tx);

    let buttons = ButtonQueue::new();
    let _button_worker = match ButtonWorker::spawn(buttons.clone()) {
        Ok(worker) => Some(worker),
        Err(e) => {
            warn!(error = %e, "failed to register the button edge worker; the button will never renew a grace period");
            None
        }
    };

    let watchdog = Watchdog::new(config.watchdog.enabled);
    let clock = SystemClock;
    let running = Arc::new(AtomicBool::new(true));
    watch_signals(Arc::clone(&running));

    let mut fsm = Fsm::new(&mut hal, &mut reader, &display, &directory, &notifier, &buttons, &clock, &watchdog, Arc::clone(&running));

    let reason = fsm.run(mac.as_str());

    display.shutdown();
    let _ = display_thread.join();

    match reason {
        ExitReason::ShutdownCard => {
            info!("shutdown card presented, requesting OS halt");
            if let Err(e) = OsCommand::new("sh").arg("-c").arg("sync; shutdown -h now").spawn() {
                error!(error = %e, "failed to invoke shutdown");
            }
            0
        }
        ExitReason::Signal => {
            info!("signal received, exiting cleanly");
            0
        }
        ExitReason::NoProfile => {
            error!("no equipment profile was ever found for this MAC address before shutdown");
            1
        }
    }
}

/// Spawns the LED driver thread for `driver` and returns the [`ChannelDisplay`]
/// handle the FSM uses, a raw command sender the card reader's hang-detection
/// path can use directly (§4.3.2), and the thread's join handle.
#[allow(clippy::type_complexity)]
fn spawn_display(
    driver: DisplayDriver,
    sleep_color: Color,
) -> Result<(ChannelDisplay, crossbeam_channel::Sender<portal::display::Command>, thread::JoinHandle<()>), portal::error::BoxError> {
    let (cmd_tx, cmd_rx) = bounded(8);
    let (ack_tx, ack_rx) = bounded(1);
    // The LED driver thread's own lifetime is governed by Command::Shutdown,
    // not this flag — it always runs until told to stop.
    let running = Arc::new(AtomicBool::new(true));

    let handle = match driver {
        DisplayDriver::Dotstar => {
            let writer = RppalSpiWriter::new()?;
            let strip = DotstarStrip::new(writer, LED_COUNT);
            thread::spawn(move || dotstar_driver::run(strip, cmd_rx, ack_tx, sleep_color, running))
        }
        DisplayDriver::NeoPixel => {
            let channel = SerialPortChannel::open(NEOPIXEL_SERIAL_PORT)?;
            thread::spawn(move || neopixel::run(channel, sleep_color, cmd_rx, ack_tx, running))
        }
    };

    Ok((ChannelDisplay::new(cmd_tx.clone(), ack_rx), cmd_tx, handle))
}

/// Spawns a thread that blocks on SIGINT/SIGTERM and clears `running` on
/// the first one received, the same shutdown signal `systemd` sends the
/// legacy service (§5, §6).
fn watch_signals(running: Arc<AtomicBool>) {
    thread::spawn(move || {
        let mut signals = match Signals::new([SIGINT, SIGTERM]) {
            Ok(signals) => signals,
            Err(e) => {
                error!(error = %e, "failed to register signal handler; SIGINT/SIGTERM will terminate the process immediately instead of shutting down cleanly");
                return;
            }
        };
        if signals.forever().next().is_some() {
            info!("shutdown signal received");
            running.store(false, Ordering::Relaxed);
        }
    });
}
