// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! NeoPixel-over-UART backend: the Rust process only forwards ASCII
//! effect commands to a microcontroller, which owns the animation tick
//! itself (§6). Unlike [`super::driver`], there is no local tick loop —
//! the MCU replies with a single ack byte once it has applied a command.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use super::{Color, Command, TICK};

const ACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Byte-level access to the UART link to the LED microcontroller.
pub trait SerialChannel: Send {
    fn write_all(&mut self, buf: &[u8]);
    /// Read one byte, if any arrives before `deadline`.
    fn read_byte(&mut self, deadline: Instant) -> Option<u8>;
}

#[cfg(target_os = "linux")]
pub struct SerialPortChannel(Box<dyn serialport::SerialPort>);

#[cfg(target_os = "linux")]
impl SerialPortChannel {
    pub fn open(path: &str) -> Result<Self, crate::error::BoxError> {
        let port = serialport::new(path, 9600)
            .timeout(Duration::from_millis(50))
            .open()
            .map_err(|e| crate::error::BoxError::Display(e.to_string()))?;
        Ok(Self(port))
    }
}

#[cfg(target_os = "linux")]
impl SerialChannel for SerialPortChannel {
    fn write_all(&mut self, buf: &[u8]) {
        let _ = Write::write_all(&mut self.0, buf);
    }

    fn read_byte(&mut self, deadline: Instant) -> Option<u8> {
        let mut byte = [0u8; 1];
        while Instant::now() < deadline {
            match Read::read(&mut self.0, &mut byte) {
                Ok(1) => {
                    if byte[0] == b' ' || byte[0] == b'\r' || byte[0] == b'\n' {
                        continue;
                    }
                    return Some(byte[0]);
                }
                _ => continue,
            }
        }
        None
    }
}

fn command_line(command: Command, sleep_color: Color) -> Option<String> {
    match command {
        Command::Color { r, g, b } => Some(format!("color {r} {g} {b}\n")),
        Command::Wipe { r, g, b, duration_ms } => Some(format!("wipe {r} {g} {b} {duration_ms}\n")),
        Command::Blink { r, g, b, duration_ms, .. } => Some(format!("blink {r} {g} {b} {duration_ms}\n")),
        Command::Pulse { r, g, b } => Some(format!("pulse {r} {g} {b}\n")),
        Command::Sleep => Some(format!("pulse {} {} {}\n", sleep_color.r, sleep_color.g, sleep_color.b)),
        Command::Wake => None,
        Command::Shutdown => Some("color 1 0 0\n".to_string()),
    }
}

/// `true` if the command expects the driver to wait for an ack before the
/// channel considers it applied (matches `Display::{set_color,wipe,blink}`'s
/// drain contract; `pulse`/`sleep` are steady-state and don't block).
fn acks(command: &Command) -> bool {
    matches!(command, Command::Color { .. } | Command::Wipe { .. } | Command::Blink { .. })
}

pub fn run(mut channel: impl SerialChannel, sleep_color: Color, rx: Receiver<Command>, ack: crossbeam_channel::Sender<()>, running: Arc<AtomicBool>) {
    while running.load(Ordering::Relaxed) {
        match rx.recv_timeout(TICK) {
            Ok(command) => {
                let should_ack = acks(&command);
                let is_shutdown = matches!(command, Command::Shutdown);
                if let Some(line) = command_line(command, sleep_color) {
                    channel.write_all(line.as_bytes());
                    let deadline = Instant::now() + ACK_TIMEOUT;
                    let _reply = channel.read_byte(deadline);
                }
                if should_ack {
                    let _ = ack.send(());
                }
                if is_shutdown {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

#[cfg(test)]
#[path = "neopixel_tests.rs"]
mod tests;
