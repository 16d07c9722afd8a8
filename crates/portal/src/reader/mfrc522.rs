// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MFRC522 register-level protocol: WUPA + anticollision over SPI, plus
//! the hang-detection heuristic from the original hardware abstraction
//! (three registers that settle into a known-bad pattern when the
//! reader's antenna has turned itself off).

use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;

use crate::card::Uid;
use crate::display::Command as DisplayCommand;

use super::CardReader;

const REG_COMMAND: u8 = 0x01;
const REG_COM_IRQ: u8 = 0x04;
const REG_ERROR: u8 = 0x06;
const REG_FIFO_DATA: u8 = 0x09;
const REG_FIFO_LEVEL: u8 = 0x0A;
const REG_BIT_FRAMING: u8 = 0x0D;

const CMD_IDLE: u8 = 0x00;
const CMD_TRANSCEIVE: u8 = 0x0C;

const PICC_WUPA: u8 = 0x52;
const PICC_ANTICOLL: u8 = 0x93;

const IRQ_RX: u8 = 0x20;

/// Registers the hang heuristic watches, in the order it watches them.
const HANG_WATCH_REGISTERS: [u8; 3] = [17, 20, 21];

const HANG_BUZZ_COLOR: (u8, u8, u8) = (0xFF, 0x00, 0x00);
const HANG_IDLE_COLOR: (u8, u8, u8) = (0xFF, 0x80, 0x00);

/// Byte-level access to the MFRC522's register file. Implemented once
/// over `rppal`'s SPI and once as a scripted fake for tests.
pub trait Mfrc522Bus: Send {
    fn read_register(&mut self, reg: u8) -> u8;
    fn write_register(&mut self, reg: u8, value: u8);
}

#[cfg(target_os = "linux")]
pub struct SpiBus(rppal::spi::Spi);

#[cfg(target_os = "linux")]
impl SpiBus {
    pub fn new() -> Result<Self, crate::error::BoxError> {
        use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, 1_000_000, Mode::Mode0)
            .map_err(|e| crate::error::BoxError::Reader(e.to_string()))?;
        Ok(Self(spi))
    }
}

#[cfg(target_os = "linux")]
impl Mfrc522Bus for SpiBus {
    fn read_register(&mut self, reg: u8) -> u8 {
        let command = (reg << 1) | 0x80;
        let mut rx = [0u8; 2];
        let _ = self.0.transfer(&mut rx, &[command, 0x00]);
        rx[1]
    }

    fn write_register(&mut self, reg: u8, value: u8) {
        let command = reg << 1;
        let mut rx = [0u8; 2];
        let _ = self.0.transfer(&mut rx, &[command, value]);
    }
}

/// Drives the hang-detection heuristic and UID acquisition protocol
/// against any [`Mfrc522Bus`].
pub struct Mfrc522Reader<B: Mfrc522Bus> {
    bus: B,
    out_list: [u8; 64],
    set_buzzer: Box<dyn FnMut(bool) + Send>,
    display: Sender<DisplayCommand>,
}

impl<B: Mfrc522Bus> Mfrc522Reader<B> {
    pub fn new(bus: B, set_buzzer: Box<dyn FnMut(bool) + Send>, display: Sender<DisplayCommand>) -> Self {
        Self {
            bus,
            out_list: [0u8; 64],
            set_buzzer,
            display,
        }
    }

    /// Updates `out_list` for the watched registers and reports whether
    /// register 20 has just transitioned `0x83` -> `0x80`, the signature
    /// of the antenna having turned itself off.
    fn check_hang(&mut self) -> bool {
        let mut hang = false;
        for reg in HANG_WATCH_REGISTERS {
            let value = self.bus.read_register(reg);
            if reg == 20 && self.out_list[reg as usize] == 0x83 && value == 0x80 {
                hang = true;
            }
            self.out_list[reg as usize] = value;
        }
        hang
    }

    /// The reader has hung. There is no self-recovery: beep and flash
    /// red/yellow forever until the external watchdog restarts the
    /// process (§4.3.2).
    fn handle_hang(&mut self) -> ! {
        loop {
            (self.set_buzzer)(true);
            let _ = self.display.send(DisplayCommand::Color {
                r: HANG_BUZZ_COLOR.0,
                g: HANG_BUZZ_COLOR.1,
                b: HANG_BUZZ_COLOR.2,
            });
            thread::sleep(Duration::from_millis(50));
            (self.set_buzzer)(false);
            let _ = self.display.send(DisplayCommand::Color {
                r: HANG_IDLE_COLOR.0,
                g: HANG_IDLE_COLOR.1,
                b: HANG_IDLE_COLOR.2,
            });
            thread::sleep(Duration::from_secs(10));
        }
    }

    fn request_card(&mut self) -> bool {
        self.bus.write_register(REG_COM_IRQ, 0x7F);
        self.bus.write_register(REG_FIFO_LEVEL, 0x80);
        self.bus.write_register(REG_FIFO_DATA, PICC_WUPA);
        self.bus.write_register(REG_BIT_FRAMING, 0x07);
        self.bus.write_register(REG_COMMAND, CMD_TRANSCEIVE);
        self.bus.write_register(REG_BIT_FRAMING, 0x87);

        let mut irq = 0u8;
        for _ in 0..30 {
            if irq & IRQ_RX != 0 {
                break;
            }
            thread::sleep(Duration::from_millis(10));
            irq = self.bus.read_register(REG_COM_IRQ);
        }
        self.bus.write_register(REG_COMMAND, CMD_IDLE);

        let error = self.bus.read_register(REG_ERROR);
        let fifo_level = self.bus.read_register(REG_FIFO_LEVEL);
        let success = (irq & IRQ_RX) != 0 && error == 0;
        if success {
            for _ in 0..fifo_level {
                let _ = self.bus.read_register(REG_FIFO_DATA);
            }
        }
        success
    }

    fn anticollision(&mut self) -> Option<Uid> {
        self.bus.write_register(REG_COM_IRQ, 0x7F);
        self.bus.write_register(REG_FIFO_LEVEL, 0x80);
        self.bus.write_register(REG_FIFO_DATA, PICC_ANTICOLL);
        self.bus.write_register(REG_FIFO_DATA, 0x20);
        self.bus.write_register(REG_BIT_FRAMING, 0x00);
        self.bus.write_register(REG_COMMAND, CMD_TRANSCEIVE);
        self.bus.write_register(REG_BIT_FRAMING, 0x80);

        let mut irq = 0u8;
        for _ in 0..30 {
            if irq & IRQ_RX != 0 {
                break;
            }
            thread::sleep(Duration::from_millis(10));
            irq = self.bus.read_register(REG_COM_IRQ);
        }
        self.bus.write_register(REG_COMMAND, CMD_IDLE);

        let error = self.bus.read_register(REG_ERROR);
        let fifo_level = self.bus.read_register(REG_FIFO_LEVEL);
        if (irq & IRQ_RX) == 0 || error != 0 || fifo_level < 5 {
            return None;
        }

        let mut bytes = Vec::with_capacity(fifo_level as usize);
        for _ in 0..fifo_level {
            bytes.push(self.bus.read_register(REG_FIFO_DATA));
        }
        if bytes.len() < 5 {
            return None;
        }

        let bcc = bytes[4];
        let computed = bytes[0] ^ bytes[1] ^ bytes[2] ^ bytes[3];
        if bcc != computed {
            return None;
        }

        let uid = ((bytes[0] as Uid) << 24)
            | ((bytes[1] as Uid) << 16)
            | ((bytes[2] as Uid) << 8)
            | (bytes[3] as Uid);
        if uid > 0 {
            Some(uid)
        } else {
            None
        }
    }
}

impl<B: Mfrc522Bus> CardReader for Mfrc522Reader<B> {
    fn read(&mut self) -> Option<Uid> {
        if self.check_hang() {
            self.handle_hang();
        }

        for _ in 0..2 {
            if self.request_card() {
                if let Some(uid) = self.anticollision() {
                    return Some(uid);
                }
            }
        }
        None
    }
}

#[cfg(test)]
#[path = "mfrc522_tests.rs"]
mod tests;
