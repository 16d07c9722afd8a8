// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dotstar (APA102-family) strip over SPI. Pixels are transmitted in
//! red-blue-green order, not red-green-blue — preserved from the original
//! hardware abstraction's wire format.

use super::driver::Strip;
use super::Color;

/// Number of LEDs on the strip this box ships with.
pub const LED_COUNT: usize = 15;

pub trait SpiWriter: Send {
    fn write(&mut self, bytes: &[u8]);
}

#[cfg(target_os = "linux")]
pub struct RppalSpiWriter(rppal::spi::Spi);

#[cfg(target_os = "linux")]
impl RppalSpiWriter {
    pub fn new() -> Result<Self, crate::error::BoxError> {
        use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
        let spi = Spi::new(Bus::Spi1, SlaveSelect::Ss0, 4_000_000, Mode::Mode0)
            .map_err(|e| crate::error::BoxError::Display(e.to_string()))?;
        Ok(Self(spi))
    }
}

#[cfg(target_os = "linux")]
impl SpiWriter for RppalSpiWriter {
    fn write(&mut self, bytes: &[u8]) {
        let _ = self.0.write(bytes);
    }
}

pub struct DotstarStrip<W: SpiWriter> {
    writer: W,
    pixel_count: usize,
}

impl<W: SpiWriter> DotstarStrip<W> {
    pub fn new(writer: W, pixel_count: usize) -> Self {
        Self { writer, pixel_count }
    }
}

impl<W: SpiWriter> Strip for DotstarStrip<W> {
    fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    fn write_frame(&mut self, brightness: u8, pixels: &[Color]) {
        self.writer.write(&[0x00; 4]);
        for pixel in pixels {
            self.writer.write(&[0xE0 | (brightness & 0x1F), pixel.r, pixel.b, pixel.g]);
        }
        // SK9822-compatible end frame: (N/16)+1 zero bytes, then a 4-byte reset.
        let end_zero_bytes = (self.pixel_count / 16) + 1;
        self.writer.write(&vec![0x00; end_zero_bytes]);
        self.writer.write(&[0x00; 4]);
    }
}

#[cfg(test)]
#[path = "dotstar_tests.rs"]
mod tests;
