// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LED display driver: a background worker that receives high-level
//! effect commands over a channel and animates a strip of addressable
//! pixels on a fixed 100 ms tick (§4.2).

pub mod dotstar;
pub mod driver;
pub mod neopixel;

/// 5-bit brightness range used by both the Dotstar framing and the pulse
/// animation's ramp.
pub const BRIGHTNESS_DEFAULT: u8 = 16;
pub const BRIGHTNESS_MIN: u8 = 3;
pub const BRIGHTNESS_MAX: u8 = 30;
pub const BRIGHTNESS_STEP: u8 = 2;

/// One animation tick.
pub const TICK: std::time::Duration = std::time::Duration::from_millis(100);

/// A single RGB pixel color at full (8-bit per channel) resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn is_black(&self) -> bool {
        *self == Self::BLACK
    }
}

/// High-level effect commands accepted by the LED driver's channel.
/// Parameters are pre-validated integers; there is no invalid-argument
/// path once a command reaches the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Set every pixel to a solid color at default brightness. Aborts an
    /// in-progress wipe; aborts an in-progress blink/pulse only when the
    /// color is black.
    Color { r: u8, g: u8, b: u8 },
    /// Animate the color onto pixels one at a time.
    Wipe { r: u8, g: u8, b: u8, duration_ms: u32 },
    /// Alternate minimum and maximum brightness at the given color.
    Blink {
        r: u8,
        g: u8,
        b: u8,
        duration_ms: u32,
        flashes: u32,
    },
    /// Smoothly ramp brightness between minimum and maximum, steady-state.
    Pulse { r: u8, g: u8, b: u8 },
    /// Put the strip into its low-power idle animation.
    Sleep,
    /// Exit the idle animation, returning to the last solid command.
    Wake,
    /// Stop the worker loop; the strip is left at a dim dark-red color.
    Shutdown,
}

/// Handle the session FSM uses to talk to the LED driver thread. A thin
/// wrapper over the command channel that also implements the "drain
/// before returning" contract §4.2 requires of `set_color`/`wipe`/`blink`.
pub trait Display: Send {
    /// Wake the strip from its idle animation.
    fn wake(&self);
    /// Enter the idle/sleep animation (slow pulse in the configured
    /// sleep color).
    fn sleep(&self);
    /// Set a solid color and block until the driver has applied it.
    fn set_color(&self, color: Color);
    /// Animate a wipe and block until it completes.
    fn wipe(&self, color: Color, duration_ms: u32);
    /// Animate a blink and block until it completes.
    fn blink(&self, color: Color, duration_ms: u32, flashes: u32);
    /// Start a steady-state pulse; does not block.
    fn pulse(&self, color: Color);
}

/// The real [`Display`]: a handle to the command channel consumed by
/// whichever backend worker (`driver::run` for Dotstar, `neopixel::run`
/// for NeoPixel) is running on its own thread.
pub struct ChannelDisplay {
    commands: crossbeam_channel::Sender<Command>,
    ack: crossbeam_channel::Receiver<()>,
}

impl ChannelDisplay {
    pub fn new(commands: crossbeam_channel::Sender<Command>, ack: crossbeam_channel::Receiver<()>) -> Self {
        Self { commands, ack }
    }

    fn send_and_drain(&self, command: Command) {
        let _ = self.commands.send(command);
        let _ = self.ack.recv();
    }

    /// Requests the worker thread stop, leaving the strip at a dim
    /// dark-red color (§4.2, §5). Not part of [`Display`] — only the
    /// process shutdown path should call this.
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

impl Display for ChannelDisplay {
    fn wake(&self) {
        let _ = self.commands.send(Command::Wake);
    }

    fn sleep(&self) {
        let _ = self.commands.send(Command::Sleep);
    }

    fn set_color(&self, color: Color) {
        self.send_and_drain(Command::Color { r: color.r, g: color.g, b: color.b });
    }

    fn wipe(&self, color: Color, duration_ms: u32) {
        self.send_and_drain(Command::Wipe { r: color.r, g: color.g, b: color.b, duration_ms });
    }

    fn blink(&self, color: Color, duration_ms: u32, flashes: u32) {
        self.send_and_drain(Command::Blink { r: color.r, g: color.g, b: color.b, duration_ms, flashes });
    }

    fn pulse(&self, color: Color) {
        let _ = self.commands.send(Command::Pulse { r: color.r, g: color.g, b: color.b });
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
