// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Dotstar backend's animation engine: a 100 ms tick loop that
//! interprets [`Command`]s and writes full-strip frames to a [`Strip`].
//! The NeoPixel backend does not use this module — its microcontroller
//! runs the tick loop itself (see [`super::neopixel`]).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use super::{Color, Command, BRIGHTNESS_DEFAULT, BRIGHTNESS_MAX, BRIGHTNESS_MIN, BRIGHTNESS_STEP, TICK};

/// Raw pixel sink. One frame is every pixel's `(brightness, color)` pair,
/// in strip order.
pub trait Strip: Send {
    fn pixel_count(&self) -> usize;
    fn write_frame(&mut self, brightness: u8, pixels: &[Color]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Effect {
    Solid,
    Wipe { target: Color, step_ticks: u32, ticks_since_step: u32, revealed: usize },
    Blink { color: Color, half_cycle_ticks: u32, tick: u32, remaining_flashes: u32, bright_phase: bool },
    Pulse { color: Color, rising: bool },
    Sleep { color: Color, rising: bool },
}

/// Runs until a [`Command::Shutdown`] is received or `running` flips to
/// `false`, whichever first. On exit the strip is left at a dim dark-red
/// steady color (§4.2, §5).
pub fn run(
    mut strip: impl Strip,
    rx: Receiver<Command>,
    ack: Sender<()>,
    sleep_color: Color,
    running: Arc<AtomicBool>,
) {
    let pixel_count = strip.pixel_count().max(1);
    let mut pixels = vec![Color::BLACK; pixel_count];
    let mut brightness = BRIGHTNESS_DEFAULT;
    let mut effect = Effect::Solid;

    while running.load(Ordering::Relaxed) {
        match rx.recv_timeout(TICK) {
            Ok(command) => {
                if matches!(command, Command::Shutdown) {
                    break;
                }
                apply_command(command, &mut effect, &mut pixels, &mut brightness, pixel_count, sleep_color, &ack);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        step(&mut effect, &mut pixels, &mut brightness, pixel_count, &ack);
        strip.write_frame(brightness, &pixels);
    }

    let dim_red = Color::new(BRIGHTNESS_MIN, 0, 0);
    strip.write_frame(BRIGHTNESS_MIN, &vec![dim_red; pixel_count]);
}

fn ticks_for(duration_ms: u32, divisor: u32) -> u32 {
    let tick_ms = TICK.as_millis() as u32;
    let divisor = divisor.max(1);
    let raw = duration_ms / divisor;
    let rounded = ((raw + tick_ms / 2) / tick_ms) * tick_ms;
    (rounded.max(tick_ms)) / tick_ms
}

fn apply_command(
    command: Command,
    effect: &mut Effect,
    pixels: &mut [Color],
    brightness: &mut u8,
    pixel_count: usize,
    sleep_color: Color,
    ack: &Sender<()>,
) {
    match command {
        Command::Color { r, g, b } => {
            let color = Color::new(r, g, b);
            let should_abort = match effect {
                Effect::Wipe { .. } => true,
                Effect::Blink { .. } | Effect::Pulse { .. } => color.is_black(),
                Effect::Solid | Effect::Sleep { .. } => true,
            };
            if should_abort {
                *effect = Effect::Solid;
                *brightness = BRIGHTNESS_DEFAULT;
                pixels.fill(color);
            }
            let _ = ack.send(());
        }
        Command::Wipe { r, g, b, duration_ms } => {
            let target = Color::new(r, g, b);
            *brightness = BRIGHTNESS_DEFAULT;
            pixels.fill(Color::BLACK);
            *effect = Effect::Wipe {
                target,
                step_ticks: ticks_for(duration_ms, pixel_count as u32),
                ticks_since_step: 0,
                revealed: 0,
            };
            if pixel_count == 0 {
                let _ = ack.send(());
            }
        }
        Command::Blink { r, g, b, duration_ms, flashes } => {
            let color = Color::new(r, g, b);
            pixels.fill(color);
            *brightness = BRIGHTNESS_MIN;
            *effect = Effect::Blink {
                color,
                half_cycle_ticks: ticks_for(duration_ms, 2 * flashes.max(1)),
                tick: 0,
                remaining_flashes: flashes,
                bright_phase: false,
            };
        }
        Command::Pulse { r, g, b } => {
            let color = Color::new(r, g, b);
            pixels.fill(color);
            *brightness = BRIGHTNESS_MIN;
            *effect = Effect::Pulse { color, rising: true };
        }
        Command::Sleep => {
            pixels.fill(sleep_color);
            *brightness = BRIGHTNESS_MIN;
            *effect = Effect::Sleep { color: sleep_color, rising: true };
        }
        Command::Wake => {
            *effect = Effect::Solid;
        }
        Command::Shutdown => unreachable!("handled by caller before apply_command"),
    }
}

fn step(effect: &mut Effect, pixels: &mut [Color], brightness: &mut u8, pixel_count: usize, ack: &Sender<()>) {
    match effect {
        Effect::Wipe { target, step_ticks, ticks_since_step, revealed } => {
            *ticks_since_step += 1;
            if *ticks_since_step >= *step_ticks && *revealed < pixel_count {
                pixels[*revealed] = *target;
                *revealed += 1;
                *ticks_since_step = 0;
            }
            if *revealed >= pixel_count {
                let _ = ack.send(());
                *effect = Effect::Solid;
            }
        }
        Effect::Blink { color, half_cycle_ticks, tick, remaining_flashes, bright_phase } => {
            *tick += 1;
            if *tick >= *half_cycle_ticks {
                *tick = 0;
                *bright_phase = !*bright_phase;
                if !*bright_phase {
                    *remaining_flashes = remaining_flashes.saturating_sub(1);
                }
            }
            pixels.fill(*color);
            if *remaining_flashes == 0 && !*bright_phase {
                let _ = ack.send(());
                *effect = Effect::Solid;
            }
        }
        Effect::Pulse { color, rising } | Effect::Sleep { color, rising } => {
            pixels.fill(*color);
            pulse_brightness(brightness, rising);
        }
        Effect::Solid => {}
    }
}

/// Bounces brightness between min and max at a fixed step per tick,
/// matching the original pulse ramp.
fn pulse_brightness(brightness: &mut u8, rising: &mut bool) {
    if *rising {
        let next = brightness.saturating_add(BRIGHTNESS_STEP);
        if next >= BRIGHTNESS_MAX {
            *brightness = BRIGHTNESS_MAX;
            *rising = false;
        } else {
            *brightness = next;
        }
    } else {
        let next = brightness.saturating_sub(BRIGHTNESS_STEP);
        if next <= BRIGHTNESS_MIN {
            *brightness = BRIGHTNESS_MIN;
            *rising = true;
        } else {
            *brightness = next;
        }
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
