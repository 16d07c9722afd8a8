// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`Hal`] implementation backed by `rppal`, the crate the rest of this
//! pack's GPIO/SPI code standardizes on.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use rppal::gpio::{Gpio, Level, OutputPin, Trigger};

use crate::button::ButtonQueue;
use crate::error::BoxError;
use crate::identity::BoardRevision;

use super::{Hal, PIN_BUTTON, PIN_BUZZER, PIN_INTERLOCK, PIN_RELAY, PIN_RFID_NRST};

pub struct RpiHal {
    interlock: OutputPin,
    /// Shared with the card reader's hang handler (§4.3.2), which beeps
    /// from inside `CardReader::read()` on the FSM thread — a second
    /// owner of the same pin, never a second *thread*.
    buzzer: Arc<Mutex<OutputPin>>,
    relay: OutputPin,
    rfid_nrst: OutputPin,
    interlock_active_high: bool,
}

impl RpiHal {
    /// Claim and initialize every pin this box drives apart from the
    /// button (owned by [`ButtonWorker`]). Equipment power starts off and
    /// the RFID module starts held in reset, matching the original
    /// hardware abstraction's constructor order.
    pub fn new(revision: BoardRevision) -> Result<Self, BoxError> {
        let gpio = Gpio::new().map_err(|e| BoxError::Directory(format!("gpio init failed: {e}")))?;

        let mut interlock = gpio
            .get(PIN_INTERLOCK)
            .map_err(|e| BoxError::Directory(e.to_string()))?
            .into_output();
        let mut buzzer = gpio
            .get(PIN_BUZZER)
            .map_err(|e| BoxError::Directory(e.to_string()))?
            .into_output();
        let mut relay = gpio
            .get(PIN_RELAY)
            .map_err(|e| BoxError::Directory(e.to_string()))?
            .into_output();
        let mut rfid_nrst = gpio
            .get(PIN_RFID_NRST)
            .map_err(|e| BoxError::Directory(e.to_string()))?
            .into_output();

        rfid_nrst.set_low();
        interlock.set_low();
        buzzer.set_low();
        relay.set_low();
        rfid_nrst.set_high();

        Ok(Self {
            interlock,
            buzzer: Arc::new(Mutex::new(buzzer)),
            relay,
            rfid_nrst,
            interlock_active_high: revision.interlock_active_high(),
        })
    }

    /// A handle the card reader's hang-detection path can toggle directly,
    /// without going through the FSM's `&mut dyn Hal` borrow (§4.3.2).
    pub fn buzzer_handle(&self) -> Arc<Mutex<OutputPin>> {
        Arc::clone(&self.buzzer)
    }
}

fn level(on: bool) -> Level {
    if on {
        Level::High
    } else {
        Level::Low
    }
}

/// Drops the relay and opens the interlock regardless of how the process
/// exits, including an early `?` return before the FSM ever runs, or a
/// panicking unwind (§5 fail safe on panic). The release profile uses
/// `panic = "unwind"` specifically so this runs on that last path too; the
/// external watchdog remains the backstop for hangs, not for panics.
impl Drop for RpiHal {
    fn drop(&mut self) {
        self.relay.write(Level::Low);
        let interlock_on = !self.interlock_active_high;
        self.interlock.write(level(interlock_on));
    }
}

impl Hal for RpiHal {
    fn set_equipment_power(&mut self, on: bool) {
        self.relay.write(level(on));
        let interlock_on = if self.interlock_active_high { on } else { !on };
        self.interlock.write(level(interlock_on));
    }

    fn set_buzzer(&mut self, on: bool) {
        #[allow(clippy::unwrap_used)]
        self.buzzer.lock().unwrap().write(level(on));
    }

    fn set_rfid_reset(&mut self, deasserted: bool) {
        self.rfid_nrst.write(level(deasserted));
    }
}

/// Owns the button pin and its interrupt callback for the lifetime of the
/// process: the "button edge worker" of §4.4/§5, kept alive by holding its
/// `InputPin` rather than by a `JoinHandle` — `rppal` runs the interrupt
/// callback on its own internal thread once registered.
pub struct ButtonWorker {
    _pin: rppal::gpio::InputPin,
}

impl ButtonWorker {
    pub fn spawn(queue: ButtonQueue) -> Result<Self, BoxError> {
        let gpio = Gpio::new().map_err(|e| BoxError::Directory(format!("gpio init failed: {e}")))?;
        let mut pin = gpio
            .get(PIN_BUTTON)
            .map_err(|e| BoxError::Directory(e.to_string()))?
            .into_input_pulldown();

        pin.set_async_interrupt(Trigger::RisingEdge, None, move |_event| {
            queue.record_press(Instant::now());
        })
        .map_err(|e| BoxError::Directory(e.to_string()))?;

        Ok(Self { _pin: pin })
    }
}
