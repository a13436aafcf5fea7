//! Pulse actuator driver.
//!
//! Drives any `embedded_hal` output pin high for a fixed time, then low.
//! The delay source is injected (`DelayNs`), so the same driver runs on a
//! value file with [`StdDelay`](super::time::StdDelay) or on a mock pin
//! with a no-op delay.
//!
//! ## Contract
//!
//! The driver is a dumb actuator: it reports whether the pin writes went
//! through, never whether the pulse had its intended effect.  If raising
//! the pin succeeds but lowering it fails, the low write is attempted once
//! more before giving up.

use core::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::warn;

use crate::app::ports::{ActuatorError, ActuatorPort};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseState {
    Low,
    High,
    Faulted,
}

pub struct PinActuator<P, D> {
    pin: P,
    delay: D,
    state: PulseState,
    pulses: u64,
}

impl<P: OutputPin, D: DelayNs> PinActuator<P, D> {
    pub fn new(pin: P, delay: D) -> Self {
        Self {
            pin,
            delay,
            state: PulseState::Low,
            pulses: 0,
        }
    }

    pub fn state(&self) -> PulseState {
        self.state
    }

    /// Completed pulses (high and low both written).
    pub fn pulses(&self) -> u64 {
        self.pulses
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }

    fn set_low_hw(&mut self) -> Result<(), ActuatorError> {
        if self.pin.set_low().is_ok() || self.pin.set_low().is_ok() {
            self.state = PulseState::Low;
            Ok(())
        } else {
            warn!("PinActuator: output stuck high");
            self.state = PulseState::Faulted;
            Err(ActuatorError::PinWriteFailed)
        }
    }
}

impl<P: OutputPin, D: DelayNs> ActuatorPort for PinActuator<P, D> {
    fn pulse(&mut self, duration: Duration) -> Result<(), ActuatorError> {
        if self.pin.set_high().is_err() {
            self.state = PulseState::Faulted;
            // Best effort: make sure the output is not left floating high.
            let _ = self.pin.set_low();
            return Err(ActuatorError::PinWriteFailed);
        }
        self.state = PulseState::High;
        self.delay
            .delay_ms(u32::try_from(duration.as_millis()).unwrap_or(u32::MAX));
        self.set_low_hw()?;
        self.pulses += 1;
        Ok(())
    }
}
