//! Hardware adapter: bridges a sensor and an actuator to the domain ports.
//!
//! The scheduler takes a single `hw` argument that is both a
//! [`SensorPort`] and an [`ActuatorPort`].  [`FeederHardware`] composes the
//! two halves so they can be chosen independently (a level file with a GPIO
//! pin, a simulated sensor with a recording actuator, ...).

use core::time::Duration;

use crate::app::ports::{ActuatorError, ActuatorPort, SensorError, SensorPort};

/// Concrete adapter that combines a sensor and an actuator behind port traits.
pub struct FeederHardware<S, A> {
    sensor: S,
    actuator: A,
}

impl<S: SensorPort, A: ActuatorPort> FeederHardware<S, A> {
    pub fn new(sensor: S, actuator: A) -> Self {
        Self { sensor, actuator }
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn into_parts(self) -> (S, A) {
        (self.sensor, self.actuator)
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<S: SensorPort, A> SensorPort for FeederHardware<S, A> {
    fn read_level(&mut self) -> Result<u8, SensorError> {
        self.sensor.read_level()
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<S, A: ActuatorPort> ActuatorPort for FeederHardware<S, A> {
    fn pulse(&mut self, duration: Duration) -> Result<(), ActuatorError> {
        self.actuator.pulse(duration)
    }
}
