//! Bang-bang (on/off) temperature regulation with hysteresis.
//!
//! A thermostat senses the temperature at one thermometer and switches one
//! power source on or off to hold that temperature near a setpoint. The
//! deadband is the half-width of the hysteresis zone: inside
//! `[setpoint - deadband, setpoint + deadband]` the switch is left alone.

use serde::{Deserialize, Serialize};
use tb_core::{PartId, ThermometerId};

use crate::error::{ControlError, ControlResult};

/// Something a thermostat can switch.
pub trait PowerSource {
    /// Configured power. Positive for a heater, negative for a cooler, zero
    /// for a source that is not a heat actuator.
    fn power(&self) -> f32;

    fn power_switch(&self) -> bool;

    fn set_power_switch(&mut self, on: bool);
}

/// Something a thermostat can read.
pub trait Sensor {
    /// Latest sampled value, `None` before the first sample.
    fn current_reading(&self) -> Option<f32>;
}

/// Outcome of one control tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchChange {
    /// The switch was left as it was.
    Unchanged,
    /// The source was switched on or off; the power array is stale.
    Switched { on: bool },
}

impl SwitchChange {
    pub fn needs_refresh(self) -> bool {
        matches!(self, SwitchChange::Switched { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thermostat {
    thermometer: ThermometerId,
    power_source: PartId,
    /// Target temperature (°C).
    pub setpoint: f32,
    /// Hysteresis half-width (°C).
    pub deadband: f32,
}

impl Thermostat {
    pub const DEFAULT_SETPOINT: f32 = 20.0;
    pub const DEFAULT_DEADBAND: f32 = 1.0;

    /// Wire a thermostat between a thermometer and a power source.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::MissingEndpoint`] if either endpoint is absent.
    pub fn new(
        thermometer: Option<ThermometerId>,
        power_source: Option<PartId>,
    ) -> ControlResult<Self> {
        let thermometer = thermometer.ok_or(ControlError::MissingEndpoint { what: "thermometer" })?;
        let power_source = power_source.ok_or(ControlError::MissingEndpoint {
            what: "power source",
        })?;
        Ok(Self {
            thermometer,
            power_source,
            setpoint: Self::DEFAULT_SETPOINT,
            deadband: Self::DEFAULT_DEADBAND,
        })
    }

    pub fn with_setpoint(mut self, setpoint: f32) -> Self {
        self.setpoint = setpoint;
        self
    }

    /// Set the hysteresis half-width. Must be finite and non-negative.
    pub fn with_deadband(mut self, deadband: f32) -> ControlResult<Self> {
        if !deadband.is_finite() || deadband < 0.0 {
            return Err(ControlError::InvalidArg {
                what: "deadband must be finite and non-negative",
            });
        }
        self.deadband = deadband;
        Ok(self)
    }

    pub fn thermometer(&self) -> ThermometerId {
        self.thermometer
    }

    pub fn power_source(&self) -> PartId {
        self.power_source
    }

    /// Run one control tick.
    ///
    /// A source with zero power is inert and never switched. A heater is
    /// switched off above `setpoint + deadband` and on below
    /// `setpoint - deadband`; a cooler does the opposite.
    pub fn control<S, P>(&self, sensor: &S, source: &mut P) -> SwitchChange
    where
        S: Sensor + ?Sized,
        P: PowerSource + ?Sized,
    {
        let power = source.power();
        if power == 0.0 {
            return SwitchChange::Unchanged;
        }
        let Some(t) = sensor.current_reading() else {
            return SwitchChange::Unchanged;
        };

        let too_hot = t > self.setpoint + self.deadband;
        let too_cold = t < self.setpoint - self.deadband;
        let wanted = if power > 0.0 {
            if too_hot {
                Some(false)
            } else if too_cold {
                Some(true)
            } else {
                None
            }
        } else if too_cold {
            Some(false)
        } else if too_hot {
            Some(true)
        } else {
            None
        };

        match wanted {
            Some(on) if on != source.power_switch() => {
                source.set_power_switch(on);
                SwitchChange::Switched { on }
            }
            _ => SwitchChange::Unchanged,
        }
    }
}
