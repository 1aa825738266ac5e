//! Control primitives for thermobox.
//!
//! Controllers are evaluated once per simulation step, after the solver has
//! advanced the fields. They read a sensor and flip the switch of a power
//! source; they never touch the derived arrays themselves. Instead
//! [`Thermostat::control`] reports whether the switch changed so the model can
//! refresh its power array only when needed.

pub mod error;
pub mod thermostat;

pub use error::{ControlError, ControlResult};
pub use thermostat::{PowerSource, Sensor, SwitchChange, Thermostat};
