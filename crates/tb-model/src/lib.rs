//! Simulation model and view state for thermobox.
//!
//! Provides:
//! - scalar model parameters with their documented defaults
//! - parts, thermometers and the heat boundary
//! - derived per-cell arrays (material properties, power, fixed temperatures)
//! - a pluggable [`Solver`] seam for the numerical stepping
//! - the view state persisted alongside the model
//!
//! The model is the single owner of every part, thermometer and thermostat.
//! Everything outside refers to them by [`tb_core::Id`].

pub mod boundary;
pub mod error;
pub mod fields;
pub mod model;
pub mod params;
pub mod part;
pub mod shape;
pub mod simulation;
pub mod solver;
pub mod thermometer;
pub mod view;

pub use boundary::HeatBoundary;
pub use error::{ModelError, ModelResult};
pub use fields::{Fields, GridConfig};
pub use model::{Model, Photon, StepOutcome};
pub use params::{BuoyancyApproximation, ModelParams};
pub use part::{Color, Optics, Part};
pub use shape::Shape;
pub use simulation::Simulation;
pub use solver::{IdleSolver, Solver};
pub use thermometer::Thermometer;
pub use view::{DisplayFlags, RainbowRect, TextBox, ViewState};
