//! Seam for the numerical solver.

use crate::boundary::HeatBoundary;
use crate::fields::Fields;
use crate::params::ModelParams;

/// Advances the temperature field by one time step.
///
/// Implementations own whatever scratch state they need. The model calls
/// [`Solver::step`] from the stepping worker while holding the simulation
/// lock, so a step never overlaps a structural edit.
pub trait Solver: Send {
    fn step(&mut self, fields: &mut Fields, params: &ModelParams, boundary: &HeatBoundary);

    /// Drop any solver-internal history (called on reset and load).
    fn reset(&mut self) {}
}

/// Solver without transport: only holds constant-temperature cells at their
/// set values. Used when no physics backend is installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdleSolver;

impl Solver for IdleSolver {
    fn step(&mut self, fields: &mut Fields, _params: &ModelParams, _boundary: &HeatBoundary) {
        fields.apply_fixed_temperature();
    }
}
