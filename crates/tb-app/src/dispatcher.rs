//! User-intent events applied to the running simulation.

use std::f32::consts::PI;
use std::sync::Arc;
use std::sync::mpsc::Receiver;

use tb_core::{PartId, ThermometerId};
use tb_model::{Part, Simulation};
use tracing::{debug, warn};

use crate::engine::ExecutionEngine;
use crate::error::EngineResult;

/// One nudge of the sun: ten degrees.
pub const SUN_ANGLE_STEP: f32 = PI / 18.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManipulationKind {
    Delete,
    Run,
    Stop,
    Reset,
    SunShine,
    SunAngleIncrease,
    SunAngleDecrease,
    /// The target was edited in place.
    PropertyChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    #[default]
    None,
    Part(PartId),
    Thermometer(ThermometerId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManipulationEvent {
    pub kind: ManipulationKind,
    pub target: Target,
}

impl ManipulationEvent {
    pub fn new(kind: ManipulationKind, target: Target) -> Self {
        Self { kind, target }
    }

    /// An event with no target.
    pub fn of(kind: ManipulationKind) -> Self {
        Self::new(kind, Target::None)
    }
}

/// Applies [`ManipulationEvent`]s one at a time.
///
/// Any event aimed at a part, whatever its kind, rebuilds the material,
/// power and boundary arrays afterwards. If that part radiates (emissivity
/// above zero) the photons in flight are dropped too. Every event ends with a
/// repaint request.
#[derive(Debug, Clone)]
pub struct ManipulationDispatcher {
    engine: Arc<ExecutionEngine>,
}

impl ManipulationDispatcher {
    pub fn new(engine: Arc<ExecutionEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    /// Apply one event. Only [`ManipulationKind::Run`] can fail.
    pub fn dispatch(&self, event: ManipulationEvent) -> EngineResult<()> {
        debug!(?event, "manipulation");
        let outcome = match event.kind {
            ManipulationKind::Run => self.engine.run(),
            ManipulationKind::Stop => {
                self.engine.stop();
                Ok(())
            }
            ManipulationKind::Reset => {
                self.engine.reset();
                Ok(())
            }
            _ => Ok(()),
        };
        self.engine.with_simulation(|sim| apply(sim, event));
        self.engine.observer().repaint();
        outcome
    }

    /// Dispatch events until every sender has hung up.
    pub fn drain(&self, events: &Receiver<ManipulationEvent>) {
        for event in events {
            if let Err(e) = self.dispatch(event) {
                warn!(?event, error = %e, "manipulation failed");
            }
        }
    }
}

fn apply(sim: &mut Simulation, event: ManipulationEvent) {
    let touched = match event.target {
        Target::Part(id) => sim.model.part(id).map(Part::emissivity),
        _ => None,
    };

    let params = &mut sim.model.params;
    match event.kind {
        ManipulationKind::Delete => match event.target {
            Target::Part(id) => {
                sim.model.remove_part(id);
            }
            Target::Thermometer(id) => {
                sim.model.remove_thermometer(id);
            }
            Target::None => debug!("delete without a target"),
        },
        ManipulationKind::SunShine => {
            params.sunny = !params.sunny;
            sim.model.refresh_power_array();
        }
        ManipulationKind::SunAngleIncrease => {
            params.sun_angle = (params.sun_angle + SUN_ANGLE_STEP).clamp(0.0, PI);
            sim.model.refresh_power_array();
        }
        ManipulationKind::SunAngleDecrease => {
            params.sun_angle = (params.sun_angle - SUN_ANGLE_STEP).clamp(0.0, PI);
            sim.model.refresh_power_array();
        }
        ManipulationKind::Run
        | ManipulationKind::Stop
        | ManipulationKind::Reset
        | ManipulationKind::PropertyChange => {}
    }

    if let Some(emissivity) = touched {
        sim.model.refresh_material_property_arrays();
        sim.model.refresh_power_array();
        sim.model.refresh_temperature_boundary_array();
        if emissivity > 0.0 {
            sim.model.clear_photons();
        }
    }
}
