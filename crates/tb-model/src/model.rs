//! The simulation model: sole owner of parts, thermometers and thermostats.

use tb_controls::Thermostat;
use tb_core::{Id, IdAllocator, PartId, ThermometerId};
use tracing::debug;

use crate::boundary::HeatBoundary;
use crate::error::{ModelError, ModelResult};
use crate::fields::{Fields, GridConfig};
use crate::params::ModelParams;
use crate::part::Part;
use crate::solver::{IdleSolver, Solver};
use crate::thermometer::Thermometer;

/// A radiation particle in flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Photon {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

/// What happened during one call to [`Model::advance_one_step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    /// Simulation time after the step.
    pub time: f32,
    /// Thermometers were sampled on this step.
    pub measured: bool,
    /// At least one thermostat flipped its power source.
    pub switched: bool,
    /// The view-update interval elapsed; the view should be redrawn.
    pub view_update: bool,
}

fn part_refs(parts: &[(PartId, Part)]) -> Vec<&Part> {
    parts.iter().map(|(_, p)| p).collect()
}

pub struct Model {
    pub params: ModelParams,
    pub boundary: HeatBoundary,
    parts: Vec<(PartId, Part)>,
    thermometers: Vec<(ThermometerId, Thermometer)>,
    thermostats: Vec<Thermostat>,
    ids: IdAllocator,
    fields: Fields,
    photons: Vec<Photon>,
    time: f32,
    step_count: u64,
    solver: Box<dyn Solver>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new(GridConfig::default())
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("params", &self.params)
            .field("boundary", &self.boundary)
            .field("parts", &self.parts.len())
            .field("thermometers", &self.thermometers.len())
            .field("thermostats", &self.thermostats.len())
            .field("time", &self.time)
            .finish_non_exhaustive()
    }
}

impl Model {
    pub fn new(grid: GridConfig) -> Self {
        let mut model = Self {
            params: ModelParams::default(),
            boundary: HeatBoundary::default(),
            parts: Vec::new(),
            thermometers: Vec::new(),
            thermostats: Vec::new(),
            ids: IdAllocator::new(),
            fields: Fields::new(grid),
            photons: Vec::new(),
            time: 0.0,
            step_count: 0,
            solver: Box::new(IdleSolver),
        };
        model.refresh_all();
        model.fields.initialize_temperature(&[], &model.params);
        model
    }

    pub fn with_solver(mut self, solver: Box<dyn Solver>) -> Self {
        self.solver = solver;
        self
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    // --- parts ---

    pub fn parts(&self) -> impl Iterator<Item = (PartId, &Part)> {
        self.parts.iter().map(|(id, p)| (*id, p))
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.parts.iter().find(|(pid, _)| *pid == id).map(|(_, p)| p)
    }

    pub fn part_mut(&mut self, id: PartId) -> Option<&mut Part> {
        self.parts
            .iter_mut()
            .find(|(pid, _)| *pid == id)
            .map(|(_, p)| p)
    }

    pub fn part_by_uid(&self, uid: &str) -> Option<PartId> {
        self.parts
            .iter()
            .find(|(_, p)| p.uid() == Some(uid))
            .map(|(id, _)| *id)
    }

    /// Append a part on top of the existing ones.
    ///
    /// Derived arrays are not refreshed here; callers batch edits and refresh
    /// once.
    pub fn add_part(&mut self, part: Part) -> ModelResult<PartId> {
        if let Some(uid) = part.uid() {
            self.ensure_uid_free(uid)?;
        }
        let id = self.ids.allocate();
        self.parts.push((id, part));
        Ok(id)
    }

    /// Remove a part along with any thermostat it powers.
    pub fn remove_part(&mut self, id: PartId) -> Option<Part> {
        let pos = self.parts.iter().position(|(pid, _)| *pid == id)?;
        let (_, part) = self.parts.remove(pos);
        self.thermostats.retain(|t| t.power_source() != id);
        Some(part)
    }

    /// Change a part's uid. A thermostat's power source cannot lose its uid.
    pub fn set_part_uid(&mut self, id: PartId, uid: Option<String>) -> ModelResult<()> {
        let uid = uid.filter(|u| !u.is_empty());
        if uid.is_none() && self.is_endpoint(id) {
            return Err(ModelError::EndpointUid(id));
        }
        if let Some(uid) = uid.as_deref() {
            if self.part(id).and_then(Part::uid) != Some(uid) {
                self.ensure_uid_free(uid)?;
            }
        }
        let part = self.part_mut(id).ok_or(ModelError::UnknownPart(id))?;
        part.set_uid(uid);
        Ok(())
    }

    // --- thermometers ---

    pub fn thermometers(&self) -> impl Iterator<Item = (ThermometerId, &Thermometer)> {
        self.thermometers.iter().map(|(id, t)| (*id, t))
    }

    pub fn thermometer_count(&self) -> usize {
        self.thermometers.len()
    }

    pub fn thermometer(&self, id: ThermometerId) -> Option<&Thermometer> {
        self.thermometers
            .iter()
            .find(|(tid, _)| *tid == id)
            .map(|(_, t)| t)
    }

    pub fn thermometer_mut(&mut self, id: ThermometerId) -> Option<&mut Thermometer> {
        self.thermometers
            .iter_mut()
            .find(|(tid, _)| *tid == id)
            .map(|(_, t)| t)
    }

    pub fn thermometer_by_uid(&self, uid: &str) -> Option<ThermometerId> {
        self.thermometers
            .iter()
            .find(|(_, t)| t.uid() == Some(uid))
            .map(|(id, _)| *id)
    }

    pub fn add_thermometer(&mut self, thermometer: Thermometer) -> ModelResult<ThermometerId> {
        if let Some(uid) = thermometer.uid() {
            self.ensure_uid_free(uid)?;
        }
        let id = self.ids.allocate();
        self.thermometers.push((id, thermometer));
        Ok(id)
    }

    /// Remove a thermometer along with any thermostat reading it.
    pub fn remove_thermometer(&mut self, id: ThermometerId) -> Option<Thermometer> {
        let pos = self.thermometers.iter().position(|(tid, _)| *tid == id)?;
        let (_, thermometer) = self.thermometers.remove(pos);
        self.thermostats.retain(|t| t.thermometer() != id);
        Some(thermometer)
    }

    /// Change a thermometer's uid. A thermostat's sensor cannot lose its uid.
    pub fn set_thermometer_uid(&mut self, id: ThermometerId, uid: Option<String>) -> ModelResult<()> {
        let uid = uid.filter(|u| !u.is_empty());
        if uid.is_none() && self.is_endpoint(id) {
            return Err(ModelError::EndpointUid(id));
        }
        if let Some(uid) = uid.as_deref() {
            if self.thermometer(id).and_then(Thermometer::uid) != Some(uid) {
                self.ensure_uid_free(uid)?;
            }
        }
        let thermometer = self
            .thermometer_mut(id)
            .ok_or(ModelError::UnknownThermometer(id))?;
        thermometer.set_uid(uid);
        Ok(())
    }

    // --- thermostats ---

    pub fn thermostats(&self) -> &[Thermostat] {
        &self.thermostats
    }

    /// Register a thermostat. Both of its endpoints must belong to this model.
    ///
    /// Saved thermostats refer to their endpoints by uid, so an endpoint
    /// without one is given a generated uid here.
    pub fn add_thermostat(&mut self, thermostat: Thermostat) -> ModelResult<()> {
        let sensor = thermostat.thermometer();
        let source = thermostat.power_source();
        if self.thermometer(sensor).is_none() {
            return Err(ModelError::UnknownThermometer(sensor));
        }
        if self.part(source).is_none() {
            return Err(ModelError::UnknownPart(source));
        }
        if self.thermometer(sensor).and_then(Thermometer::uid).is_none() {
            let uid = self.generate_uid("thermometer", sensor);
            self.set_thermometer_uid(sensor, Some(uid))?;
        }
        if self.part(source).and_then(Part::uid).is_none() {
            let uid = self.generate_uid("part", source);
            self.set_part_uid(source, Some(uid))?;
        }
        self.thermostats.push(thermostat);
        Ok(())
    }

    fn is_endpoint(&self, id: Id) -> bool {
        self.thermostats
            .iter()
            .any(|t| t.thermometer() == id || t.power_source() == id)
    }

    // --- uids ---

    pub fn is_uid_used(&self, uid: &str) -> bool {
        self.parts.iter().any(|(_, p)| p.uid() == Some(uid))
            || self.thermometers.iter().any(|(_, t)| t.uid() == Some(uid))
    }

    /// First free uid of the form `{prefix}{id}`, `{prefix}{id}-2`, ...
    fn generate_uid(&self, prefix: &str, id: Id) -> String {
        let base = format!("{prefix}{id}");
        let mut uid = base.clone();
        let mut n = 2;
        while self.is_uid_used(&uid) {
            uid = format!("{base}-{n}");
            n += 1;
        }
        uid
    }

    fn ensure_uid_free(&self, uid: &str) -> ModelResult<()> {
        if self.is_uid_used(uid) {
            return Err(ModelError::DuplicateUid {
                uid: uid.to_string(),
            });
        }
        Ok(())
    }

    // --- photons ---

    pub fn photons(&self) -> &[Photon] {
        &self.photons
    }

    pub fn add_photon(&mut self, photon: Photon) {
        self.photons.push(photon);
    }

    pub fn clear_photons(&mut self) {
        self.photons.clear();
    }

    // --- derived arrays ---

    pub fn refresh_material_property_arrays(&mut self) {
        let parts = part_refs(&self.parts);
        self.fields.refresh_material_properties(&parts, &self.params);
    }

    pub fn refresh_power_array(&mut self) {
        let parts = part_refs(&self.parts);
        self.fields.refresh_power(&parts, &self.params);
    }

    pub fn refresh_temperature_boundary_array(&mut self) {
        let parts = part_refs(&self.parts);
        self.fields.refresh_fixed_temperature(&parts, &self.params);
    }

    pub fn refresh_all(&mut self) {
        self.refresh_material_property_arrays();
        self.refresh_power_array();
        self.refresh_temperature_boundary_array();
    }

    pub fn temperature_at(&self, x: f32, y: f32) -> Option<f32> {
        self.fields
            .cell_at(x, y, &self.params)
            .map(|i| self.fields.temperature[i])
    }

    // --- stepping ---

    /// Advance the model by one time step.
    ///
    /// Runs the solver, moves photons, samples thermometers on measurement
    /// steps and evaluates every thermostat. The power array is refreshed
    /// only when a thermostat actually flipped its source.
    pub fn advance_one_step(&mut self) -> StepOutcome {
        self.solver
            .step(&mut self.fields, &self.params, &self.boundary);
        self.move_photons();
        self.time += self.params.timestep;
        self.step_count += 1;

        let measured = self.step_count % u64::from(self.params.measurement_interval.max(1)) == 0;
        if measured {
            self.sample_thermometers();
        }

        let mut switched = false;
        for thermostat in &self.thermostats {
            let Some(sensor) = self
                .thermometers
                .iter()
                .find(|(id, _)| *id == thermostat.thermometer())
                .map(|(_, t)| t)
            else {
                continue;
            };
            let Some(source) = self
                .parts
                .iter_mut()
                .find(|(id, _)| *id == thermostat.power_source())
                .map(|(_, p)| p)
            else {
                continue;
            };
            switched |= thermostat.control(sensor, source).needs_refresh();
        }
        if switched {
            self.refresh_power_array();
        }

        StepOutcome {
            time: self.time,
            measured,
            switched,
            view_update: self.step_count % u64::from(self.params.viewupdate_interval.max(1)) == 0,
        }
    }

    /// Sample every thermometer at its location.
    pub fn sample_thermometers(&mut self) {
        for (_, thermometer) in &mut self.thermometers {
            if let Some(i) = self.fields.cell_at(thermometer.x, thermometer.y, &self.params) {
                thermometer.record(self.fields.temperature[i]);
            }
        }
    }

    fn move_photons(&mut self) {
        let dt = self.params.timestep;
        let (lx, ly) = (self.params.lx, self.params.ly);
        self.photons.retain_mut(|p| {
            p.x += p.vx * dt;
            p.y += p.vy * dt;
            (0.0..=lx).contains(&p.x) && (0.0..=ly).contains(&p.y)
        });
    }

    // --- lifecycle ---

    /// Return to the configured initial conditions: time zero, initial
    /// temperatures, no photons, no sensor history. Parts and parameters stay.
    pub fn reset(&mut self) {
        self.time = 0.0;
        self.step_count = 0;
        self.photons.clear();
        for (_, thermometer) in &mut self.thermometers {
            thermometer.clear();
        }
        self.solver.reset();
        self.refresh_all();
        let parts = part_refs(&self.parts);
        self.fields.initialize_temperature(&parts, &self.params);
        debug!(parts = self.parts.len(), "model reset");
    }

    /// Remove every part, thermometer and thermostat. Parameters stay.
    pub fn clear(&mut self) {
        self.parts.clear();
        self.thermometers.clear();
        self.thermostats.clear();
        self.reset();
    }

    /// Clear and restore every parameter to its default, as before a load.
    pub fn clear_to_defaults(&mut self) {
        self.params = ModelParams::default();
        self.boundary = HeatBoundary::default();
        self.clear();
    }
}
