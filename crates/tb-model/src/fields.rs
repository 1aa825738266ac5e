//! Per-cell derived arrays.
//!
//! The solver reads these arrays every step. They are rebuilt from the part
//! list on demand: after a structural edit, a thermostat switch, or a reset.
//! Each cell takes its properties from the topmost (last added) part whose
//! shape contains the cell centre, or from the background medium.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::params::ModelParams;
use crate::part::Part;

/// Grid resolution of the derived arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub nx: usize,
    pub ny: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { nx: 100, ny: 100 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fields {
    nx: usize,
    ny: usize,
    pub temperature: Vec<f32>,
    pub conductivity: Vec<f32>,
    pub specific_heat: Vec<f32>,
    pub density: Vec<f32>,
    pub power: Vec<f32>,
    /// Held temperature of cells covered by constant-temperature parts.
    pub fixed_temperature: Vec<Option<f32>>,
}

fn topmost<'a>(parts: &[&'a Part], x: f32, y: f32) -> Option<&'a Part> {
    parts.iter().rev().copied().find(|p| p.shape().contains(x, y))
}

impl Fields {
    pub fn new(grid: GridConfig) -> Self {
        let nx = grid.nx.max(1);
        let ny = grid.ny.max(1);
        let n = nx * ny;
        Self {
            nx,
            ny,
            temperature: vec![0.0; n],
            conductivity: vec![0.0; n],
            specific_heat: vec![0.0; n],
            density: vec![0.0; n],
            power: vec![0.0; n],
            fixed_temperature: vec![None; n],
        }
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn index(&self, i: usize, j: usize) -> usize {
        j * self.nx + i
    }

    /// Cell containing model point `(x, y)`, if inside the domain.
    pub fn cell_at(&self, x: f32, y: f32, params: &ModelParams) -> Option<usize> {
        if !(0.0..=params.lx).contains(&x) || !(0.0..=params.ly).contains(&y) {
            return None;
        }
        let i = ((x / params.lx * self.nx as f32) as usize).min(self.nx - 1);
        let j = ((y / params.ly * self.ny as f32) as usize).min(self.ny - 1);
        Some(self.index(i, j))
    }

    fn centre(nx: usize, ny: usize, i: usize, j: usize, params: &ModelParams) -> (f32, f32) {
        let dx = params.lx / nx as f32;
        let dy = params.ly / ny as f32;
        ((i as f32 + 0.5) * dx, (j as f32 + 0.5) * dy)
    }

    pub fn refresh_material_properties(&mut self, parts: &[&Part], params: &ModelParams) {
        let (nx, ny) = (self.nx, self.ny);
        self.conductivity
            .par_chunks_mut(nx)
            .zip(self.specific_heat.par_chunks_mut(nx))
            .zip(self.density.par_chunks_mut(nx))
            .enumerate()
            .for_each(|(j, ((k, c), d))| {
                for i in 0..nx {
                    let (x, y) = Self::centre(nx, ny, i, j, params);
                    match topmost(parts, x, y) {
                        Some(p) => {
                            k[i] = p.thermal_conductivity;
                            c[i] = p.specific_heat;
                            d[i] = p.density;
                        }
                        None => {
                            k[i] = params.background_conductivity;
                            c[i] = params.background_specific_heat;
                            d[i] = params.background_density;
                        }
                    }
                }
            });
    }

    pub fn refresh_power(&mut self, parts: &[&Part], params: &ModelParams) {
        let (nx, ny) = (self.nx, self.ny);
        self.power
            .par_chunks_mut(nx)
            .enumerate()
            .for_each(|(j, row)| {
                for (i, q) in row.iter_mut().enumerate() {
                    let (x, y) = Self::centre(nx, ny, i, j, params);
                    *q = topmost(parts, x, y).map_or(0.0, Part::effective_power);
                }
            });
    }

    pub fn refresh_fixed_temperature(&mut self, parts: &[&Part], params: &ModelParams) {
        let (nx, ny) = (self.nx, self.ny);
        self.fixed_temperature
            .par_chunks_mut(nx)
            .enumerate()
            .for_each(|(j, row)| {
                for (i, tb) in row.iter_mut().enumerate() {
                    let (x, y) = Self::centre(nx, ny, i, j, params);
                    *tb = topmost(parts, x, y)
                        .filter(|p| p.constant_temperature())
                        .map(|p| p.temperature);
                }
            });
    }

    /// Initial temperature: background everywhere, part temperature inside parts.
    pub fn initialize_temperature(&mut self, parts: &[&Part], params: &ModelParams) {
        let (nx, ny) = (self.nx, self.ny);
        self.temperature
            .par_chunks_mut(nx)
            .enumerate()
            .for_each(|(j, row)| {
                for (i, t) in row.iter_mut().enumerate() {
                    let (x, y) = Self::centre(nx, ny, i, j, params);
                    *t = topmost(parts, x, y).map_or(params.background_temperature, |p| p.temperature);
                }
            });
    }

    /// Pin every constant-temperature cell to its held value.
    pub fn apply_fixed_temperature(&mut self) {
        self.temperature
            .par_iter_mut()
            .zip(self.fixed_temperature.par_iter())
            .for_each(|(t, tb)| {
                if let Some(v) = tb {
                    *t = *v;
                }
            });
    }
}
