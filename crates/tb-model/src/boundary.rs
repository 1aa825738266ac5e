//! Thermal boundary conditions at the four borders of the domain.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HeatBoundary {
    /// Fixed temperature (°C) at each border.
    Dirichlet {
        upper: f32,
        lower: f32,
        left: f32,
        right: f32,
    },
    /// Fixed heat flux at each border.
    Neumann {
        upper: f32,
        lower: f32,
        left: f32,
        right: f32,
    },
}

impl Default for HeatBoundary {
    fn default() -> Self {
        HeatBoundary::Dirichlet {
            upper: 0.0,
            lower: 0.0,
            left: 0.0,
            right: 0.0,
        }
    }
}

impl HeatBoundary {
    /// Border values in `[upper, lower, left, right]` order.
    pub fn values(&self) -> [f32; 4] {
        match *self {
            HeatBoundary::Dirichlet {
                upper,
                lower,
                left,
                right,
            }
            | HeatBoundary::Neumann {
                upper,
                lower,
                left,
                right,
            } => [upper, lower, left, right],
        }
    }
}
