//! Physical constants of air.
//!
//! The background medium of a fresh model is air; the state codec only writes
//! background properties that differ from these values.

/// Thermal conductivity of air, W/(m·K).
pub const AIR_THERMAL_CONDUCTIVITY: f32 = 0.025;

/// Specific heat of air, J/(kg·K).
pub const AIR_SPECIFIC_HEAT: f32 = 1012.0;

/// Density of air, kg/m³.
pub const AIR_DENSITY: f32 = 1.204;

/// Kinematic viscosity of air, m²/s.
pub const AIR_VISCOSITY: f32 = 0.00001568;
