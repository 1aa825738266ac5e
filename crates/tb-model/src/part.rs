//! Structural parts: solid objects with thermal and optical properties.

use serde::{Deserialize, Serialize};
use tb_controls::PowerSource;
use tb_core::numeric::{OPTICAL_SUM_TOLERANCE, ensure_in_range, nearly_equal};

use crate::error::{ModelError, ModelResult};
use crate::shape::Shape;

/// 24-bit RGB fill color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub const GRAY: Color = Color(0x808080);

    pub fn to_hex(self) -> String {
        format!("{:06x}", self.0 & 0x00ff_ffff)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.trim().trim_start_matches('#');
        u32::from_str_radix(s, 16)
            .ok()
            .filter(|v| *v <= 0x00ff_ffff)
            .map(Color)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::GRAY
    }
}

/// Radiative properties of a part.
///
/// Absorption, reflection and transmission partition incoming radiation and
/// must sum to one (within [`OPTICAL_SUM_TOLERANCE`]). Each coefficient,
/// emissivity included, lies in `[0, 1]`. Out-of-range values are rejected,
/// never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Optics {
    absorption: f32,
    reflection: f32,
    transmission: f32,
    emissivity: f32,
}

impl Optics {
    pub fn new(
        absorption: f32,
        reflection: f32,
        transmission: f32,
        emissivity: f32,
    ) -> ModelResult<Self> {
        ensure_in_range(absorption, 0.0, 1.0, "absorption")?;
        ensure_in_range(reflection, 0.0, 1.0, "reflection")?;
        ensure_in_range(transmission, 0.0, 1.0, "transmission")?;
        ensure_in_range(emissivity, 0.0, 1.0, "emissivity")?;
        let sum = absorption + reflection + transmission;
        if !nearly_equal(sum, 1.0, OPTICAL_SUM_TOLERANCE) {
            return Err(ModelError::InvalidOptics {
                what: format!(
                    "absorption + reflection + transmission = {sum}, expected 1 ± {OPTICAL_SUM_TOLERANCE}"
                ),
            });
        }
        Ok(Self {
            absorption,
            reflection,
            transmission,
            emissivity,
        })
    }

    pub fn absorption(&self) -> f32 {
        self.absorption
    }

    pub fn reflection(&self) -> f32 {
        self.reflection
    }

    pub fn transmission(&self) -> f32 {
        self.transmission
    }

    pub fn emissivity(&self) -> f32 {
        self.emissivity
    }
}

impl Default for Optics {
    fn default() -> Self {
        Self {
            absorption: 1.0,
            reflection: 0.0,
            transmission: 0.0,
            emissivity: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    uid: Option<String>,
    pub label: Option<String>,
    shape: Shape,
    pub thermal_conductivity: f32,
    pub specific_heat: f32,
    pub density: f32,
    optics: Optics,
    /// Initial temperature, or the held temperature in constant-temperature mode.
    pub temperature: f32,
    constant_temperature: bool,
    power: f32,
    power_switch: bool,
    pub wind_speed: f32,
    /// Wind direction in radians.
    pub wind_angle: f32,
    pub visible: bool,
    pub draggable: bool,
    pub filled: bool,
    pub color: Color,
}

impl Part {
    pub const DEFAULT_CONDUCTIVITY: f32 = 1.0;
    pub const DEFAULT_SPECIFIC_HEAT: f32 = 1300.0;
    pub const DEFAULT_DENSITY: f32 = 25.0;

    pub fn new(shape: Shape) -> ModelResult<Self> {
        shape.validate()?;
        Ok(Self {
            uid: None,
            label: None,
            shape,
            thermal_conductivity: Self::DEFAULT_CONDUCTIVITY,
            specific_heat: Self::DEFAULT_SPECIFIC_HEAT,
            density: Self::DEFAULT_DENSITY,
            optics: Optics::default(),
            temperature: 0.0,
            constant_temperature: false,
            power: 0.0,
            power_switch: true,
            wind_speed: 0.0,
            wind_angle: 0.0,
            visible: true,
            draggable: true,
            filled: true,
            color: Color::default(),
        })
    }

    /// Set the uid before the part is added to a model. Empty means none.
    /// Uniqueness is checked by the model on insertion.
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        let uid = uid.into();
        self.uid = (!uid.is_empty()).then_some(uid);
        self
    }

    pub fn with_optics(mut self, optics: Optics) -> Self {
        self.optics = optics;
        self
    }

    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }

    pub(crate) fn set_uid(&mut self, uid: Option<String>) {
        self.uid = uid.filter(|u| !u.is_empty());
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn set_shape(&mut self, shape: Shape) -> ModelResult<()> {
        shape.validate()?;
        self.shape = shape;
        Ok(())
    }

    pub fn optics(&self) -> &Optics {
        &self.optics
    }

    pub fn set_optics(&mut self, optics: Optics) {
        self.optics = optics;
    }

    pub fn emissivity(&self) -> f32 {
        self.optics.emissivity
    }

    pub fn constant_temperature(&self) -> bool {
        self.constant_temperature
    }

    /// Holding a fixed temperature excludes being a power source.
    pub fn set_constant_temperature(&mut self, on: bool) {
        self.constant_temperature = on;
        if on {
            self.power = 0.0;
        }
    }

    /// A nonzero power excludes constant-temperature mode.
    pub fn set_power(&mut self, power: f32) {
        self.power = power;
        if power != 0.0 {
            self.constant_temperature = false;
        }
    }

    /// Power currently delivered: the configured power when switched on.
    pub fn effective_power(&self) -> f32 {
        if self.power_switch { self.power } else { 0.0 }
    }
}

impl PowerSource for Part {
    fn power(&self) -> f32 {
        self.power
    }

    fn power_switch(&self) -> bool {
        self.power_switch
    }

    fn set_power_switch(&mut self, on: bool) {
        self.power_switch = on;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> Part {
        Part::new(Shape::rectangle(0.0, 0.0, 1.0, 1.0).unwrap()).unwrap()
    }

    #[test]
    fn optics_must_partition_radiation() {
        assert!(Optics::new(0.5, 0.3, 0.2, 0.9).is_ok());
        assert!(Optics::new(0.5, 0.3, 0.205, 0.0).is_ok());
        assert!(matches!(
            Optics::new(0.5, 0.5, 0.5, 0.0),
            Err(ModelError::InvalidOptics { .. })
        ));
    }

    #[test]
    fn optics_out_of_range_rejected() {
        assert!(Optics::new(1.2, -0.2, 0.0, 0.0).is_err());
        assert!(Optics::new(1.0, 0.0, 0.0, 1.5).is_err());
    }

    #[test]
    fn power_and_constant_temperature_are_exclusive() {
        let mut p = block();
        p.set_constant_temperature(true);
        p.set_power(10.0);
        assert!(!p.constant_temperature());
        assert_eq!(p.power(), 10.0);

        p.set_constant_temperature(true);
        assert_eq!(p.power(), 0.0);
    }

    #[test]
    fn switch_gates_effective_power() {
        let mut p = block();
        p.set_power(5.0);
        assert_eq!(p.effective_power(), 5.0);
        p.set_power_switch(false);
        assert_eq!(p.effective_power(), 0.0);
    }

    #[test]
    fn empty_uid_means_none() {
        assert_eq!(block().with_uid("").uid(), None);
        assert_eq!(block().with_uid("a").uid(), Some("a"));
    }

    #[test]
    fn color_hex() {
        assert_eq!(Color(0x00ff10).to_hex(), "00ff10");
        assert_eq!(Color::from_hex("#00FF10"), Some(Color(0x00ff10)));
        assert_eq!(Color::from_hex("zz"), None);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn optics_accept_exactly_bounded_partitions(
            a in -0.2f32..1.2,
            r in -0.2f32..1.2,
            slack in -0.03f32..0.03,
            e in -0.2f32..1.2,
        ) {
            let t = 1.0 - a - r + slack;
            let bounded = [a, r, t, e].iter().all(|c| (0.0..=1.0).contains(c));
            let partitions = nearly_equal(a + r + t, 1.0, OPTICAL_SUM_TOLERANCE);
            match Optics::new(a, r, t, e) {
                Ok(optics) => {
                    prop_assert!(bounded && partitions);
                    prop_assert_eq!(optics.transmission(), t);
                }
                Err(_) => prop_assert!(!(bounded && partitions)),
            }
        }
    }
}
