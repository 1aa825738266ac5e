//! Tag vocabulary and default-omission rules for the scalar fields of the
//! model and view blocks.
//!
//! Each table lists fields in document order. The encoder walks a table to
//! decide what to write; the decoder looks tags up in the same table to know
//! how to parse them. Defaults are read from `ModelParams::default()` and
//! `ViewState::default()`, so a field omitted on save is exactly the value a
//! fresh load starts from.

use tb_model::{BuoyancyApproximation, ModelParams, ViewState};

/// A scalar value as it appears between tags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Scalar {
    Real(f32),
    Int(i64),
    Bool(bool),
}

impl Scalar {
    /// Parse `text` as the same kind of scalar as `self`.
    pub(crate) fn parse_like(self, text: &str) -> Option<Scalar> {
        let text = text.trim();
        match self {
            Scalar::Real(_) => text
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Scalar::Real),
            Scalar::Int(_) => text.parse::<i64>().ok().map(Scalar::Int),
            Scalar::Bool(_) => match text {
                "true" => Some(Scalar::Bool(true)),
                "false" => Some(Scalar::Bool(false)),
                _ => None,
            },
        }
    }

    pub(crate) fn render(self) -> String {
        match self {
            Scalar::Real(v) => fmt_real(v),
            Scalar::Int(v) => v.to_string(),
            Scalar::Bool(v) => v.to_string(),
        }
    }

    pub(crate) fn real(self) -> Option<f32> {
        match self {
            Scalar::Real(v) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn int<T: TryFrom<i64>>(self) -> Option<T> {
        match self {
            Scalar::Int(v) => T::try_from(v).ok(),
            _ => None,
        }
    }

    pub(crate) fn boolean(self) -> Option<bool> {
        match self {
            Scalar::Bool(v) => Some(v),
            _ => None,
        }
    }
}

/// Render a real the way saved files have always spelled it: integral values
/// keep a trailing `.0`.
pub(crate) fn fmt_real(v: f32) -> String {
    format!("{v:?}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Omit {
    Never,
    WhenDefault,
    WhenNotPositive,
}

pub(crate) struct Field<T> {
    pub tag: &'static str,
    pub omit: Omit,
    /// Whether the element is followed by a line break.
    pub newline: bool,
    pub get: fn(&T) -> Scalar,
    /// Returns `false` if the value is out of range for the field.
    pub set: fn(&mut T, Scalar) -> bool,
}

impl<T> Field<T> {
    pub(crate) fn should_emit(&self, target: &T, defaults: &T) -> bool {
        let value = (self.get)(target);
        match self.omit {
            Omit::Never => true,
            Omit::WhenDefault => value != (self.get)(defaults),
            Omit::WhenNotPositive => match value {
                Scalar::Real(v) => v > 0.0,
                Scalar::Int(v) => v > 0,
                Scalar::Bool(v) => v,
            },
        }
    }
}

pub(crate) fn find<'t, T>(table: &'t [Field<T>], tag: &str) -> Option<&'t Field<T>> {
    table.iter().find(|f| f.tag == tag)
}

macro_rules! real {
    ($tag:literal, $omit:expr, $($f:ident).+) => {
        Field {
            tag: $tag,
            omit: $omit,
            newline: true,
            get: |p| Scalar::Real(p.$($f).+),
            set: |p, v| v.real().map(|x| p.$($f).+ = x).is_some(),
        }
    };
}

macro_rules! int {
    ($tag:literal, $omit:expr, $newline:expr, $($f:ident).+) => {
        Field {
            tag: $tag,
            omit: $omit,
            newline: $newline,
            get: |p| Scalar::Int(i64::from(p.$($f).+)),
            set: |p, v| v.int().map(|x| p.$($f).+ = x).is_some(),
        }
    };
}

macro_rules! flag {
    ($tag:literal, $newline:expr, $($f:ident).+) => {
        Field {
            tag: $tag,
            omit: Omit::WhenDefault,
            newline: $newline,
            get: |p| Scalar::Bool(p.$($f).+),
            set: |p, v| v.boolean().map(|x| p.$($f).+ = x).is_some(),
        }
    };
}

/// Scalar children of `<model>`, before `<boundary>`.
pub(crate) static MODEL_FIELDS: &[Field<ModelParams>] = &[
    real!("model_width", Omit::WhenDefault, lx),
    real!("model_height", Omit::WhenDefault, ly),
    real!("timestep", Omit::WhenDefault, timestep),
    int!("measurement_interval", Omit::WhenDefault, true, measurement_interval),
    int!("viewupdate_interval", Omit::WhenDefault, true, viewupdate_interval),
    flag!("sunny", false, sunny),
    real!("sun_angle", Omit::Never, sun_angle),
    real!("solar_power_density", Omit::Never, solar_power_density),
    int!("solar_ray_count", Omit::Never, true, solar_ray_count),
    real!("solar_ray_speed", Omit::Never, solar_ray_speed),
    int!("photon_emission_interval", Omit::Never, true, photon_emission_interval),
    flag!("convective", true, convective),
    real!("background_conductivity", Omit::WhenDefault, background_conductivity),
    real!("background_density", Omit::WhenDefault, background_density),
    real!("background_specific_heat", Omit::WhenDefault, background_specific_heat),
    real!("background_temperature", Omit::WhenDefault, background_temperature),
    real!("background_viscosity", Omit::WhenDefault, background_viscosity),
    real!("thermal_buoyancy", Omit::Never, thermal_buoyancy),
    Field {
        tag: "buoyancy_approximation",
        omit: Omit::Never,
        newline: true,
        get: |p| Scalar::Int(i64::from(p.buoyancy_approximation.code())),
        set: |p, v| {
            v.int::<u8>()
                .and_then(BuoyancyApproximation::from_code)
                .map(|mode| p.buoyancy_approximation = mode)
                .is_some()
        },
    },
];

/// Scalar children of `<view>`, before the text annotations.
pub(crate) static VIEW_FIELDS: &[Field<ViewState>] = &[
    flag!("grid", true, flags.grid),
    flag!("ruler", true, flags.ruler),
    flag!("isotherm", true, flags.isotherm),
    flag!("rainbow", true, flags.rainbow),
    int!("rainbow_x", Omit::Never, false, rainbow_rect.x),
    int!("rainbow_y", Omit::Never, false, rainbow_rect.y),
    int!("rainbow_w", Omit::WhenNotPositive, false, rainbow_rect.width),
    int!("rainbow_h", Omit::WhenNotPositive, false, rainbow_rect.height),
    real!("minimum_temperature", Omit::Never, min_temperature),
    real!("maximum_temperature", Omit::Never, max_temperature),
    flag!("velocity", true, flags.velocity),
    flag!("streamline", true, flags.streamline),
    flag!("graph", true, flags.graph),
    flag!("clock", true, flags.clock),
    flag!("smooth", true, flags.smooth),
];

/// Escape text for element content and attribute values.
pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Undo [`escape`], plus numeric character references. Unknown entities are
/// kept verbatim.
pub(crate) fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest.find(';') else {
            break;
        };
        let entity = &rest[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reals_keep_trailing_zero() {
        assert_eq!(fmt_real(10.0), "10.0");
        assert_eq!(fmt_real(0.025), "0.025");
    }

    #[test]
    fn scalar_parsing_follows_kind() {
        assert_eq!(Scalar::Real(0.0).parse_like(" 2.5 "), Some(Scalar::Real(2.5)));
        assert_eq!(Scalar::Real(0.0).parse_like("1.568E-5"), Some(Scalar::Real(1.568e-5)));
        assert_eq!(Scalar::Int(0).parse_like("2.5"), None);
        assert_eq!(Scalar::Bool(false).parse_like("yes"), None);
        assert_eq!(Scalar::Real(0.0).parse_like("NaN"), None);
    }

    #[test]
    fn tags_are_unique() {
        let mut tags: Vec<_> = MODEL_FIELDS
            .iter()
            .map(|f| f.tag)
            .chain(VIEW_FIELDS.iter().map(|f| f.tag))
            .collect();
        let n = tags.len();
        tags.sort_unstable();
        tags.dedup();
        assert_eq!(tags.len(), n);
    }

    #[test]
    fn out_of_range_ints_rejected() {
        let field = find(MODEL_FIELDS, "measurement_interval").unwrap();
        let mut params = ModelParams::default();
        assert!(!(field.set)(&mut params, Scalar::Int(-5)));
        assert_eq!(params.measurement_interval, 500);
    }

    #[test]
    fn escape_round_trip() {
        let raw = "a < b & \"c\" > 'd'";
        assert_eq!(unescape(&escape(raw)), raw);
        assert_eq!(unescape("&#65;&#x42;&bogus;"), "AB&bogus;");
    }
}
