//! Tag writer and state encoder.

use tb_controls::PowerSource;
use tb_model::{HeatBoundary, Model, ModelParams, Part, Shape, Simulation, ViewState};
use tracing::warn;

use crate::schema::{Field, MODEL_FIELDS, VIEW_FIELDS, escape, fmt_real};

/// Minimal builder for the nested-tag document.
#[derive(Debug, Default)]
pub struct TagWriter {
    out: String,
}

impl TagWriter {
    pub fn new() -> Self {
        Self {
            out: String::with_capacity(1000),
        }
    }

    pub fn declaration(&mut self) -> &mut Self {
        self.out
            .push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        self
    }

    pub fn open(&mut self, tag: &str) -> &mut Self {
        self.out.push('<');
        self.out.push_str(tag);
        self.out.push_str(">\n");
        self
    }

    pub fn close(&mut self, tag: &str) -> &mut Self {
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push_str(">\n");
        self
    }

    /// `<tag>text</tag>`, text escaped.
    pub fn text(&mut self, tag: &str, text: &str, newline: bool) -> &mut Self {
        self.out.push('<');
        self.out.push_str(tag);
        self.out.push('>');
        self.out.push_str(&escape(text));
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push('>');
        if newline {
            self.out.push('\n');
        }
        self
    }

    /// `<tag a="v" .../>` followed by a line break, values escaped.
    pub fn empty(&mut self, tag: &str, attrs: &[(&str, String)]) -> &mut Self {
        self.out.push('<');
        self.out.push_str(tag);
        for (name, value) in attrs {
            self.out.push(' ');
            self.out.push_str(name);
            self.out.push_str("=\"");
            self.out.push_str(&escape(value));
            self.out.push('"');
        }
        self.out.push_str("/>\n");
        self
    }

    fn fields<T>(&mut self, table: &[Field<T>], target: &T, defaults: &T) -> &mut Self {
        for field in table {
            if field.should_emit(target, defaults) {
                let value = (field.get)(target).render();
                self.text(field.tag, &value, field.newline);
            }
        }
        self
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Encode the whole simulation as a saved-state document.
pub fn encode(sim: &Simulation) -> String {
    let mut w = TagWriter::new();
    w.declaration().open("state");
    write_model(&mut w, &sim.model);
    write_sensors(&mut w, &sim.model);
    write_controllers(&mut w, &sim.model);
    write_view(&mut w, &sim.view);
    w.close("state");
    w.finish()
}

fn write_model(w: &mut TagWriter, model: &Model) {
    w.open("model");
    w.fields(MODEL_FIELDS, &model.params, &ModelParams::default());

    w.open("boundary");
    let [upper, lower, left, right] = model.boundary.values();
    let tag = match model.boundary {
        HeatBoundary::Dirichlet { .. } => "temperature_at_border",
        HeatBoundary::Neumann { .. } => "flux_at_border",
    };
    w.empty(
        tag,
        &[
            ("upper", fmt_real(upper)),
            ("lower", fmt_real(lower)),
            ("left", fmt_real(left)),
            ("right", fmt_real(right)),
        ],
    );
    w.close("boundary");

    if model.part_count() > 0 {
        w.open("structure");
        for (_, part) in model.parts() {
            write_part(w, part);
        }
        w.close("structure");
    }
    w.close("model");
}

fn write_shape(w: &mut TagWriter, shape: &Shape) {
    match shape {
        Shape::Rectangle {
            x,
            y,
            width,
            height,
        } => {
            w.empty(
                "rectangle",
                &[
                    ("x", fmt_real(*x)),
                    ("y", fmt_real(*y)),
                    ("width", fmt_real(*width)),
                    ("height", fmt_real(*height)),
                ],
            );
        }
        Shape::Ellipse { x, y, a, b } => {
            w.empty(
                "ellipse",
                &[
                    ("x", fmt_real(*x)),
                    ("y", fmt_real(*y)),
                    ("a", fmt_real(*a)),
                    ("b", fmt_real(*b)),
                ],
            );
        }
        Shape::Polygon { vertices } => {
            let coords = vertices
                .iter()
                .flat_map(|(x, y)| [fmt_real(*x), fmt_real(*y)])
                .collect::<Vec<_>>()
                .join(", ");
            w.empty(
                "polygon",
                &[("count", vertices.len().to_string()), ("vertices", coords)],
            );
        }
    }
}

fn write_part(w: &mut TagWriter, part: &Part) {
    w.open("part");
    write_shape(w, part.shape());
    let optics = part.optics();
    w.text("thermal_conductivity", &fmt_real(part.thermal_conductivity), true)
        .text("specific_heat", &fmt_real(part.specific_heat), true)
        .text("density", &fmt_real(part.density), true)
        .text("transmission", &fmt_real(optics.transmission()), true)
        .text("reflection", &fmt_real(optics.reflection()), true)
        .text("absorption", &fmt_real(optics.absorption()), true)
        .text("emissivity", &fmt_real(optics.emissivity()), true)
        .text("temperature", &fmt_real(part.temperature), true);
    if part.constant_temperature() {
        w.text("constant_temperature", "true", true);
    }
    if part.power() != 0.0 {
        w.text("power", &fmt_real(part.power()), true);
    }
    if !part.power_switch() {
        w.text("power_switch", "false", true);
    }
    if part.wind_speed != 0.0 {
        w.text("wind_speed", &fmt_real(part.wind_speed), true);
    }
    if part.wind_angle != 0.0 {
        w.text("wind_angle", &fmt_real(part.wind_angle), true);
    }
    if let Some(uid) = part.uid() {
        w.text("uid", uid, true);
    }
    if let Some(label) = &part.label {
        w.text("label", label, true);
    }
    if !part.filled {
        w.text("filled", "false", true);
    }
    if part.color != tb_model::Color::default() {
        w.text("color", &part.color.to_hex(), true);
    }
    if !part.visible {
        w.text("visible", "false", true);
    }
    if !part.draggable {
        w.text("draggable", "false", true);
    }
    w.close("part");
}

fn write_sensors(w: &mut TagWriter, model: &Model) {
    w.open("sensor");
    for (_, t) in model.thermometers() {
        let mut attrs = vec![("x", fmt_real(t.x)), ("y", fmt_real(t.y))];
        if let Some(uid) = t.uid() {
            attrs.push(("uid", uid.to_string()));
        }
        if let Some(label) = &t.label {
            attrs.push(("label", label.clone()));
        }
        w.empty("thermometer", &attrs);
    }
    w.close("sensor");
}

fn write_controllers(w: &mut TagWriter, model: &Model) {
    if model.thermostats().is_empty() {
        return;
    }
    w.open("controller");
    for thermostat in model.thermostats() {
        let thermometer = model
            .thermometer(thermostat.thermometer())
            .and_then(|t| t.uid());
        let source = model.part(thermostat.power_source()).and_then(|p| p.uid());
        let (Some(thermometer), Some(source)) = (thermometer, source) else {
            warn!("thermostat endpoints need uids to be saved; skipping");
            continue;
        };
        w.empty(
            "thermostat",
            &[
                ("set_point", fmt_real(thermostat.setpoint)),
                ("deadband", fmt_real(thermostat.deadband)),
                ("thermometer", thermometer.to_string()),
                ("power_source", source.to_string()),
            ],
        );
    }
    w.close("controller");
}

fn write_view(w: &mut TagWriter, view: &ViewState) {
    w.open("view");
    w.fields(VIEW_FIELDS, view, &ViewState::default());
    for text in &view.text_boxes {
        w.empty(
            "text",
            &[
                ("string", text.text.clone()),
                ("size", text.size.to_string()),
                ("name", text.font.clone()),
                ("style", text.style.to_string()),
                ("color", text.color.to_hex()),
                ("x", fmt_real(text.x)),
                ("y", fmt_real(text.y)),
            ],
        );
    }
    w.close("view");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tb_model::GridConfig;

    #[test]
    fn default_state_document() {
        let sim = Simulation::new(GridConfig { nx: 4, ny: 4 });
        let expected = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<state>\n\
<model>\n\
<sun_angle>1.5707964</sun_angle>\n\
<solar_power_density>2000.0</solar_power_density>\n\
<solar_ray_count>24</solar_ray_count>\n\
<solar_ray_speed>0.1</solar_ray_speed>\n\
<photon_emission_interval>20</photon_emission_interval>\n\
<thermal_buoyancy>0.00025</thermal_buoyancy>\n\
<buoyancy_approximation>1</buoyancy_approximation>\n\
<boundary>\n\
<temperature_at_border upper=\"0.0\" lower=\"0.0\" left=\"0.0\" right=\"0.0\"/>\n\
</boundary>\n\
</model>\n\
<sensor>\n\
</sensor>\n\
<view>\n\
<rainbow_x>0</rainbow_x><rainbow_y>0</rainbow_y><minimum_temperature>0.0</minimum_temperature>\n\
<maximum_temperature>40.0</maximum_temperature>\n\
</view>\n\
</state>\n";
        assert_eq!(encode(&sim), expected);
    }

    #[test]
    fn non_default_flags_are_written() {
        let mut sim = Simulation::new(GridConfig { nx: 4, ny: 4 });
        sim.model.params.sunny = true;
        sim.model.params.convective = false;
        sim.view.flags.grid = true;
        sim.view.flags.clock = false;
        sim.view.rainbow_rect.width = 30;

        let doc = encode(&sim);
        assert!(doc.contains("<sunny>true</sunny><sun_angle>"));
        assert!(doc.contains("<convective>false</convective>\n"));
        assert!(doc.contains("<grid>true</grid>\n"));
        assert!(doc.contains("<clock>false</clock>\n"));
        assert!(doc.contains("<rainbow_w>30</rainbow_w>"));
        assert!(!doc.contains("<rainbow_h>"));
        assert!(!doc.contains("<structure>"));
    }

    #[test]
    fn text_is_escaped() {
        let mut sim = Simulation::new(GridConfig { nx: 4, ny: 4 });
        sim.view
            .text_boxes
            .push(tb_model::TextBox::new("a<b & \"c\"", 1.0, 2.0));
        let doc = encode(&sim);
        assert!(doc.contains("string=\"a&lt;b &amp; &quot;c&quot;\""));
    }
}
