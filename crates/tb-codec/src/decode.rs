//! Streaming decoder.
//!
//! The input is consumed one `>`-terminated chunk at a time, so a document
//! never has to fit in memory as a tree. Every problem short of an I/O
//! failure is recorded in the [`DecodeReport`] and the parse carries on with
//! the next tag.

use std::io::{BufRead, BufReader, Read};

use thiserror::Error;
use tracing::{debug, warn};

use tb_controls::{PowerSource, Thermostat};
use tb_model::{Color, HeatBoundary, Optics, Part, Shape, Simulation, TextBox, Thermometer};

use crate::CodecResult;
use crate::schema::{self, MODEL_FIELDS, VIEW_FIELDS, Scalar, unescape};
use crate::token::{Token, tokenize};

/// A non-fatal problem met while decoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeIssue {
    #[error("malformed tag `{markup}`")]
    MalformedTag { markup: String },
    #[error("invalid value `{value}` for <{tag}>")]
    InvalidValue { tag: String, value: String },
    #[error("unknown element <{tag}>")]
    UnknownElement { tag: String },
    #[error("unbalanced closing tag </{tag}>")]
    UnbalancedTag { tag: String },
    #[error("{what} rejected: {reason}")]
    Rejected { what: &'static str, reason: String },
    #[error("document ended inside {open:?}")]
    Truncated { open: Vec<String> },
}

/// Everything that went wrong without stopping the parse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeReport {
    issues: Vec<DecodeIssue>,
}

impl DecodeReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issues(&self) -> &[DecodeIssue] {
        &self.issues
    }

    fn push(&mut self, issue: DecodeIssue) {
        warn!(%issue, "state decode");
        self.issues.push(issue);
    }
}

/// Elements whose only content is other elements.
const CONTAINERS: &[&str] = &[
    "state",
    "model",
    "boundary",
    "structure",
    "part",
    "sensor",
    "controller",
    "view",
];

/// Replace `sim` with the state read from `reader`.
///
/// Every persisted field is reset to its default first. The reader is
/// consumed and dropped before this returns, on success and on error alike.
/// On an I/O error whatever was decoded so far is kept.
pub fn read_state_into<R: Read>(reader: R, sim: &mut Simulation) -> CodecResult<DecodeReport> {
    sim.clear_to_defaults();
    let mut handler = StateHandler::new(sim);
    let outcome = pump(BufReader::new(reader), &mut handler);
    let report = handler.finish();
    outcome.map(|()| report)
}

fn pump<R: Read>(mut reader: BufReader<R>, handler: &mut StateHandler<'_>) -> CodecResult<()> {
    let mut buf = Vec::new();
    let mut pending = String::new();
    loop {
        buf.clear();
        if reader.read_until(b'>', &mut buf)? == 0 {
            break;
        }
        let chunk = std::str::from_utf8(&buf)?;
        if !pending.is_empty() {
            pending.push_str(chunk);
            if is_incomplete(&pending) {
                continue;
            }
            let markup = std::mem::take(&mut pending);
            handler.markup(&markup);
            continue;
        }
        let Some(lt) = chunk.find('<') else {
            handler.text(chunk);
            continue;
        };
        handler.text(&chunk[..lt]);
        let markup = &chunk[lt..];
        if is_incomplete(markup) {
            pending.push_str(markup);
        } else {
            handler.markup(markup);
        }
    }
    if !pending.is_empty() {
        handler.report.push(DecodeIssue::MalformedTag {
            markup: pending.trim().to_string(),
        });
    }
    Ok(())
}

/// A `>` inside a comment, declaration or quoted attribute does not end the tag.
fn is_incomplete(markup: &str) -> bool {
    if markup.starts_with("<!--") {
        return !markup.ends_with("-->");
    }
    if markup.starts_with("<?") {
        return !markup.ends_with("?>");
    }
    if !markup.ends_with('>') {
        return false;
    }
    let mut quote = None;
    for c in markup.chars() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(open), _) if c == open => quote = None,
            _ => {}
        }
    }
    quote.is_some()
}

#[derive(Debug)]
struct PartDraft {
    shape: Option<Shape>,
    thermal_conductivity: f32,
    specific_heat: f32,
    density: f32,
    absorption: f32,
    reflection: f32,
    transmission: f32,
    emissivity: f32,
    temperature: f32,
    constant_temperature: bool,
    power: f32,
    power_switch: bool,
    wind_speed: f32,
    wind_angle: f32,
    uid: Option<String>,
    label: Option<String>,
    filled: bool,
    color: Color,
    visible: bool,
    draggable: bool,
}

impl Default for PartDraft {
    fn default() -> Self {
        let optics = Optics::default();
        Self {
            shape: None,
            thermal_conductivity: Part::DEFAULT_CONDUCTIVITY,
            specific_heat: Part::DEFAULT_SPECIFIC_HEAT,
            density: Part::DEFAULT_DENSITY,
            absorption: optics.absorption(),
            reflection: optics.reflection(),
            transmission: optics.transmission(),
            emissivity: optics.emissivity(),
            temperature: 0.0,
            constant_temperature: false,
            power: 0.0,
            power_switch: true,
            wind_speed: 0.0,
            wind_angle: 0.0,
            uid: None,
            label: None,
            filled: true,
            color: Color::default(),
            visible: true,
            draggable: true,
        }
    }
}

struct StateHandler<'s> {
    sim: &'s mut Simulation,
    stack: Vec<String>,
    text: String,
    part: Option<PartDraft>,
    report: DecodeReport,
}

type Attrs<'a> = [(&'a str, &'a str)];

fn attr(attrs: &Attrs<'_>, key: &str) -> Option<String> {
    attrs
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| unescape(v))
}

impl<'s> StateHandler<'s> {
    fn new(sim: &'s mut Simulation) -> Self {
        Self {
            sim,
            stack: Vec::new(),
            text: String::new(),
            part: None,
            report: DecodeReport::default(),
        }
    }

    fn text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn markup(&mut self, markup: &str) {
        match tokenize(markup) {
            Some(Token::Start { name, .. }) => {
                if name == "part" {
                    self.part = Some(PartDraft::default());
                }
                self.stack.push(name.to_string());
            }
            Some(Token::Empty { name, attrs }) => {
                let parent = self.stack.last().cloned().unwrap_or_default();
                if CONTAINERS.contains(&name) {
                    // an empty container such as `<sensor/>`
                } else if attrs.is_empty() {
                    self.scalar(&parent, name, "");
                } else {
                    self.element(&parent, name, &attrs);
                }
            }
            Some(Token::End { name }) => self.end(name),
            Some(Token::Ignorable) => {}
            None => self.report.push(DecodeIssue::MalformedTag {
                markup: markup.trim().to_string(),
            }),
        }
        self.text.clear();
    }

    fn end(&mut self, name: &str) {
        let Some(depth) = self.stack.iter().rposition(|open| open == name) else {
            self.report.push(DecodeIssue::UnbalancedTag {
                tag: name.to_string(),
            });
            return;
        };
        if depth + 1 != self.stack.len() {
            self.report.push(DecodeIssue::UnbalancedTag {
                tag: name.to_string(),
            });
            self.stack.truncate(depth + 1);
            self.text.clear();
        }
        self.stack.pop();
        if name == "part" {
            self.finish_part();
        } else if !CONTAINERS.contains(&name) {
            let parent = self.stack.last().cloned().unwrap_or_default();
            let text = std::mem::take(&mut self.text);
            self.scalar(&parent, name, &text);
        }
    }

    fn invalid(&mut self, tag: &str, value: &str) {
        self.report.push(DecodeIssue::InvalidValue {
            tag: tag.to_string(),
            value: value.to_string(),
        });
    }

    fn unknown(&mut self, tag: &str) {
        self.report.push(DecodeIssue::UnknownElement {
            tag: tag.to_string(),
        });
    }

    fn scalar(&mut self, parent: &str, tag: &str, raw: &str) {
        let text = unescape(raw.trim());
        match parent {
            "model" => match schema::find(MODEL_FIELDS, tag) {
                Some(field) => {
                    let params = &mut self.sim.model.params;
                    let applied = (field.get)(params)
                        .parse_like(&text)
                        .is_some_and(|v| (field.set)(params, v));
                    if !applied {
                        self.invalid(tag, &text);
                    }
                }
                None => self.unknown(tag),
            },
            "view" => match schema::find(VIEW_FIELDS, tag) {
                Some(field) => {
                    let view = &mut self.sim.view;
                    let applied = (field.get)(view)
                        .parse_like(&text)
                        .is_some_and(|v| (field.set)(view, v));
                    if !applied {
                        self.invalid(tag, &text);
                    }
                }
                None => self.unknown(tag),
            },
            "part" => self.part_field(tag, text),
            _ => self.unknown(tag),
        }
    }

    fn part_field(&mut self, tag: &str, text: String) {
        let Some(draft) = self.part.as_mut() else {
            self.unknown(tag);
            return;
        };
        let real = || Scalar::Real(0.0).parse_like(&text).and_then(Scalar::real);
        let flag = || Scalar::Bool(false).parse_like(&text).and_then(Scalar::boolean);
        let ok = match tag {
            "thermal_conductivity" => real().map(|v| draft.thermal_conductivity = v).is_some(),
            "specific_heat" => real().map(|v| draft.specific_heat = v).is_some(),
            "density" => real().map(|v| draft.density = v).is_some(),
            "absorption" => real().map(|v| draft.absorption = v).is_some(),
            "reflection" => real().map(|v| draft.reflection = v).is_some(),
            "transmission" => real().map(|v| draft.transmission = v).is_some(),
            "emissivity" => real().map(|v| draft.emissivity = v).is_some(),
            "temperature" => real().map(|v| draft.temperature = v).is_some(),
            "power" => real().map(|v| draft.power = v).is_some(),
            "wind_speed" => real().map(|v| draft.wind_speed = v).is_some(),
            "wind_angle" => real().map(|v| draft.wind_angle = v).is_some(),
            "constant_temperature" => flag().map(|v| draft.constant_temperature = v).is_some(),
            "power_switch" => flag().map(|v| draft.power_switch = v).is_some(),
            "filled" => flag().map(|v| draft.filled = v).is_some(),
            "visible" => flag().map(|v| draft.visible = v).is_some(),
            "draggable" => flag().map(|v| draft.draggable = v).is_some(),
            "color" => Color::from_hex(&text).map(|c| draft.color = c).is_some(),
            "uid" => {
                draft.uid = (!text.is_empty()).then(|| text.clone());
                true
            }
            "label" => {
                draft.label = (!text.is_empty()).then(|| text.clone());
                true
            }
            _ => {
                self.unknown(tag);
                return;
            }
        };
        if !ok {
            self.invalid(tag, &text);
        }
    }

    fn reals<const N: usize>(&mut self, tag: &str, attrs: &Attrs<'_>, keys: [&str; N]) -> Option<[f32; N]> {
        let mut out = [0.0; N];
        for (slot, key) in out.iter_mut().zip(keys) {
            let raw = attr(attrs, key).unwrap_or_default();
            match raw.trim().parse::<f32>().ok().filter(|v| v.is_finite()) {
                Some(v) => *slot = v,
                None => {
                    self.invalid(&format!("{tag} {key}"), &raw);
                    return None;
                }
            }
        }
        Some(out)
    }

    fn element(&mut self, parent: &str, name: &str, attrs: &Attrs<'_>) {
        match (parent, name) {
            ("part", "rectangle") => {
                if let Some([x, y, w, h]) = self.reals(name, attrs, ["x", "y", "width", "height"]) {
                    self.set_shape(Shape::rectangle(x, y, w, h));
                }
            }
            ("part", "ellipse") => {
                if let Some([x, y, a, b]) = self.reals(name, attrs, ["x", "y", "a", "b"]) {
                    self.set_shape(Shape::ellipse(x, y, a, b));
                }
            }
            ("part", "polygon") => self.polygon(attrs),
            ("boundary", "temperature_at_border" | "flux_at_border") => {
                let keys = ["upper", "lower", "left", "right"];
                if let Some([upper, lower, left, right]) = self.reals(name, attrs, keys) {
                    self.sim.model.boundary = if name == "flux_at_border" {
                        HeatBoundary::Neumann {
                            upper,
                            lower,
                            left,
                            right,
                        }
                    } else {
                        HeatBoundary::Dirichlet {
                            upper,
                            lower,
                            left,
                            right,
                        }
                    };
                }
            }
            ("sensor", "thermometer") => self.thermometer(attrs),
            ("controller", "thermostat") => self.thermostat(attrs),
            ("view", "text") => self.text_box(attrs),
            _ => self.unknown(name),
        }
    }

    fn set_shape(&mut self, shape: tb_model::ModelResult<Shape>) {
        let shape = match shape {
            Ok(shape) => shape,
            Err(e) => {
                self.report.push(DecodeIssue::Rejected {
                    what: "shape",
                    reason: e.to_string(),
                });
                return;
            }
        };
        if let Some(draft) = self.part.as_mut() {
            draft.shape = Some(shape);
        }
    }

    fn polygon(&mut self, attrs: &Attrs<'_>) {
        let raw = attr(attrs, "vertices").unwrap_or_default();
        let coords: Option<Vec<f32>> = raw
            .split(',')
            .map(|c| c.trim().parse::<f32>().ok())
            .collect();
        let Some(coords) = coords.filter(|c| c.len() % 2 == 0) else {
            self.invalid("polygon vertices", &raw);
            return;
        };
        let vertices: Vec<(f32, f32)> = coords.chunks_exact(2).map(|p| (p[0], p[1])).collect();
        if let Some(count) = attr(attrs, "count") {
            if count.trim().parse::<usize>().ok() != Some(vertices.len()) {
                self.invalid("polygon count", &count);
            }
        }
        self.set_shape(Shape::polygon(vertices));
    }

    fn finish_part(&mut self) {
        let Some(draft) = self.part.take() else {
            return;
        };
        let Some(shape) = draft.shape else {
            self.report.push(DecodeIssue::Rejected {
                what: "part",
                reason: "no shape element".to_string(),
            });
            return;
        };
        let optics = match Optics::new(
            draft.absorption,
            draft.reflection,
            draft.transmission,
            draft.emissivity,
        ) {
            Ok(optics) => optics,
            Err(e) => {
                self.report.push(DecodeIssue::Rejected {
                    what: "part",
                    reason: e.to_string(),
                });
                return;
            }
        };
        let mut part = match Part::new(shape) {
            Ok(part) => part.with_optics(optics),
            Err(e) => {
                self.report.push(DecodeIssue::Rejected {
                    what: "part",
                    reason: e.to_string(),
                });
                return;
            }
        };
        part.thermal_conductivity = draft.thermal_conductivity;
        part.specific_heat = draft.specific_heat;
        part.density = draft.density;
        part.temperature = draft.temperature;
        part.set_power(draft.power);
        if draft.constant_temperature {
            part.set_constant_temperature(true);
        }
        part.set_power_switch(draft.power_switch);
        part.wind_speed = draft.wind_speed;
        part.wind_angle = draft.wind_angle;
        part.label = draft.label;
        part.filled = draft.filled;
        part.color = draft.color;
        part.visible = draft.visible;
        part.draggable = draft.draggable;
        if let Some(uid) = draft.uid {
            part = self.claim_uid(uid, part, Part::with_uid);
        }
        if let Err(e) = self.sim.model.add_part(part) {
            self.report.push(DecodeIssue::Rejected {
                what: "part",
                reason: e.to_string(),
            });
        }
    }

    /// Attach `uid` unless another object already holds it.
    fn claim_uid<T>(&mut self, uid: String, item: T, with_uid: fn(T, String) -> T) -> T {
        if self.sim.model.is_uid_used(&uid) {
            self.report.push(DecodeIssue::Rejected {
                what: "uid",
                reason: format!("`{uid}` is already in use; kept the object without it"),
            });
            item
        } else {
            with_uid(item, uid)
        }
    }

    fn thermometer(&mut self, attrs: &Attrs<'_>) {
        let Some([x, y]) = self.reals("thermometer", attrs, ["x", "y"]) else {
            return;
        };
        let mut thermometer = Thermometer::new(x, y);
        thermometer.label = attr(attrs, "label").filter(|l| !l.is_empty());
        if let Some(uid) = attr(attrs, "uid").filter(|u| !u.is_empty()) {
            thermometer = self.claim_uid(uid, thermometer, Thermometer::with_uid);
        }
        if let Err(e) = self.sim.model.add_thermometer(thermometer) {
            self.report.push(DecodeIssue::Rejected {
                what: "thermometer",
                reason: e.to_string(),
            });
        }
    }

    fn thermostat(&mut self, attrs: &Attrs<'_>) {
        let model = &self.sim.model;
        let sensor = attr(attrs, "thermometer").and_then(|uid| model.thermometer_by_uid(&uid));
        let source = attr(attrs, "power_source").and_then(|uid| model.part_by_uid(&uid));
        let mut setpoint = Thermostat::DEFAULT_SETPOINT;
        let mut deadband = Thermostat::DEFAULT_DEADBAND;
        for (key, slot) in [("set_point", &mut setpoint), ("deadband", &mut deadband)] {
            if let Some(raw) = attr(attrs, key) {
                match raw.trim().parse::<f32>().ok().filter(|v| v.is_finite()) {
                    Some(v) => *slot = v,
                    None => self.invalid(&format!("thermostat {key}"), &raw),
                }
            }
        }
        let built = Thermostat::new(sensor, source)
            .and_then(|t| t.with_setpoint(setpoint).with_deadband(deadband))
            .map_err(tb_model::ModelError::from)
            .and_then(|t| self.sim.model.add_thermostat(t));
        if let Err(e) = built {
            self.report.push(DecodeIssue::Rejected {
                what: "thermostat",
                reason: e.to_string(),
            });
        }
    }

    fn text_box(&mut self, attrs: &Attrs<'_>) {
        let Some([x, y]) = self.reals("text", attrs, ["x", "y"]) else {
            return;
        };
        let mut text = TextBox::new(attr(attrs, "string").unwrap_or_default(), x, y);
        if let Some(size) = attr(attrs, "size") {
            match size.trim().parse() {
                Ok(v) => text.size = v,
                Err(_) => self.invalid("text size", &size),
            }
        }
        if let Some(style) = attr(attrs, "style") {
            match style.trim().parse() {
                Ok(v) => text.style = v,
                Err(_) => self.invalid("text style", &style),
            }
        }
        if let Some(font) = attr(attrs, "name") {
            text.font = font;
        }
        if let Some(color) = attr(attrs, "color") {
            match Color::from_hex(&color) {
                Some(c) => text.color = c,
                None => self.invalid("text color", &color),
            }
        }
        self.sim.view.text_boxes.push(text);
    }

    fn finish(mut self) -> DecodeReport {
        let mut report = std::mem::take(&mut self.report);
        if !self.stack.is_empty() {
            report.push(DecodeIssue::Truncated {
                open: self.stack.clone(),
            });
        }
        self.sim.model.reset();
        debug!(
            parts = self.sim.model.part_count(),
            thermometers = self.sim.model.thermometer_count(),
            issues = report.issues.len(),
            "state decoded"
        );
        report
    }
}
