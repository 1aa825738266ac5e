use tb_controls::{PowerSource, Thermostat};
use tb_model::{Fields, GridConfig, HeatBoundary, Model, ModelParams, Part, Shape, Solver, Thermometer};

/// Lumped heating: each cell gains its power and loses a fixed amount per step.
struct Lumped;

impl Solver for Lumped {
    fn step(&mut self, fields: &mut Fields, params: &ModelParams, _boundary: &HeatBoundary) {
        let dt = params.timestep;
        for (t, q) in fields.temperature.iter_mut().zip(&fields.power) {
            *t += q * dt * 0.01 - 0.05 * dt;
        }
        fields.apply_fixed_temperature();
    }
}

fn heated_room() -> Model {
    let mut model = Model::new(GridConfig { nx: 4, ny: 4 }).with_solver(Box::new(Lumped));
    model.params.measurement_interval = 1;
    let mut heater = Part::new(Shape::rectangle(0.0, 0.0, 10.0, 10.0).unwrap()).unwrap();
    heater.set_power(100.0);
    let heater = model.add_part(heater).unwrap();
    let sensor = model.add_thermometer(Thermometer::new(5.0, 5.0)).unwrap();
    let thermostat = Thermostat::new(Some(sensor), Some(heater)).unwrap();
    model.add_thermostat(thermostat).unwrap();
    model.reset();
    model
}

#[test]
fn thermostat_holds_temperature_in_band() {
    let mut model = heated_room();
    let mut switches = 0;
    for step in 1..=400 {
        let outcome = model.advance_one_step();
        if outcome.switched {
            switches += 1;
        }
        if step > 30 {
            let t = model.temperature_at(5.0, 5.0).unwrap();
            assert!((18.5..=22.5).contains(&t), "step {step}: {t}");
        }
    }
    assert!(switches >= 3, "only {switches} switches");
}

#[test]
fn power_array_follows_the_switch() {
    let mut model = heated_room();
    assert_eq!(model.fields().power[0], 100.0);
    let mut stepped = 0;
    while !model.advance_one_step().switched {
        stepped += 1;
        assert!(stepped < 100, "heater never switched off");
    }
    let (_, heater) = model.parts().next().unwrap();
    assert!(!heater.power_switch());
    assert!(model.fields().power.iter().all(|q| *q == 0.0));
}

#[test]
fn inert_source_is_never_switched() {
    let mut model = Model::new(GridConfig { nx: 4, ny: 4 }).with_solver(Box::new(Lumped));
    model.params.measurement_interval = 1;
    let wall = model
        .add_part(Part::new(Shape::rectangle(0.0, 0.0, 10.0, 10.0).unwrap()).unwrap())
        .unwrap();
    let sensor = model.add_thermometer(Thermometer::new(5.0, 5.0)).unwrap();
    model
        .add_thermostat(Thermostat::new(Some(sensor), Some(wall)).unwrap())
        .unwrap();
    model.reset();
    for _ in 0..200 {
        assert!(!model.advance_one_step().switched);
    }
    assert!(model.part(wall).unwrap().power_switch());
}
