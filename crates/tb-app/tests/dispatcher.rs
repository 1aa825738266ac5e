use std::f32::consts::PI;
use std::sync::Arc;
use std::sync::mpsc::channel;

use proptest::prelude::*;
use tb_app::{
    ChannelObserver, EngineConfig, EngineState, ExecutionEngine, ManipulationDispatcher,
    ManipulationEvent, ManipulationKind, NullObserver, Target, ViewEvent,
};
use tb_controls::Thermostat;
use tb_core::PartId;
use tb_model::{GridConfig, Optics, Part, Photon, Shape, Thermometer};

fn config() -> EngineConfig {
    EngineConfig {
        grid: GridConfig { nx: 4, ny: 4 },
        step_pause_ms: 0,
    }
}

fn dispatcher() -> ManipulationDispatcher {
    ManipulationDispatcher::new(Arc::new(ExecutionEngine::new(
        &config(),
        Arc::new(NullObserver),
    )))
}

fn add_part(d: &ManipulationDispatcher, emissivity: f32) -> PartId {
    d.engine().with_simulation(|sim| {
        let optics = Optics::new(1.0, 0.0, 0.0, emissivity).unwrap();
        let part = Part::new(Shape::rectangle(2.0, 2.0, 1.0, 1.0).unwrap())
            .unwrap()
            .with_optics(optics);
        let id = sim.model.add_part(part).unwrap();
        sim.model.add_photon(Photon {
            x: 5.0,
            y: 5.0,
            vx: 0.1,
            vy: 0.0,
        });
        id
    })
}

fn photons(d: &ManipulationDispatcher) -> usize {
    d.engine().with_simulation(|sim| sim.model.photons().len())
}

#[test]
fn deleting_a_non_emitter_keeps_photons() {
    let d = dispatcher();
    let id = add_part(&d, 0.0);
    d.dispatch(ManipulationEvent::new(ManipulationKind::Delete, Target::Part(id)))
        .unwrap();
    assert_eq!(d.engine().with_simulation(|sim| sim.model.part_count()), 0);
    assert_eq!(photons(&d), 1);
}

#[test]
fn deleting_an_emitter_clears_photons() {
    let d = dispatcher();
    let id = add_part(&d, 0.8);
    d.dispatch(ManipulationEvent::new(ManipulationKind::Delete, Target::Part(id)))
        .unwrap();
    assert_eq!(photons(&d), 0);
}

#[test]
fn editing_an_emitter_clears_photons() {
    let d = dispatcher();
    let id = add_part(&d, 0.3);
    d.dispatch(ManipulationEvent::new(
        ManipulationKind::PropertyChange,
        Target::Part(id),
    ))
    .unwrap();
    assert_eq!(photons(&d), 0);
    assert_eq!(d.engine().with_simulation(|sim| sim.model.part_count()), 1);
}

#[test]
fn deleting_a_thermometer_drops_its_thermostat() {
    let d = dispatcher();
    let id = add_part(&d, 0.0);
    let sensor = d.engine().with_simulation(|sim| {
        let sensor = sim.model.add_thermometer(Thermometer::new(1.0, 1.0)).unwrap();
        let thermostat = Thermostat::new(Some(sensor), Some(id)).unwrap();
        sim.model.add_thermostat(thermostat).unwrap();
        sensor
    });
    d.dispatch(ManipulationEvent::new(
        ManipulationKind::Delete,
        Target::Thermometer(sensor),
    ))
    .unwrap();
    d.engine().with_simulation(|sim| {
        assert_eq!(sim.model.thermometer_count(), 0);
        assert!(sim.model.thermostats().is_empty());
    });
}

#[test]
fn every_event_requests_a_repaint() {
    let (observer, events) = ChannelObserver::new();
    let d = ManipulationDispatcher::new(Arc::new(ExecutionEngine::new(
        &config(),
        Arc::new(observer),
    )));
    for kind in [
        ManipulationKind::SunShine,
        ManipulationKind::SunAngleIncrease,
        ManipulationKind::SunAngleDecrease,
        ManipulationKind::Stop,
        ManipulationKind::Delete,
    ] {
        d.dispatch(ManipulationEvent::of(kind)).unwrap();
    }
    let repaints = events
        .try_iter()
        .filter(|e| *e == ViewEvent::Repaint)
        .count();
    assert_eq!(repaints, 5);
}

#[test]
fn run_stop_reset_drive_the_engine() {
    let d = dispatcher();
    d.dispatch(ManipulationEvent::of(ManipulationKind::Run)).unwrap();
    assert_eq!(d.engine().state(), EngineState::Running);
    d.dispatch(ManipulationEvent::of(ManipulationKind::Stop)).unwrap();
    assert_eq!(d.engine().state(), EngineState::Stopped);
    d.dispatch(ManipulationEvent::of(ManipulationKind::Run)).unwrap();
    d.dispatch(ManipulationEvent::of(ManipulationKind::Reset)).unwrap();
    assert_eq!(d.engine().state(), EngineState::Stopped);
    assert_eq!(d.engine().with_simulation(|sim| sim.model.time()), 0.0);
    assert!(d.engine().active_workers() <= 1);
}

#[test]
fn drain_applies_queued_events_in_order() {
    let d = dispatcher();
    let (tx, rx) = channel();
    tx.send(ManipulationEvent::of(ManipulationKind::SunShine)).unwrap();
    tx.send(ManipulationEvent::of(ManipulationKind::SunAngleDecrease))
        .unwrap();
    tx.send(ManipulationEvent::of(ManipulationKind::SunShine)).unwrap();
    drop(tx);
    d.drain(&rx);
    d.engine().with_simulation(|sim| {
        assert!(!sim.model.params.sunny);
        assert!((sim.model.params.sun_angle - (PI / 2.0 - PI / 18.0)).abs() < 1e-6);
    });
}

proptest! {
    #[test]
    fn sun_angle_stays_in_range(
        start in -1.0f32..4.0,
        moves in prop::collection::vec(any::<bool>(), 1..100),
    ) {
        let d = dispatcher();
        d.engine().with_simulation(|sim| sim.model.params.sun_angle = start);
        for up in moves {
            let kind = if up {
                ManipulationKind::SunAngleIncrease
            } else {
                ManipulationKind::SunAngleDecrease
            };
            d.dispatch(ManipulationEvent::of(kind)).unwrap();
            let angle = d.engine().with_simulation(|sim| sim.model.params.sun_angle);
            prop_assert!((0.0..=PI).contains(&angle));
        }
    }
}
