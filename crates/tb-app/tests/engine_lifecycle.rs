use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use tb_app::{
    ChannelObserver, EngineConfig, EngineError, EngineState, ExecutionEngine, NullObserver,
    ViewEvent,
};
use tb_model::{
    Fields, GridConfig, HeatBoundary, IdleSolver, Model, ModelParams, Part, Shape, Simulation,
    Solver,
};

fn config() -> EngineConfig {
    EngineConfig {
        grid: GridConfig { nx: 6, ny: 6 },
        step_pause_ms: 0,
    }
}

fn engine() -> ExecutionEngine {
    ExecutionEngine::new(&config(), Arc::new(NullObserver))
}

fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    cond()
}

fn time(engine: &ExecutionEngine) -> f32 {
    engine.with_simulation(|sim| sim.model.time())
}

struct Tracked<T> {
    inner: T,
    closed: Arc<AtomicBool>,
}

impl<T> Tracked<T> {
    fn new(inner: T) -> (Self, Arc<AtomicBool>) {
        let closed = Arc::new(AtomicBool::new(false));
        (
            Self {
                inner,
                closed: closed.clone(),
            },
            closed,
        )
    }
}

impl<T> Drop for Tracked<T> {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl<T: Read> Read for Tracked<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<T: Write> Write for Tracked<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[test]
fn run_twice_keeps_one_worker() {
    let engine = engine();
    engine.run().unwrap();
    engine.run().unwrap();
    assert_eq!(engine.state(), EngineState::Running);
    assert!(wait_until(|| engine.active_workers() == 1));
    assert!(wait_until(|| time(&engine) > 0.0));
    assert_eq!(engine.active_workers(), 1);
    engine.stop();
}

#[test]
fn concurrent_runs_keep_one_worker() {
    let engine = Arc::new(engine());
    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                engine.run().unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert!(wait_until(|| engine.active_workers() == 1));
    thread::sleep(Duration::from_millis(20));
    assert_eq!(engine.active_workers(), 1);
    engine.stop();
}

#[test]
fn stop_halts_stepping_and_run_resumes_on_same_worker() {
    let engine = engine();
    engine.run().unwrap();
    assert!(wait_until(|| time(&engine) > 0.0));

    engine.stop();
    assert_eq!(engine.state(), EngineState::Stopped);
    let frozen = time(&engine);
    thread::sleep(Duration::from_millis(20));
    assert_eq!(time(&engine), frozen);

    engine.run().unwrap();
    assert!(wait_until(|| time(&engine) > frozen));
    assert_eq!(engine.active_workers(), 1);
    engine.stop();
}

/// Panics on its first step, then behaves like [`IdleSolver`].
struct FlakySolver {
    failed: bool,
}

impl Solver for FlakySolver {
    fn step(&mut self, fields: &mut Fields, params: &ModelParams, boundary: &HeatBoundary) {
        if !self.failed {
            self.failed = true;
            panic!("solver blew up");
        }
        IdleSolver.step(fields, params, boundary);
    }
}

#[test]
fn run_replaces_a_worker_lost_to_a_panicking_step() {
    let grid = config().grid;
    let mut sim = Simulation::new(grid);
    sim.model = Model::new(grid).with_solver(Box::new(FlakySolver { failed: false }));
    let engine = ExecutionEngine::from_simulation(sim, &config(), Arc::new(NullObserver));

    engine.run().unwrap();
    assert!(wait_until(|| engine.active_workers() == 0));
    assert_eq!(engine.state(), EngineState::Stopped);

    engine.run().unwrap();
    assert_eq!(engine.state(), EngineState::Running);
    assert!(wait_until(|| time(&engine) > 0.0));
    assert_eq!(engine.active_workers(), 1);
    engine.stop();
}

#[test]
fn reset_stops_and_rewinds_time() {
    let (observer, events) = ChannelObserver::new();
    let engine = ExecutionEngine::new(&config(), Arc::new(observer));
    engine.with_simulation(|sim| {
        let part = Part::new(Shape::rectangle(1.0, 1.0, 2.0, 2.0).unwrap()).unwrap();
        sim.model.add_part(part).unwrap();
    });
    engine.run().unwrap();
    assert!(wait_until(|| time(&engine) > 0.0));

    engine.reset();
    assert_eq!(engine.state(), EngineState::Stopped);
    assert_eq!(time(&engine), 0.0);
    assert_eq!(engine.with_simulation(|sim| sim.model.part_count()), 1);

    // a step finishing just before the reset may still report its own time
    let seen: Vec<_> = events.try_iter().collect();
    let rewound = seen
        .iter()
        .position(|e| *e == ViewEvent::Time(0.0))
        .expect("reset reports time zero");
    assert!(seen[rewound..].contains(&ViewEvent::Repaint));
}

#[test]
fn clear_empties_the_model() {
    let engine = engine();
    engine.with_simulation(|sim| {
        let part = Part::new(Shape::rectangle(1.0, 1.0, 2.0, 2.0).unwrap()).unwrap();
        sim.model.add_part(part).unwrap();
        sim.model.params.lx = 20.0;
    });
    engine.clear();
    engine.with_simulation(|sim| {
        assert_eq!(sim.model.part_count(), 0);
        assert_eq!(sim.model.params.lx, 20.0);
    });
}

#[test]
fn load_stops_closes_and_applies_good_tags() {
    let engine = engine();
    engine.run().unwrap();
    assert!(wait_until(|| time(&engine) > 0.0));

    let doc = "<state><model><model_width 4.0>\n\
               <model_height>4.0</model_height></model></state>";
    let (reader, closed) = Tracked::new(doc.as_bytes());
    let report = engine.load_state(reader).unwrap();

    assert!(closed.load(Ordering::SeqCst));
    assert!(!report.is_clean());
    assert_eq!(engine.state(), EngineState::Stopped);
    engine.with_simulation(|sim| {
        assert_eq!(sim.model.params.ly, 4.0);
        assert_eq!(sim.model.params.lx, 10.0);
        assert_eq!(sim.model.time(), 0.0);
    });
}

#[test]
fn save_closes_writer_and_matches_encoding() {
    let engine = engine();
    engine.with_simulation(|sim| sim.model.params.sunny = true);

    let (writer, closed) = Tracked::new(Vec::new());
    let shared = Arc::new(std::sync::Mutex::new(Vec::new()));
    struct Sink(Arc<std::sync::Mutex<Vec<u8>>>, Tracked<Vec<u8>>);
    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            self.1.write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            self.1.flush()
        }
    }

    engine.save_state(Sink(shared.clone(), writer)).unwrap();
    assert!(closed.load(Ordering::SeqCst));
    let written = String::from_utf8(shared.lock().unwrap().clone()).unwrap();
    let expected = engine.with_simulation(|sim| tb_codec::encode(sim));
    assert_eq!(written, expected);
    assert!(written.contains("<sunny>true</sunny>"));
}

#[test]
fn shutdown_detaches_worker_and_refuses_run() {
    let engine = engine();
    engine.run().unwrap();
    assert!(wait_until(|| engine.active_workers() == 1));

    engine.shutdown();
    assert_eq!(engine.state(), EngineState::Stopped);
    assert!(matches!(engine.run(), Err(EngineError::ShutDown)));
    assert!(wait_until(|| engine.active_workers() == 0));
}
