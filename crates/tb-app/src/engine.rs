//! Run/stop/reset lifecycle and the background stepping worker.
//!
//! The simulation lives behind one mutex. The worker takes it once per step;
//! every other caller (dispatcher, codec, reset) takes it per operation, so a
//! structural edit never interleaves with a step.
//!
//! There is at most one worker thread per engine. It is spawned on the first
//! [`ExecutionEngine::run`] and parked on a wake channel while the engine is
//! not running. `run()` moves the state to `Running` with a compare-and-swap,
//! so concurrent callers cannot start two stepping loops.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tb_codec::{DecodeReport, read_state_into, write_state};
use tb_model::Simulation;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::script::Scripter;
use crate::view::ViewObserver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Never run.
    Idle,
    Running,
    Stopped,
}

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

impl EngineState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            RUNNING => EngineState::Running,
            STOPPED => EngineState::Stopped,
            _ => EngineState::Idle,
        }
    }
}

/// Lock `mutex`, taking over the data if a previous holder panicked. The
/// simulation is plain data; a panic mid-step leaves it usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        warn!("recovering a poisoned lock");
        poisoned.into_inner()
    })
}

struct Shared {
    sim: Mutex<Simulation>,
    state: AtomicU8,
    abort: AtomicBool,
    workers: AtomicUsize,
    observer: Arc<dyn ViewObserver>,
    step_pause: Duration,
}

impl Shared {
    fn running(&self) -> bool {
        self.state.load(Ordering::SeqCst) == RUNNING && !self.abort.load(Ordering::SeqCst)
    }
}

/// Keeps the live-worker count honest even if a step panics. The count is
/// raised by [`ExecutionEngine::run`] before the thread is spawned, so a
/// worker that has not started yet still counts as live.
struct WorkerGuard(Arc<Shared>);

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            let _ = self.0.state.compare_exchange(
                RUNNING,
                STOPPED,
                Ordering::SeqCst,
                Ordering::SeqCst,
            );
            warn!("a step panicked; stepping worker lost");
        }
        self.0.workers.fetch_sub(1, Ordering::SeqCst);
        debug!("stepping worker exited");
    }
}

fn worker_loop(shared: Arc<Shared>, wake: Receiver<()>) {
    let guard = WorkerGuard(shared);
    let shared = &guard.0;
    debug!("stepping worker started");
    while wake.recv().is_ok() {
        while shared.running() {
            let outcome = {
                let mut sim = lock(&shared.sim);
                // reset() or load_state() may have stopped us while we waited
                if !shared.running() {
                    break;
                }
                sim.model.advance_one_step()
            };
            if outcome.view_update {
                shared.observer.set_time(outcome.time);
                shared.observer.repaint();
            }
            if !shared.step_pause.is_zero() {
                thread::sleep(shared.step_pause);
            }
        }
        if shared.abort.load(Ordering::SeqCst) {
            break;
        }
    }
}

#[derive(Default)]
struct Worker {
    wake: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

pub struct ExecutionEngine {
    shared: Arc<Shared>,
    worker: Mutex<Worker>,
    scripter: Mutex<Option<Box<dyn Scripter>>>,
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("state", &self.state())
            .field("active_workers", &self.active_workers())
            .finish_non_exhaustive()
    }
}

impl ExecutionEngine {
    pub fn new(config: &EngineConfig, observer: Arc<dyn ViewObserver>) -> Self {
        Self::from_simulation(Simulation::new(config.grid), config, observer)
    }

    /// Wrap an existing simulation, e.g. one built with a custom solver.
    pub fn from_simulation(
        sim: Simulation,
        config: &EngineConfig,
        observer: Arc<dyn ViewObserver>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                sim: Mutex::new(sim),
                state: AtomicU8::new(IDLE),
                abort: AtomicBool::new(false),
                workers: AtomicUsize::new(0),
                observer,
                step_pause: config.step_pause(),
            }),
            worker: Mutex::new(Worker::default()),
            scripter: Mutex::new(None),
        }
    }

    pub fn state(&self) -> EngineState {
        EngineState::from_raw(self.shared.state.load(Ordering::SeqCst))
    }

    /// Number of live stepping threads: 0 before the first run, 1 afterwards.
    pub fn active_workers(&self) -> usize {
        self.shared.workers.load(Ordering::SeqCst)
    }

    pub fn observer(&self) -> &dyn ViewObserver {
        self.shared.observer.as_ref()
    }

    /// Run `f` with exclusive access to the simulation.
    pub fn with_simulation<T>(&self, f: impl FnOnce(&mut Simulation) -> T) -> T {
        f(&mut lock(&self.shared.sim))
    }

    /// Start stepping. A no-op while already running.
    ///
    /// # Errors
    ///
    /// [`EngineError::ShutDown`] after [`shutdown`](Self::shutdown), or
    /// [`EngineError::WorkerSpawn`] if a worker thread cannot start. A worker
    /// lost to a panicking step is replaced here.
    pub fn run(&self) -> EngineResult<()> {
        if self.shared.abort.load(Ordering::SeqCst) {
            return Err(EngineError::ShutDown);
        }
        let claimed = self
            .shared
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |s| {
                (s != RUNNING).then_some(RUNNING)
            })
            .is_ok();
        if !claimed {
            debug!("run requested while already running");
            return Ok(());
        }

        let mut worker = lock(&self.worker);
        // a worker lost to a panicking step leaves a stale slot behind
        if worker.wake.is_none() || self.active_workers() == 0 {
            self.spawn_worker(&mut worker)?;
        }
        let delivered = worker.wake.as_ref().is_some_and(|wake| wake.send(()).is_ok());
        if !delivered {
            self.spawn_worker(&mut worker)?;
            if let Some(wake) = &worker.wake {
                // the receiver lives as long as the new worker
                let _ = wake.send(());
            }
        }
        info!("engine running");
        Ok(())
    }

    fn spawn_worker(&self, worker: &mut Worker) -> EngineResult<()> {
        let (tx, rx) = channel();
        let shared = Arc::clone(&self.shared);
        self.shared.workers.fetch_add(1, Ordering::SeqCst);
        let spawned = thread::Builder::new()
            .name("tb-stepper".to_string())
            .spawn(move || worker_loop(shared, rx));
        let handle = spawned.map_err(|e| {
            self.shared.workers.fetch_sub(1, Ordering::SeqCst);
            self.shared.state.store(STOPPED, Ordering::SeqCst);
            EngineError::WorkerSpawn(e)
        })?;
        worker.wake = Some(tx);
        // replacing a finished handle detaches it
        worker.handle = Some(handle);
        Ok(())
    }

    /// Ask the worker to stop at the next step boundary. An in-flight step
    /// completes.
    pub fn stop(&self) {
        let previous = self.shared.state.swap(STOPPED, Ordering::SeqCst);
        if previous == RUNNING {
            info!("engine stopped");
        }
    }

    /// Stop, then return the model to its initial conditions.
    pub fn reset(&self) {
        self.stop();
        let time = self.with_simulation(|sim| {
            sim.reset();
            sim.model.time()
        });
        self.shared.observer.set_time(time);
        self.shared.observer.repaint();
        info!("engine reset");
    }

    /// Remove every part, thermometer, thermostat and annotation.
    pub fn clear(&self) {
        self.with_simulation(Simulation::clear);
        self.shared.observer.repaint();
        info!("engine cleared");
    }

    /// Stop, then replace the whole simulation with the state read from
    /// `reader`. The reader is dropped before this returns, and the engine is
    /// left stopped either way.
    ///
    /// Content problems do not fail the load; they come back in the report.
    pub fn load_state<R: Read>(&self, reader: R) -> EngineResult<DecodeReport> {
        self.stop();
        let outcome = self.with_simulation(|sim| {
            let outcome = read_state_into(reader, sim);
            (outcome, sim.model.time())
        });
        self.stop();
        let (outcome, time) = outcome;
        self.shared.observer.set_time(time);
        self.shared.observer.repaint();
        let report = outcome?;
        if report.is_clean() {
            info!("state loaded");
        } else {
            warn!(issues = report.issues().len(), "state loaded with problems");
        }
        Ok(report)
    }

    /// Stop, then write the encoded state to `writer`, which is dropped
    /// before this returns.
    pub fn save_state<W: Write>(&self, writer: W) -> EngineResult<()> {
        self.stop();
        self.with_simulation(|sim| write_state(sim, writer))?;
        info!("state saved");
        Ok(())
    }

    pub fn set_scripter(&self, scripter: Box<dyn Scripter>) {
        *lock(&self.scripter) = Some(scripter);
    }

    /// Hand `script` to the installed [`Scripter`], if any.
    pub fn run_script(&self, script: &str) {
        match lock(&self.scripter).as_mut() {
            Some(scripter) => scripter.execute(script),
            None => warn!(len = script.len(), "no scripter installed; script ignored"),
        }
    }

    /// Process teardown: stop, raise the abort flag and detach the worker
    /// without waiting for it. A step in progress is abandoned. Later calls to
    /// [`run`](Self::run) fail with [`EngineError::ShutDown`].
    pub fn shutdown(&self) {
        self.stop();
        if self.shared.abort.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut worker = lock(&self.worker);
        worker.wake = None;
        if worker.handle.take().is_some() && self.active_workers() > 0 {
            warn!("shutting down; abandoning the stepping worker");
        }
        info!("engine shut down");
    }
}

impl Drop for ExecutionEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::NullObserver;
    use tb_model::GridConfig;

    fn engine() -> ExecutionEngine {
        let config = EngineConfig {
            grid: GridConfig { nx: 4, ny: 4 },
            step_pause_ms: 0,
        };
        ExecutionEngine::new(&config, Arc::new(NullObserver))
    }

    #[test]
    fn starts_idle_without_workers() {
        let engine = engine();
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.active_workers(), 0);
    }

    #[test]
    fn stop_before_run_is_stopped() {
        let engine = engine();
        engine.stop();
        assert_eq!(engine.state(), EngineState::Stopped);
    }

    #[test]
    fn run_after_shutdown_fails() {
        let engine = engine();
        engine.shutdown();
        assert!(matches!(engine.run(), Err(EngineError::ShutDown)));
        assert_eq!(engine.state(), EngineState::Stopped);
    }

    #[test]
    fn script_without_scripter_is_ignored() {
        struct Recorder(Arc<Mutex<Vec<String>>>);
        impl Scripter for Recorder {
            fn execute(&mut self, script: &str) {
                self.0.lock().unwrap().push(script.to_string());
            }
        }

        let engine = engine();
        engine.run_script("run");
        let seen = Arc::new(Mutex::new(Vec::new()));
        engine.set_scripter(Box::new(Recorder(seen.clone())));
        engine.run_script("reset");
        assert_eq!(*seen.lock().unwrap(), vec!["reset".to_string()]);
    }
}
